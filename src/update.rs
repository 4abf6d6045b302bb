//! Update transactions.
//!
//! An [`Updater`] accumulates add and delete operations for one zone and submits them as a
//! single DNS UPDATE to the DOH endpoint it was created with. Operations are staged
//! synchronously; only the final [`Updater::signed_update`] or [`Updater::unsigned_update`]
//! touches the network, and only one of them may be called.

use crate::dns::message::{expect_success, fqdn};
use crate::dns::{DynTransport, StageKind, UpdateSession};
use crate::error::Error;
use crate::keystore::StoredKey;
use crate::task::{self, Pending};
use trust_dns_client::op::Message;

/// A single-use DNS UPDATE builder bound to a key, a zone and a DOH endpoint.
pub struct Updater {
    session: Option<UpdateSession>,
    endpoint: String,
    transport: DynTransport,
}

impl Updater {
    /// Start an update of `zone` signed with `key`, to be submitted to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `zone` or `endpoint` is empty and
    /// [`Error::Unauthorized`] if `key` may not update `zone`.
    pub fn new(
        key: StoredKey,
        zone: &str,
        endpoint: &str,
        transport: DynTransport,
    ) -> Result<Self, Error> {
        if endpoint.trim().is_empty() {
            return Err(Error::InvalidArgument("empty DOH endpoint".to_string()));
        }
        let session = UpdateSession::start(key, fqdn(zone)?)?;
        Ok(Self {
            session: Some(session),
            endpoint: endpoint.trim().to_string(),
            transport,
        })
    }

    /// Stage the full record `text` for addition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for invalid record text and [`Error::UpdateConsumed`] once the
    /// update was submitted.
    pub fn add_rr(&mut self, text: &str) -> Result<(), Error> {
        self.stage(text, StageKind::AddRecord)
    }

    /// Stage the removal of exactly the record `text`.
    ///
    /// # Errors
    ///
    /// See [`Updater::add_rr`].
    pub fn delete_rr(&mut self, text: &str) -> Result<(), Error> {
        self.stage(text, StageKind::DeleteRecord)
    }

    /// Stage the removal of every record with the name and type in `text`, e.g.
    /// `foo.example.com. IN A`.
    ///
    /// # Errors
    ///
    /// See [`Updater::add_rr`].
    pub fn delete_rrset(&mut self, text: &str) -> Result<(), Error> {
        self.stage(text, StageKind::DeleteRRset)
    }

    /// Stage the removal of every record at the name in `text`, including `KEY` records.
    ///
    /// # Errors
    ///
    /// See [`Updater::add_rr`].
    pub fn delete_name(&mut self, text: &str) -> Result<(), Error> {
        self.stage(text, StageKind::DeleteName)
    }

    /// Sign the staged operations with SIG(0) and submit them.
    ///
    /// The returned handle rejects with [`Error::UpdateConsumed`] if the update was already
    /// submitted.
    pub fn signed_update(&mut self) -> Pending<()> {
        match self.session.take() {
            Some(session) => task::spawn(
                "signed update",
                submit_signed(self.transport.clone(), self.endpoint.clone(), session),
            ),
            None => Pending::rejected(Error::UpdateConsumed),
        }
    }

    /// Submit the staged operations without a signature.
    ///
    /// The returned handle rejects with [`Error::UpdateConsumed`] if the update was already
    /// submitted.
    pub fn unsigned_update(&mut self) -> Pending<()> {
        match self.session.take() {
            Some(session) => task::spawn(
                "unsigned update",
                submit_unsigned(self.transport.clone(), self.endpoint.clone(), session),
            ),
            None => Pending::rejected(Error::UpdateConsumed),
        }
    }

    fn stage(&mut self, text: &str, kind: StageKind) -> Result<(), Error> {
        self.session
            .as_mut()
            .ok_or(Error::UpdateConsumed)?
            .stage(text, kind)
    }
}

async fn submit_signed(
    transport: DynTransport,
    endpoint: String,
    session: UpdateSession,
) -> Result<(), Error> {
    let zone = session.zone().clone();
    let update = session.sign()?;
    submit(transport, &endpoint, update).await?;
    tracing::info!("signed update of \"{zone}\" accepted by {endpoint}");
    Ok(())
}

async fn submit_unsigned(
    transport: DynTransport,
    endpoint: String,
    session: UpdateSession,
) -> Result<(), Error> {
    let zone = session.zone().clone();
    let update = session.unsigned()?;
    submit(transport, &endpoint, update).await?;
    tracing::info!("unsigned update of \"{zone}\" accepted by {endpoint}");
    Ok(())
}

/// Send `update` to `endpoint`, failing unless it is answered with `NOERROR`.
pub(crate) async fn submit(
    transport: DynTransport,
    endpoint: &str,
    update: Message,
) -> Result<(), Error> {
    let response = transport.send(endpoint, update).await?;
    expect_success(&response)
}
