//! Key enrollment status.
//!
//! A key is *published* when a `KEY` record with exactly its flags, protocol, algorithm and
//! public key exists at its owner name. A key is *queued* when the zone's `_signal` subzone
//! holds a `PTR` record naming the key's enrollment marker, e.g. for key `foo.example.com.`
//! in zone `example.com.`:
//!
//! ```text
//! _signal.example.com. IN PTR foo._signal.example.com.
//! ```
//!
//! The `KEY` lookup always completes before the `PTR` lookup starts, and a failed `KEY`
//! lookup ends the check without sending the `PTR` query.

use crate::dns::message::{self, enrollment_marker, signal_subzone};
use crate::dns::transport::DohTransport;
use crate::error::Error;
use crate::keystore::KeyRecord;
use serde::Serialize;
use trust_dns_client::rr::{Name, RecordType};

/// The outcome of a key status check.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyStatus {
    /// The key's `KEY` record is published at its owner name.
    #[serde(rename = "KeyRRExists")]
    pub key_rr_exists: bool,
    /// An enrollment request for the key is queued in the zone's signal subzone.
    #[serde(rename = "QueuePTRExists")]
    pub queue_ptr_exists: bool,
}

/// Check whether `key` is published in, or queued for enrollment into, `zone`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the key isn't within `zone`, the transport's error if
/// either query can't be sent, [`Error::UnexpectedResponse`] if either query is answered with
/// a response code other than `NOERROR` or `NXDOMAIN`, and [`Error::Protocol`] if an answer
/// has the wrong type.
pub async fn check_key_status(
    transport: &(dyn DohTransport + Send + Sync),
    key: &KeyRecord,
    zone: &Name,
    endpoint: &str,
) -> Result<KeyStatus, Error> {
    let marker = enrollment_marker(&key.fqdn, zone)?;
    let key_rr_exists = key_published(transport, key, endpoint).await?;
    let queue_ptr_exists = request_queued(transport, zone, &marker, endpoint).await?;
    tracing::debug!(
        "status of {} in {zone}: published={key_rr_exists} queued={queue_ptr_exists}",
        key.fqdn
    );
    Ok(KeyStatus {
        key_rr_exists,
        queue_ptr_exists,
    })
}

async fn key_published(
    transport: &(dyn DohTransport + Send + Sync),
    key: &KeyRecord,
    endpoint: &str,
) -> Result<bool, Error> {
    let response = transport
        .send(endpoint, message::key_query(key.fqdn.clone()))
        .await?;
    let answers = message::typed_answers(&response, RecordType::KEY)?;
    Ok(answers
        .iter()
        .filter_map(|rr| rr.data())
        .any(|rdata| key.matches(rdata)))
}

async fn request_queued(
    transport: &(dyn DohTransport + Send + Sync),
    zone: &Name,
    marker: &Name,
    endpoint: &str,
) -> Result<bool, Error> {
    let response = transport
        .send(endpoint, message::ptr_query(signal_subzone(zone)?))
        .await?;
    let answers = message::typed_answers(&response, RecordType::PTR)?;
    let marker = marker.to_ascii();
    Ok(answers
        .iter()
        .filter_map(|rr| rr.data().and_then(|rdata| rdata.as_ptr()))
        .any(|target| target.to_ascii() == marker))
}
