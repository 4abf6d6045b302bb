//! Key enrollment requests.
//!
//! A name asks its parent zone for a key by filing a SIG(0) signed update into the zone's
//! `_signal` subzone. For `foo.example.com.` the update to `example.com.` adds:
//!
//! ```text
//! foo._signal.example.com. 3600 IN KEY 513 3 15 <public key>
//! _signal.example.com.     3600 IN PTR foo._signal.example.com.
//! ```
//!
//! signed with the requesting key under the marker name `foo._signal.example.com.`. The zone
//! operator later publishes the key at `foo.example.com.`, see [`crate::status`].

use crate::dns::message::{enrollment_marker, fqdn, signal_subzone};
use crate::dns::rr_parse::DEFAULT_TTL;
use crate::dns::{DynTransport, StageKind, UpdateSession};
use crate::endpoint::find_doh_endpoint;
use crate::error::Error;
use crate::keystore::{DynKeystore, Keystore, StoredKey};
use crate::update::submit;
use trust_dns_client::rr::{Name, Record, RecordType};

/// File an enrollment request for `domain`, creating its key pair if none is stored yet.
///
/// # Errors
///
/// Returns [`Error::Enrollment`] wrapping whatever step failed.
pub async fn request_key(
    keystore: DynKeystore,
    transport: DynTransport,
    bootstrap: String,
    domain: String,
) -> Result<(), Error> {
    enroll(keystore, transport, &bootstrap, &domain)
        .await
        .map_err(|err| Error::Enrollment(Box::new(err)))
}

async fn enroll(
    keystore: DynKeystore,
    transport: DynTransport,
    bootstrap: &str,
    domain: &str,
) -> Result<(), Error> {
    let name = fqdn(domain)?;
    if name.num_labels() < 2 {
        return Err(Error::InvalidArgument(format!(
            "\"{name}\" has no parent zone to enroll with"
        )));
    }
    let zone = name.base_name();
    let marker = enrollment_marker(&name, &zone)?;

    let key = signing_key(&keystore, &name).await?;
    let endpoint = find_doh_endpoint(transport.as_ref(), bootstrap, &zone.to_ascii()).await?;

    let update = enrollment_update(key, &zone, &marker)?;
    submit(transport, &endpoint, update).await?;
    tracing::info!("enrollment of \"{name}\" requested from \"{zone}\" at {endpoint}");
    Ok(())
}

async fn signing_key(keystore: &DynKeystore, name: &Name) -> Result<StoredKey, Error> {
    if let Some(key) = keystore.read().await.find_signing_key(name).await? {
        tracing::debug!("reusing key {} for \"{name}\"", key.record.name);
        return Ok(key);
    }
    let mut keystore = keystore.write().await;
    find_or_create(&mut *keystore, name).await
}

/// Create a key for `name` unless one appeared while the write lock was awaited.
async fn find_or_create(
    keystore: &mut (dyn Keystore + Send + Sync),
    name: &Name,
) -> Result<StoredKey, Error> {
    if let Some(key) = keystore.find_signing_key(name).await? {
        return Ok(key);
    }
    keystore.create_key(name).await
}

fn enrollment_update(
    key: StoredKey,
    zone: &Name,
    marker: &Name,
) -> Result<trust_dns_client::op::Message, Error> {
    let mut key_rr = Record::from_rdata(marker.clone(), DEFAULT_TTL, key.record.to_rdata());
    key_rr.set_rr_type(RecordType::KEY);

    let mut session = UpdateSession::start(key, zone.clone())?.with_signer_name(marker.clone());
    session.stage_record(key_rr)?;
    session.stage(
        &format!("{} {DEFAULT_TTL} IN PTR {marker}", signal_subzone(zone)?),
        StageKind::AddRecord,
    )?;
    session.sign()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::message::rdata_bytes;
    use crate::dns::testing::{name, raw_record, response, ScriptedTransport};
    use crate::keystore::InMemoryKeystore;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use trust_dns_client::op::ResponseCode;

    const BOOTSTRAP: &str = "https://resolver.example.net/dns-query";

    fn svcb_answer() -> Record {
        let mut wire = 1_u16.to_be_bytes().to_vec();
        for label in ["doh", "example", "com"] {
            wire.push(u8::try_from(label.len()).unwrap());
            wire.extend_from_slice(label.as_bytes());
        }
        wire.push(0);
        raw_record("_dns.example.com.", RecordType::SVCB, wire)
    }

    fn keystore() -> (Arc<RwLock<InMemoryKeystore>>, DynKeystore) {
        let store = Arc::new(RwLock::new(InMemoryKeystore::default()));
        let dyn_store: DynKeystore = store.clone();
        (store, dyn_store)
    }

    async fn request(
        keystore: DynKeystore,
        transport: Arc<ScriptedTransport>,
        domain: &str,
    ) -> Result<(), Error> {
        request_key(keystore, transport, BOOTSTRAP.into(), domain.into()).await
    }

    #[tokio::test]
    async fn new_key_is_created_and_filed() {
        let (store, keystore) = keystore();
        let transport = ScriptedTransport::new(vec![
            Ok(response(ResponseCode::NoError, vec![svcb_answer()])),
            Ok(response(ResponseCode::NoError, vec![])),
        ]);
        request(keystore, transport.clone(), "foo.example.com")
            .await
            .unwrap();

        let keys = store.read().await.list_keys().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].fqdn, name("foo.example.com."));

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, BOOTSTRAP);
        assert_eq!(sent[1].0, "https://doh.example.com/dns-query");

        let update = &sent[1].1;
        assert_eq!(update.queries()[0].name(), &name("example.com."));
        let staged = update.name_servers();
        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].name(), &name("foo._signal.example.com."));
        assert_eq!(staged[0].rr_type(), RecordType::KEY);
        assert_eq!(
            rdata_bytes(staged[0].data().unwrap()).unwrap(),
            keys[0].rdata_wire()
        );
        assert_eq!(staged[1].name(), &name("_signal.example.com."));
        assert_eq!(staged[1].rr_type(), RecordType::PTR);
        assert_eq!(update.sig0().len(), 1);
    }

    #[tokio::test]
    async fn stored_key_is_reused() {
        let (store, keystore) = keystore();
        let existing = StoredKey::generate(name("foo.example.com.")).unwrap();
        store.write().await.insert(existing.clone());
        let transport = ScriptedTransport::new(vec![
            Ok(response(ResponseCode::NoError, vec![svcb_answer()])),
            Ok(response(ResponseCode::NoError, vec![])),
        ]);
        request(keystore, transport.clone(), "foo.example.com.")
            .await
            .unwrap();

        assert_eq!(store.read().await.list_keys().await.unwrap().len(), 1);
        let sent = transport.sent();
        assert_eq!(
            rdata_bytes(sent[1].1.name_servers()[0].data().unwrap()).unwrap(),
            existing.record.rdata_wire()
        );
    }

    #[tokio::test]
    async fn key_created_meanwhile_is_not_duplicated() {
        let mut store = InMemoryKeystore::default();
        let raced = StoredKey::generate(name("foo.example.com.")).unwrap();
        store.insert(raced.clone());

        let key = find_or_create(&mut store, &name("foo.example.com."))
            .await
            .unwrap();
        assert_eq!(key.record, raced.record);
        assert_eq!(store.list_keys().await.unwrap().len(), 1);

        find_or_create(&mut store, &name("bar.example.com."))
            .await
            .unwrap();
        assert_eq!(store.list_keys().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn top_level_names_are_rejected() {
        let (_, keystore) = keystore();
        let transport = ScriptedTransport::new(vec![]);
        let res = request(keystore, transport.clone(), "com").await;
        match res {
            Err(Error::Enrollment(inner)) => {
                assert!(matches!(*inner, Error::InvalidArgument(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn failures_are_wrapped() {
        let (_, keystore) = keystore();
        let transport = ScriptedTransport::new(vec![Ok(response(ResponseCode::NXDomain, vec![]))]);
        let res = request(keystore.clone(), transport, "foo.example.com").await;
        assert!(
            matches!(res, Err(Error::Enrollment(inner)) if matches!(*inner, Error::Resolution { .. }))
        );

        let transport = ScriptedTransport::new(vec![
            Ok(response(ResponseCode::NoError, vec![svcb_answer()])),
            Ok(response(ResponseCode::Refused, vec![])),
        ]);
        let res = request(keystore, transport, "foo.example.com").await;
        assert!(matches!(
            res,
            Err(Error::Enrollment(inner))
                if matches!(*inner, Error::UnexpectedResponse(ResponseCode::Refused))
        ));
    }
}
