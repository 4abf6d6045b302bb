//! Update sessions: record staging and SIG(0) signing for one zone.

use crate::dns::message;
use crate::dns::rr_parse::{self, StageKind};
use crate::error::Error;
use crate::keystore::key::ALGORITHM_ED25519;
use crate::keystore::StoredKey;
use ring::signature::Ed25519KeyPair;
use time::OffsetDateTime;
use trust_dns_client::op::Message;
use trust_dns_client::rr::{Name, Record};
use trust_dns_client::rr::dnssec::{Algorithm, KeyPair, SigSigner};

/// The staged records of a single DNS UPDATE, bound to the key that may sign it and the zone
/// it applies to.
#[derive(Debug)]
pub struct UpdateSession {
    key: StoredKey,
    zone: Name,
    signer_name: Name,
    staged: Vec<Record>,
}

impl UpdateSession {
    /// Start a session updating `zone` with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] unless the key's owner name is at or below `zone`.
    pub fn start(key: StoredKey, zone: Name) -> Result<Self, Error> {
        if !zone.zone_of(&key.record.fqdn) {
            return Err(Error::Unauthorized {
                key: key.record.fqdn.clone(),
                zone,
            });
        }
        let signer_name = key.record.fqdn.clone();
        Ok(Self {
            key,
            zone,
            signer_name,
            staged: Vec::new(),
        })
    }

    /// Sign as `signer_name` rather than the key's owner name, e.g. for a key that is only
    /// published under the zone's signal subzone.
    #[must_use]
    pub fn with_signer_name(mut self, signer_name: Name) -> Self {
        self.signer_name = signer_name;
        self
    }

    pub fn zone(&self) -> &Name {
        &self.zone
    }

    pub fn key(&self) -> &StoredKey {
        &self.key
    }

    pub fn staged(&self) -> &[Record] {
        &self.staged
    }

    /// Parse `text` and append it to the update as `kind`. A parse failure leaves the
    /// already staged records untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if `text` isn't a valid record for `kind` in this zone.
    pub fn stage(&mut self, text: &str, kind: StageKind) -> Result<(), Error> {
        let record = rr_parse::parse_record(text, &self.zone, kind)?;
        self.staged.push(record);
        Ok(())
    }

    /// Append an already built record, e.g. a `KEY` constructed from keystore data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the record is outside of this zone.
    pub fn stage_record(&mut self, record: Record) -> Result<(), Error> {
        if !self.zone.zone_of(record.name()) {
            return Err(Error::Validation(format!(
                "{} is outside of zone {}",
                record.name(),
                self.zone
            )));
        }
        self.staged.push(record);
        Ok(())
    }

    /// Build the unsigned UPDATE message for the session's zone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if nothing was staged.
    pub fn unsigned(self) -> Result<Message, Error> {
        self.build()
    }

    /// Build the UPDATE message and sign it with SIG(0), see
    /// [RFC-2931](https://www.rfc-editor.org/rfc/rfc2931).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if nothing was staged, and [`Error::Signing`] if the key
    /// has no private half, isn't an Ed25519 key, or signing fails.
    pub fn sign(self) -> Result<Message, Error> {
        let secret = self.key.secret.as_ref().ok_or_else(|| {
            Error::Signing(format!("key {} has no private key", self.key.record.name))
        })?;
        if self.key.record.algorithm != ALGORITHM_ED25519 {
            return Err(Error::Signing(format!(
                "unsupported key algorithm {}",
                self.key.record.algorithm
            )));
        }
        let pair = Ed25519KeyPair::from_seed_unchecked(secret.as_bytes())
            .map_err(|err| Error::Signing(err.to_string()))?;
        let key_pair = KeyPair::from_ed25519(pair);
        let sig0key = key_pair
            .to_sig0key(Algorithm::ED25519)
            .map_err(|err| Error::Signing(err.to_string()))?;
        let signer = SigSigner::sig0(sig0key, key_pair, self.signer_name.clone());

        let mut update = self.build()?;
        let inception = u32::try_from(OffsetDateTime::now_utc().unix_timestamp())
            .map_err(|err| Error::Signing(format!("clock out of range: {err}")))?;
        update
            .finalize(&signer, inception)
            .map_err(|err| Error::Signing(err.to_string()))?;
        Ok(update)
    }

    fn build(&self) -> Result<Message, Error> {
        if self.staged.is_empty() {
            return Err(Error::Validation(format!(
                "no staged records for zone {}",
                self.zone
            )));
        }
        Ok(message::update(self.zone.clone(), &self.staged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::key::KeyRecord;
    use std::str::FromStr;
    use trust_dns_client::op::OpCode;
    use trust_dns_client::rr::{DNSClass, RecordType};

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn session() -> UpdateSession {
        let key = StoredKey::generate(name("foo.example.com.")).unwrap();
        UpdateSession::start(key, name("example.com.")).unwrap()
    }

    #[test]
    fn keys_outside_the_zone_are_unauthorized() {
        let key = StoredKey::generate(name("foo.example.org.")).unwrap();
        assert!(matches!(
            UpdateSession::start(key, name("example.com.")),
            Err(Error::Unauthorized { .. })
        ));
    }

    #[test]
    fn staging_preserves_order() {
        let mut session = session();
        session
            .stage("foo.example.com.", StageKind::DeleteName)
            .unwrap();
        session
            .stage("foo.example.com. 300 IN A 10.0.0.1", StageKind::AddRecord)
            .unwrap();

        let staged = session.staged();
        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].rr_type(), RecordType::ANY);
        assert_eq!(staged[0].dns_class(), DNSClass::ANY);
        assert_eq!(staged[1].rr_type(), RecordType::A);
        assert_eq!(staged[1].dns_class(), DNSClass::IN);
    }

    #[test]
    fn parse_failures_keep_earlier_records() {
        let mut session = session();
        session
            .stage("foo.example.com. 300 IN A 10.0.0.1", StageKind::AddRecord)
            .unwrap();
        assert!(session
            .stage("foo.example.com. 300 IN A bogus", StageKind::AddRecord)
            .is_err());
        session
            .stage("foo.example.com. IN AAAA", StageKind::DeleteRRset)
            .unwrap();
        assert_eq!(session.staged().len(), 2);
    }

    #[test]
    fn empty_updates_are_invalid() {
        assert!(matches!(session().unsigned(), Err(Error::Validation(_))));
        assert!(matches!(session().sign(), Err(Error::Validation(_))));
    }

    #[test]
    fn unsigned_update_carries_staged_records() {
        let mut session = session();
        session
            .stage("foo.example.com. 300 IN A 10.0.0.1", StageKind::AddRecord)
            .unwrap();
        let update = session.unsigned().unwrap();
        assert_eq!(update.op_code(), OpCode::Update);
        assert_eq!(update.queries()[0].name(), &name("example.com."));
        assert_eq!(update.name_servers().len(), 1);
        assert!(update.sig0().is_empty());
    }

    #[test]
    fn signed_update_carries_sig0() {
        let mut session = session();
        session
            .stage("foo.example.com. 300 IN A 10.0.0.1", StageKind::AddRecord)
            .unwrap();
        let update = session.sign().unwrap();
        assert_eq!(update.name_servers().len(), 1);
        assert_eq!(update.sig0().len(), 1);
        assert_eq!(update.sig0()[0].rr_type(), RecordType::SIG);
    }

    #[test]
    fn signing_requires_private_key() {
        let mut key = StoredKey::generate(name("foo.example.com.")).unwrap();
        key.secret = None;
        let mut session = UpdateSession::start(key, name("example.com.")).unwrap();
        session
            .stage("foo.example.com. IN A", StageKind::DeleteRRset)
            .unwrap();
        assert!(matches!(session.sign(), Err(Error::Signing(_))));
    }

    #[test]
    fn staged_records_must_be_in_zone() {
        let mut session = session();
        let key: &KeyRecord = &session.key().record.clone();
        let outside = Record::from_rdata(name("foo.example.org."), 60, key.to_rdata());
        assert!(matches!(
            session.stage_record(outside),
            Err(Error::Validation(_))
        ));
    }
}
