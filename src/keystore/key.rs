//! Key pair model and the BIND style key file formats.

use crate::dns::message::rdata_bytes;
use crate::dns::rr_parse;
use crate::error::Error;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use trust_dns_client::rr::rdata::NULL;
use trust_dns_client::rr::{Name, RData, RecordType};

/// DNSSEC algorithm number for Ed25519, see [RFC-8080](https://www.rfc-editor.org/rfc/rfc8080).
pub const ALGORITHM_ED25519: u8 = 15;

/// KEY protocol number for DNSSEC, the only value allowed by
/// [RFC-3445](https://www.rfc-editor.org/rfc/rfc3445).
pub const PROTOCOL_DNSSEC: u8 = 3;

/// Flags of newly generated keys: a zone/entity key usable for general updates.
pub const DEFAULT_KEY_FLAGS: u16 = 513;

const ED25519_SEED_LEN: usize = 32;

/// The public half of a key pair, as published in a DNS `KEY` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    /// Keystore name of the key pair, e.g. `Kfoo.example.com.+015+12345`.
    pub name: String,
    /// Owner name of the `KEY` record.
    pub fqdn: Name,
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
}

/// The JSON summary of a key, as returned when listing the keystore.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct KeySummary {
    pub name: String,
    pub key: String,
}

impl KeyRecord {
    /// Parse `KEY` RDATA in presentation format: `flags protocol algorithm base64...`.
    pub(crate) fn from_rdata_tokens(
        name: String,
        fqdn: Name,
        tokens: &[String],
    ) -> Result<Self, String> {
        let (flags, protocol, algorithm, key) = match tokens {
            [flags, protocol, algorithm, key @ ..] if !key.is_empty() => {
                (flags, protocol, algorithm, key)
            }
            _ => return Err("KEY data needs flags, protocol, algorithm and key".to_string()),
        };
        let flags = flags
            .parse::<u16>()
            .map_err(|err| format!("bad KEY flags {flags}: {err}"))?;
        let protocol = protocol
            .parse::<u8>()
            .map_err(|err| format!("bad KEY protocol {protocol}: {err}"))?;
        let algorithm = algorithm
            .parse::<u8>()
            .map_err(|err| format!("bad KEY algorithm {algorithm}: {err}"))?;
        let public_key = BASE64
            .decode(key.concat())
            .map_err(|err| format!("bad KEY public key: {err}"))?;
        Ok(Self {
            name,
            fqdn,
            flags,
            protocol,
            algorithm,
            public_key,
        })
    }

    /// Parse the contents of a `.key` file: a single `KEY` record in presentation format,
    /// optionally preceded by `;` comment lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the file holds no well formed `KEY` record.
    pub fn from_key_file(name: &str, contents: &str) -> Result<Self, Error> {
        let line = contents
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with(';'))
            .ok_or_else(|| Error::parse(name, "key file holds no record"))?;
        let tokens = rr_parse::tokenize(line).map_err(|reason| Error::parse(line, reason))?;

        let (owner, rest) = tokens
            .split_first()
            .ok_or_else(|| Error::parse(line, "missing owner name"))?;
        let fqdn = Name::from_str(owner).map_err(|err| Error::parse(line, err))?;
        let key_idx = rest
            .iter()
            .position(|token| token.eq_ignore_ascii_case("KEY"))
            .ok_or_else(|| Error::parse(line, "not a KEY record"))?;
        Self::from_rdata_tokens(name.to_string(), fqdn, &rest[key_idx + 1..])
            .map_err(|reason| Error::parse(line, reason))
    }

    /// The `KEY` RDATA in wire format: flags, protocol, algorithm and public key.
    pub fn rdata_wire(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(4 + self.public_key.len());
        wire.extend_from_slice(&self.flags.to_be_bytes());
        wire.push(self.protocol);
        wire.push(self.algorithm);
        wire.extend_from_slice(&self.public_key);
        wire
    }

    /// The `KEY` RDATA, encoded opaquely so it survives independent of the DNSSEC feature set.
    pub fn to_rdata(&self) -> RData {
        RData::Unknown {
            code: u16::from(RecordType::KEY),
            rdata: NULL::with(self.rdata_wire()),
        }
    }

    /// Whether `rdata` is a `KEY` with exactly this key's flags, protocol, algorithm and
    /// public key.
    pub fn matches(&self, rdata: &RData) -> bool {
        rdata_bytes(rdata).map_or(false, |wire| wire == self.rdata_wire())
    }

    /// The key tag, see [RFC-4034 Appendix B](https://www.rfc-editor.org/rfc/rfc4034#appendix-B).
    pub fn key_tag(&self) -> u16 {
        let mut acc: u32 = 0;
        for (i, byte) in self.rdata_wire().iter().enumerate() {
            acc += if i & 1 == 0 {
                u32::from(*byte) << 8
            } else {
                u32::from(*byte)
            };
        }
        acc += (acc >> 16) & 0xFFFF;
        #[allow(clippy::cast_possible_truncation)]
        let tag = (acc & 0xFFFF) as u16;
        tag
    }

    /// The BIND keystore name for this key, `K<fqdn>+<algorithm>+<key tag>`.
    pub fn keystore_name(&self) -> String {
        format!(
            "K{}+{:03}+{:05}",
            self.fqdn.to_ascii(),
            self.algorithm,
            self.key_tag()
        )
    }

    pub fn summary(&self) -> KeySummary {
        KeySummary {
            name: self.name.clone(),
            key: self.to_string(),
        }
    }
}

impl fmt::Display for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} IN KEY {} {} {} {}",
            self.fqdn.to_ascii(),
            self.flags,
            self.protocol,
            self.algorithm,
            BASE64.encode(&self.public_key)
        )
    }
}

/// An Ed25519 private key seed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; ED25519_SEED_LEN]);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

impl SecretKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parse the contents of a BIND `.private` file (`Private-key-format: v1.3`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the file isn't an Ed25519 private key.
    pub fn from_private_file(name: &str, contents: &str) -> Result<Self, Error> {
        let field = |wanted: &str| {
            contents.lines().find_map(|line| {
                let (key, value) = line.split_once(':')?;
                (key.trim() == wanted).then(|| value.trim())
            })
        };
        let algorithm = field("Algorithm")
            .and_then(|value| value.split_whitespace().next())
            .ok_or_else(|| Error::parse(name, "missing Algorithm"))?;
        if algorithm != ALGORITHM_ED25519.to_string() {
            return Err(Error::parse(
                name,
                format!("unsupported private key algorithm {algorithm}"),
            ));
        }
        let seed = field("PrivateKey")
            .ok_or_else(|| Error::parse(name, "missing PrivateKey"))
            .and_then(|value| BASE64.decode(value).map_err(|err| Error::parse(name, err)))?;
        let seed: [u8; ED25519_SEED_LEN] = seed
            .try_into()
            .map_err(|_| Error::parse(name, "Ed25519 seed must be 32 bytes"))?;
        Ok(Self(seed))
    }

    pub fn to_private_file(&self) -> String {
        format!(
            "Private-key-format: v1.3\nAlgorithm: {ALGORITHM_ED25519} (ED25519)\nPrivateKey: {}\n",
            BASE64.encode(self.0)
        )
    }
}

/// A keystore entry: a public [`KeyRecord`] and, when available, its private half.
#[derive(Debug, Clone)]
pub struct StoredKey {
    pub record: KeyRecord,
    pub secret: Option<SecretKey>,
}

impl StoredKey {
    /// Generate a new Ed25519 key pair owned by `fqdn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if the system random source fails.
    pub fn generate(fqdn: Name) -> Result<Self, Error> {
        let mut seed = [0_u8; ED25519_SEED_LEN];
        SystemRandom::new()
            .fill(&mut seed)
            .map_err(|err| Error::Signing(format!("no randomness for key generation: {err}")))?;
        let pair = Ed25519KeyPair::from_seed_unchecked(&seed)
            .map_err(|err| Error::Signing(err.to_string()))?;

        let mut record = KeyRecord {
            name: String::new(),
            fqdn,
            flags: DEFAULT_KEY_FLAGS,
            protocol: PROTOCOL_DNSSEC,
            algorithm: ALGORITHM_ED25519,
            public_key: pair.public_key().as_ref().to_vec(),
        };
        record.name = record.keystore_name();
        Ok(Self {
            record,
            secret: Some(SecretKey(seed)),
        })
    }

    /// The `.key` file contents for this key.
    pub fn to_key_file(&self, created: &str) -> String {
        format!(
            "; This is a key, keyid {}, for {}\n; Created: {created}\n{}\n",
            self.record.key_tag(),
            self.record.fqdn.to_ascii(),
            self.record
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_FILE: &str = "; This is a key, keyid 7040, for foo.example.com.\n\
        ; Created: 20260101000000\n\
        foo.example.com. IN KEY 513 3 15 AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=\n";

    fn fqdn(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    #[test]
    fn key_file_round_trips_through_display() {
        let key = KeyRecord::from_key_file("Kfoo", KEY_FILE).unwrap();
        assert_eq!(key.name, "Kfoo");
        assert_eq!(key.fqdn, fqdn("foo.example.com."));
        assert_eq!(key.flags, 513);
        assert_eq!(key.protocol, 3);
        assert_eq!(key.algorithm, 15);
        assert_eq!(key.public_key, (0..32).collect::<Vec<u8>>());
        assert_eq!(
            key.to_string(),
            "foo.example.com. IN KEY 513 3 15 AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8="
        );
    }

    #[test]
    fn key_file_with_ttl_parses() {
        let key = KeyRecord::from_key_file(
            "Kfoo",
            "foo.example.com. 3600 IN KEY 512 3 15 AAEC AwQF",
        )
        .unwrap();
        assert_eq!(key.flags, 512);
        assert_eq!(key.public_key, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn malformed_key_files_are_rejected() {
        for contents in [
            "",
            "; only a comment",
            "foo.example.com. IN A 10.0.0.1",
            "foo.example.com. IN KEY 513 3",
            "foo.example.com. IN KEY 513 3 15 !!!",
        ] {
            assert!(
                matches!(
                    KeyRecord::from_key_file("Kfoo", contents),
                    Err(Error::Parse { .. })
                ),
                "{contents}"
            );
        }
    }

    #[test]
    fn rdata_matches_exact_key_only() {
        let key = KeyRecord::from_key_file("Kfoo", KEY_FILE).unwrap();
        assert!(key.matches(&key.to_rdata()));

        let mut other = key.clone();
        other.flags = 512;
        assert!(!key.matches(&other.to_rdata()));
        let mut other = key.clone();
        other.public_key[0] ^= 1;
        assert!(!key.matches(&other.to_rdata()));
    }

    #[test]
    fn decoded_key_rdata_matches() {
        use trust_dns_proto::serialize::binary::{BinDecoder, Restrict};

        let decode = |key: &KeyRecord| {
            let wire = key.rdata_wire();
            let len = u16::try_from(wire.len()).unwrap();
            RData::read(&mut BinDecoder::new(&wire), RecordType::KEY, Restrict::new(len)).unwrap()
        };
        let key = KeyRecord::from_key_file("Kfoo", KEY_FILE).unwrap();
        let decoded = decode(&key);
        assert!(matches!(decoded, RData::DNSSEC(_)));
        assert!(key.matches(&decoded));

        let mut other = key.clone();
        other.algorithm = 13;
        assert!(!key.matches(&decode(&other)));
        let mut other = key.clone();
        other.protocol = 4;
        assert!(!key.matches(&decode(&other)));
    }

    #[test]
    fn key_tag_follows_rfc4034() {
        // wire: 02 01 03 0f followed by bytes 0..32
        let key = KeyRecord::from_key_file("Kfoo", KEY_FILE).unwrap();
        let mut acc: u32 = 0x0201 + 0x030f;
        for pair in (0_u32..32).collect::<Vec<_>>().chunks(2) {
            acc += (pair[0] << 8) + pair[1];
        }
        acc += (acc >> 16) & 0xFFFF;
        assert_eq!(u32::from(key.key_tag()), acc & 0xFFFF);
    }

    #[test]
    fn generated_keys_are_named_after_their_tag() {
        let key = StoredKey::generate(fqdn("foo.example.com.")).unwrap();
        assert_eq!(key.record.public_key.len(), 32);
        assert_eq!(key.record.algorithm, ALGORITHM_ED25519);
        assert_eq!(
            key.record.name,
            format!("Kfoo.example.com.+015+{:05}", key.record.key_tag())
        );
        assert!(key.secret.is_some());
    }

    #[test]
    fn private_file_round_trips() {
        let key = StoredKey::generate(fqdn("foo.example.com.")).unwrap();
        let secret = key.secret.unwrap();
        let parsed = SecretKey::from_private_file("Kfoo", &secret.to_private_file()).unwrap();
        assert_eq!(parsed, secret);
    }

    #[test]
    fn non_ed25519_private_files_are_rejected() {
        let contents = "Private-key-format: v1.3\nAlgorithm: 8 (RSASHA256)\nModulus: AAAA\n";
        assert!(SecretKey::from_private_file("Kfoo", contents).is_err());
    }

    #[test]
    fn key_file_parses_back() {
        let key = StoredKey::generate(fqdn("foo.example.com.")).unwrap();
        let parsed =
            KeyRecord::from_key_file(&key.record.name, &key.to_key_file("20260101000000")).unwrap();
        assert_eq!(parsed, key.record);
    }
}
