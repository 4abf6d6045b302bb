//! A directory-backed implementation of the [`Keystore`][super::Keystore] trait.
//!
//! Key pairs are kept in the two file format written by `dnssec-keygen -T KEY`: a
//! `<name>.key` file holding the public `KEY` record and a `<name>.private` file holding the
//! private key. Keys with only a `.key` file can be listed and checked but not used to sign.
use crate::error::Error;
use crate::keystore::key::{KeyRecord, SecretKey, StoredKey};
use crate::keystore::Keystore;
use lazy_static::lazy_static;
use std::io::ErrorKind;
use std::path::PathBuf;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::fs;
use trust_dns_client::rr::Name;

const PUBLIC_SUFFIX: &str = ".key";
const PRIVATE_SUFFIX: &str = ".private";

lazy_static! {
    static ref CREATED_FORMATTER: &'static [time::format_description::FormatItem<'static>] =
        format_description!(version = 2, "[year][month][day][hour][minute][second]");
}

/// A keystore rooted at a directory. The directory is never implied from the working
/// directory; it is always passed in explicitly.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileKeystore {
    dir: PathBuf,
}

impl FileKeystore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str, suffix: &str) -> PathBuf {
        self.dir.join(format!("{name}{suffix}"))
    }

    async fn read_public(&self, name: &str) -> Result<KeyRecord, Error> {
        let contents = match fs::read_to_string(self.path(name, PUBLIC_SUFFIX)).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(name.to_string()))
            }
            Err(err) => return Err(Error::IO(err)),
        };
        KeyRecord::from_key_file(name, &contents)
    }

    async fn read_private(&self, name: &str) -> Result<Option<SecretKey>, Error> {
        match fs::read_to_string(self.path(name, PRIVATE_SUFFIX)).await {
            Ok(contents) => Ok(Some(SecretKey::from_private_file(name, &contents)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::IO(err)),
        }
    }
}

/// Accept key names with or without a file suffix, e.g. as copied from a directory listing.
fn base_name(name: &str) -> &str {
    name.strip_suffix(PUBLIC_SUFFIX)
        .or_else(|| name.strip_suffix(PRIVATE_SUFFIX))
        .unwrap_or(name)
}

#[async_trait::async_trait]
impl Keystore for FileKeystore {
    async fn list_keys(&self) -> Result<Vec<KeyRecord>, Error> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name
                .to_str()
                .and_then(|file_name| file_name.strip_suffix(PUBLIC_SUFFIX))
            else {
                continue;
            };
            match self.read_public(name).await {
                Ok(key) => keys.push(key),
                Err(err) => tracing::warn!("skipping unreadable key {name}: {err}"),
            }
        }
        keys.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(keys)
    }

    async fn load_key(&self, name: &str) -> Result<StoredKey, Error> {
        let name = base_name(name.trim());
        if name.is_empty() || name.contains(std::path::is_separator) {
            return Err(Error::InvalidArgument(format!("bad key name \"{name}\"")));
        }
        let record = self.read_public(name).await?;
        let secret = self.read_private(name).await?;
        Ok(StoredKey { record, secret })
    }

    async fn create_key(&mut self, fqdn: &Name) -> Result<StoredKey, Error> {
        let key = StoredKey::generate(fqdn.clone())?;
        let created = OffsetDateTime::now_utc()
            .format(&CREATED_FORMATTER)
            .map_err(|err| Error::IO(std::io::Error::new(ErrorKind::Other, err)))?;

        fs::create_dir_all(&self.dir).await?;
        if let Some(secret) = &key.secret {
            fs::write(
                self.path(&key.record.name, PRIVATE_SUFFIX),
                secret.to_private_file(),
            )
            .await?;
        }
        fs::write(
            self.path(&key.record.name, PUBLIC_SUFFIX),
            key.to_key_file(&created),
        )
        .await?;
        tracing::info!("created key {} for \"{fqdn}\"", key.record.name);
        Ok(key)
    }
}
