//! SIG(0) key pair storage.
//!
//! Supports a generic interface for listing, loading and creating the key pairs used to
//! sign dynamic updates.
//!
//! Two implementations are provided, [`memory::InMemoryKeystore`] and [`file::FileKeystore`].
//! The former is not durable across restarts. The latter keeps BIND style
//! `K<fqdn>+<alg>+<tag>.key` and `.private` files in the configured
//! [`Config::keystore_dir`][`crate::config::Config::keystore_dir`].

use crate::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;
use trust_dns_client::rr::Name;

pub mod file;
pub mod key;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileKeystore;
pub use key::{KeyRecord, KeySummary, SecretKey, StoredKey};
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryKeystore;

/// `DynKeystore` is a type alias for a [`Keystore`] that can be used by multiple read/write
/// consumers that coordinate through an [`Arc`] and a [`RwLock`] wrapping the [`Keystore`].
#[allow(clippy::module_name_repetitions)]
pub type DynKeystore = Arc<RwLock<dyn Keystore + Send + Sync>>;

/// An async trait describing storage of SIG(0) key pairs, addressed by their keystore name.
#[async_trait::async_trait]
pub trait Keystore {
    /// List the public half of every stored key, ordered by name.
    async fn list_keys(&self) -> Result<Vec<KeyRecord>, Error>;

    /// Load the key pair stored under `name`.
    async fn load_key(&self, name: &str) -> Result<StoredKey, Error>;

    /// Generate and store a new key pair owned by `fqdn`.
    async fn create_key(&mut self, fqdn: &Name) -> Result<StoredKey, Error>;

    /// List the keys that may update `domain`: those owned by `domain` itself or by one of
    /// its parent names.
    async fn list_keys_filtered(&self, domain: &Name) -> Result<Vec<KeyRecord>, Error> {
        let keys = self.list_keys().await?;
        Ok(keys
            .into_iter()
            .filter(|key| key.fqdn.zone_of(domain))
            .collect())
    }

    /// Load the first stored key pair owned by `fqdn` that includes its private half.
    async fn find_signing_key(&self, fqdn: &Name) -> Result<Option<StoredKey>, Error> {
        for key in self.list_keys().await? {
            if key.fqdn != *fqdn {
                continue;
            }
            let stored = self.load_key(&key.name).await?;
            if stored.secret.is_some() {
                return Ok(Some(stored));
            }
        }
        Ok(None)
    }
}
