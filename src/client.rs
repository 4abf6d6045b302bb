//! The `Sig0Client` facade tying the keystore, the DOH transport and the protocols together.

use crate::config::Shared;
use crate::dns::message::fqdn;
use crate::dns::{DynTransport, HttpsTransport};
use crate::error::Error;
use crate::keystore::{DynKeystore, FileKeystore, KeyRecord};
use crate::status::KeyStatus;
use crate::task::{self, Pending};
use crate::update::Updater;
use crate::{endpoint, enroll, status};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Entry point for key management, key status checks, endpoint discovery and updates.
///
/// Network bound operations return a [`Pending`] handle immediately and run on their own task.
#[derive(Clone)]
pub struct Sig0Client {
    config: Shared,
    keystore: DynKeystore,
    transport: DynTransport,
}

impl Sig0Client {
    pub fn new(config: Shared, keystore: DynKeystore, transport: DynTransport) -> Self {
        Self {
            config,
            keystore,
            transport,
        }
    }

    /// Create a client keeping keys in [`Config::keystore_dir`][crate::config::Config::keystore_dir]
    /// and speaking DOH over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the HTTP client can't be initialized.
    pub fn from_config(config: Shared) -> Result<Self, Error> {
        let keystore: DynKeystore =
            Arc::new(RwLock::new(FileKeystore::new(config.keystore_dir.clone())));
        let transport: DynTransport = Arc::new(HttpsTransport::new(config.doh_timeout)?);
        Ok(Self::new(config, keystore, transport))
    }

    /// List every stored key.
    pub async fn list_keys(&self) -> Result<Vec<KeyRecord>, Error> {
        self.keystore.read().await.list_keys().await
    }

    /// List the stored keys that may update `domain`.
    pub async fn list_keys_filtered(&self, domain: &str) -> Result<Vec<KeyRecord>, Error> {
        let domain = fqdn(domain)?;
        let keystore = self.keystore.read().await;
        keystore.list_keys_filtered(&domain).await
    }

    /// Request enrollment of a key for `domain` with its parent zone.
    pub fn new_key_request(&self, domain: &str) -> Pending<()> {
        task::spawn(
            "key request",
            enroll::request_key(
                self.keystore.clone(),
                self.transport.clone(),
                self.config.bootstrap_doh_url.clone(),
                domain.to_string(),
            ),
        )
    }

    /// Start an update of `zone`, signed with the stored key `key_name` and submitted to
    /// `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the key isn't stored, plus the errors of [`Updater::new`].
    pub async fn new_updater(
        &self,
        key_name: &str,
        zone: &str,
        endpoint: &str,
    ) -> Result<Updater, Error> {
        let key = self.keystore.read().await.load_key(key_name).await?;
        Updater::new(key, zone, endpoint, self.transport.clone())
    }

    /// Check whether the stored key `key_name` is published in, or queued for enrollment into,
    /// `zone` as seen through `endpoint`.
    pub fn check_key_status(&self, key_name: &str, zone: &str, endpoint: &str) -> Pending<KeyStatus> {
        if endpoint.trim().is_empty() {
            return Pending::rejected(Error::InvalidArgument("empty DOH endpoint".to_string()));
        }
        let zone = match fqdn(zone) {
            Ok(zone) => zone,
            Err(err) => return Pending::rejected(err),
        };
        task::spawn(
            "key status",
            key_status(
                self.keystore.clone(),
                self.transport.clone(),
                key_name.to_string(),
                zone,
                endpoint.trim().to_string(),
            ),
        )
    }

    /// Discover the DOH endpoint advertised by `domain`.
    pub fn find_doh_endpoint(&self, domain: &str) -> Pending<String> {
        let transport = self.transport.clone();
        let bootstrap = self.config.bootstrap_doh_url.clone();
        let domain = domain.to_string();
        task::spawn("endpoint discovery", async move {
            endpoint::find_doh_endpoint(transport.as_ref(), &bootstrap, &domain).await
        })
    }
}

async fn key_status(
    keystore: DynKeystore,
    transport: DynTransport,
    key_name: String,
    zone: trust_dns_client::rr::Name,
    endpoint: String,
) -> Result<KeyStatus, Error> {
    let key = keystore.read().await.load_key(&key_name).await?;
    status::check_key_status(transport.as_ref(), &key.record, &zone, &endpoint).await
}
