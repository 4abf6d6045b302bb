//! Error types.

use axum::extract::rejection::JsonRejection;
use std::net::IpAddr;
use trust_dns_client::op::ResponseCode;
use trust_dns_proto::error::ProtoError;
use trust_dns_client::rr::Name;

/// Error enumerates the possible SIG0 Crab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a key can't be found in the [keystore][crate::keystore], either because
    /// no key files exist for the requested name or because they were removed concurrently.
    #[error("key \"{0}\" not found")]
    NotFound(String),

    /// Returned when an update session is started for a zone the key may not update. A key
    /// is only authorized for its own FQDN's zone and the zones above it.
    #[error("key \"{key}\" is not authorized to update zone \"{zone}\"")]
    Unauthorized { key: Name, zone: Name },

    /// Returned synchronously by the [update builder][crate::update::Updater] when the record
    /// text for an add or delete operation can't be parsed.
    #[error("invalid record \"{text}\": {reason}")]
    Parse { text: String, reason: String },

    /// Returned when an update message can't be assembled from the staged operations.
    #[error("invalid update: {0}")]
    Validation(String),

    /// Returned when SIG(0) signing of an update fails.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Returned when a DNS message can't be delivered to, or read back from, a DOH endpoint.
    #[error("DOH transport failed: {0}")]
    Transport(String),

    /// Returned when no usable DOH endpoint can be discovered for a domain.
    #[error("no usable DOH endpoint for \"{domain}\": {reason}")]
    Resolution { domain: String, reason: String },

    /// Returned when a DNS response carries a record that doesn't belong to the question.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Returned when a DNS response carries an unexpected response code, e.g. `REFUSED` for an
    /// update the server didn't accept.
    #[error("unexpected DNS response code: {0}")]
    UnexpectedResponse(ResponseCode),

    /// Returned when an [enrollment request][crate::enroll] fails. Wraps the underlying error.
    #[error("enrollment request failed: {0}")]
    Enrollment(#[source] Box<Error>),

    /// Returned when a caller supplied argument is empty or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Returned when an [`Updater`][crate::update::Updater] is used after it was committed.
    #[error("update transaction was already committed")]
    UpdateConsumed,

    /// Returned when a background task stopped without reporting an outcome.
    #[error("task ended without reporting a result")]
    TaskAborted,

    /// Returned when clients `POST` invalid JSON.
    #[error(transparent)]
    JsonExtractorRejection(#[from] JsonRejection),

    /// Returned when the [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`] is
    /// not a loopback address, or an address within a private network space. The
    /// [SIG0 Crab HTTP API][crate::api] can create keys and sign updates, and is never
    /// intended to be reachable from public networks.
    #[error("API bind address ({0}) must be a loopback or private IP")]
    InsecureAPIBind(IpAddr),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g. when
    /// [trying to load a `Config`][crate::config::Config::try_from_file]) fails due to invalid
    /// JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when a generic DNS protocol error occurs, e.g. encoding a message.
    #[error("DNS error: {0}")]
    DNSError(#[from] ProtoError),
}

impl Error {
    pub(crate) fn parse(text: &str, reason: impl ToString) -> Self {
        Error::Parse {
            text: text.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn resolution(domain: impl ToString, reason: impl ToString) -> Self {
        Error::Resolution {
            domain: domain.to_string(),
            reason: reason.to_string(),
        }
    }
}
