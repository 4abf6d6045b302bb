//! DNS-over-HTTPS transport.
//!
//! Messages are exchanged with [RFC-8484][RFC-8484] `POST` requests carrying the
//! `application/dns-message` wire format.
//!
//! [RFC-8484]: https://www.rfc-editor.org/rfc/rfc8484

use crate::error::Error;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_client::op::Message;

const DNS_MESSAGE_MIME: &str = "application/dns-message";
const DEFAULT_DOH_PATH: &str = "/dns-query";

/// `DynTransport` is a type alias for a [`DohTransport`] shared between concurrent tasks.
pub type DynTransport = Arc<dyn DohTransport + Send + Sync>;

/// An async trait describing the delivery of a DNS message to a DOH endpoint.
#[async_trait::async_trait]
pub trait DohTransport {
    /// Send `message` to `endpoint` and return the decoded response.
    ///
    /// `endpoint` is either a full URL or a bare host name served at `/dns-query`.
    async fn send(&self, endpoint: &str, message: Message) -> Result<Message, Error>;
}

/// A [`DohTransport`] speaking HTTPS through a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    http: reqwest::Client,
}

impl HttpsTransport {
    /// Create a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the HTTP client can't be initialized.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Transport(err.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl DohTransport for HttpsTransport {
    async fn send(&self, endpoint: &str, message: Message) -> Result<Message, Error> {
        let url = endpoint_url(endpoint)?;
        let body = message.to_vec()?;
        tracing::debug!("sending {} byte DNS message to {url}", body.len());

        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, DNS_MESSAGE_MIME)
            .header(ACCEPT, DNS_MESSAGE_MIME)
            .body(body)
            .send()
            .await
            .map_err(|err| Error::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("{url} answered HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| Error::Transport(err.to_string()))?;
        Message::from_vec(&bytes)
            .map_err(|err| Error::Transport(format!("undecodable response from {url}: {err}")))
    }
}

fn endpoint_url(endpoint: &str) -> Result<Url, Error> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(Error::InvalidArgument("empty DOH endpoint".to_string()));
    }
    let raw = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}{DEFAULT_DOH_PATH}", endpoint.trim_end_matches('.'))
    };
    Url::parse(&raw).map_err(|err| Error::InvalidArgument(format!("bad DOH endpoint {raw}: {err}")))
}
