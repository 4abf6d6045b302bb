//! DNS plumbing: message construction, record text parsing, update sessions and the
//! DNS-over-HTTPS transport.
//!
//! # Queries
//!
//! All lookups are recursive queries sent to a DOH endpoint with [`transport::DohTransport`]:
//!
//! * `KEY` at a key's owner name, to see whether the key is published.
//! * `PTR` at `_signal.<zone>`, to see whether a key enrollment request is queued.
//! * `SVCB` at `_dns.<domain>`, to discover a domain's DOH endpoint.
//!
//! # Updates
//!
//! An [`session::UpdateSession`] collects records parsed from `nsupdate` style text, e.g.
//!
//! ```text
//! foo.example.com. 300 IN A 10.0.0.1
//! ```
//!
//! into a single [RFC-2136][RFC-2136] UPDATE message, either unsigned or signed with
//! [SIG(0)][RFC-2931].
//!
//! [RFC-2136]: https://www.rfc-editor.org/rfc/rfc2136
//! [RFC-2931]: https://www.rfc-editor.org/rfc/rfc2931

pub mod message;
pub mod rr_parse;
pub mod session;
pub mod transport;

pub use rr_parse::StageKind;
pub use session::UpdateSession;
pub use transport::{DohTransport, DynTransport, HttpsTransport};

#[cfg(test)]
pub(crate) mod testing;
