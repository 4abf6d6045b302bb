//! SIG0 Crab
//!
//! Manages [SIG(0)][RFC-2931] key pairs and uses them to sign [RFC-2136][RFC-2136] dynamic
//! updates delivered over [DNS-over-HTTPS][RFC-8484].
//!
//! A key is enrolled with its parent zone by filing a request into the zone's `_signal`
//! subzone; once the zone publishes the key, updates signed with it are accepted. DOH
//! endpoints are discovered with [DDR][RFC-9462] `SVCB` records.
//!
//! [RFC-2931]: https://www.rfc-editor.org/rfc/rfc2931
//! [RFC-2136]: https://www.rfc-editor.org/rfc/rfc2136
//! [RFC-8484]: https://www.rfc-editor.org/rfc/rfc8484
//! [RFC-9462]: https://www.rfc-editor.org/rfc/rfc9462
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod client;
pub mod config;
pub mod dns;
pub mod endpoint;
pub mod enroll;
pub mod error;
pub mod keystore;
pub mod status;
pub mod task;
pub mod update;

pub use api::new as new_http;
pub use client::Sig0Client;
pub use config::{Config, Shared};
pub use keystore::{FileKeystore, InMemoryKeystore};
pub use status::KeyStatus;
pub use task::Pending;
pub use update::Updater;
