//! HTTP API for key management, key status checks and signed updates.
//!
//! Errors are returned as a JSON body of the form `{"error": "..."}` with a status code for
//! the kind of failure: 404 for unknown keys, 400 for malformed arguments or record text, 403
//! for keys not authorized for a zone, and 502 when a DOH endpoint fails or answers with an
//! error.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/keys` (GET)
//!
//!   Lists the stored keys as `[{"Name": "Kfoo.example.com.+015+12345", "Key": "foo.example.com. IN KEY 513 3 15 ..."}]`.
//!   With a `?domain=foo.example.com` query only keys that may update that domain are listed.
//!
//! ## `/keys/request` (POST)
//!
//!   Expects `{"domain": "foo.example.com"}`. Creates a key for the domain if none is stored
//!   and files an enrollment request with the parent zone.
//!
//! ## `/status` (POST)
//!
//!   Expects `{"key": "<key name>", "zone": "example.com", "endpoint": "doh.example.com"}` and
//!   returns `{"KeyRRExists": false, "QueuePTRExists": true}`.
//!
//! ## `/endpoint/{domain}` (GET)
//!
//!   Returns `{"endpoint": "https://doh.example.com/dns-query"}`, the DOH endpoint the domain
//!   advertises with `_dns` SVCB records.
//!
//! ## `/update` (POST)
//!
//!   Expects a JSON request body of the form:
//!
//!   ```json
//!   {
//!     "key": "Kfoo.example.com.+015+12345",
//!     "zone": "example.com",
//!     "endpoint": "doh.example.com",
//!     "signed": true,
//!     "operations": [
//!       { "op": "delete_rrset", "rr": "foo.example.com. IN A" },
//!       { "op": "add", "rr": "foo.example.com. 300 IN A 10.0.0.1" }
//!     ]
//!   }
//!   ```
//!
//!  `op` is one of `add`, `delete`, `delete_rrset` or `delete_name`. Operations are applied in
//!  order as one DNS UPDATE. `signed` defaults to `true`.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
