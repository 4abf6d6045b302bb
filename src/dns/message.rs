//! DNS message construction and response inspection.

use crate::error::Error;
use std::str::FromStr;
use trust_dns_client::op::{Message, MessageType, OpCode, Query, ResponseCode};
use trust_dns_client::rr::{DNSClass, Name, RData, Record, RecordType};
use trust_dns_proto::error::ProtoError;
use trust_dns_proto::serialize::binary::BinEncoder;

/// Label prefixing a zone to form its enrollment queue, see [`signal_subzone`].
pub const SIGNAL_SUBZONE_PREFIX: &str = "_signal";

/// Label prefixing a domain to form its DDR service-binding name.
pub const DDR_PREFIX: &str = "_dns";

/// Normalize a user supplied domain to a fully qualified [`Name`] ending in the root label.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the domain is empty or not a valid DNS name.
pub fn fqdn(domain: &str) -> Result<Name, Error> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(Error::InvalidArgument("empty domain name".to_string()));
    }
    let domain = if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{domain}.")
    };
    Name::from_str(&domain)
        .map_err(|err| Error::InvalidArgument(format!("invalid domain \"{domain}\": {err}")))
}

/// The enrollment queue subzone of `zone`, i.e. `_signal.<zone>`.
pub fn signal_subzone(zone: &Name) -> Result<Name, Error> {
    Ok(Name::from_str(SIGNAL_SUBZONE_PREFIX)?.append_domain(zone)?)
}

/// The name a queued enrollment request for `key_fqdn` is filed under: the key's labels below
/// `zone`, followed by the [signal subzone][signal_subzone] of `zone`.
///
/// E.g. `foo.example.com.` in zone `example.com.` is queued as `foo._signal.example.com.`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `key_fqdn` is not at or below `zone`.
pub fn enrollment_marker(key_fqdn: &Name, zone: &Name) -> Result<Name, Error> {
    if !zone.zone_of(key_fqdn) {
        return Err(Error::InvalidArgument(format!(
            "key \"{key_fqdn}\" is not within zone \"{zone}\""
        )));
    }
    let key_label_count = usize::from(key_fqdn.num_labels() - zone.num_labels());
    let key_labels: Vec<&[u8]> = key_fqdn.iter().take(key_label_count).collect();
    let signal = signal_subzone(zone)?;
    if key_labels.is_empty() {
        return Ok(signal);
    }
    Ok(Name::from_labels(key_labels)?.append_domain(&signal)?)
}

/// Build a recursive query for `name`. Query IDs are left at zero, see
/// [RFC-8484 §4.1](https://www.rfc-editor.org/rfc/rfc8484#section-4.1).
pub fn query(name: Name, record_type: RecordType) -> Message {
    let mut query = Query::query(name, record_type);
    query.set_query_class(DNSClass::IN);
    let mut message = Message::new();
    message
        .set_id(0)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(query);
    message
}

pub fn key_query(fqdn: Name) -> Message {
    query(fqdn, RecordType::KEY)
}

pub fn ptr_query(name: Name) -> Message {
    query(name, RecordType::PTR)
}

pub fn svcb_query(name: Name) -> Message {
    query(name, RecordType::SVCB)
}

/// Build an UPDATE for `zone` carrying `updates` in order.
pub fn update(zone: Name, updates: &[Record]) -> Message {
    let mut zone_query = Query::query(zone, RecordType::SOA);
    zone_query.set_query_class(DNSClass::IN);
    let mut message = Message::new();
    message
        .set_id(0)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Update)
        .set_recursion_desired(false)
        .add_query(zone_query);
    for record in updates {
        message.add_name_server(record.clone());
    }
    message
}

/// Returns the answers of `response` when they may be inspected for `expected` records.
///
/// `NXDOMAIN` yields no answers rather than an error: the name not existing is a valid
/// negative answer.
///
/// # Errors
///
/// Returns [`Error::UnexpectedResponse`] for any other non-success response code, and
/// [`Error::Protocol`] if any answer isn't of the `expected` type.
pub fn typed_answers(response: &Message, expected: RecordType) -> Result<&[Record], Error> {
    match response.response_code() {
        ResponseCode::NoError => {}
        ResponseCode::NXDomain => return Ok(&[]),
        code => return Err(Error::UnexpectedResponse(code)),
    }
    let answers = response.answers();
    if let Some(stray) = answers.iter().find(|rr| rr.rr_type() != expected) {
        return Err(Error::Protocol(format!(
            "answer for {expected} query is a {} record: {}",
            stray.rr_type(),
            stray.name()
        )));
    }
    Ok(answers)
}

/// Requires `response` to report success, e.g. for an UPDATE.
pub fn expect_success(response: &Message) -> Result<(), Error> {
    match response.response_code() {
        ResponseCode::NoError => Ok(()),
        code => Err(Error::UnexpectedResponse(code)),
    }
}

/// The RDATA of `rdata` in wire format.
pub fn rdata_bytes(rdata: &RData) -> Result<Vec<u8>, ProtoError> {
    let mut bytes = Vec::new();
    let mut encoder = BinEncoder::new(&mut bytes);
    rdata.emit(&mut encoder)?;
    Ok(bytes)
}
