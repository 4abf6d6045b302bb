//! Presentation format parsing for single resource records.
//!
//! Accepts the one-line `name [ttl] [class] type rdata...` form used by `nsupdate`, where the
//! TTL and class may appear in either order. Relative owner names are completed with the zone
//! origin. Double quoted tokens may contain spaces and a `;` outside of quotes starts a comment.

use crate::error::Error;
use crate::keystore::KeyRecord;
use std::str::FromStr;
use trust_dns_client::rr::{DNSClass, Name, RData, Record, RecordType};
use trust_dns_client::serialize::txt::RDataParser;

/// TTL used for added records that don't carry one.
pub const DEFAULT_TTL: u32 = 3600;

/// How a parsed record is staged in an update, see
/// [RFC-2136 §2.5](https://www.rfc-editor.org/rfc/rfc2136#section-2.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Add a record to an RRset (§2.5.1). Requires full record data.
    AddRecord,
    /// Delete one record from an RRset (§2.5.4). Requires full record data.
    DeleteRecord,
    /// Delete an RRset (§2.5.2). Requires a name and type.
    DeleteRRset,
    /// Delete all RRsets at a name (§2.5.3). Requires a name.
    DeleteName,
}

#[derive(Debug)]
struct RecordText {
    name: Name,
    ttl: Option<u32>,
    class: Option<DNSClass>,
    record_type: Option<RecordType>,
    rdata: Vec<String>,
}

/// Parse `text` into the update record staged for `kind` in the zone `origin`.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the text is malformed, lacks the parts `kind` requires, or names
/// a record outside of `origin`.
pub fn parse_record(text: &str, origin: &Name, kind: StageKind) -> Result<Record, Error> {
    let tokens = tokenize(text).map_err(|reason| Error::parse(text, reason))?;
    let parsed = split_header(&tokens, origin).map_err(|reason| Error::parse(text, reason))?;
    if !origin.zone_of(&parsed.name) {
        return Err(Error::parse(
            text,
            format!("{} is outside of zone {origin}", parsed.name),
        ));
    }
    to_record(parsed, origin, kind).map_err(|reason| Error::parse(text, reason))
}

fn to_record(parsed: RecordText, origin: &Name, kind: StageKind) -> Result<Record, String> {
    let record = match kind {
        StageKind::AddRecord => {
            let class = parsed.class.unwrap_or(DNSClass::IN);
            if matches!(class, DNSClass::ANY | DNSClass::NONE) {
                return Err(format!("can't add a record of class {class}"));
            }
            let record_type = parsed.required_type()?;
            let rdata = parse_rdata(&parsed.name, record_type, &parsed.rdata, origin)?;
            let ttl = parsed.ttl.unwrap_or(DEFAULT_TTL);
            let mut record = Record::from_rdata(parsed.name, ttl, rdata);
            record.set_rr_type(record_type).set_dns_class(class);
            record
        }
        StageKind::DeleteRecord => {
            let record_type = parsed.required_type()?;
            let rdata = parse_rdata(&parsed.name, record_type, &parsed.rdata, origin)?;
            let mut record = Record::from_rdata(parsed.name, 0, rdata);
            record.set_rr_type(record_type).set_dns_class(DNSClass::NONE);
            record
        }
        StageKind::DeleteRRset => {
            let record_type = parsed.required_type()?;
            let mut record = Record::with(parsed.name, record_type, 0);
            record.set_dns_class(DNSClass::ANY);
            record
        }
        StageKind::DeleteName => {
            let mut record = Record::with(parsed.name, RecordType::ANY, 0);
            record.set_dns_class(DNSClass::ANY);
            record
        }
    };
    Ok(record)
}

impl RecordText {
    fn required_type(&self) -> Result<RecordType, String> {
        self.record_type
            .ok_or_else(|| "missing record type".to_string())
    }
}

fn parse_rdata(
    owner: &Name,
    record_type: RecordType,
    tokens: &[String],
    origin: &Name,
) -> Result<RData, String> {
    if tokens.is_empty() {
        return Err(format!("missing {record_type} record data"));
    }
    // trust-dns has no presentation parser for KEY.
    if record_type == RecordType::KEY {
        let key = KeyRecord::from_rdata_tokens(String::new(), owner.clone(), tokens)?;
        return Ok(key.to_rdata());
    }
    RData::parse(record_type, tokens.iter().map(String::as_str), Some(origin))
        .map_err(|err| err.to_string())
}

fn split_header(tokens: &[String], origin: &Name) -> Result<RecordText, String> {
    let (owner, rest) = tokens
        .split_first()
        .ok_or_else(|| "missing owner name".to_string())?;
    let name = Name::parse(owner, Some(origin)).map_err(|err| format!("bad name {owner}: {err}"))?;

    let mut ttl = None;
    let mut class = None;
    let mut idx = 0;
    while let Some(token) = rest.get(idx) {
        if ttl.is_none() && token.bytes().all(|b| b.is_ascii_digit()) {
            ttl = Some(
                token
                    .parse::<u32>()
                    .map_err(|err| format!("bad TTL {token}: {err}"))?,
            );
        } else if let (None, Ok(parsed), Some(_)) = (
            class,
            DNSClass::from_str(&token.to_ascii_uppercase()),
            rest.get(idx + 1),
        ) {
            // A class name followed by nothing is the type, e.g. `foo.example.com. ANY`.
            class = Some(parsed);
        } else {
            break;
        }
        idx += 1;
    }

    let record_type = rest
        .get(idx)
        .map(|token| {
            RecordType::from_str(&token.to_ascii_uppercase())
                .map_err(|_| format!("unknown record type {token}"))
        })
        .transpose()?;
    let rdata = rest.iter().skip(idx + 1).cloned().collect();

    Ok(RecordText {
        name,
        ttl,
        class,
        record_type,
        rdata,
    })
}

/// Split `text` on whitespace, keeping double quoted strings (without their quotes) together.
pub(crate) fn tokenize(text: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' => {
                    tokens.push(std::mem::take(&mut current));
                    quoted = false;
                }
                '\\' => current.extend(chars.next()),
                c => current.push(c),
            }
            continue;
        }
        match c {
            ';' => break,
            '"' => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
                quoted = true;
            }
            // Multi-line grouping parens carry no meaning on a single line.
            '(' | ')' => {}
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err("unterminated quoted string".to_string());
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
