//! Test doubles for the DOH transport.

use crate::dns::transport::DohTransport;
use crate::error::Error;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use trust_dns_client::op::{Message, ResponseCode};
use trust_dns_client::rr::rdata::NULL;
use trust_dns_client::rr::{Name, RData, Record, RecordType};
use trust_dns_client::serialize::txt::RDataParser;

/// A transport answering from a script of canned outcomes, recording every message sent.
///
/// Responses are encoded and decoded again before they are returned, so answers reach the
/// caller as the typed RDATA a real DOH endpoint would produce.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Message, Error>>>,
    sent: Mutex<Vec<(String, Message)>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Result<Message, Error>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            sent: Mutex::default(),
        })
    }

    pub(crate) fn sent(&self) -> Vec<(String, Message)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DohTransport for ScriptedTransport {
    async fn send(&self, endpoint: &str, message: Message) -> Result<Message, Error> {
        self.sent
            .lock()
            .unwrap()
            .push((endpoint.to_string(), message));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("script exhausted".to_string())))
            .and_then(|response| over_wire(&response))
    }
}

pub(crate) fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

pub(crate) fn response(code: ResponseCode, answers: Vec<Record>) -> Message {
    let mut message = Message::new();
    message.set_response_code(code);
    for answer in answers {
        message.add_answer(answer);
    }
    message
}

/// A record of `record_type` carrying raw wire RDATA. It decodes to the typed RDATA once it
/// passes through [`ScriptedTransport`].
pub(crate) fn raw_record(owner: &str, record_type: RecordType, wire: Vec<u8>) -> Record {
    let mut record = Record::from_rdata(
        name(owner),
        300,
        RData::Unknown {
            code: u16::from(record_type),
            rdata: NULL::with(wire),
        },
    );
    record.set_rr_type(record_type);
    record
}

pub(crate) fn ptr_record(owner: &str, target: &str) -> Record {
    let rdata = RData::parse(RecordType::PTR, [target].into_iter(), None).unwrap();
    Record::from_rdata(name(owner), 300, rdata)
}

fn over_wire(message: &Message) -> Result<Message, Error> {
    let wire = message.to_vec()?;
    Message::from_vec(&wire).map_err(|err| Error::Transport(format!("undecodable response: {err}")))
}
