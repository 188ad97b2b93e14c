use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::parse::{is_request, parse_request, parse_response};
use crate::request::Request;
use crate::response::Response;
use crate::token::Token;

/// Per-request sequence number correlating a response to its request.
/// Positive; zero never appears on the wire.
pub type CSeq = u32;

/// Server-assigned identifier binding requests to one media exchange.
pub type SessionId = String;

pub type StatusCode = u16;

/// Index of the media description line an ICE candidate applies to.
pub type MLineIndex = u32;

/// Header fields with lowercase names. `cseq` and `session` are extracted
/// into structured fields and never appear here.
pub type Headers = BTreeMap<String, String>;

/// Name/value pairs from a `text/parameters` body.
pub type Parameters = BTreeMap<String, String>;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Method {
    Options,
    List,
    Describe,
    Setup,
    Play,
    Record,
    Teardown,
    GetParameter,
    SetParameter,
}

impl Method {
    pub(crate) const ALL: [Method; 9] = [
        Method::Options,
        Method::List,
        Method::Describe,
        Method::Setup,
        Method::Play,
        Method::Record,
        Method::Teardown,
        Method::GetParameter,
        Method::SetParameter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::List => "LIST",
            Method::Describe => "DESCRIBE",
            Method::Setup => "SETUP",
            Method::Play => "PLAY",
            Method::Record => "RECORD",
            Method::Teardown => "TEARDOWN",
            Method::GetParameter => "GET_PARAMETER",
            Method::SetParameter => "SET_PARAMETER",
        }
    }

    pub(crate) fn from_token(token: &Token) -> Option<Method> {
        if token.is_empty() {
            return None;
        }

        Method::ALL
            .into_iter()
            .find(|method| token.matches(method.as_str()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol version token. `WEBRTSP/0.2` is the only version in the wild
/// and also the current one.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Protocol {
    #[default]
    V0_2,
}

impl Protocol {
    pub const CURRENT: Protocol = Protocol::V0_2;

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::V0_2 => "WEBRTSP/0.2",
        }
    }

    pub(crate) fn from_token(token: &Token) -> Option<Protocol> {
        if token.is_empty() {
            return None;
        }

        [Protocol::V0_2]
            .into_iter()
            .find(|protocol| token.matches(protocol.as_str()))
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status codes the client role produces itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    Ok,
}

impl Status {
    pub fn code(&self) -> StatusCode {
        match self {
            Status::Ok => 200,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
        }
    }
}

/// One line of an `application/x-ice-candidate` body.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IceCandidate {
    pub m_line_index: MLineIndex,
    pub candidate: String,
}

/// Inbound wire text classified by its first token: a known method name
/// makes it a request, anything else is parsed as a response.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn parse(text: &str) -> Result<Message> {
        if is_request(text) {
            Ok(Message::Request(parse_request(text)?))
        } else {
            Ok(Message::Response(parse_response(text)?))
        }
    }
}
