use std::fmt;

use crate::message::{CSeq, Headers, Method, Protocol, SessionId};

/// A single WebRTSP request.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub protocol: Protocol,
    pub cseq: CSeq,
    pub session_id: Option<SessionId>,
    pub headers: Headers,
    pub body: String,
}

impl Request {
    pub fn new(method: Method, uri: &str, cseq: CSeq) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            protocol: Protocol::CURRENT,
            cseq,
            session_id: None,
            headers: Headers::new(),
            body: String::new(),
        }
    }

    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(self, content_type: &str, body: &str) -> Self {
        let mut request = self.with_header("content-type", content_type);
        request.body = body.to_string();
        request
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} (CSeq: {})", self.method, self.uri, self.cseq)
    }
}
