use std::fmt;

use crate::message::{CSeq, Headers, Protocol, SessionId, Status, StatusCode};

/// A single WebRTSP response.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Response {
    pub protocol: Protocol,
    pub status: StatusCode,
    pub reason: String,
    pub cseq: CSeq,
    pub session_id: Option<SessionId>,
    pub headers: Headers,
    pub body: String,
}

impl Response {
    pub fn new(status: Status, cseq: CSeq) -> Self {
        Self {
            protocol: Protocol::CURRENT,
            status: status.code(),
            reason: status.reason().to_string(),
            cseq,
            session_id: None,
            headers: Headers::new(),
            body: String::new(),
        }
    }

    /// 200 OK echoing the request's CSeq and session id, the only reply the
    /// client role sends itself.
    pub fn ok(cseq: CSeq, session_id: &str) -> Self {
        Self::new(Status::Ok, cseq).with_session_id(session_id)
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
        let mut response = self.with_header("content-type", content_type);
        response.body = body.to_string();
        response
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} (CSeq: {})", self.status, self.reason, self.cseq)
    }
}
