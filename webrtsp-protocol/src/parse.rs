use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::message::{
    CSeq, Headers, IceCandidate, Method, Parameters, Protocol, SessionId, StatusCode,
};
use crate::request::Request;
use crate::response::Response;
use crate::token::{is_ctl, is_tspecial, is_wsp, Token};

/// True iff the first token of the first line is a known method name. Used
/// to decide which of the two parse routines applies to inbound text.
pub fn is_request(text: &str) -> bool {
    let mut cursor = Cursor::new(text);
    match cursor.token() {
        Some(token) => Method::from_token(&token).is_some(),
        None => false,
    }
}

pub fn parse_request(text: &str) -> Result<Request> {
    let mut cursor = Cursor::new(text);

    let (method, uri, protocol) = cursor.method_line()?;
    let (headers, body) = cursor.header_fields_and_body()?;
    let (cseq, session_id, headers) = extract_structured_fields(headers)?;

    Ok(Request {
        method,
        uri: uri.to_string(),
        protocol,
        cseq,
        session_id,
        headers,
        body,
    })
}

pub fn parse_response(text: &str) -> Result<Response> {
    let mut cursor = Cursor::new(text);

    let (protocol, status, reason) = cursor.status_line()?;
    let (headers, body) = cursor.header_fields_and_body()?;
    let (cseq, session_id, headers) = extract_structured_fields(headers)?;

    Ok(Response {
        protocol,
        status,
        reason: reason.to_string(),
        cseq,
        session_id,
        headers,
        body,
    })
}

/// Parse a `Public`-style options list: method names separated by
/// whitespace and commas. Any token that is not a known method fails the
/// whole parse.
pub fn parse_options(text: &str) -> Result<HashSet<Method>> {
    let mut methods = HashSet::new();

    let mut cursor = Cursor::new(text);
    while !cursor.eos() {
        cursor.skip_wsp();

        let token = cursor.token().ok_or_else(|| Error::OptionMalformed {
            token: cursor.line().to_string(),
        })?;
        let method = Method::from_token(&token).ok_or_else(|| Error::OptionMalformed {
            token: token.as_str().to_string(),
        })?;
        cursor.skip_wsp();

        if !cursor.eos() && !cursor.skip(b',') {
            return Err(Error::OptionMalformed {
                token: cursor.line().to_string(),
            });
        }

        methods.insert(method);
    }

    Ok(methods)
}

/// Parse a `text/parameters` body: `name ":" WSP* value EOL` lines. A
/// malformed line fails the whole parse.
pub fn parse_parameters(text: &str) -> Result<Parameters> {
    let mut parameters = Parameters::new();

    let mut cursor = Cursor::new(text);
    while !cursor.eos() {
        let line = cursor.line().to_string();
        let (name, value) = cursor
            .parameter()
            .ok_or(Error::ParameterMalformed { line })?;
        parameters.insert(name.to_string(), value.to_string());
    }

    Ok(parameters)
}

/// Parse an `application/x-ice-candidate` body: one `mlineIndex "/"
/// candidate` entry per non-empty line. Any bad line fails the whole parse.
pub fn parse_ice_candidates(text: &str) -> Result<Vec<IceCandidate>> {
    let mut candidates = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }

        let (index, candidate) =
            line.split_once('/')
                .ok_or_else(|| Error::IceCandidateMalformed {
                    line: line.to_string(),
                })?;
        let m_line_index = index
            .parse()
            .map_err(|_| Error::IceCandidateMalformed {
                line: line.to_string(),
            })?;

        candidates.push(IceCandidate {
            m_line_index,
            candidate: candidate.to_string(),
        });
    }

    Ok(candidates)
}

/// Pull `cseq` and `session` out of the generic header map; they are
/// carried as structured fields and never surface to callers as headers.
fn extract_structured_fields(
    mut headers: Headers,
) -> Result<(CSeq, Option<SessionId>, Headers)> {
    let value = headers.remove("cseq").ok_or(Error::CSeqMissing)?;
    let cseq = match parse_cseq(&value) {
        Some(cseq) => cseq,
        None => return Err(Error::CSeqInvalid { value }),
    };

    let session_id = headers.remove("session");

    Ok((cseq, session_id, headers))
}

/// Unsigned decimal with zero and overflow rejected.
fn parse_cseq(value: &str) -> Option<CSeq> {
    let mut cseq: CSeq = 0;

    for c in value.bytes() {
        if !c.is_ascii_digit() {
            return None;
        }

        cseq = cseq.checked_mul(10)?.checked_add(CSeq::from(c - b'0'))?;
    }

    if cseq == 0 {
        return None;
    }

    Some(cseq)
}

#[derive(Clone, Copy)]
struct Cursor<'a> {
    buffer: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buffer: &'a str) -> Self {
        Self { buffer, pos: 0 }
    }

    fn eos(&self) -> bool {
        self.pos >= self.buffer.len()
    }

    fn tail(&self) -> &'a str {
        &self.buffer[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.buffer.as_bytes().get(self.pos).copied()
    }

    /// Rest of the current line, for error reporting.
    fn line(&self) -> &'a str {
        let tail = self.tail();
        let end = tail
            .bytes()
            .position(|c| c == b'\r' || c == b'\n')
            .unwrap_or(tail.len());
        &tail[..end]
    }

    fn advance(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.buffer.len());
    }

    fn skip(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.advance(1);
            true
        } else {
            false
        }
    }

    fn skip_digit(&mut self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => {
                self.advance(1);
                true
            }
            _ => false,
        }
    }

    /// Advance to the next occurrence of `c`; false if the buffer ends
    /// before one is found.
    fn skip_until(&mut self, c: u8) -> bool {
        while let Some(current) = self.peek() {
            if current == c {
                return true;
            }
            self.advance(1);
        }

        false
    }

    fn skip_wsp(&mut self) -> bool {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if !is_wsp(c) {
                break;
            }
            self.advance(1);
        }

        start != self.pos
    }

    /// `\n`, or `\r` optionally followed by `\n`.
    fn skip_eol(&mut self) -> bool {
        match self.peek() {
            Some(b'\n') => {
                self.advance(1);
                true
            }
            Some(b'\r') => {
                self.advance(1);
                if self.peek() == Some(b'\n') {
                    self.advance(1);
                }
                true
            }
            _ => false,
        }
    }

    /// Folding: an end-of-line immediately followed by whitespace continues
    /// the current header value. Consumes nothing unless both are present.
    fn skip_folding(&mut self) -> bool {
        let mut probe = *self;

        if !probe.skip_eol() {
            return false;
        }
        if !probe.skip_wsp() {
            return false;
        }

        self.pos = probe.pos;
        true
    }

    /// Linear whitespace after a header colon: optional end-of-line, then a
    /// mandatory whitespace run.
    fn skip_lws(&mut self) -> bool {
        let mut probe = *self;

        probe.skip_eol();
        if !probe.skip_wsp() {
            return false;
        }

        self.pos = probe.pos;
        true
    }

    /// Run of characters that are neither controls nor tspecials.
    fn token(&mut self) -> Option<Token<'a>> {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if is_ctl(c) || is_tspecial(c) {
                break;
            }
            self.advance(1);
        }

        let token = Token::new(self.buffer, start, self.pos - start);
        (!token.is_empty()).then_some(token)
    }

    /// Literal protocol family name, "/", digit, ".", digit.
    fn protocol_token(&mut self) -> Option<Token<'a>> {
        const PROTOCOL_NAME: &str = "WEBRTSP";

        if self.tail().len() < Protocol::CURRENT.as_str().len() {
            return None;
        }

        let start = self.pos;

        if !self.tail().starts_with(PROTOCOL_NAME) {
            return None;
        }
        self.advance(PROTOCOL_NAME.len());

        if !self.skip(b'/') {
            return None;
        }
        if !self.skip_digit() {
            return None;
        }
        if !self.skip(b'.') {
            return None;
        }
        if !self.skip_digit() {
            return None;
        }

        Some(Token::new(self.buffer, start, self.pos - start))
    }

    fn protocol(&mut self) -> Option<Protocol> {
        let token = self.protocol_token()?;
        Protocol::from_token(&token)
    }

    /// Run until control or space.
    // TODO tighten to the URI grammar of the RFC.
    fn uri_token(&mut self) -> Option<Token<'a>> {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if is_ctl(c) || c == b' ' {
                break;
            }
            self.advance(1);
        }

        let token = Token::new(self.buffer, start, self.pos - start);
        (!token.is_empty()).then_some(token)
    }

    fn status_code_token(&mut self) -> Option<Token<'a>> {
        if self.tail().len() < 3 {
            return None;
        }

        let start = self.pos;
        for _ in 0..3 {
            if !self.skip_digit() {
                return None;
            }
        }

        Some(Token::new(self.buffer, start, 3))
    }

    fn status_code(&mut self) -> Option<StatusCode> {
        let token = self.status_code_token()?;
        token.as_str().parse().ok()
    }

    /// Run until control; may be empty.
    fn reason_phrase_token(&mut self) -> Token<'a> {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if is_ctl(c) {
                break;
            }
            self.advance(1);
        }

        Token::new(self.buffer, start, self.pos - start)
    }

    fn method_line(&mut self) -> Result<(Method, &'a str, Protocol)> {
        let line = self.line().to_string();

        let token = self.token().ok_or_else(|| Error::MethodLineMalformed {
            line: line.clone(),
        })?;
        let method = Method::from_token(&token).ok_or_else(|| Error::MethodUnknown {
            method: token.as_str().to_string(),
        })?;
        if !self.skip_wsp() {
            return Err(Error::MethodLineMalformed { line });
        }
        let uri = self.uri_token().ok_or_else(|| Error::MethodLineMalformed {
            line: line.clone(),
        })?;
        if !self.skip_wsp() {
            return Err(Error::MethodLineMalformed { line });
        }
        let protocol = self
            .protocol()
            .ok_or_else(|| Error::VersionMalformed { line: line.clone() })?;
        if !self.skip_eol() {
            return Err(Error::MethodLineMalformed { line });
        }

        Ok((method, uri.as_str(), protocol))
    }

    fn status_line(&mut self) -> Result<(Protocol, StatusCode, &'a str)> {
        let line = self.line().to_string();

        let protocol = self
            .protocol()
            .ok_or_else(|| Error::VersionMalformed { line: line.clone() })?;
        if !self.skip_wsp() {
            return Err(Error::StatusLineMalformed { line });
        }
        let status = self
            .status_code()
            .ok_or_else(|| Error::StatusLineMalformed { line: line.clone() })?;
        if !self.skip_wsp() {
            return Err(Error::StatusLineMalformed { line });
        }
        let reason = self.reason_phrase_token();
        if !self.skip_eol() {
            return Err(Error::StatusLineMalformed { line });
        }

        Ok((protocol, status, reason.as_str()))
    }

    /// `name ':' LWS value EOL`, name lower-cased, folding retained
    /// verbatim inside the captured value.
    fn header_field(&mut self) -> Option<(String, &'a str)> {
        let name = self.token()?;
        if !self.skip(b':') {
            return None;
        }
        self.skip_lws();

        let value_start = self.pos;
        while !self.eos() {
            let value_end = self.pos;
            if self.skip_folding() {
                continue;
            } else if self.skip_eol() {
                let name = name.as_str().to_ascii_lowercase();
                return Some((name, &self.buffer[value_start..value_end]));
            } else if !is_ctl(self.peek()?) {
                self.advance(1);
            } else {
                return None;
            }
        }

        None
    }

    /// `name ':' WSP* value EOL` with a non-blank name; no folding.
    fn parameter(&mut self) -> Option<(&'a str, &'a str)> {
        let name_start = self.pos;

        if !self.skip_until(b':') {
            return None;
        }
        let name = &self.buffer[name_start..self.pos];
        if name.trim().is_empty() {
            return None;
        }

        if !self.skip(b':') {
            return None;
        }
        self.skip_wsp();

        let value_start = self.pos;
        while !self.eos() {
            let value_end = self.pos;
            if self.skip_eol() {
                return Some((name, &self.buffer[value_start..value_end]));
            } else if !is_ctl(self.peek()?) {
                self.advance(1);
            } else {
                return None;
            }
        }

        None
    }

    /// Header fields until the input ends (no body) or a bare end-of-line
    /// is hit (the remainder, if any, is the body verbatim).
    fn header_fields_and_body(&mut self) -> Result<(Headers, String)> {
        let mut headers = Headers::new();

        while !self.eos() {
            let line = self.line().to_string();
            let (name, value) = self
                .header_field()
                .ok_or(Error::HeaderMalformed { line })?;
            headers.insert(name, value.to_string());

            if self.eos() {
                break;
            }
            if self.skip_eol() {
                break;
            }
        }

        let body = if !self.eos() {
            self.tail().to_string()
        } else {
            String::new()
        };

        Ok((headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn parse_options_request() {
        let message = "OPTIONS * WEBRTSP/0.2\r\nCSeq: 1\r\n";

        let request = parse_request(message).unwrap();
        assert_eq!(request.method, Method::Options);
        assert_eq!(request.uri, "*");
        assert_eq!(request.protocol, Protocol::V0_2);
        assert_eq!(request.cseq, 1);
        assert_eq!(request.session_id, None);
        assert!(request.headers.is_empty());
        assert!(request.body.is_empty());
    }

    #[test]
    fn parse_options_request_tab_after_colon() {
        let message = "OPTIONS * WEBRTSP/0.2\r\nCSeq:\t1\r\n";

        let request = parse_request(message).unwrap();
        assert_eq!(request.method, Method::Options);
        assert_eq!(request.cseq, 1);
        assert!(request.headers.is_empty());
    }

    #[test]
    fn parse_get_parameter_request_with_body() {
        let message = "GET_PARAMETER rtsp://example.com/media.mp4 WEBRTSP/0.2\r\n\
                       CSeq: 9\r\n\
                       Content-Type: text/parameters\r\n\
                       Session: 12345678\r\n\
                       Content-Length: 15\r\n\
                       \r\n\
                       packets_received\r\n\
                       jitter\r\n";

        let request = parse_request(message).unwrap();
        assert_eq!(request.method, Method::GetParameter);
        assert_eq!(request.uri, "rtsp://example.com/media.mp4");
        assert_eq!(request.cseq, 9);
        assert_eq!(request.session_id.as_deref(), Some("12345678"));
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.content_type(), Some("text/parameters"));
        assert_eq!(
            request.headers.get("content-length").map(String::as_str),
            Some("15")
        );
        assert_eq!(request.body, "packets_received\r\njitter\r\n");
    }

    #[test]
    fn parse_describe_response() {
        let message = "WEBRTSP/0.2 200 OK\r\n\
                       CSeq: 3\r\n\
                       Session: 9a2f\r\n\
                       Content-Type: application/sdp\r\n\
                       \r\n\
                       v=0\r\nm=video 0 RTP/AVP 96\r\n";

        let response = parse_response(message).unwrap();
        assert_eq!(response.protocol, Protocol::V0_2);
        assert_eq!(response.status, 200);
        assert_eq!(response.reason, "OK");
        assert_eq!(response.cseq, 3);
        assert_eq!(response.session_id.as_deref(), Some("9a2f"));
        assert_eq!(response.content_type(), Some("application/sdp"));
        assert_eq!(response.body, "v=0\r\nm=video 0 RTP/AVP 96\r\n");
    }

    #[test]
    fn parse_error_response_without_session() {
        let message = "WEBRTSP/0.2 404 Stream Not Found\r\nCSeq: 2\r\n";

        let response = parse_response(message).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.reason, "Stream Not Found");
        assert_eq!(response.cseq, 2);
        assert_eq!(response.session_id, None);
        assert!(response.body.is_empty());
    }

    #[test]
    fn parse_folded_header_retains_fold_bytes() {
        let message = "OPTIONS * WEBRTSP/0.2\r\n\
                       CSeq: 1\r\n\
                       X-Info: part one\r\n\tpart two\r\n";

        let request = parse_request(message).unwrap();
        assert_eq!(
            request.headers.get("x-info").map(String::as_str),
            Some("part one\r\n\tpart two")
        );
        assert!(request.body.is_empty());
    }

    #[test]
    fn parse_request_rejects_missing_cseq() {
        let message = "OPTIONS * WEBRTSP/0.2\r\nSession: 1234\r\n";
        assert_eq!(parse_request(message), Err(Error::CSeqMissing));
    }

    #[test]
    fn parse_request_rejects_unknown_version() {
        let message = "OPTIONS * WEBRTSP/9.9\r\nCSeq: 1\r\n";
        assert!(matches!(
            parse_request(message),
            Err(Error::VersionMalformed { .. })
        ));
    }

    #[test]
    fn parse_request_rejects_malformed_header() {
        let message = "OPTIONS * WEBRTSP/0.2\r\nCSeq: 1\r\nNoColonHere\r\n";
        assert!(matches!(
            parse_request(message),
            Err(Error::HeaderMalformed { .. })
        ));
    }

    #[test]
    fn cseq_zero_rejected() {
        assert_eq!(parse_cseq("0"), None);
    }

    #[test]
    fn cseq_trailing_garbage_rejected() {
        assert_eq!(parse_cseq("12a"), None);
    }

    #[test]
    fn cseq_overflow_rejected() {
        assert_eq!(parse_cseq("99999999999999999999"), None);
    }

    #[test]
    fn cseq_plain_number_accepted() {
        assert_eq!(parse_cseq("42"), Some(42));
    }

    #[test]
    fn classify_request_and_response() {
        assert!(is_request("OPTIONS * WEBRTSP/0.2\r\nCSeq: 1\r\n"));
        assert!(!is_request("WEBRTSP/0.2 200 OK\r\nCSeq: 1\r\n"));
        assert!(!is_request(""));

        let message = Message::parse("SETUP * WEBRTSP/0.2\r\nCSeq: 7\r\nSession: x1\r\n").unwrap();
        assert!(matches!(message, Message::Request(_)));

        let message = Message::parse("WEBRTSP/0.2 200 OK\r\nCSeq: 7\r\n").unwrap();
        assert!(matches!(message, Message::Response(_)));
    }

    #[test]
    fn options_list_parses_to_method_set() {
        let methods = parse_options("OPTIONS, LIST, DESCRIBE").unwrap();
        assert_eq!(methods.len(), 3);
        assert!(methods.contains(&Method::Options));
        assert!(methods.contains(&Method::List));
        assert!(methods.contains(&Method::Describe));
    }

    #[test]
    fn options_list_rejects_unknown_method() {
        assert!(matches!(
            parse_options("OPTIONS, FOO"),
            Err(Error::OptionMalformed { .. })
        ));
    }

    #[test]
    fn parameters_parse_to_map() {
        let parameters = parse_parameters("packets_received: 10\r\njitter: 2\r\n").unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(
            parameters.get("packets_received").map(String::as_str),
            Some("10")
        );
        assert_eq!(parameters.get("jitter").map(String::as_str), Some("2"));
    }

    #[test]
    fn parameters_reject_line_without_colon() {
        assert!(matches!(
            parse_parameters("packets_received: 10\r\njunk\r\n"),
            Err(Error::ParameterMalformed { .. })
        ));
    }

    #[test]
    fn parameters_reject_missing_final_eol() {
        assert!(matches!(
            parse_parameters("jitter: 2"),
            Err(Error::ParameterMalformed { .. })
        ));
    }

    #[test]
    fn ice_candidates_parse_per_line() {
        let candidates = parse_ice_candidates("0/candidate:1 x\r\n1/candidate:2 y\r\n").unwrap();
        assert_eq!(
            candidates,
            vec![
                IceCandidate {
                    m_line_index: 0,
                    candidate: "candidate:1 x".to_string(),
                },
                IceCandidate {
                    m_line_index: 1,
                    candidate: "candidate:2 y".to_string(),
                },
            ]
        );
    }

    #[test]
    fn ice_candidates_skip_empty_lines() {
        let candidates = parse_ice_candidates("0/a=end-of-candidates\r\n\r\n").unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn ice_candidates_reject_line_without_separator() {
        assert!(matches!(
            parse_ice_candidates("0/candidate:1 x\r\ncandidate:2 y\r\n"),
            Err(Error::IceCandidateMalformed { .. })
        ));
    }

    #[test]
    fn ice_candidates_reject_bad_index() {
        assert!(matches!(
            parse_ice_candidates("a/candidate:1 x\r\n"),
            Err(Error::IceCandidateMalformed { .. })
        ));
    }
}
