use bytes::{BufMut, BytesMut};

use crate::message::{CSeq, StatusCode};
use crate::request::Request;
use crate::response::Response;

pub trait Serialize {
    fn serialize(&self, dst: &mut BytesMut);
}

/// Flatten a message to wire text for message-oriented transports.
pub fn to_text<M: Serialize>(message: &M) -> String {
    let mut buffer = BytesMut::new();
    message.serialize(&mut buffer);
    // The serializer is fed exclusively from `str` fields.
    String::from_utf8_lossy(&buffer).into_owned()
}

impl Serialize for Request {
    fn serialize(&self, dst: &mut BytesMut) {
        dst.put(format!("{} {} {}\r\n", self.method, self.uri, self.protocol).as_bytes());

        serialize_common(dst, self.cseq, self.session_id.as_deref());

        for (name, value) in &self.headers {
            dst.put(format!("{}: {}\r\n", name, value).as_bytes());
        }

        serialize_body(dst, &self.body);
    }
}

impl Serialize for Response {
    fn serialize(&self, dst: &mut BytesMut) {
        dst.put(
            format!(
                "{} {} {}\r\n",
                self.protocol,
                clamp_status_code(self.status),
                self.reason,
            )
            .as_bytes(),
        );

        serialize_common(dst, self.cseq, self.session_id.as_deref());

        for (name, value) in &self.headers {
            dst.put(format!("{}: {}\r\n", name, value).as_bytes());
        }

        serialize_body(dst, &self.body);
    }
}

fn serialize_common(dst: &mut BytesMut, cseq: CSeq, session_id: Option<&str>) {
    dst.put(format!("CSeq: {}\r\n", cseq).as_bytes());

    if let Some(session_id) = session_id {
        dst.put(format!("Session: {}\r\n", session_id).as_bytes());
    }
}

fn serialize_body(dst: &mut BytesMut, body: &str) {
    if !body.is_empty() {
        dst.put(b"\r\n".as_slice());
        dst.put(body.as_bytes());
    }
}

/// An in-memory status outside the 3-digit range still serializes to a
/// well-formed wire status.
fn clamp_status_code(status: StatusCode) -> StatusCode {
    status.clamp(100, 999)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Method, Status};
    use crate::parse::{parse_request, parse_response};

    #[test]
    fn serialize_options_request() {
        let request = Request::new(Method::Options, "*", 1);
        assert_eq!(to_text(&request), "OPTIONS * WEBRTSP/0.2\r\nCSeq: 1\r\n");
    }

    #[test]
    fn serialize_setup_request_with_session_and_body() {
        let request = Request::new(Method::Setup, "*", 5)
            .with_session_id("12345678")
            .with_body("application/x-ice-candidate", "0/candidate:1 x\r\n");

        assert_eq!(
            to_text(&request),
            "SETUP * WEBRTSP/0.2\r\n\
             CSeq: 5\r\n\
             Session: 12345678\r\n\
             content-type: application/x-ice-candidate\r\n\
             \r\n\
             0/candidate:1 x\r\n"
        );
    }

    #[test]
    fn serialize_ok_response() {
        let response = Response::ok(7, "12345678");
        assert_eq!(
            to_text(&response),
            "WEBRTSP/0.2 200 OK\r\nCSeq: 7\r\nSession: 12345678\r\n"
        );
    }

    #[test]
    fn status_code_clamped_low() {
        let mut response = Response::new(Status::Ok, 1);
        response.status = 0;
        assert!(to_text(&response).starts_with("WEBRTSP/0.2 100 "));
    }

    #[test]
    fn status_code_clamped_high() {
        let mut response = Response::new(Status::Ok, 1);
        response.status = 5000;
        assert!(to_text(&response).starts_with("WEBRTSP/0.2 999 "));
    }

    #[test]
    fn status_code_in_range_untouched() {
        let mut response = Response::new(Status::Ok, 1);
        response.status = 450;
        response.reason = "Whatever".to_string();
        assert!(to_text(&response).starts_with("WEBRTSP/0.2 450 Whatever"));
    }

    #[test]
    fn request_roundtrips_through_parser() {
        let request = Request::new(Method::Play, "rtsp://example.com/live", 12)
            .with_session_id("9a2f")
            .with_header("User-Agent", "webrtsp-client")
            .with_body("application/sdp", "v=0\r\ns=-\r\n");

        let parsed = parse_request(&to_text(&request)).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn response_roundtrips_through_parser() {
        let response = Response::new(Status::Ok, 3)
            .with_session_id("9a2f")
            .with_body("application/sdp", "v=0\r\n");

        let parsed = parse_response(&to_text(&response)).unwrap();
        assert_eq!(parsed, response);
    }
}
