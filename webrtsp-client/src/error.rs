use std::error;
use std::fmt;

use webrtsp_protocol::{CSeq, Method};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Inbound text failed the message grammar.
    Parse(webrtsp_protocol::Error),
    /// A well-formed message broke a protocol rule.
    Protocol(ProtocolViolation),
    /// The media peer backend rejected an operation.
    Peer(PeerError),
    /// The transport failed or closed.
    Connection(ConnectionError),
    /// A request was submitted with a CSeq that already has a pending
    /// entry. The generator never produces one, so this is a caller bug.
    RequestPending { cseq: CSeq },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "{}", err),
            Error::Protocol(err) => write!(f, "{}", err),
            Error::Peer(err) => write!(f, "{}", err),
            Error::Connection(err) => write!(f, "{}", err),
            Error::RequestPending { cseq } => {
                write!(f, "request with CSeq {} is already pending", cseq)
            }
        }
    }
}

impl error::Error for Error {}

impl From<webrtsp_protocol::Error> for Error {
    fn from(err: webrtsp_protocol::Error) -> Self {
        Error::Parse(err)
    }
}

impl From<ProtocolViolation> for Error {
    fn from(err: ProtocolViolation) -> Self {
        Error::Protocol(err)
    }
}

impl From<PeerError> for Error {
    fn from(err: PeerError) -> Self {
        Error::Peer(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

/// Protocol rule violated by an otherwise well-formed message.
#[derive(Debug)]
pub enum ProtocolViolation {
    /// A required header is missing.
    HeaderMissing {
        method: Method,
        header: &'static str,
    },
    /// The message must carry a session id but did not.
    SessionMissing { method: Method },
    /// The carried session id does not match the bound session.
    SessionMismatch { method: Method, session_id: String },
    /// No session id is bound yet for an exchange that needs one.
    SessionUnbound { method: Method },
    /// No target URI is bound yet for an exchange that needs one.
    UriUnbound { method: Method },
    /// The content type differs from what the exchange requires.
    ContentTypeMismatch {
        method: Method,
        expected: &'static str,
        actual: Option<String>,
    },
    /// DESCRIBE must deliver a non-empty SDP body.
    SdpMissing,
    /// The server sent a request the client role does not serve.
    MethodUnsupported { method: Method },
    /// SETUP arrived before a peer exists to take its candidates.
    PeerMissing,
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolViolation::HeaderMissing { method, header } => {
                write!(f, "missing \"{}\" header in {} message", header, method)
            }
            ProtocolViolation::SessionMissing { method } => {
                write!(f, "missing session in {} message", method)
            }
            ProtocolViolation::SessionMismatch { method, session_id } => {
                write!(f, "unknown session \"{}\" in {} message", session_id, method)
            }
            ProtocolViolation::SessionUnbound { method } => {
                write!(f, "no session bound for {} request", method)
            }
            ProtocolViolation::UriUnbound { method } => {
                write!(f, "no target uri bound for {} request", method)
            }
            ProtocolViolation::ContentTypeMismatch {
                method,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "invalid content-type \"{}\" in {} message (expected \"{}\")",
                    actual.as_deref().unwrap_or(""),
                    method,
                    expected,
                )
            }
            ProtocolViolation::SdpMissing => {
                write!(f, "missing sdp in DESCRIBE response")
            }
            ProtocolViolation::MethodUnsupported { method } => {
                write!(f, "inbound {} not supported in client role", method)
            }
            ProtocolViolation::PeerMissing => {
                write!(f, "no local peer to take candidates")
            }
        }
    }
}

impl error::Error for ProtocolViolation {}

/// Failure reported by the media peer backend, carrying its message.
#[derive(Debug)]
pub struct PeerError(pub String);

impl fmt::Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "peer failed: {}", self.0)
    }
}

impl error::Error for PeerError {}

#[derive(Debug, PartialEq, Eq)]
pub enum ConnectionError {
    /// The transport never reached the connected state.
    ConnectFailed,
    /// The connection closed while the operation was outstanding.
    Closed,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectionError::ConnectFailed => write!(f, "transport failed to connect"),
            ConnectionError::Closed => write!(f, "connection closed"),
        }
    }
}

impl error::Error for ConnectionError {}
