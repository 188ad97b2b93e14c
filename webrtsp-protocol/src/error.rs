use std::error;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Grammar-level parse failure. Parsing is all-or-nothing: any of these
/// voids the whole message, with no partial recovery.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// The method line does not follow `Method SP URI SP Protocol EOL`.
    MethodLineMalformed { line: String },
    /// The first token of the method line is not a known method.
    MethodUnknown { method: String },
    /// The status line does not follow `Protocol SP 3DIGIT SP Reason EOL`.
    StatusLineMalformed { line: String },
    /// The version token is not of the `WEBRTSP/<digit>.<digit>` family,
    /// or names a version this implementation does not know.
    VersionMalformed { line: String },
    /// A header line is not `name ":" LWS value EOL`.
    HeaderMalformed { line: String },
    /// The mandatory CSeq header is missing.
    CSeqMissing,
    /// The CSeq value is zero, not a decimal number, or overflows.
    CSeqInvalid { value: String },
    /// A token in an options list is not a known method.
    OptionMalformed { token: String },
    /// A parameter line has a blank name or no terminating end-of-line.
    ParameterMalformed { line: String },
    /// An ICE candidate line has no "/" separator or a bad m-line index.
    IceCandidateMalformed { line: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MethodLineMalformed { line } => {
                write!(f, "method line malformed: {}", line)
            }
            Error::MethodUnknown { method } => {
                write!(f, "method unknown: {}", method)
            }
            Error::StatusLineMalformed { line } => {
                write!(f, "status line malformed: {}", line)
            }
            Error::VersionMalformed { line } => {
                write!(f, "protocol version malformed (in line: {})", line)
            }
            Error::HeaderMalformed { line } => {
                write!(f, "header line malformed: {}", line)
            }
            Error::CSeqMissing => {
                write!(f, "message does not have a CSeq header")
            }
            Error::CSeqInvalid { value } => {
                write!(f, "message has invalid CSeq value: {}", value)
            }
            Error::OptionMalformed { token } => {
                write!(f, "options list has unknown method: {}", token)
            }
            Error::ParameterMalformed { line } => {
                write!(f, "parameter line malformed: {}", line)
            }
            Error::IceCandidateMalformed { line } => {
                write!(f, "ice candidate line malformed: {}", line)
            }
        }
    }
}

impl error::Error for Error {}
