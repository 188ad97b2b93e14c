mod error;
mod message;
mod parse;
mod request;
mod response;
mod serialize;
mod token;

pub use error::{Error, Result};
pub use message::{
    CSeq, Headers, IceCandidate, MLineIndex, Message, Method, Parameters, Protocol, SessionId,
    Status, StatusCode,
};
pub use parse::{
    is_request, parse_ice_candidates, parse_options, parse_parameters, parse_request,
    parse_response,
};
pub use request::Request;
pub use response::Response;
pub use serialize::{to_text, Serialize};
pub use token::Token;
