pub mod client;
pub mod error;
pub mod peer;
pub mod runtime;
pub mod session;
pub mod transport;

pub use client::{Client, Requester};
pub use error::{ConnectionError, Error, PeerError, ProtocolViolation};
pub use peer::{CreatePeer, EngineInit, Peer, END_OF_CANDIDATES};
pub use runtime::Runtime;
pub use session::Session;
pub use transport::{ConnectionState, Transport, TransportHandle};
