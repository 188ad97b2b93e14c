use tokio::sync::mpsc;
use tokio::sync::watch;

/// Connection state of the underlying message transport.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub type MessageTx = mpsc::UnboundedSender<String>;
pub type MessageRx = mpsc::UnboundedReceiver<String>;
pub type ConnectionStateTx = watch::Sender<ConnectionState>;
pub type ConnectionStateRx = watch::Receiver<ConnectionState>;

/// Client-side end of a duplex text channel. A transport implementation
/// pumps received text into `incoming`, puts whatever shows up on the far
/// end of `outgoing` on the wire, and publishes its state transitions; the
/// client never touches the socket itself.
pub struct Transport {
    pub outgoing: MessageTx,
    pub incoming: MessageRx,
    pub state: ConnectionStateRx,
}

/// Transport-side end of [`Transport::channel`].
pub struct TransportHandle {
    pub outgoing: MessageRx,
    pub incoming: MessageTx,
    pub state: ConnectionStateTx,
}

impl Transport {
    /// Paired channel bundle, starting out in `Connecting`. The `Transport`
    /// half goes to the client, the `TransportHandle` half stays with the
    /// transport implementation.
    pub fn channel() -> (Transport, TransportHandle) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        (
            Transport {
                outgoing: outgoing_tx,
                incoming: incoming_rx,
                state: state_rx,
            },
            TransportHandle {
                outgoing: outgoing_rx,
                incoming: incoming_tx,
                state: state_tx,
            },
        )
    }
}
