use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::select;
use tokio::sync::{mpsc, oneshot};

use webrtsp_protocol::{is_request, parse_request, parse_response, to_text, CSeq, Request, Response};

use crate::error::{ConnectionError, Error};
use crate::peer::CreatePeer;
use crate::runtime::task_manager::{Task, TaskContext};
use crate::runtime::Runtime;
use crate::session::Session;
use crate::transport::{ConnectionState, ConnectionStateRx, MessageRx, MessageTx, Transport};

/// Correlation state shared between requester handles and the dispatch
/// loop. Only ever locked briefly; no await happens under the lock.
struct Pending {
    next_cseq: CSeq,
    closed: bool,
    waiters: HashMap<CSeq, oneshot::Sender<Response>>,
}

impl Pending {
    fn new() -> Self {
        Self {
            next_cseq: 0,
            closed: false,
            waiters: HashMap::new(),
        }
    }

    /// Next CSeq: monotonic, never zero, skipping values that still have a
    /// pending waiter.
    fn next_cseq(&mut self) -> CSeq {
        loop {
            self.next_cseq = self.next_cseq.wrapping_add(1);
            if self.next_cseq != 0 && !self.waiters.contains_key(&self.next_cseq) {
                return self.next_cseq;
            }
        }
    }

    /// Drop every waiter and refuse new ones. Dropping a waiter resumes its
    /// suspended `request` call with `ConnectionError::Closed`.
    fn close(&mut self) {
        self.closed = true;
        for (cseq, _waiter) in self.waiters.drain() {
            tracing::debug!(cseq, "failing pending request on connection teardown");
        }
    }
}

/// Cloneable handle for sending over the connection. Requests suspend the
/// caller until their response arrives; responses are fire-and-forget.
#[derive(Clone)]
pub struct Requester {
    pending: Arc<Mutex<Pending>>,
    outgoing: MessageTx,
}

impl Requester {
    pub fn next_cseq(&self) -> CSeq {
        self.pending.lock().unwrap().next_cseq()
    }

    /// Send a request and wait for the response correlated by its CSeq.
    /// Fails with `ConnectionError::Closed` if the connection goes down
    /// while the request is outstanding.
    pub async fn request(&self, request: Request) -> Result<Response, Error> {
        let (waiter_tx, waiter_rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().unwrap();
            if pending.closed {
                return Err(Error::Connection(ConnectionError::Closed));
            }
            if pending.waiters.contains_key(&request.cseq) {
                return Err(Error::RequestPending { cseq: request.cseq });
            }
            pending.waiters.insert(request.cseq, waiter_tx);
        }

        tracing::trace!(cseq = request.cseq, %request, "sending request");
        if self.outgoing.send(to_text(&request)).is_err() {
            self.pending.lock().unwrap().waiters.remove(&request.cseq);
            return Err(Error::Connection(ConnectionError::Closed));
        }

        waiter_rx
            .await
            .map_err(|_| Error::Connection(ConnectionError::Closed))
    }

    /// Send a response; no correlation entry is created.
    pub fn send_response(&self, response: Response) -> Result<(), Error> {
        tracing::trace!(cseq = response.cseq, %response, "sending response");
        self.outgoing
            .send(to_text(&response))
            .map_err(|_| Error::Connection(ConnectionError::Closed))
    }
}

#[cfg(test)]
impl Requester {
    /// Requester over a bare channel with a fresh pending table.
    pub(crate) fn detached() -> (Requester, crate::transport::MessageRx) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let requester = Requester {
            pending: Arc::new(Mutex::new(Pending::new())),
            outgoing: outgoing_tx,
        };
        (requester, outgoing_rx)
    }
}

/// One WebRTSP connection: owns the correlation table and the single
/// session bound to it.
pub struct Client {
    session: Session,
    requester: Requester,
    worker: Task,
}

impl Client {
    /// Drive an established transport to a playing session. Waits for the
    /// transport to leave `Connecting`; on `Connected` it creates the one
    /// session bound to this connection and runs its startup handshake to
    /// completion. Any handshake failure aborts the whole bring-up and is
    /// returned here.
    pub async fn connect(
        transport: Transport,
        create_peer: CreatePeer,
        runtime: Arc<Runtime>,
    ) -> Result<Client, Error> {
        let Transport {
            outgoing,
            incoming,
            mut state,
        } = transport;

        let connected = state
            .wait_for(|state| *state != ConnectionState::Connecting)
            .await
            .map(|state| *state == ConnectionState::Connected)
            .unwrap_or(false);
        if !connected {
            return Err(Error::Connection(ConnectionError::ConnectFailed));
        }
        tracing::debug!("transport connected");

        let pending = Arc::new(Mutex::new(Pending::new()));
        let requester = Requester {
            pending: pending.clone(),
            outgoing,
        };

        let (request_tx, request_rx) = mpsc::unbounded_channel();

        let mut session =
            Session::start(requester.clone(), create_peer, request_rx, runtime.clone()).await;

        let mut worker = runtime
            .task()
            .spawn({
                let pending = pending.clone();
                |task_context| Self::run(incoming, state, pending, request_tx, task_context)
            })
            .await;

        if let Err(err) = session.startup().await {
            // Bring-up failed: tear the connection workers down before
            // surfacing the failure to the caller.
            session.stop().await;
            worker.stop().await;
            return Err(err);
        }

        Ok(Client {
            session,
            requester,
            worker,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }

    /// Tear down the session and the dispatch loop. Every request still
    /// outstanding fails with `ConnectionError::Closed`.
    pub async fn disconnect(&mut self) {
        self.session.stop().await;
        self.worker.stop().await;
    }

    async fn run(
        mut incoming: MessageRx,
        mut state: ConnectionStateRx,
        pending: Arc<Mutex<Pending>>,
        request_tx: mpsc::UnboundedSender<Request>,
        mut task_context: TaskContext,
    ) {
        loop {
            select! {
                message = incoming.recv() => {
                    match message {
                        Some(text) => Self::dispatch(&text, &pending, &request_tx),
                        None => {
                            tracing::debug!("transport dropped inbound channel");
                            break;
                        }
                    }
                },
                changed = state.changed() => {
                    let disconnected = changed.is_err()
                        || *state.borrow_and_update() == ConnectionState::Disconnected;
                    if disconnected {
                        tracing::debug!("transport disconnected");
                        break;
                    }
                },
                _ = task_context.wait_for_stop() => {
                    break;
                },
            }
        }

        pending.lock().unwrap().close();
    }

    /// Classify one inbound message. Requests go to the session in arrival
    /// order; a response resumes its single waiter exactly once.
    fn dispatch(
        text: &str,
        pending: &Arc<Mutex<Pending>>,
        request_tx: &mpsc::UnboundedSender<Request>,
    ) {
        if is_request(text) {
            match parse_request(text) {
                Ok(request) => {
                    tracing::trace!(cseq = request.cseq, %request, "received request");
                    let _ = request_tx.send(request);
                }
                Err(err) => {
                    tracing::error!(%err, "dropping malformed inbound request");
                }
            }
        } else {
            match parse_response(text) {
                Ok(response) => {
                    tracing::trace!(cseq = response.cseq, %response, "received response");
                    let waiter = pending.lock().unwrap().waiters.remove(&response.cseq);
                    match waiter {
                        Some(waiter) => {
                            let _ = waiter.send(response);
                        }
                        None => {
                            tracing::warn!(
                                cseq = response.cseq,
                                "response does not match any pending request"
                            );
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(%err, "dropping malformed inbound response");
                }
            }
        }
    }
}
