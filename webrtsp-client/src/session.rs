use std::collections::HashSet;
use std::sync::Arc;

use tokio::select;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use webrtsp_protocol::{
    parse_ice_candidates, parse_options, parse_parameters, IceCandidate, Method, Parameters,
    Request, Response, SessionId,
};

use crate::client::Requester;
use crate::error::{Error, ProtocolViolation};
use crate::peer::{CreatePeer, Peer};
use crate::runtime::task_manager::{Task, TaskContext};
use crate::runtime::Runtime;

pub const SDP_CONTENT_TYPE: &str = "application/sdp";
pub const ICE_CANDIDATE_CONTENT_TYPE: &str = "application/x-ice-candidate";
pub const PARAMETERS_CONTENT_TYPE: &str = "text/parameters";

pub type RequestRx = mpsc::UnboundedReceiver<Request>;

/// The one signaling session bound to a connection. Drives the startup
/// handshake (OPTIONS, optional LIST, DESCRIBE, peer negotiation, PLAY)
/// and services server-initiated SETUP and TEARDOWN.
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
    requester: Requester,
    create_peer: CreatePeer,
    worker: Task,
    runtime: Arc<Runtime>,
}

/// Session fields behind one async mutex: the handshake flow and inbound
/// request servicing interleave at await points, never concurrently.
struct SessionInner {
    supported_methods: HashSet<Method>,
    parameters: Parameters,
    uri: Option<String>,
    session_id: Option<SessionId>,
    peer: Option<Box<dyn Peer>>,
}

impl Session {
    pub(crate) async fn start(
        requester: Requester,
        create_peer: CreatePeer,
        request_rx: RequestRx,
        runtime: Arc<Runtime>,
    ) -> Self {
        let inner = Arc::new(Mutex::new(SessionInner {
            supported_methods: HashSet::new(),
            parameters: Parameters::new(),
            uri: None,
            session_id: None,
            peer: None,
        }));

        tracing::trace!("starting session");
        let worker = runtime
            .task()
            .spawn({
                let inner = inner.clone();
                let requester = requester.clone();
                |task_context| Self::run(inner, requester, request_rx, task_context)
            })
            .await;

        Self {
            inner,
            requester,
            create_peer,
            worker,
            runtime,
        }
    }

    /// Methods the server advertised in its OPTIONS response.
    pub async fn supported_methods(&self) -> HashSet<Method> {
        self.inner.lock().await.supported_methods.clone()
    }

    /// Parameters delivered by LIST, when the server supports it.
    pub async fn parameters(&self) -> Parameters {
        self.inner.lock().await.parameters.clone()
    }

    /// The id bound by DESCRIBE; `None` before that and after TEARDOWN.
    pub async fn session_id(&self) -> Option<SessionId> {
        self.inner.lock().await.session_id.clone()
    }

    pub async fn stop(&mut self) {
        tracing::trace!("stopping session");
        self.worker.stop().await;
    }

    /// The whole signaling handshake, in order. Any failure aborts the
    /// bring-up; the caller decides what to do with the connection.
    pub(crate) async fn startup(&self) -> Result<(), Error> {
        self.request_options("*").await?;

        let list_supported = self
            .inner
            .lock()
            .await
            .supported_methods
            .contains(&Method::List);
        if list_supported {
            self.request_list().await?;
        }

        let sdp = self.request_describe("*").await?;

        let mut peer = (self.create_peer)();

        // Trickle ICE: every candidate the peer discovers from here on
        // rides its own SETUP request, independent of the main flow.
        let (candidate_tx, candidate_rx) = mpsc::unbounded_channel();
        peer.on_ice_candidate(Box::new(move |m_line_index, candidate| {
            let _ = candidate_tx.send(IceCandidate {
                m_line_index,
                candidate,
            });
        }));
        self.spawn_candidate_pump(candidate_rx).await;

        self.inner.lock().await.peer = Some(peer);

        // The lock stays held across the peer negotiation so inbound
        // SETUPs queue behind it instead of racing it.
        let answer = {
            let mut inner = self.inner.lock().await;
            let peer = inner.peer.as_mut().ok_or(ProtocolViolation::PeerMissing)?;
            peer.set_remote_sdp(&sdp).await?;
            peer.local_sdp().await?
        };

        self.request_play(&answer).await?;
        tracing::debug!("session playing");

        Ok(())
    }

    async fn request_options(&self, uri: &str) -> Result<(), Error> {
        let request = Request::new(Method::Options, uri, self.requester.next_cseq());
        let response = self.requester.request(request).await?;

        let mut inner = self.inner.lock().await;
        inner.supported_methods = HashSet::new();

        let public = response
            .headers
            .get("public")
            .ok_or(ProtocolViolation::HeaderMissing {
                method: Method::Options,
                header: "public",
            })?;
        inner.supported_methods = parse_options(public)?;
        tracing::debug!(methods = %public, "server options");

        Ok(())
    }

    async fn request_list(&self) -> Result<(), Error> {
        let request = Request::new(Method::List, "*", self.requester.next_cseq());
        let response = self.requester.request(request).await?;

        let mut inner = self.inner.lock().await;
        inner.parameters = Parameters::new();

        if response.content_type() != Some(PARAMETERS_CONTENT_TYPE) {
            return Err(ProtocolViolation::ContentTypeMismatch {
                method: Method::List,
                expected: PARAMETERS_CONTENT_TYPE,
                actual: response.content_type().map(str::to_string),
            }
            .into());
        }
        inner.parameters = parse_parameters(&response.body)?;

        Ok(())
    }

    async fn request_describe(&self, uri: &str) -> Result<String, Error> {
        self.inner.lock().await.uri = Some(uri.to_string());

        let request = Request::new(Method::Describe, uri, self.requester.next_cseq());
        let response = self.requester.request(request).await?;

        let session_id = response
            .session_id
            .clone()
            .ok_or(ProtocolViolation::SessionMissing {
                method: Method::Describe,
            })?;
        self.inner.lock().await.session_id = Some(session_id.clone());
        tracing::debug!(%session_id, "session bound");

        if response.content_type() != Some(SDP_CONTENT_TYPE) {
            return Err(ProtocolViolation::ContentTypeMismatch {
                method: Method::Describe,
                expected: SDP_CONTENT_TYPE,
                actual: response.content_type().map(str::to_string),
            }
            .into());
        }
        if response.body.is_empty() {
            return Err(ProtocolViolation::SdpMissing.into());
        }

        Ok(response.body)
    }

    async fn request_play(&self, sdp: &str) -> Result<(), Error> {
        let (uri, session_id) = Self::target(&self.inner, Method::Play).await?;

        let request = Request::new(Method::Play, &uri, self.requester.next_cseq())
            .with_session_id(&session_id)
            .with_body(SDP_CONTENT_TYPE, sdp);
        self.requester.request(request).await?;

        Ok(())
    }

    async fn spawn_candidate_pump(&self, mut candidate_rx: mpsc::UnboundedReceiver<IceCandidate>) {
        let inner = self.inner.clone();
        let requester = self.requester.clone();
        let runtime = self.runtime.clone();

        self.runtime
            .task()
            .spawn(move |mut task_context| async move {
                loop {
                    select! {
                        candidate = candidate_rx.recv() => {
                            match candidate {
                                Some(candidate) => {
                                    // Every candidate gets its own SETUP; the
                                    // sends run concurrently and resolve in
                                    // whatever order their responses arrive.
                                    let inner = inner.clone();
                                    let requester = requester.clone();
                                    runtime
                                        .task()
                                        .spawn(|_| async move {
                                            if let Err(err) =
                                                Self::send_candidate(&inner, &requester, candidate)
                                                    .await
                                            {
                                                tracing::warn!(
                                                    %err,
                                                    "failed to send local candidate"
                                                );
                                            }
                                        })
                                        .await;
                                }
                                None => break,
                            }
                        },
                        _ = task_context.wait_for_stop() => break,
                    }
                }
            })
            .await;
    }

    async fn send_candidate(
        inner: &Mutex<SessionInner>,
        requester: &Requester,
        candidate: IceCandidate,
    ) -> Result<(), Error> {
        let (uri, session_id) = Self::target(inner, Method::Setup).await?;

        let body = format!("{}/{}\r\n", candidate.m_line_index, candidate.candidate);
        let request = Request::new(Method::Setup, &uri, requester.next_cseq())
            .with_session_id(&session_id)
            .with_body(ICE_CANDIDATE_CONTENT_TYPE, &body);
        requester.request(request).await?;

        Ok(())
    }

    /// Snapshot of the bound target for an outbound request.
    async fn target(
        inner: &Mutex<SessionInner>,
        method: Method,
    ) -> Result<(String, SessionId), Error> {
        let inner = inner.lock().await;
        let uri = inner
            .uri
            .clone()
            .ok_or(ProtocolViolation::UriUnbound { method })?;
        let session_id = inner
            .session_id
            .clone()
            .ok_or(ProtocolViolation::SessionUnbound { method })?;
        Ok((uri, session_id))
    }

    async fn run(
        inner: Arc<Mutex<SessionInner>>,
        requester: Requester,
        mut request_rx: RequestRx,
        mut task_context: TaskContext,
    ) {
        loop {
            select! {
                request = request_rx.recv() => {
                    match request {
                        Some(request) => {
                            if let Err(err) =
                                Self::handle_request(&inner, &requester, request).await
                            {
                                tracing::error!(%err, "failed to service inbound request");
                            }
                        }
                        None => break,
                    }
                },
                _ = task_context.wait_for_stop() => break,
            }
        }

        // The session is over; release the peer if it is still around.
        if let Some(mut peer) = inner.lock().await.peer.take() {
            peer.close();
        }
    }

    /// Dispatch one server-initiated request. A failure here fails only
    /// this request; no protocol-level error response is generated.
    async fn handle_request(
        inner: &Arc<Mutex<SessionInner>>,
        requester: &Requester,
        request: Request,
    ) -> Result<(), Error> {
        match request.method {
            Method::Setup => Self::on_setup(inner, requester, request).await,
            Method::Teardown => Self::on_teardown(inner, requester, request).await,
            method => Err(Error::Protocol(ProtocolViolation::MethodUnsupported {
                method,
            })),
        }
    }

    async fn on_setup(
        inner: &Arc<Mutex<SessionInner>>,
        requester: &Requester,
        request: Request,
    ) -> Result<(), Error> {
        let mut inner = inner.lock().await;

        if inner.peer.is_none() {
            return Err(ProtocolViolation::PeerMissing.into());
        }

        let session_id =
            request
                .session_id
                .clone()
                .ok_or(ProtocolViolation::SessionMissing {
                    method: Method::Setup,
                })?;
        if inner.session_id.as_deref() != Some(session_id.as_str()) {
            return Err(ProtocolViolation::SessionMismatch {
                method: Method::Setup,
                session_id,
            }
            .into());
        }
        if request.content_type() != Some(ICE_CANDIDATE_CONTENT_TYPE) {
            return Err(ProtocolViolation::ContentTypeMismatch {
                method: Method::Setup,
                expected: ICE_CANDIDATE_CONTENT_TYPE,
                actual: request.content_type().map(str::to_string),
            }
            .into());
        }

        let candidates = parse_ice_candidates(&request.body)?;

        requester.send_response(Response::ok(request.cseq, &session_id))?;

        // The reply does not wait on the peer; a candidate the peer
        // rejects is logged and the rest still land.
        if let Some(peer) = inner.peer.as_mut() {
            for candidate in candidates {
                if let Err(err) = peer
                    .add_ice_candidate(candidate.m_line_index, &candidate.candidate)
                    .await
                {
                    tracing::warn!(%err, "peer rejected remote candidate");
                }
            }
        }

        Ok(())
    }

    async fn on_teardown(
        inner: &Arc<Mutex<SessionInner>>,
        requester: &Requester,
        request: Request,
    ) -> Result<(), Error> {
        let mut inner = inner.lock().await;

        let session_id =
            request
                .session_id
                .clone()
                .ok_or(ProtocolViolation::SessionMissing {
                    method: Method::Teardown,
                })?;
        if inner.session_id.as_deref() != Some(session_id.as_str()) {
            return Err(ProtocolViolation::SessionMismatch {
                method: Method::Teardown,
                session_id,
            }
            .into());
        }

        if let Some(mut peer) = inner.peer.take() {
            peer.close();
        }
        inner.session_id = None;
        tracing::debug!(%session_id, "session torn down");

        requester.send_response(Response::ok(request.cseq, &session_id))?;

        Ok(())
    }
}
