use std::sync::Once;

use futures::future::BoxFuture;

use webrtsp_protocol::MLineIndex;

use crate::error::PeerError;

/// Candidate payload that signals the end of ICE gathering to the remote
/// side. Always carried with m-line index 0.
pub const END_OF_CANDIDATES: &str = "a=end-of-candidates";

pub type IceCandidateCallback = Box<dyn FnMut(MLineIndex, String) + Send>;
pub type EosCallback = Box<dyn FnMut() + Send>;

/// The capability surface the session needs from whatever real-time media
/// engine sits underneath. Implementations adapt their engine's observer
/// API onto the two callbacks and four operations below.
pub trait Peer: Send {
    /// Register the callback invoked for every locally discovered ICE
    /// candidate, and once with [`END_OF_CANDIDATES`] when gathering is
    /// complete.
    fn on_ice_candidate(&mut self, callback: IceCandidateCallback);

    /// Register the callback invoked when the media stream ends.
    fn on_eos(&mut self, callback: EosCallback);

    /// Apply the remote offer.
    fn set_remote_sdp<'a>(&'a mut self, sdp: &'a str) -> BoxFuture<'a, Result<(), PeerError>>;

    /// Create and commit the local answer, returning its SDP.
    fn local_sdp(&mut self) -> BoxFuture<'_, Result<String, PeerError>>;

    /// Feed a remote candidate into the peer.
    fn add_ice_candidate<'a>(
        &'a mut self,
        m_line_index: MLineIndex,
        candidate: &'a str,
    ) -> BoxFuture<'a, Result<(), PeerError>>;

    /// Release the underlying resources. Idempotent.
    fn close(&mut self);
}

/// Factory producing the single peer a session owns, invoked once the
/// remote offer is in hand.
pub type CreatePeer = Box<dyn Fn() -> Box<dyn Peer> + Send + Sync>;

/// One-time global initialization guard for media engines that need it.
/// Owned by whichever component constructs peers, not ambient state.
pub struct EngineInit {
    once: Once,
}

impl EngineInit {
    pub const fn new() -> Self {
        Self { once: Once::new() }
    }

    /// Run `init` on the first call; every later call is a no-op, even
    /// across threads racing here.
    pub fn ensure(&self, init: impl FnOnce()) {
        self.once.call_once(init);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::EngineInit;

    #[test]
    fn engine_init_runs_once() {
        static INIT: EngineInit = EngineInit::new();
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        for _ in 0..3 {
            INIT.ensure(|| {
                CALLS.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
