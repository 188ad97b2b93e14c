use futures::future::BoxFuture;
use futures::FutureExt;

use webrtsp_client::error::PeerError;
use webrtsp_client::peer::{EosCallback, IceCandidateCallback, Peer, END_OF_CANDIDATES};
use webrtsp_protocol::MLineIndex;

/// Media-engine-free peer for probing a server's signaling path. It
/// accepts the remote offer, answers every m-line with a declined (zero
/// port) stub, and reports end-of-candidates right away since it gathers
/// none. Good enough to walk a server through its whole handshake.
pub struct ProbePeer {
    remote_sdp: Option<String>,
    on_ice_candidate: Option<IceCandidateCallback>,
    closed: bool,
}

impl ProbePeer {
    pub fn new() -> Self {
        Self {
            remote_sdp: None,
            on_ice_candidate: None,
            closed: false,
        }
    }

    /// Minimal answer: echo the offer's m-lines with port zero, which
    /// declines every stream while keeping the answer structurally valid.
    fn answer_from_offer(offer: &str) -> String {
        let mut answer = String::new();
        answer.push_str("v=0\r\n");
        answer.push_str("o=- 0 0 IN IP4 0.0.0.0\r\n");
        answer.push_str("s=-\r\n");
        answer.push_str("t=0 0\r\n");

        for line in offer.lines() {
            if let Some(media) = line.strip_prefix("m=") {
                let mut fields = media.split(' ');
                let kind = fields.next().unwrap_or_default();
                let _port = fields.next();
                let rest = fields.collect::<Vec<_>>().join(" ");
                answer.push_str(&format!("m={} 0 {}\r\n", kind, rest));
            } else if let Some(mid) = line.strip_prefix("a=mid:") {
                answer.push_str(&format!("a=mid:{}\r\n", mid));
            }
        }

        answer
    }

    fn ensure_open(&self) -> Result<(), PeerError> {
        if self.closed {
            Err(PeerError("peer is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for ProbePeer {
    fn default() -> Self {
        Self::new()
    }
}

impl Peer for ProbePeer {
    fn on_ice_candidate(&mut self, callback: IceCandidateCallback) {
        self.on_ice_candidate = Some(callback);
    }

    fn on_eos(&mut self, _callback: EosCallback) {}

    fn set_remote_sdp<'a>(&'a mut self, sdp: &'a str) -> BoxFuture<'a, Result<(), PeerError>> {
        async move {
            self.ensure_open()?;
            tracing::debug!(bytes = sdp.len(), "remote offer received");
            self.remote_sdp = Some(sdp.to_string());
            Ok(())
        }
        .boxed()
    }

    fn local_sdp(&mut self) -> BoxFuture<'_, Result<String, PeerError>> {
        async move {
            self.ensure_open()?;
            let offer = self
                .remote_sdp
                .as_ref()
                .ok_or_else(|| PeerError("no remote description".to_string()))?;
            let answer = Self::answer_from_offer(offer);

            // Nothing is gathered, so gathering is already complete.
            if let Some(callback) = self.on_ice_candidate.as_mut() {
                callback(0, END_OF_CANDIDATES.to_string());
            }

            Ok(answer)
        }
        .boxed()
    }

    fn add_ice_candidate<'a>(
        &'a mut self,
        m_line_index: MLineIndex,
        candidate: &'a str,
    ) -> BoxFuture<'a, Result<(), PeerError>> {
        async move {
            self.ensure_open()?;
            tracing::debug!(m_line_index, candidate, "remote candidate (ignored by probe)");
            Ok(())
        }
        .boxed()
    }

    fn close(&mut self) {
        self.closed = true;
        self.on_ice_candidate = None;
    }
}

#[cfg(test)]
mod tests {
    use super::ProbePeer;

    #[test]
    fn answer_declines_every_media_line() {
        let offer = "v=0\r\n\
                     o=- 1 1 IN IP4 10.0.0.1\r\n\
                     s=live\r\n\
                     m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
                     a=mid:0\r\n\
                     m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
                     a=mid:1\r\n";

        let answer = ProbePeer::answer_from_offer(offer);
        assert!(answer.starts_with("v=0\r\n"));
        assert!(answer.contains("m=video 0 UDP/TLS/RTP/SAVPF 96\r\n"));
        assert!(answer.contains("m=audio 0 UDP/TLS/RTP/SAVPF 111\r\n"));
        assert!(answer.contains("a=mid:0\r\n"));
        assert!(answer.contains("a=mid:1\r\n"));
    }
}
