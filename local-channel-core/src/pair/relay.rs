use crate::models::frame::{ControlKind, Frame};
use crate::models::state::{ChannelState, GlareExit, Side};
use crate::pair::private::{LocalPvt, PvtGuard};
use crate::registry::Registry;
use crate::traits::channel_host::ChannelHost;

/// Variable copied from the relaying endpoint onto its peer with every frame.
pub const BUSY_PEER_VAR: &str = "Busy-Peer";

/// Result of relaying one frame across a pair.
#[must_use]
pub enum RelayOutcome<'a, C> {
    /// The record is still live and its lock is handed back.
    Relayed(PvtGuard<'a, C>),
    /// Teardown cancelled the queue while the relay was in flight. The record
    /// is gone and must not be touched again.
    RecordDestroyed,
}

impl<'a, C> RelayOutcome<'a, C> {
    pub fn into_guard(self) -> Option<PvtGuard<'a, C>> {
        match self {
            Self::Relayed(guard) => Some(guard),
            Self::RecordDestroyed => None,
        }
    }
}

impl<H: ChannelHost> LocalPvt<H> {
    /// Queue `frame` from the endpoint on `from` onto its peer.
    ///
    /// Called with the record lock held. `source` is the endpoint the frame
    /// came from, if known; `source_locked` says the caller holds its channel
    /// lock, which the peer-lock back-off then cycles instead of sleeping.
    ///
    /// Frames are dropped silently when the peer is gone, when the pair has
    /// been masqueraded, or when generators feed both endpoints.
    pub fn relay<'a>(
        &'a self,
        host: &H,
        registry: &Registry<H>,
        mut inner: PvtGuard<'a, H::Channel>,
        from: Side,
        frame: Frame,
        source: Option<&H::Channel>,
        source_locked: bool,
    ) -> RelayOutcome<'a, H::Channel> {
        let other = match inner.endpoint(from.peer()) {
            Some(other) => other.clone(),
            None => return RelayOutcome::Relayed(inner),
        };

        if inner.phase.is_masqueraded() {
            log::debug!(
                "not relaying {} frame through masqueraded pair {}",
                frame.kind_name(),
                self.destination()
            );
            return RelayOutcome::Relayed(inner);
        }

        if let Some(us) = source {
            if host.has_generator(us) && host.has_generator(&other) {
                return RelayOutcome::Relayed(inner);
            }
        }

        inner.glare.enter();

        let backoff = if source_locked { source } else { None };
        let (mut inner, peer) = self.acquire_endpoint(host, inner, from.peer(), backoff);

        if inner.glare.is_cancelled() {
            // Both endpoints hung up while we were backing off.
            if inner.glare.leave() == GlareExit::Destroy {
                self.destroy(registry, &mut inner);
            }
            drop(inner);
            if let Some(peer) = peer {
                host.unlock(&peer);
            }
            return RelayOutcome::RecordDestroyed;
        }

        if let Some(peer) = peer {
            if inner.phase.is_masqueraded() {
                log::debug!("pair {} masqueraded during relay, dropping frame", self.destination());
            } else {
                if let Some(busy) = source.and_then(|us| host.get_var(us, BUSY_PEER_VAR)) {
                    host.set_var(&peer, BUSY_PEER_VAR, &busy);
                }
                if frame.is_control(ControlKind::Ringing) {
                    host.set_state(&peer, ChannelState::Ringing);
                }
                host.queue_frame(&peer, frame);
            }
            host.unlock(&peer);
        }

        inner.glare.leave();
        RelayOutcome::Relayed(inner)
    }
}
