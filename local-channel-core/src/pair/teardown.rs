use serde::Serialize;

use crate::models::frame::{ControlKind, Frame};
use crate::models::error::LocalError;
use crate::models::state::Side;
use crate::pair::private::LocalPvt;
use crate::pair::relay::RelayOutcome;
use crate::registry::Registry;
use crate::traits::channel_host::ChannelHost;

/// Variable the owner-side receives with the chan-side's final dial status.
pub const CHANLOCALSTATUS_VAR: &str = "CHANLOCALSTATUS";

const DIALSTATUS_VAR: &str = "DIALSTATUS";

/// What became of the record after one endpoint hung up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownOutcome {
    /// The other endpoint is still attached.
    Detached,
    /// Both endpoints are gone; an in-flight relay will destroy the record.
    Deferred,
    /// The record was destroyed.
    Destroyed,
}

impl<H: ChannelHost> LocalPvt<H> {
    /// Detach `ast` from the pair and tell the other side.
    pub(crate) fn teardown(
        &self,
        host: &H,
        registry: &Registry<H>,
        ast: &H::Channel,
    ) -> Result<TeardownOutcome, LocalError> {
        let mut inner = self.lock();
        let side = inner
            .side_of(ast)
            .ok_or_else(|| LocalError::NotLocal(host.name(ast)))?;

        if side == Side::Owner && host.answered_elsewhere(ast) {
            if let Some(chan) = inner.chan.as_ref() {
                host.set_answered_elsewhere(chan);
            }
        }

        match side {
            Side::Chan => {
                if let Some(status) = host.get_var(ast, DIALSTATUS_VAR) {
                    let (guard, owner) = self.acquire_endpoint(host, inner, Side::Owner, Some(ast));
                    inner = guard;
                    if let Some(owner) = owner {
                        host.set_var(&owner, CHANLOCALSTATUS_VAR, &status);
                        host.unlock(&owner);
                    }
                }
                inner.chan = None;
                inner.chan_use = None;
                inner.phase = inner.phase.chan_departed();
            }
            Side::Owner => {
                let (guard, chan) = self.acquire_endpoint(host, inner, Side::Chan, Some(ast));
                inner = guard;
                inner.owner = None;
                inner.owner_use = None;
                if let Some(chan) = chan {
                    host.queue_frame(&chan, Frame::control(ControlKind::Hangup));
                    host.unlock(&chan);
                }
            }
        }
        host.set_tech_pvt(ast, None);
        log::debug!("{} left local pair {}", host.name(ast), self.destination());

        if inner.is_vacant() {
            registry.unlink(self.id());
            if inner.glare.cancel() {
                log::debug!(
                    "relay in flight on {}, handing destruction over",
                    self.destination()
                );
                return Ok(TeardownOutcome::Deferred);
            }
            self.destroy(registry, &mut inner);
            return Ok(TeardownOutcome::Destroyed);
        }

        if let Some(chan) = inner.chan.clone() {
            if !inner.phase.dialplan_launched() {
                // Nothing will ever service the chan-side; hang it up ourselves.
                drop(inner);
                host.hangup(&chan);
                return Ok(TeardownOutcome::Detached);
            }
        }

        let hangup = Frame::hangup(host.hangup_cause(ast));
        match self.relay(host, registry, inner, side, hangup, None, false) {
            RelayOutcome::Relayed(_) => Ok(TeardownOutcome::Detached),
            RelayOutcome::RecordDestroyed => Ok(TeardownOutcome::Destroyed),
        }
    }
}
