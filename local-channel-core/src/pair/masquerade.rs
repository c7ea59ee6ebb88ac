//! Splicing a pair out of an established call.
//!
//! When the chan-side is bridged to a third channel, the owner-side can take
//! that channel's place in the outer call and both Local endpoints drop out.
//! Only media written by the chan-side triggers the check.

use crate::models::state::{Phase, Side};
use crate::pair::private::{LocalPvt, PvtInner};
use crate::traits::channel_host::ChannelHost;

impl<H: ChannelHost> LocalPvt<H> {
    /// Request a masquerade of the owner-side into the chan-side's bridge.
    ///
    /// `third` is the writer's direct bridge peer as resolved by
    /// [`direct_bridge`] before the record lock was taken. Called with the
    /// record lock held and the chan-side's channel lock held by the host.
    /// Every lock taken here is a trylock; any contention simply skips the
    /// attempt until the next frame. Returns the owner-side when a masquerade
    /// was registered, so the caller can complete it once the record lock is
    /// released.
    pub(crate) fn try_optimize(
        &self,
        host: &H,
        inner: &mut PvtInner<H::Channel>,
        from: Side,
        third: Option<H::Channel>,
    ) -> Option<H::Channel> {
        if from != Side::Chan || self.options().no_optimization || inner.phase.is_masqueraded() {
            return None;
        }
        let third = third?;
        let (owner, chan) = match (inner.owner.clone(), inner.chan.clone()) {
            (Some(owner), Some(chan)) => (owner, chan),
            _ => return None,
        };
        // The bridge may have moved since it was resolved.
        if host.bridge(&chan).as_ref() != Some(&third) {
            return None;
        }
        if !host.read_queue_empty(&owner) {
            return None;
        }
        if !host.try_lock(&third) {
            return None;
        }

        let mut survivor = None;
        if !host.check_hangup(&third) && host.try_lock(&owner) {
            if !host.check_hangup(&owner) {
                if host.has_monitor(&owner) && !host.has_monitor(&third) {
                    host.swap_monitors(&owner, &third);
                }
                if host.has_audiohooks(&chan) {
                    host.swap_audiohooks(&chan, &owner);
                }
                host.update_groups(&chan, &owner);

                let requested = host.masquerade(&owner, &third);
                inner.phase = Phase::Optimized;
                match requested {
                    Ok(()) => {
                        log::debug!(
                            "optimizing {} out of the call with {}",
                            self.destination(),
                            host.name(&third)
                        );
                        survivor = Some(owner.clone());
                    }
                    Err(e) => log::error!(
                        "masquerade of {} into {} failed: {}",
                        host.name(&owner),
                        host.name(&third),
                        e
                    ),
                }
            }
            host.unlock(&owner);
        }
        host.unlock(&third);
        survivor
    }
}

/// The channel `chan` is directly bridged to, if any.
///
/// A bridge that resolves through another technology is not a direct one.
/// Must run without the record lock: resolving the bridged channel may take
/// the record lock of another pair.
pub(crate) fn direct_bridge<H: ChannelHost>(host: &H, chan: &H::Channel) -> Option<H::Channel> {
    let third = host.bridge(chan)?;
    if host.bridged_channel(chan).as_ref() == Some(&third) {
        Some(third)
    } else {
        None
    }
}

/// Carry out a masquerade registered by [`LocalPvt::try_optimize`].
///
/// Must run without the record lock: completing the masquerade calls back
/// into the technology's fixup.
pub(crate) fn complete<H: ChannelHost>(host: &H, survivor: &H::Channel) {
    if host.try_lock(survivor) {
        host.complete_masquerade(survivor);
        host.unlock(survivor);
    } else {
        log::debug!(
            "{} busy, leaving masquerade to its next service",
            host.name(survivor)
        );
    }
}
