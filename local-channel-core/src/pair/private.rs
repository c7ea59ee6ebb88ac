use std::thread;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::config::JitterBufferConfig;
use crate::models::destination::{Destination, LocalOptions};
use crate::models::format::FormatMask;
use crate::models::state::{Glare, Phase, Side};
use crate::pair::module_use::ModuleRef;
use crate::registry::Registry;
use crate::traits::channel_host::ChannelHost;

/// Held record lock. Passed by value through operations that may destroy the record.
pub type PvtGuard<'a, C> = MutexGuard<'a, PvtInner<C>>;

/// Mutable state of a pair, guarded by the record lock.
#[derive(Debug)]
pub struct PvtInner<C> {
    pub(crate) owner: Option<C>,
    pub(crate) chan: Option<C>,
    pub(crate) owner_use: Option<ModuleRef>,
    pub(crate) chan_use: Option<ModuleRef>,
    pub(crate) phase: Phase,
    pub(crate) glare: Glare,
    pub(crate) destroyed: bool,
}

impl<C: PartialEq> PvtInner<C> {
    fn new() -> Self {
        Self {
            owner: None,
            chan: None,
            owner_use: None,
            chan_use: None,
            phase: Phase::Fresh,
            glare: Glare::None,
            destroyed: false,
        }
    }

    pub fn endpoint(&self, side: Side) -> Option<&C> {
        match side {
            Side::Owner => self.owner.as_ref(),
            Side::Chan => self.chan.as_ref(),
        }
    }

    /// Which side `chan` is, if it still belongs to this pair.
    pub fn side_of(&self, chan: &C) -> Option<Side> {
        if self.chan.as_ref() == Some(chan) {
            Some(Side::Chan)
        } else if self.owner.as_ref() == Some(chan) {
            Some(Side::Owner)
        } else {
            None
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn glare(&self) -> Glare {
        self.glare
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn is_vacant(&self) -> bool {
        self.owner.is_none() && self.chan.is_none()
    }
}

/// Private record shared by the two endpoints of a Local pair.
pub struct LocalPvt<H: ChannelHost> {
    id: Uuid,
    destination: Destination,
    requested: FormatMask,
    jitterbuffer: JitterBufferConfig,
    created_at: DateTime<Utc>,
    pub(crate) inner: Mutex<PvtInner<H::Channel>>,
}

impl<H: ChannelHost> LocalPvt<H> {
    pub(crate) fn new(destination: Destination, requested: FormatMask, jitterbuffer: JitterBufferConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination,
            requested,
            jitterbuffer,
            created_at: Utc::now(),
            inner: Mutex::new(PvtInner::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn options(&self) -> LocalOptions {
        self.destination.options
    }

    pub fn requested_format(&self) -> FormatMask {
        self.requested
    }

    pub fn jitterbuffer(&self) -> &JitterBufferConfig {
        &self.jitterbuffer
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Take the record lock.
    pub fn lock(&self) -> PvtGuard<'_, H::Channel> {
        self.inner.lock()
    }

    pub fn owner(&self) -> Option<H::Channel> {
        self.inner.lock().owner.clone()
    }

    pub fn chan(&self) -> Option<H::Channel> {
        self.inner.lock().chan.clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    pub fn glare(&self) -> Glare {
        self.inner.lock().glare
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }

    /// Lock the endpoint on `side` without deadlocking against its holder.
    ///
    /// Trylocks the endpoint; on failure drops the record lock, backs off and
    /// retakes it, then re-reads the endpoint since a teardown may have
    /// replaced or cleared it. Returns the endpoint locked, or `None` once it
    /// is gone. The record lock is held again on return.
    pub(crate) fn acquire_endpoint<'a>(
        &'a self,
        host: &H,
        mut inner: PvtGuard<'a, H::Channel>,
        side: Side,
        source: Option<&H::Channel>,
    ) -> (PvtGuard<'a, H::Channel>, Option<H::Channel>) {
        loop {
            let peer = match inner.endpoint(side) {
                Some(peer) => peer.clone(),
                None => return (inner, None),
            };
            if host.try_lock(&peer) {
                return (inner, Some(peer));
            }
            drop(inner);
            inner = self.back_off(host, source);
        }
    }

    /// Retake the record lock after losing a trylock race.
    ///
    /// With a locked source endpoint, the source is cycled through the host's
    /// deadlock-avoidance primitive until the record lock can be tried
    /// successfully; otherwise the thread yields and blocks on the record.
    fn back_off(&self, host: &H, source: Option<&H::Channel>) -> PvtGuard<'_, H::Channel> {
        match source {
            Some(us) => loop {
                host.deadlock_avoidance(us);
                if let Some(inner) = self.inner.try_lock() {
                    return inner;
                }
            },
            None => {
                thread::yield_now();
                self.inner.lock()
            }
        }
    }

    /// Final release of the pair's resources. Must run exactly once, after unlink.
    pub(crate) fn destroy(&self, registry: &Registry<H>, inner: &mut PvtInner<H::Channel>) {
        if inner.destroyed {
            log::error!("local pair {} ({}) destroyed twice", self.id, self.destination);
            return;
        }
        inner.destroyed = true;
        inner.owner = None;
        inner.chan = None;
        inner.owner_use = None;
        inner.chan_use = None;
        registry.note_destroyed();
        log::info!("destroyed local pair {} ({})", self.id, self.destination);
    }
}
