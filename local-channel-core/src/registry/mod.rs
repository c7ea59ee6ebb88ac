//! Process-local list of live pairs.
//!
//! The registry lock is a leaf: it is never held while a record or endpoint
//! lock is taken. Lookups that need record state snapshot the list first.

pub mod diagnostics;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::pair::private::LocalPvt;
use crate::traits::channel_host::ChannelHost;

/// Lifetime counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub registered: u64,
    pub unlinked: u64,
    pub destroyed: u64,
}

pub struct Registry<H: ChannelHost> {
    pairs: Mutex<Vec<Arc<LocalPvt<H>>>>,
    registered: AtomicU64,
    unlinked: AtomicU64,
    destroyed: AtomicU64,
}

impl<H: ChannelHost> Registry<H> {
    pub fn new() -> Self {
        Self {
            pairs: Mutex::new(Vec::new()),
            registered: AtomicU64::new(0),
            unlinked: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
        }
    }

    /// Add a pair. Returns `false` if it was already registered.
    pub(crate) fn register(&self, pvt: Arc<LocalPvt<H>>) -> bool {
        let mut pairs = self.pairs.lock();
        if pairs.iter().any(|p| p.id() == pvt.id()) {
            return false;
        }
        pairs.push(pvt);
        self.registered.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Remove a pair. Returns `false` if it was not registered.
    pub(crate) fn unlink(&self, id: Uuid) -> bool {
        let mut pairs = self.pairs.lock();
        let before = pairs.len();
        pairs.retain(|p| p.id() != id);
        let removed = pairs.len() != before;
        if removed {
            self.unlinked.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    pub(crate) fn note_destroyed(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.pairs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.lock().is_empty()
    }

    /// How many entries carry `id`. Anything but 0 or 1 is a bug.
    pub fn occurrences(&self, id: Uuid) -> usize {
        self.pairs.lock().iter().filter(|p| p.id() == id).count()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.occurrences(id) > 0
    }

    /// Copy of the current list; the registry lock is released on return.
    pub fn snapshot(&self) -> Vec<Arc<LocalPvt<H>>> {
        self.pairs.lock().clone()
    }

    /// Whether any registered pair for `exten@context` still has its owner-side.
    pub fn owner_active(&self, exten: &str, context: &str) -> bool {
        self.snapshot().iter().any(|pvt| {
            let dest = pvt.destination();
            dest.exten == exten && dest.context == context && pvt.owner().is_some()
        })
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            registered: self.registered.load(Ordering::SeqCst),
            unlinked: self.unlinked.load(Ordering::SeqCst),
            destroyed: self.destroyed.load(Ordering::SeqCst),
        }
    }
}

impl<H: ChannelHost> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}
