use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts live endpoints so the technology is not unloaded under them.
#[derive(Debug, Clone, Default)]
pub struct ModuleUse {
    users: Arc<AtomicUsize>,
}

impl ModuleUse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a token; the count drops again when the token is dropped.
    pub fn acquire(&self) -> ModuleRef {
        self.users.fetch_add(1, Ordering::SeqCst);
        ModuleRef {
            users: Arc::clone(&self.users),
        }
    }

    pub fn in_use(&self) -> usize {
        self.users.load(Ordering::SeqCst)
    }
}

/// One endpoint's hold on the module.
#[derive(Debug)]
pub struct ModuleRef {
    users: Arc<AtomicUsize>,
}

impl Drop for ModuleRef {
    fn drop(&mut self) {
        self.users.fetch_sub(1, Ordering::SeqCst);
    }
}
