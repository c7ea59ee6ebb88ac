use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, MutexGuard};

use local_channel_core::{
    CallProfile, CallerId, ChannelFormats, ChannelState, Frame, JitterBufferConfig,
    SoftHangupCause, TechPvt,
};

/// Recursive per-channel lock, as the PBX core's channel mutex behaves.
///
/// Unlike a plain mutex it can be released on behalf of the current holder
/// from anywhere, which the Local technology relies on for deadlock avoidance.
#[derive(Default)]
pub(crate) struct ChannelLock {
    holder: Mutex<Holder>,
    released: Condvar,
}

#[derive(Default)]
struct Holder {
    thread: Option<ThreadId>,
    depth: usize,
}

impl ChannelLock {
    pub(crate) fn lock(&self) {
        let me = thread::current().id();
        let mut holder = self.holder.lock();
        while holder.thread.is_some_and(|t| t != me) {
            self.released.wait(&mut holder);
        }
        holder.thread = Some(me);
        holder.depth += 1;
    }

    pub(crate) fn try_lock(&self) -> bool {
        let me = thread::current().id();
        let mut holder = self.holder.lock();
        match holder.thread {
            Some(t) if t != me => false,
            _ => {
                holder.thread = Some(me);
                holder.depth += 1;
                true
            }
        }
    }

    pub(crate) fn unlock(&self) {
        let me = thread::current().id();
        let mut holder = self.holder.lock();
        if holder.thread != Some(me) {
            log::error!("channel unlocked by a thread that does not hold it");
            return;
        }
        holder.depth -= 1;
        if holder.depth == 0 {
            holder.thread = None;
            self.released.notify_all();
        }
    }

    /// Fully release the lock if this thread holds it, yield, and take it
    /// back at the same depth.
    pub(crate) fn cycle(&self) {
        let me = thread::current().id();
        let depth = {
            let mut holder = self.holder.lock();
            if holder.thread != Some(me) {
                drop(holder);
                thread::yield_now();
                return;
            }
            let depth = holder.depth;
            holder.thread = None;
            holder.depth = 0;
            self.released.notify_all();
            depth
        };
        thread::yield_now();
        let mut holder = self.holder.lock();
        while holder.thread.is_some() {
            self.released.wait(&mut holder);
        }
        holder.thread = Some(me);
        holder.depth = depth;
    }

    pub(crate) fn held_by_current(&self) -> bool {
        self.holder.lock().thread == Some(thread::current().id())
    }
}

/// Mutable fields of an in-memory channel.
pub(crate) struct ChannelData {
    pub(crate) name: String,
    pub(crate) tech_type: &'static str,
    pub(crate) state: ChannelState,
    pub(crate) formats: ChannelFormats,
    pub(crate) context: String,
    pub(crate) exten: String,
    pub(crate) priority: u32,
    pub(crate) tech_pvt: Option<TechPvt>,
    pub(crate) frames: VecDeque<Frame>,
    pub(crate) written: Vec<Frame>,
    pub(crate) generator: bool,
    pub(crate) caller: CallerId,
    pub(crate) profile: CallProfile,
    pub(crate) answered_elsewhere: bool,
    pub(crate) vars: Vec<(String, String)>,
    pub(crate) datastores: Vec<String>,
    pub(crate) groups: Vec<String>,
    pub(crate) moh_playing: bool,
    pub(crate) moh_class: Option<String>,
    pub(crate) bridge: Option<ChannelRef>,
    pub(crate) monitor: Option<String>,
    pub(crate) audiohooks: Vec<String>,
    pub(crate) pending_masq: Option<ChannelRef>,
    pub(crate) soft_hangup: Option<SoftHangupCause>,
    pub(crate) hangup_cause: u32,
    pub(crate) hungup: bool,
    pub(crate) zombie: bool,
    pub(crate) jitterbuffer: Option<JitterBufferConfig>,
    pub(crate) dialplan_started: bool,
}

impl ChannelData {
    fn new(name: String, tech_type: &'static str) -> Self {
        Self {
            name,
            tech_type,
            state: ChannelState::Down,
            formats: ChannelFormats::default(),
            context: String::new(),
            exten: String::new(),
            priority: 0,
            tech_pvt: None,
            frames: VecDeque::new(),
            written: Vec::new(),
            generator: false,
            caller: CallerId::default(),
            profile: CallProfile::default(),
            answered_elsewhere: false,
            vars: Vec::new(),
            datastores: Vec::new(),
            groups: Vec::new(),
            moh_playing: false,
            moh_class: None,
            bridge: None,
            monitor: None,
            audiohooks: Vec::new(),
            pending_masq: None,
            soft_hangup: None,
            hangup_cause: 0,
            hungup: false,
            zombie: false,
            jitterbuffer: None,
            dialplan_started: false,
        }
    }
}

pub struct MemoryChannel {
    id: u64,
    pub(crate) lock: ChannelLock,
    data: Mutex<ChannelData>,
}

/// Handle to an in-memory channel. Equality is identity.
#[derive(Clone)]
pub struct ChannelRef(Arc<MemoryChannel>);

impl ChannelRef {
    pub(crate) fn new(id: u64, name: String, tech_type: &'static str) -> Self {
        Self(Arc::new(MemoryChannel {
            id,
            lock: ChannelLock::default(),
            data: Mutex::new(ChannelData::new(name, tech_type)),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Short-lived access to the channel's fields. Never held across a call
    /// into a technology or while another channel's data is locked.
    pub(crate) fn data(&self) -> MutexGuard<'_, ChannelData> {
        self.0.data.lock()
    }

    pub(crate) fn lock(&self) -> &ChannelLock {
        &self.0.lock
    }
}

impl PartialEq for ChannelRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ChannelRef {}

impl fmt::Debug for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelRef({}, {})", self.0.id, self.data().name)
    }
}
