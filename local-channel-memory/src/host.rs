use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use local_channel_core::{
    CallProfile, CallerId, ChannelFormats, ChannelHost, ChannelRequest, ChannelState, ChannelTech,
    ControlKind, FormatMask, Frame, HostError, JitterBufferConfig, LocalConfig, LocalError,
    LocalTech, SoftHangupCause, TechPvt,
};

use crate::channel::ChannelRef;

/// Technology name given to plain channels created with [`MemoryHost::new_channel`].
pub const TEST_TYPE: &str = "Test";

type Tech = Arc<dyn ChannelTech<ChannelRef>>;

/// In-process PBX core.
///
/// Keeps channels in memory, dispatches channel operations to registered
/// technologies with the channel locked, and records everything a technology
/// does to a channel so tests can inspect it.
pub struct MemoryHost {
    techs: Mutex<HashMap<&'static str, Tech>>,
    channels: Mutex<Vec<ChannelRef>>,
    extensions: Mutex<HashSet<(String, String)>>,
    next_id: AtomicU64,
    alloc_budget: Mutex<Option<usize>>,
    released: AtomicU64,
    fail_dialplan: AtomicBool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            techs: Mutex::new(HashMap::new()),
            channels: Mutex::new(Vec::new()),
            extensions: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
            alloc_budget: Mutex::new(None),
            released: AtomicU64::new(0),
            fail_dialplan: AtomicBool::new(false),
        }
    }

    /// A host with the Local technology registered under its type name.
    pub fn with_local(config: LocalConfig) -> Result<(Arc<Self>, Arc<LocalTech<Self>>), LocalError> {
        let host = Arc::new(Self::new());
        let local = Arc::new(LocalTech::new(Arc::clone(&host), config)?);
        host.register_tech(local.clone());
        Ok((host, local))
    }

    pub fn register_tech(&self, tech: Tech) {
        log::info!("registered channel technology {}", tech.type_name());
        self.techs.lock().insert(tech.type_name(), tech);
    }

    /// Drop the host's handle on a technology.
    ///
    /// A technology that holds the host, as [`LocalTech`] does, keeps both
    /// alive until it is unregistered.
    pub fn unregister_tech(&self, tech_type: &str) -> Option<Tech> {
        let tech = self.techs.lock().remove(tech_type)?;
        log::info!("unregistered channel technology {}", tech_type);
        Some(tech)
    }

    fn tech_of(&self, chan: &ChannelRef) -> Option<Tech> {
        let tech_type = chan.data().tech_type;
        self.techs.lock().get(tech_type).cloned()
    }

    fn with_tech<T>(
        &self,
        chan: &ChannelRef,
        op: impl FnOnce(&Tech) -> Result<T, LocalError>,
    ) -> Result<T, LocalError> {
        let tech = self
            .tech_of(chan)
            .ok_or_else(|| LocalError::NotLocal(self.name(chan)))?;
        self.lock(chan);
        let result = op(&tech);
        self.unlock(chan);
        result
    }

    // -- Dispatch, the way the PBX core drives a technology --

    pub fn request(&self, tech_type: &str, data: &str, format: FormatMask) -> Result<ChannelRef, LocalError> {
        let tech = self
            .techs
            .lock()
            .get(tech_type)
            .cloned()
            .ok_or_else(|| LocalError::from(HostError::Other(format!("no technology {}", tech_type))))?;
        tech.request(data, format)
    }

    pub fn device_state(&self, tech_type: &str, data: &str) -> Option<local_channel_core::DeviceState> {
        let tech = self.techs.lock().get(tech_type).cloned()?;
        Some(tech.devicestate(data))
    }

    pub fn place_call(&self, chan: &ChannelRef, dest: &str, timeout: Option<Duration>) -> Result<(), LocalError> {
        self.with_tech(chan, |tech| tech.call(chan, dest, timeout))
    }

    /// Write a frame out of `chan`. Channels without a technology just log it.
    pub fn write_frame(&self, chan: &ChannelRef, frame: Frame) -> Result<(), LocalError> {
        if chan.data().zombie {
            return Ok(());
        }
        match self.tech_of(chan) {
            Some(_) => self.with_tech(chan, |tech| tech.write(chan, frame)),
            None => {
                chan.data().written.push(frame);
                Ok(())
            }
        }
    }

    pub fn indicate_condition(&self, chan: &ChannelRef, condition: ControlKind, data: &[u8]) -> Result<(), LocalError> {
        self.with_tech(chan, |tech| tech.indicate(chan, condition, data))
    }

    pub fn answer_channel(&self, chan: &ChannelRef) -> Result<(), LocalError> {
        self.with_tech(chan, |tech| tech.answer(chan))?;
        self.set_state(chan, ChannelState::Up);
        Ok(())
    }

    pub fn send_dtmf_begin(&self, chan: &ChannelRef, digit: char) -> Result<(), LocalError> {
        self.with_tech(chan, |tech| tech.send_digit_begin(chan, digit))
    }

    pub fn send_dtmf_end(&self, chan: &ChannelRef, digit: char, duration_ms: u32) -> Result<(), LocalError> {
        self.with_tech(chan, |tech| tech.send_digit_end(chan, digit, duration_ms))
    }

    pub fn send_text_message(&self, chan: &ChannelRef, text: &str) -> Result<(), LocalError> {
        self.with_tech(chan, |tech| tech.send_text(chan, text))
    }

    pub fn send_html_frame(&self, chan: &ChannelRef, subclass: i32, data: &[u8]) -> Result<(), LocalError> {
        self.with_tech(chan, |tech| tech.send_html(chan, subclass, data))
    }

    /// Hang `chan` up, running its technology's hangup with the channel locked.
    pub fn hangup_channel(&self, chan: &ChannelRef) -> Result<(), LocalError> {
        let already = mem::replace(&mut chan.data().hungup, true);
        if already {
            return Ok(());
        }
        let result = match self.tech_of(chan) {
            Some(_) => self.with_tech(chan, |tech| tech.hangup(chan)),
            None => Ok(()),
        };
        self.channels.lock().retain(|c| c != chan);
        result
    }

    // -- Test setup --

    pub fn add_extension(&self, context: &str, exten: &str) {
        self.extensions.lock().insert((context.to_string(), exten.to_string()));
    }

    /// A plain channel with no technology behind it.
    pub fn new_channel(&self, name: &str) -> ChannelRef {
        let chan = ChannelRef::new(self.next_id.fetch_add(1, Ordering::SeqCst), name.to_string(), TEST_TYPE);
        self.channels.lock().push(chan.clone());
        chan
    }

    /// Allow `n` more allocations, then refuse.
    pub fn refuse_allocations_after(&self, n: usize) {
        *self.alloc_budget.lock() = Some(n);
    }

    pub fn fail_dialplan(&self, fail: bool) {
        self.fail_dialplan.store(fail, Ordering::SeqCst);
    }

    /// Bridge `a` and `b` to each other.
    pub fn set_bridge(&self, a: &ChannelRef, b: &ChannelRef) {
        a.data().bridge = Some(b.clone());
        b.data().bridge = Some(a.clone());
    }

    pub fn set_generator(&self, chan: &ChannelRef, active: bool) {
        chan.data().generator = active;
    }

    pub fn set_monitor(&self, chan: &ChannelRef, monitor: &str) {
        chan.data().monitor = Some(monitor.to_string());
    }

    pub fn add_audiohook(&self, chan: &ChannelRef, hook: &str) {
        chan.data().audiohooks.push(hook.to_string());
    }

    pub fn add_datastore(&self, chan: &ChannelRef, store: &str) {
        chan.data().datastores.push(store.to_string());
    }

    pub fn add_group(&self, chan: &ChannelRef, group: &str) {
        chan.data().groups.push(group.to_string());
    }

    pub fn set_hangup_cause(&self, chan: &ChannelRef, cause: u32) {
        chan.data().hangup_cause = cause;
    }

    // -- Inspection --

    pub fn drain_frames(&self, chan: &ChannelRef) -> Vec<Frame> {
        chan.data().frames.drain(..).collect()
    }

    pub fn written(&self, chan: &ChannelRef) -> Vec<Frame> {
        chan.data().written.clone()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    pub fn find_channel(&self, name: &str) -> Option<ChannelRef> {
        self.channels.lock().iter().find(|c| c.data().name == name).cloned()
    }

    pub fn formats(&self, chan: &ChannelRef) -> ChannelFormats {
        chan.data().formats
    }

    /// `(context, exten, priority)`.
    pub fn dialplan_location(&self, chan: &ChannelRef) -> (String, String, u32) {
        let data = chan.data();
        (data.context.clone(), data.exten.clone(), data.priority)
    }

    pub fn jitterbuffer(&self, chan: &ChannelRef) -> Option<JitterBufferConfig> {
        chan.data().jitterbuffer.clone()
    }

    pub fn dialplan_started(&self, chan: &ChannelRef) -> bool {
        chan.data().dialplan_started
    }

    pub fn moh_playing(&self, chan: &ChannelRef) -> bool {
        chan.data().moh_playing
    }

    pub fn moh_class(&self, chan: &ChannelRef) -> Option<String> {
        chan.data().moh_class.clone()
    }

    pub fn soft_hangup_cause(&self, chan: &ChannelRef) -> Option<SoftHangupCause> {
        chan.data().soft_hangup
    }

    pub fn is_hungup(&self, chan: &ChannelRef) -> bool {
        chan.data().hungup
    }

    pub fn is_zombie(&self, chan: &ChannelRef) -> bool {
        chan.data().zombie
    }

    pub fn monitor(&self, chan: &ChannelRef) -> Option<String> {
        chan.data().monitor.clone()
    }

    pub fn audiohooks(&self, chan: &ChannelRef) -> Vec<String> {
        chan.data().audiohooks.clone()
    }

    pub fn datastores(&self, chan: &ChannelRef) -> Vec<String> {
        chan.data().datastores.clone()
    }

    pub fn groups(&self, chan: &ChannelRef) -> Vec<String> {
        chan.data().groups.clone()
    }

    pub fn pending_masquerade(&self, chan: &ChannelRef) -> Option<ChannelRef> {
        chan.data().pending_masq.clone()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHost for MemoryHost {
    type Channel = ChannelRef;

    fn alloc_channel(&self, request: &ChannelRequest) -> Result<ChannelRef, HostError> {
        {
            let mut budget = self.alloc_budget.lock();
            match budget.as_mut() {
                Some(0) => return Err(HostError::Refused("channel limit reached".into())),
                Some(n) => *n -= 1,
                None => {}
            }
        }
        let chan = ChannelRef::new(
            self.next_id.fetch_add(1, Ordering::SeqCst),
            request.name.clone(),
            request.tech_type,
        );
        {
            let mut data = chan.data();
            data.state = request.state;
            data.exten = request.exten.clone();
            data.context = request.context.clone();
            data.profile.accountcode = request.accountcode.clone();
        }
        self.channels.lock().push(chan.clone());
        log::debug!("allocated {}", request.name);
        Ok(chan)
    }

    fn release_channel(&self, chan: &ChannelRef) {
        self.channels.lock().retain(|c| c != chan);
        chan.data().tech_pvt = None;
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self, chan: &ChannelRef) -> String {
        chan.data().name.clone()
    }

    fn state(&self, chan: &ChannelRef) -> ChannelState {
        chan.data().state
    }

    fn set_state(&self, chan: &ChannelRef, state: ChannelState) {
        chan.data().state = state;
    }

    fn soft_hangup(&self, chan: &ChannelRef, cause: SoftHangupCause) {
        chan.data().soft_hangup = Some(cause);
    }

    fn check_hangup(&self, chan: &ChannelRef) -> bool {
        let data = chan.data();
        data.soft_hangup.is_some() || data.hungup || data.zombie
    }

    fn hangup(&self, chan: &ChannelRef) {
        if let Err(e) = self.hangup_channel(chan) {
            log::warn!("hangup of {} failed: {}", self.name(chan), e);
        }
    }

    fn hangup_cause(&self, chan: &ChannelRef) -> u32 {
        chan.data().hangup_cause
    }

    fn set_formats(&self, chan: &ChannelRef, formats: ChannelFormats) {
        chan.data().formats = formats;
    }

    fn set_dialplan_location(&self, chan: &ChannelRef, context: &str, exten: &str, priority: u32) {
        let mut data = chan.data();
        data.context = context.to_string();
        data.exten = exten.to_string();
        data.priority = priority;
    }

    fn configure_jitterbuffer(&self, chan: &ChannelRef, config: &JitterBufferConfig) {
        chan.data().jitterbuffer = Some(config.clone());
    }

    fn tech_pvt(&self, chan: &ChannelRef) -> Option<TechPvt> {
        chan.data().tech_pvt.clone()
    }

    fn set_tech_pvt(&self, chan: &ChannelRef, pvt: Option<TechPvt>) {
        chan.data().tech_pvt = pvt;
    }

    fn lock(&self, chan: &ChannelRef) {
        chan.lock().lock();
    }

    fn try_lock(&self, chan: &ChannelRef) -> bool {
        chan.lock().try_lock()
    }

    fn unlock(&self, chan: &ChannelRef) {
        chan.lock().unlock();
    }

    fn deadlock_avoidance(&self, chan: &ChannelRef) {
        if chan.lock().held_by_current() {
            chan.lock().cycle();
        } else {
            thread::yield_now();
        }
    }

    fn queue_frame(&self, chan: &ChannelRef, frame: Frame) {
        chan.data().frames.push_back(frame);
    }

    fn read_queue_empty(&self, chan: &ChannelRef) -> bool {
        chan.data().frames.is_empty()
    }

    fn has_generator(&self, chan: &ChannelRef) -> bool {
        chan.data().generator
    }

    fn caller_id(&self, chan: &ChannelRef) -> CallerId {
        chan.data().caller.clone()
    }

    fn set_caller_id(&self, chan: &ChannelRef, caller: CallerId) {
        chan.data().caller = caller;
    }

    fn call_profile(&self, chan: &ChannelRef) -> CallProfile {
        chan.data().profile.clone()
    }

    fn set_call_profile(&self, chan: &ChannelRef, profile: CallProfile) {
        chan.data().profile = profile;
    }

    fn answered_elsewhere(&self, chan: &ChannelRef) -> bool {
        chan.data().answered_elsewhere
    }

    fn set_answered_elsewhere(&self, chan: &ChannelRef) {
        chan.data().answered_elsewhere = true;
    }

    fn get_var(&self, chan: &ChannelRef, name: &str) -> Option<String> {
        chan.data()
            .vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn set_var(&self, chan: &ChannelRef, name: &str, value: &str) {
        let mut data = chan.data();
        match data.vars.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => data.vars.push((name.to_string(), value.to_string())),
        }
    }

    fn variables(&self, chan: &ChannelRef) -> Vec<(String, String)> {
        chan.data().vars.clone()
    }

    fn push_var(&self, chan: &ChannelRef, name: &str, value: &str) {
        chan.data().vars.push((name.to_string(), value.to_string()));
    }

    fn inherit_datastores(&self, from: &ChannelRef, to: &ChannelRef) {
        let stores = from.data().datastores.clone();
        to.data().datastores.extend(stores);
    }

    fn update_groups(&self, from: &ChannelRef, to: &ChannelRef) {
        let groups = mem::take(&mut from.data().groups);
        to.data().groups.extend(groups);
    }

    fn start_moh(&self, chan: &ChannelRef, class: Option<&str>) {
        let mut data = chan.data();
        data.moh_playing = true;
        data.moh_class = class.map(String::from);
    }

    fn stop_moh(&self, chan: &ChannelRef) {
        let mut data = chan.data();
        data.moh_playing = false;
        data.moh_class = None;
    }

    fn bridge(&self, chan: &ChannelRef) -> Option<ChannelRef> {
        chan.data().bridge.clone()
    }

    fn bridged_channel(&self, chan: &ChannelRef) -> Option<ChannelRef> {
        let bridge = self.bridge(chan)?;
        match self.tech_of(&bridge) {
            Some(tech) => tech.bridged_channel(chan, &bridge),
            None => Some(bridge),
        }
    }

    fn has_monitor(&self, chan: &ChannelRef) -> bool {
        chan.data().monitor.is_some()
    }

    fn swap_monitors(&self, a: &ChannelRef, b: &ChannelRef) {
        let from_a = a.data().monitor.take();
        let from_b = mem::replace(&mut b.data().monitor, from_a);
        a.data().monitor = from_b;
    }

    fn has_audiohooks(&self, chan: &ChannelRef) -> bool {
        !chan.data().audiohooks.is_empty()
    }

    fn swap_audiohooks(&self, a: &ChannelRef, b: &ChannelRef) {
        let from_a = mem::take(&mut a.data().audiohooks);
        let from_b = mem::replace(&mut b.data().audiohooks, from_a);
        a.data().audiohooks = from_b;
    }

    fn masquerade(&self, original: &ChannelRef, clone: &ChannelRef) -> Result<(), HostError> {
        let mut data = original.data();
        if data.pending_masq.is_some() {
            return Err(HostError::MasqueradePending(data.name.clone()));
        }
        data.pending_masq = Some(clone.clone());
        Ok(())
    }

    /// `original` takes over the identity, technology and monitor of the
    /// clone. The clone inherits the original's technology, becomes a zombie
    /// and is hung up.
    fn complete_masquerade(&self, original: &ChannelRef) {
        let Some(clone) = original.data().pending_masq.take() else {
            return;
        };
        self.lock(&clone);

        let (clone_name, clone_tech, clone_pvt, clone_formats) = {
            let mut data = clone.data();
            (data.name.clone(), data.tech_type, data.tech_pvt.take(), data.formats)
        };
        let (orig_name, orig_tech, orig_pvt, orig_formats) = {
            let mut data = original.data();
            (
                mem::replace(&mut data.name, clone_name),
                mem::replace(&mut data.tech_type, clone_tech),
                mem::replace(&mut data.tech_pvt, clone_pvt),
                mem::replace(&mut data.formats, clone_formats),
            )
        };
        self.swap_monitors(original, &clone);
        {
            let mut data = clone.data();
            data.name = format!("{}<ZOMBIE>", orig_name);
            data.tech_type = orig_tech;
            data.tech_pvt = orig_pvt;
            data.formats = orig_formats;
            data.zombie = true;
            data.bridge = None;
        }
        log::debug!("masquerade done: {} took over {}", self.name(original), self.name(&clone));

        if let Some(tech) = self.tech_of(&clone) {
            if let Err(e) = tech.fixup(original, &clone) {
                log::warn!("fixup after masquerade failed: {}", e);
            }
        }
        self.soft_hangup(&clone, SoftHangupCause::Device);
        self.hangup(&clone);
        self.unlock(&clone);
    }

    fn extension_exists(&self, context: &str, exten: &str, _priority: u32, _caller: Option<&str>) -> bool {
        self.extensions
            .lock()
            .contains(&(context.to_string(), exten.to_string()))
    }

    fn start_dialplan(&self, chan: &ChannelRef) -> Result<(), HostError> {
        if self.fail_dialplan.load(Ordering::SeqCst) {
            return Err(HostError::Other("unable to start PBX".into()));
        }
        chan.data().dialplan_started = true;
        Ok(())
    }
}
