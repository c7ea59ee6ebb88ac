use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::models::caller::{CallProfile, CallerId};
use crate::models::config::JitterBufferConfig;
use crate::models::error::HostError;
use crate::models::format::ChannelFormats;
use crate::models::frame::Frame;
use crate::models::state::{ChannelState, SoftHangupCause};

/// Opaque technology-private slot stored on a host channel.
pub type TechPvt = Arc<dyn Any + Send + Sync>;

/// Parameters for allocating a host channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRequest {
    pub tech_type: &'static str,
    pub name: String,
    pub state: ChannelState,
    pub accountcode: String,
    pub exten: String,
    pub context: String,
    pub ama_flags: u32,
}

/// Services the PBX runtime provides to a channel technology.
///
/// Implemented by the embedding host (or `local-channel-memory` in tests).
/// Every method may be called from any thread. Channel locks are the host's
/// per-channel mutex: the technology only ever takes them with `try_lock`
/// while it holds a private record lock.
pub trait ChannelHost: Send + Sync + 'static {
    /// Handle to a host channel. Equality is channel identity.
    type Channel: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    // -- Factory & lifecycle --

    fn alloc_channel(&self, request: &ChannelRequest) -> Result<Self::Channel, HostError>;

    /// Free a channel that never made it into service.
    fn release_channel(&self, chan: &Self::Channel);

    fn name(&self, chan: &Self::Channel) -> String;

    fn state(&self, chan: &Self::Channel) -> ChannelState;

    fn set_state(&self, chan: &Self::Channel, state: ChannelState);

    fn soft_hangup(&self, chan: &Self::Channel, cause: SoftHangupCause);

    /// Whether the channel has been asked to hang up.
    fn check_hangup(&self, chan: &Self::Channel) -> bool;

    /// Hang the channel up right away, running its technology's hangup.
    fn hangup(&self, chan: &Self::Channel);

    fn hangup_cause(&self, chan: &Self::Channel) -> u32;

    fn set_formats(&self, chan: &Self::Channel, formats: ChannelFormats);

    fn set_dialplan_location(&self, chan: &Self::Channel, context: &str, exten: &str, priority: u32);

    fn configure_jitterbuffer(&self, chan: &Self::Channel, config: &JitterBufferConfig);

    // -- Technology private --

    fn tech_pvt(&self, chan: &Self::Channel) -> Option<TechPvt>;

    fn set_tech_pvt(&self, chan: &Self::Channel, pvt: Option<TechPvt>);

    // -- Locking --

    fn lock(&self, chan: &Self::Channel);

    fn try_lock(&self, chan: &Self::Channel) -> bool;

    fn unlock(&self, chan: &Self::Channel);

    /// Drop a held channel lock, yield briefly, and take it again.
    fn deadlock_avoidance(&self, chan: &Self::Channel);

    // -- Frames --

    fn queue_frame(&self, chan: &Self::Channel, frame: Frame);

    fn read_queue_empty(&self, chan: &Self::Channel) -> bool;

    /// Whether a media generator is feeding the channel.
    fn has_generator(&self, chan: &Self::Channel) -> bool;

    // -- Call context --

    fn caller_id(&self, chan: &Self::Channel) -> CallerId;

    fn set_caller_id(&self, chan: &Self::Channel, caller: CallerId);

    fn call_profile(&self, chan: &Self::Channel) -> CallProfile;

    fn set_call_profile(&self, chan: &Self::Channel, profile: CallProfile);

    fn answered_elsewhere(&self, chan: &Self::Channel) -> bool;

    fn set_answered_elsewhere(&self, chan: &Self::Channel);

    fn get_var(&self, chan: &Self::Channel, name: &str) -> Option<String>;

    /// Set or replace a variable.
    fn set_var(&self, chan: &Self::Channel, name: &str, value: &str);

    /// All variables in definition order.
    fn variables(&self, chan: &Self::Channel) -> Vec<(String, String)>;

    /// Append a variable at the tail, keeping the existing order.
    fn push_var(&self, chan: &Self::Channel, name: &str, value: &str);

    fn inherit_datastores(&self, from: &Self::Channel, to: &Self::Channel);

    /// Move group memberships from `from` to `to`.
    fn update_groups(&self, from: &Self::Channel, to: &Self::Channel);

    fn start_moh(&self, chan: &Self::Channel, class: Option<&str>);

    fn stop_moh(&self, chan: &Self::Channel);

    // -- Bridging & masquerade --

    /// The channel this one is directly bridged to (one hop).
    fn bridge(&self, chan: &Self::Channel) -> Option<Self::Channel>;

    /// The bridged channel after asking the bridge's technology to resolve it.
    fn bridged_channel(&self, chan: &Self::Channel) -> Option<Self::Channel>;

    fn has_monitor(&self, chan: &Self::Channel) -> bool;

    fn swap_monitors(&self, a: &Self::Channel, b: &Self::Channel);

    fn has_audiohooks(&self, chan: &Self::Channel) -> bool;

    fn swap_audiohooks(&self, a: &Self::Channel, b: &Self::Channel);

    /// Schedule `original` to take over the identity of `clone`.
    fn masquerade(&self, original: &Self::Channel, clone: &Self::Channel) -> Result<(), HostError>;

    /// Carry out a pending masquerade. `original` must be locked by the caller.
    fn complete_masquerade(&self, original: &Self::Channel);

    // -- Dialplan --

    fn extension_exists(&self, context: &str, exten: &str, priority: u32, caller: Option<&str>) -> bool;

    fn start_dialplan(&self, chan: &Self::Channel) -> Result<(), HostError>;
}
