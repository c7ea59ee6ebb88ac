//! # local-channel-core
//!
//! Host-agnostic Local proxy channel technology.
//!
//! A Local channel is a pair of virtual endpoints joined back to back: the
//! owner-side is handed to whoever requested `Local/exten@context`, the
//! chan-side runs the dialplan at that extension. Frames written to one side
//! are queued on the other. Once the chan-side is bridged to a real channel,
//! the pair can masquerade itself out of the call path.
//!
//! The PBX runtime plugs in through the `ChannelHost` trait; `LocalTech` is
//! the operation table the host dispatches to.
//!
//! ## Architecture
//!
//! ```text
//! local-channel-core (this crate)
//! ├── traits/       ← ChannelHost, ChannelTech
//! ├── models/       ← LocalError, Destination, Frame, FormatMask, LocalConfig, states
//! ├── pair/         ← LocalPvt record, relay, masquerade, setup, teardown, module-use tokens
//! ├── registry/     ← live pair list, diagnostics snapshots
//! └── tech/         ← LocalTech (the Local operation table)
//! ```

pub mod models;
pub mod pair;
pub mod registry;
pub mod tech;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::caller::{CallProfile, CallerId};
pub use models::config::{JitterBufferConfig, LocalConfig, VariableFilter};
pub use models::destination::{Destination, LocalOptions};
pub use models::error::{HostError, LocalError};
pub use models::format::{ChannelFormats, FormatMask};
pub use models::frame::{ControlKind, Frame, Media};
pub use models::state::{ChannelState, DeviceState, Glare, GlareExit, Phase, Side, SoftHangupCause};
pub use pair::module_use::{ModuleRef, ModuleUse};
pub use pair::private::{LocalPvt, PvtGuard, PvtInner};
pub use pair::relay::{RelayOutcome, BUSY_PEER_VAR};
pub use pair::teardown::{TeardownOutcome, CHANLOCALSTATUS_VAR};
pub use registry::diagnostics::ChannelSnapshot;
pub use registry::{Registry, RegistryStats};
pub use tech::local::{LocalTech, LOCAL_TYPE};
pub use traits::channel_host::{ChannelHost, ChannelRequest, TechPvt};
pub use traits::channel_tech::ChannelTech;
