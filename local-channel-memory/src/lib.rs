//! # local-channel-memory
//!
//! In-process reference host for `local-channel-core`.
//!
//! `MemoryHost` implements `ChannelHost` over plain in-memory channels with
//! recursive per-channel locks, and drives registered technologies the way a
//! PBX core would: every dispatched operation runs with the target channel
//! locked. Used by the integration tests and handy for embedding experiments.

pub mod channel;
pub mod host;

pub use channel::{ChannelRef, MemoryChannel};
pub use host::{MemoryHost, TEST_TYPE};
