//! The two-endpoint private record and everything that mutates it.

mod factory;
pub mod masquerade;
pub mod module_use;
pub mod private;
pub mod relay;
mod setup;
pub mod teardown;
