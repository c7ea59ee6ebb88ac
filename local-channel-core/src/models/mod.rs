pub mod caller;
pub mod config;
pub mod destination;
pub mod error;
pub mod format;
pub mod frame;
pub mod state;
