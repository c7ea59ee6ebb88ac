pub mod channel_host;
pub mod channel_tech;
