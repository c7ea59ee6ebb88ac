use std::time::Duration;

use crate::models::error::LocalError;
use crate::models::format::FormatMask;
use crate::models::frame::{ControlKind, Frame};
use crate::models::state::DeviceState;

/// Operation table a host dispatches to for channels of one technology.
///
/// Apart from `request` and `devicestate`, the host calls these with `chan`
/// locked.
pub trait ChannelTech<C>: Send + Sync {
    /// Technology name, e.g. "Local".
    fn type_name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Formats this technology can carry.
    fn capabilities(&self) -> FormatMask;

    /// Create a new channel for `data` and return the caller-facing end.
    fn request(&self, data: &str, format: FormatMask) -> Result<C, LocalError>;

    fn devicestate(&self, data: &str) -> DeviceState;

    fn call(&self, chan: &C, dest: &str, timeout: Option<Duration>) -> Result<(), LocalError>;

    fn hangup(&self, chan: &C) -> Result<(), LocalError>;

    fn answer(&self, chan: &C) -> Result<(), LocalError>;

    fn read(&self, chan: &C) -> Frame;

    fn write(&self, chan: &C, frame: Frame) -> Result<(), LocalError>;

    fn indicate(&self, chan: &C, condition: ControlKind, data: &[u8]) -> Result<(), LocalError>;

    fn send_digit_begin(&self, chan: &C, digit: char) -> Result<(), LocalError>;

    fn send_digit_end(&self, chan: &C, digit: char, duration_ms: u32) -> Result<(), LocalError>;

    fn send_text(&self, chan: &C, text: &str) -> Result<(), LocalError>;

    fn send_html(&self, chan: &C, subclass: i32, data: &[u8]) -> Result<(), LocalError>;

    /// `old` has been replaced by `new` through a masquerade.
    fn fixup(&self, old: &C, new: &C) -> Result<(), LocalError>;

    /// The channel to report as bridged with `chan`, given `bridge` is ours.
    fn bridged_channel(&self, chan: &C, bridge: &C) -> Option<C>;
}
