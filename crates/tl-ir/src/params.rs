//! Well-known event parameter names.
//!
//! Any other key in an `EventSpec` is passed through to the
//! event as a free-form argument.

pub const NOTE: &str = "note";
pub const DURATION: &str = "duration";
pub const GATE: &str = "gate";
pub const AMPLITUDE: &str = "amplitude";
pub const CHANNEL: &str = "channel";
/// Control (CC) number; its presence turns the event into a control event
pub const CONTROL: &str = "control";
pub const VALUE: &str = "value";
/// Side-effecting callback, executed instead of sending a note
pub const ACTION: &str = "action";

pub const DEFAULT_DURATION: f64 = 1.0;
pub const DEFAULT_GATE: f64 = 1.0;
pub const DEFAULT_AMPLITUDE: u8 = 64;
pub const DEFAULT_CHANNEL: u8 = 0;
