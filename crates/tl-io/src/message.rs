//! Messages received by a sink, stamped with the sink's own tick count.

use serde::{Deserialize, Serialize};

/// Something a sink was asked to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    NoteOn { note: u8, velocity: u8, channel: u8 },
    NoteOff { note: u8, channel: u8 },
    Control { control: u8, value: u8, channel: u8 },
    Start,
    Stop,
}

/// A message and the sink tick it arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stamped {
    pub tick: u64,
    /// `tick` expressed in beats at the sink's resolution
    pub beat: f64,
    pub message: Message,
}

impl Stamped {
    pub fn new(tick: u64, ticks_per_beat: u32, message: Message) -> Self {
        Self {
            tick,
            beat: tick as f64 / ticks_per_beat.max(1) as f64,
            message,
        }
    }
}
