//! Event types dispatched by tracks.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::value::Value;

/// One concrete event produced by a track.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Timeline time at dispatch, in beats
    pub time: f64,
    /// Time until the track's next event, in beats
    pub duration: f64,
    pub channel: u8,
    /// What the event does
    pub kind: EventKind,
    /// Free-form parameters not understood by the scheduler
    pub args: BTreeMap<String, Value>,
}

/// What an event does.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// Play a note for `gate * duration` beats
    Note { note: u8, amplitude: u8, gate: f64 },
    /// Silence for the event's duration
    Rest,
    /// Set a continuous controller
    Control { control: u8, value: u8 },
    /// A side-effecting callback was executed
    Action,
}

impl Event {
    /// Beats until the note-off for this event, if it is a sounding note.
    pub fn note_length(&self) -> Option<f64> {
        match self.kind {
            EventKind::Note { amplitude, gate, .. } if amplitude > 0 => {
                Some(self.duration * gate)
            }
            _ => None,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, EventKind::Note { .. })
    }
}
