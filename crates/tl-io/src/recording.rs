//! Sink that keeps every message in memory.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tl_engine::OutputSink;

use crate::message::{Message, Stamped};

/// Shared view of what a [`RecordingOutput`] has received.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    messages: Arc<Mutex<Vec<Stamped>>>,
}

impl Recording {
    fn lock(&self) -> MutexGuard<'_, Vec<Stamped>> {
        // A panic while pushing cannot leave the Vec half-written.
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn messages(&self) -> Vec<Stamped> {
        self.lock().clone()
    }

    /// Only the note-on messages, in arrival order.
    pub fn note_ons(&self) -> Vec<Stamped> {
        self.lock()
            .iter()
            .filter(|m| matches!(m.message, Message::NoteOn { .. }))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn push(&self, message: Stamped) {
        self.lock().push(message);
    }
}

/// Records messages, stamped with the number of ticks it has received.
pub struct RecordingOutput {
    ticks_per_beat: u32,
    tick: u64,
    sounding: BTreeSet<(u8, u8)>,
    recording: Recording,
}

impl RecordingOutput {
    pub fn new(ticks_per_beat: u32) -> Self {
        Self {
            ticks_per_beat,
            tick: 0,
            sounding: BTreeSet::new(),
            recording: Recording::default(),
        }
    }

    /// Handle that stays readable after the sink moves into a timeline.
    pub fn recording(&self) -> Recording {
        self.recording.clone()
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    fn record(&mut self, message: Message) {
        self.recording
            .push(Stamped::new(self.tick, self.ticks_per_beat, message));
    }
}

impl OutputSink for RecordingOutput {
    fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    fn start(&mut self) {
        self.record(Message::Start);
    }

    fn stop(&mut self) {
        self.record(Message::Stop);
    }

    fn tick(&mut self) {
        self.tick += 1;
    }

    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        self.sounding.insert((note, channel));
        self.record(Message::NoteOn { note, velocity, channel });
    }

    fn note_off(&mut self, note: u8, channel: u8) {
        self.sounding.remove(&(note, channel));
        self.record(Message::NoteOff { note, channel });
    }

    fn control(&mut self, control: u8, value: u8, channel: u8) {
        self.record(Message::Control { control, value, channel });
    }

    fn all_notes_off(&mut self) {
        for (note, channel) in std::mem::take(&mut self.sounding) {
            self.record(Message::NoteOff { note, channel });
        }
    }
}
