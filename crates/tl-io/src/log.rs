//! Sink that reports every message through `tracing`.

use tl_engine::OutputSink;

/// Logs events at `info` and ticks at `trace`.
pub struct LogOutput {
    name: String,
    ticks_per_beat: u32,
    tick: u64,
}

impl LogOutput {
    pub fn new(name: impl Into<String>, ticks_per_beat: u32) -> Self {
        Self {
            name: name.into(),
            ticks_per_beat,
            tick: 0,
        }
    }

    fn beat(&self) -> f64 {
        self.tick as f64 / self.ticks_per_beat.max(1) as f64
    }
}

impl OutputSink for LogOutput {
    fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    fn start(&mut self) {
        tracing::info!(output = %self.name, "output started");
    }

    fn stop(&mut self) {
        tracing::info!(output = %self.name, ticks = self.tick, "output stopped");
    }

    fn tick(&mut self) {
        self.tick += 1;
        tracing::trace!(output = %self.name, tick = self.tick);
    }

    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        tracing::info!(output = %self.name, beat = self.beat(), note, velocity, channel, "note on");
    }

    fn note_off(&mut self, note: u8, channel: u8) {
        tracing::debug!(output = %self.name, beat = self.beat(), note, channel, "note off");
    }

    fn control(&mut self, control: u8, value: u8, channel: u8) {
        tracing::info!(output = %self.name, beat = self.beat(), control, value, channel, "control");
    }

    fn all_notes_off(&mut self) {
        tracing::debug!(output = %self.name, "all notes off");
    }
}
