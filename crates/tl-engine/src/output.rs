//! Output sink interface.

use crate::clock_multiplier::ClockMultiplier;

slotmap::new_key_type! {
    /// Handle for an output sink registered with a timeline.
    pub struct OutputId;
}

/// A consumer of dispatched events (device, file, network endpoint).
///
/// Sinks run at their own resolution; the timeline calls [`tick`] as many
/// times per master tick as the sink's resolution requires.
///
/// [`tick`]: OutputSink::tick
pub trait OutputSink: Send {
    /// Resolution this sink expects, in ticks per beat.
    fn ticks_per_beat(&self) -> u32;

    fn start(&mut self) {}
    fn stop(&mut self) {}

    /// Advance by one step at the sink's own resolution.
    fn tick(&mut self) {}

    fn note_on(&mut self, note: u8, velocity: u8, channel: u8);
    fn note_off(&mut self, note: u8, channel: u8);
    fn control(&mut self, control: u8, value: u8, channel: u8);

    /// Silence every sounding note.
    fn all_notes_off(&mut self) {}
}

/// Sink that discards everything. Registered when a track is scheduled
/// on a timeline without outputs.
#[derive(Clone, Copy, Debug)]
pub struct NullOutput {
    ticks_per_beat: u32,
}

impl NullOutput {
    pub fn new(ticks_per_beat: u32) -> Self {
        Self { ticks_per_beat }
    }
}

impl OutputSink for NullOutput {
    fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    fn note_on(&mut self, _note: u8, _velocity: u8, _channel: u8) {}
    fn note_off(&mut self, _note: u8, _channel: u8) {}
    fn control(&mut self, _control: u8, _value: u8, _channel: u8) {}
}

/// A registered sink together with its clock translator.
pub(crate) struct OutputSlot {
    pub sink: Box<dyn OutputSink>,
    pub multiplier: ClockMultiplier,
}

impl OutputSlot {
    pub fn new(sink: Box<dyn OutputSink>, master_ticks_per_beat: u32) -> Self {
        let multiplier = ClockMultiplier::new(sink.ticks_per_beat(), master_ticks_per_beat);
        Self { sink, multiplier }
    }

    /// Advance the sink by however many of its own ticks are due.
    pub fn advance(&mut self) {
        for _ in 0..self.multiplier.next_ticks() {
            self.sink.tick();
        }
    }
}
