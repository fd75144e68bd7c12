//! Lock-free hand-off of messages to another thread.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tl_engine::OutputSink;

use crate::message::{Message, Stamped};

/// Pushes messages into a single-producer ring buffer.
///
/// Never blocks the timeline: when the reader falls behind, messages are
/// dropped and counted.
pub struct RingOutput {
    producer: HeapProd<Stamped>,
    ticks_per_beat: u32,
    tick: u64,
    dropped: u64,
}

/// Reading end of a [`RingOutput`].
pub struct RingReceiver {
    consumer: HeapCons<Stamped>,
}

impl RingOutput {
    pub fn new(ticks_per_beat: u32, capacity: usize) -> (Self, RingReceiver) {
        let rb = HeapRb::<Stamped>::new(capacity.max(1));
        let (producer, consumer) = rb.split();
        let output = Self {
            producer,
            ticks_per_beat,
            tick: 0,
            dropped: 0,
        };
        (output, RingReceiver { consumer })
    }

    /// Messages lost because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn send(&mut self, message: Message) {
        let stamped = Stamped::new(self.tick, self.ticks_per_beat, message);
        if self.producer.try_push(stamped).is_err() {
            if self.dropped == 0 {
                tracing::warn!("ring output full, dropping messages");
            }
            self.dropped += 1;
        }
    }
}

impl OutputSink for RingOutput {
    fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    fn start(&mut self) {
        self.send(Message::Start);
    }

    fn stop(&mut self) {
        self.send(Message::Stop);
    }

    fn tick(&mut self) {
        self.tick += 1;
    }

    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        self.send(Message::NoteOn { note, velocity, channel });
    }

    fn note_off(&mut self, note: u8, channel: u8) {
        self.send(Message::NoteOff { note, channel });
    }

    fn control(&mut self, control: u8, value: u8, channel: u8) {
        self.send(Message::Control { control, value, channel });
    }
}

impl RingReceiver {
    pub fn try_recv(&mut self) -> Option<Stamped> {
        self.consumer.try_pop()
    }

    /// Take everything currently buffered.
    pub fn drain(&mut self) -> Vec<Stamped> {
        let mut out = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(message) = self.consumer.try_pop() {
            out.push(message);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_messages_across() {
        let (mut out, mut rx) = RingOutput::new(24, 8);
        out.note_on(60, 90, 0);
        out.tick();
        out.note_off(60, 0);

        let received = rx.drain();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].tick, 1);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn full_buffer_drops_instead_of_blocking() {
        let (mut out, mut rx) = RingOutput::new(24, 2);
        for note in 0..5 {
            out.note_on(note, 64, 0);
        }
        assert_eq!(out.dropped(), 3);
        assert_eq!(rx.drain().len(), 2);
    }
}
