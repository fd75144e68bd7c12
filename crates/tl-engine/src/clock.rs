//! Clock sources that drive a timeline.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tl_ir::{DEFAULT_TEMPO, DEFAULT_TICKS_PER_BEAT};

use crate::error::{ClockError, Result};

/// Pulses per beat of an external clock signal.
pub const EXTERNAL_TICKS_PER_BEAT: u32 = 24;

/// Ticks an internal clock may catch up in one wake-up before warning.
const MAX_CATCH_UP_TICKS: u32 = 64;

const POLL_INTERVAL: Duration = Duration::from_micros(100);
const EXTERNAL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of a single timeline tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// Nothing left to play and the timeline asked to stop when done
    Exhausted,
}

/// Receiver of clock ticks.
pub trait ClockTarget {
    fn tick(&mut self) -> Result<TickOutcome>;

    /// Resync to the nearest whole beat, e.g. on an external start message.
    fn reset_to_beat(&mut self) {}
}

/// A source of ticks.
pub trait ClockSource: Send {
    /// Shared control handle for tempo, resolution and stopping.
    fn control(&self) -> ClockControl;

    /// Drive `target` until stopped, exhausted or failing.
    fn run(&mut self, target: &mut dyn ClockTarget) -> Result<()>;
}

struct ClockState {
    tempo_bits: AtomicU64,
    ticks_per_beat: AtomicU32,
    stopped: AtomicBool,
    external: bool,
}

/// Shared view of a clock's settings.
///
/// Cloning yields another handle onto the same clock, so a timeline can
/// retune or stop a clock running on another thread.
#[derive(Clone)]
pub struct ClockControl {
    state: Arc<ClockState>,
}

impl ClockControl {
    fn new(tempo: f64, ticks_per_beat: u32, external: bool) -> Self {
        Self {
            state: Arc::new(ClockState {
                tempo_bits: AtomicU64::new(tempo.to_bits()),
                ticks_per_beat: AtomicU32::new(ticks_per_beat),
                stopped: AtomicBool::new(false),
                external,
            }),
        }
    }

    pub fn is_external(&self) -> bool {
        self.state.external
    }

    /// Tempo in beats per minute, unknown for external clocks.
    pub fn tempo(&self) -> Option<f64> {
        if self.state.external {
            return None;
        }
        Some(f64::from_bits(self.state.tempo_bits.load(Ordering::Relaxed)))
    }

    pub fn set_tempo(&self, tempo: f64) -> std::result::Result<(), ClockError> {
        if self.state.external {
            return Err(ClockError::ExternallyDriven("tempo"));
        }
        if !tempo.is_finite() || tempo <= 0.0 {
            return Err(ClockError::InvalidTempo(tempo));
        }
        self.state.tempo_bits.store(tempo.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.state.ticks_per_beat.load(Ordering::Relaxed)
    }

    pub fn set_ticks_per_beat(&self, ticks_per_beat: u32) -> std::result::Result<(), ClockError> {
        if self.state.external {
            return Err(ClockError::ExternallyDriven("ticks per beat"));
        }
        if ticks_per_beat == 0 {
            return Err(ClockError::InvalidResolution(ticks_per_beat));
        }
        self.state.ticks_per_beat.store(ticks_per_beat, Ordering::Relaxed);
        Ok(())
    }

    /// Ask the clock to return from `run` at its next opportunity.
    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::Relaxed)
    }

    /// Clear a previous stop request. Called by clocks entering `run`.
    pub fn resume(&self) {
        self.state.stopped.store(false, Ordering::Relaxed);
    }

    /// Length of one tick in seconds at the current settings.
    pub fn tick_seconds(&self) -> Option<f64> {
        let tempo = self.tempo()?;
        Some(60.0 / (tempo * self.ticks_per_beat() as f64))
    }
}

impl std::fmt::Debug for ClockControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockControl")
            .field("tempo", &self.tempo())
            .field("ticks_per_beat", &self.ticks_per_beat())
            .field("external", &self.is_external())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Real-time clock that ticks on the calling thread.
pub struct InternalClock {
    control: ClockControl,
}

impl InternalClock {
    pub fn new(tempo: f64, ticks_per_beat: u32) -> Self {
        Self {
            control: ClockControl::new(tempo, ticks_per_beat, false),
        }
    }
}

impl Default for InternalClock {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPO, DEFAULT_TICKS_PER_BEAT)
    }
}

impl ClockSource for InternalClock {
    fn control(&self) -> ClockControl {
        self.control.clone()
    }

    fn run(&mut self, target: &mut dyn ClockTarget) -> Result<()> {
        self.control.resume();
        let mut last = Instant::now();
        let mut pending = 0.0;

        while !self.control.is_stopped() {
            let now = Instant::now();
            pending += now.duration_since(last).as_secs_f64();
            last = now;

            // Tempo and resolution may change between ticks.
            let mut caught_up = 0;
            while let Some(tick) = self.control.tick_seconds().filter(|t| pending >= *t) {
                pending -= tick;
                if target.tick()? == TickOutcome::Exhausted {
                    self.control.stop();
                    return Ok(());
                }
                caught_up += 1;
                if self.control.is_stopped() {
                    return Ok(());
                }
            }
            if caught_up > MAX_CATCH_UP_TICKS {
                tracing::warn!(ticks = caught_up, "clock overrun, timeline fell behind real time");
            }

            thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }
}

/// Offline clock that ticks as fast as the target allows.
///
/// Useful for rendering and tests; `max_ticks` bounds runs that would
/// otherwise never exhaust.
pub struct ManualClock {
    control: ClockControl,
    max_ticks: Option<u64>,
    elapsed: u64,
}

impl ManualClock {
    pub fn new(tempo: f64, ticks_per_beat: u32) -> Self {
        Self {
            control: ClockControl::new(tempo, ticks_per_beat, false),
            max_ticks: None,
            elapsed: 0,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Ticks delivered across every `run`.
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPO, DEFAULT_TICKS_PER_BEAT)
    }
}

impl ClockSource for ManualClock {
    fn control(&self) -> ClockControl {
        self.control.clone()
    }

    fn run(&mut self, target: &mut dyn ClockTarget) -> Result<()> {
        self.control.resume();
        let mut ticks = 0;
        while !self.control.is_stopped() && self.max_ticks.map_or(true, |max| ticks < max) {
            let outcome = target.tick()?;
            ticks += 1;
            self.elapsed += 1;
            if outcome == TickOutcome::Exhausted {
                self.control.stop();
                break;
            }
        }
        Ok(())
    }
}

/// Timing message from an external device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockPulse {
    Tick,
    Start,
    Stop,
    /// Jump back to the nearest beat (song position reset)
    Reset,
}

/// Clock driven by pulses arriving on a channel at 24 per beat.
///
/// Ticks are ignored between `Stop` and the next `Start`.
pub struct ExternalClock {
    control: ClockControl,
    pulses: Receiver<ClockPulse>,
}

impl ExternalClock {
    pub fn new(pulses: Receiver<ClockPulse>) -> Self {
        Self {
            control: ClockControl::new(0.0, EXTERNAL_TICKS_PER_BEAT, true),
            pulses,
        }
    }
}

impl ClockSource for ExternalClock {
    fn control(&self) -> ClockControl {
        self.control.clone()
    }

    fn run(&mut self, target: &mut dyn ClockTarget) -> Result<()> {
        self.control.resume();
        let mut running = true;
        while !self.control.is_stopped() {
            let pulse = match self.pulses.recv_timeout(EXTERNAL_POLL_INTERVAL) {
                Ok(pulse) => pulse,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(ClockError::Disconnected.into()),
            };
            match pulse {
                ClockPulse::Tick if running => {
                    if target.tick()? == TickOutcome::Exhausted {
                        self.control.stop();
                    }
                }
                ClockPulse::Tick => {}
                ClockPulse::Start => {
                    target.reset_to_beat();
                    running = true;
                }
                ClockPulse::Stop => running = false,
                ClockPulse::Reset => target.reset_to_beat(),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[derive(Default)]
    struct Counter {
        ticks: u32,
        resyncs: u32,
        exhaust_after: Option<u32>,
    }

    impl ClockTarget for Counter {
        fn tick(&mut self) -> Result<TickOutcome> {
            self.ticks += 1;
            Ok(match self.exhaust_after {
                Some(n) if self.ticks >= n => TickOutcome::Exhausted,
                _ => TickOutcome::Continue,
            })
        }

        fn reset_to_beat(&mut self) {
            self.resyncs += 1;
        }
    }

    #[test]
    fn external_control_rejects_settings() {
        let (_tx, rx) = unbounded();
        let clock = ExternalClock::new(rx);
        let control = clock.control();
        assert_eq!(control.tempo(), None);
        assert_eq!(control.ticks_per_beat(), 24);
        assert_eq!(control.set_tempo(100.0), Err(ClockError::ExternallyDriven("tempo")));
        assert!(control.set_ticks_per_beat(96).is_err());
    }

    #[test]
    fn internal_control_validates() {
        let control = InternalClock::default().control();
        assert_eq!(control.tempo(), Some(120.0));
        assert!(control.set_tempo(0.0).is_err());
        assert!(control.set_ticks_per_beat(0).is_err());
        control.set_tempo(90.0).unwrap();
        assert_eq!(control.tempo(), Some(90.0));
    }

    #[test]
    fn manual_clock_stops_on_exhaustion() {
        let mut clock = ManualClock::default();
        let mut target = Counter { exhaust_after: Some(10), ..Default::default() };
        clock.run(&mut target).unwrap();
        assert_eq!(target.ticks, 10);
        assert!(clock.control().is_stopped());
    }

    #[test]
    fn manual_clock_honours_max_ticks() {
        let mut clock = ManualClock::default().with_max_ticks(25);
        let mut target = Counter::default();
        clock.run(&mut target).unwrap();
        assert_eq!(target.ticks, 25);
        assert_eq!(clock.elapsed(), 25);
    }

    #[test]
    fn internal_clock_ticks_in_real_time() {
        // 6000 bpm at 10 tpb: one tick per millisecond
        let mut clock = InternalClock::new(6000.0, 10);
        let mut target = Counter { exhaust_after: Some(20), ..Default::default() };
        let start = Instant::now();
        clock.run(&mut target).unwrap();
        assert_eq!(target.ticks, 20);
        assert!(start.elapsed() >= Duration::from_millis(19));
    }

    #[test]
    fn external_clock_follows_pulses() {
        let (tx, rx) = unbounded();
        let mut clock = ExternalClock::new(rx);
        for pulse in [
            ClockPulse::Tick,
            ClockPulse::Stop,
            ClockPulse::Tick,
            ClockPulse::Start,
            ClockPulse::Tick,
            ClockPulse::Tick,
        ] {
            tx.send(pulse).unwrap();
        }
        drop(tx);

        let mut target = Counter::default();
        let result = clock.run(&mut target);
        assert!(matches!(
            result,
            Err(crate::TimelineError::Clock(ClockError::Disconnected))
        ));
        assert_eq!(target.ticks, 3);
        assert_eq!(target.resyncs, 1);
    }
}
