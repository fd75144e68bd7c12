//! Background execution of a timeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::clock::{ClockControl, ClockSource, ClockTarget, TickOutcome};
use crate::error::{Result, TimelineError};
use crate::timeline::Timeline;

/// Clock target that locks the shared timeline once per tick.
struct SharedTimeline(Arc<Mutex<Timeline>>);

impl ClockTarget for SharedTimeline {
    fn tick(&mut self) -> Result<TickOutcome> {
        self.0.lock().map_err(|_| TimelineError::Poisoned)?.tick()
    }

    fn reset_to_beat(&mut self) {
        if let Ok(mut timeline) = self.0.lock() {
            timeline.reset_to_beat();
        }
    }
}

/// Handle to a timeline running on its own thread.
///
/// Dropping the handle detaches the thread; call [`stop`](Self::stop) and
/// [`join`](Self::join) to get the timeline back.
pub struct Playback {
    timeline: Arc<Mutex<Timeline>>,
    control: ClockControl,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl Playback {
    pub(crate) fn spawn(timeline: Timeline, mut clock: Box<dyn ClockSource>) -> Self {
        let control = clock.control();
        let timeline = Arc::new(Mutex::new(timeline));
        let running = Arc::new(AtomicBool::new(true));

        let shared = timeline.clone();
        let done = running.clone();
        let thread = std::thread::spawn(move || {
            let mut target = SharedTimeline(shared.clone());
            let result = clock.run(&mut target);
            if let Err(err) = &result {
                tracing::warn!(error = %err, "timeline thread stopped with an error");
            }
            match shared.lock() {
                Ok(mut timeline) => timeline.finish_run(clock),
                Err(poisoned) => poisoned.into_inner().finish_run(clock),
            }
            done.store(false, Ordering::Release);
            tracing::info!("timeline thread finished");
            result
        });

        Self {
            timeline,
            control,
            running,
            thread: Some(thread),
        }
    }

    /// Run `f` against the timeline between two ticks.
    pub fn with<R>(&self, f: impl FnOnce(&mut Timeline) -> R) -> Result<R> {
        let mut timeline = self.timeline.lock().map_err(|_| TimelineError::Poisoned)?;
        Ok(f(&mut timeline))
    }

    /// Silence the outputs and ask the clock to halt.
    pub fn stop(&self) -> Result<()> {
        self.control.stop();
        self.with(|timeline| timeline.stop())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Block until the playback thread ends, returning how it ended.
    pub fn wait(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(handle) => handle.join().map_err(|_| TimelineError::ThreadPanicked)?,
            None => Ok(()),
        }
    }

    /// Wait for the thread to end and take the timeline back.
    pub fn join(mut self) -> Result<Timeline> {
        let outcome = self.wait();
        let timeline = Arc::try_unwrap(self.timeline)
            .map_err(|_| TimelineError::AlreadyRunning)?
            .into_inner()
            .map_err(|_| TimelineError::Poisoned)?;
        outcome.map(|()| timeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{InternalClock, ManualClock};
    use crate::spec::EventSpec;
    use crate::timeline::ScheduleOptions;
    use std::time::Duration;
    use tl_ir::{params, Sequence};

    #[test]
    fn background_run_finishes_and_returns_timeline() {
        let mut timeline = Timeline::with_clock(ManualClock::new(120.0, 24));
        timeline.set_stop_when_done(true);
        timeline
            .schedule(
                EventSpec::new().with(params::NOTE, Sequence::once([60, 64])),
                ScheduleOptions::new(),
            )
            .unwrap();

        let playback = timeline.start().unwrap();
        let timeline = playback.join().unwrap();
        assert!(!timeline.is_running());
        assert_eq!(timeline.track_count(), 0);
        assert!(timeline.current_time() >= 2.0);
    }

    #[test]
    fn stop_halts_an_endless_timeline() {
        let mut timeline = Timeline::with_clock(InternalClock::new(600.0, 24));
        timeline
            .schedule(EventSpec::new(), ScheduleOptions::new().name("loop"))
            .unwrap();

        let playback = timeline.start().unwrap();
        assert!(playback.is_running());
        std::thread::sleep(Duration::from_millis(50));
        let names = playback
            .with(|tl| tl.tracks().filter_map(|t| t.name().map(str::to_string)).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(names, ["loop"]);

        playback.stop().unwrap();
        let timeline = playback.join().unwrap();
        assert!(timeline.current_time() > 0.0);
        assert!(!timeline.is_running());
    }
}
