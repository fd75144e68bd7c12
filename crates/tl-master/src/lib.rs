//! Headless controller for tickline.
//!
//! Owns a timeline built from a [`TimelineConfig`] and runs it either
//! offline, as fast as possible, or in real time on a background thread.

mod config;
mod error;

use tl_engine::{
    EventSpec, InternalClock, ManualClock, OutputId, OutputSink, Playback, ScheduleOptions,
    Scheduled, Timeline,
};

pub use config::TimelineConfig;
pub use error::{ControllerError, Result};

// Re-export common types so callers don't need tl-engine directly.
pub use tl_engine::{self, params, Event, EventKind, Interpolation, ParamValue, TrackInfo, Value};
pub use tl_io::{LogOutput, Message, Recording, RecordingOutput, Stamped};

/// Outcome of an offline render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rendered {
    pub ticks: u64,
    /// Timeline position when rendering ended
    pub end_beat: f64,
    /// False when the beat limit cut rendering short
    pub finished: bool,
}

/// Headless timeline controller.
pub struct Controller {
    config: TimelineConfig,
    timeline: Option<Timeline>,
    playback: Option<Playback>,
}

impl Controller {
    pub fn new(config: TimelineConfig) -> Result<Self> {
        config.validate()?;
        let mut timeline = Timeline::new(config.tempo, config.ticks_per_beat);
        config.apply(&mut timeline);
        Ok(Self {
            config,
            timeline: Some(timeline),
            playback: None,
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Run `f` against the timeline, whether idle or playing.
    pub fn with_timeline<R>(&mut self, f: impl FnOnce(&mut Timeline) -> R) -> Result<R> {
        if let Some(playback) = &self.playback {
            return Ok(playback.with(f)?);
        }
        match self.timeline.as_mut() {
            Some(timeline) => Ok(f(timeline)),
            None => Err(tl_engine::TimelineError::AlreadyRunning.into()),
        }
    }

    pub fn schedule(&mut self, spec: EventSpec, options: ScheduleOptions) -> Result<Scheduled> {
        self.with_timeline(|timeline| timeline.schedule(spec, options))?
            .map_err(Into::into)
    }

    pub fn add_output(&mut self, sink: impl OutputSink + 'static) -> Result<OutputId> {
        self.with_timeline(|timeline| timeline.add_output(sink))
    }

    // --- Offline rendering ---

    /// Run the timeline as fast as possible for at most `max_beats`,
    /// stopping early once everything has played out.
    pub fn render(&mut self, max_beats: f64) -> Result<Rendered> {
        self.stop()?;
        let config = self.config.clone();
        let timeline = self
            .timeline
            .as_mut()
            .ok_or(tl_engine::TimelineError::AlreadyRunning)?;

        let tempo = timeline.tempo().unwrap_or(config.tempo);
        let ticks_per_beat = timeline.ticks_per_beat();
        let max_ticks = (max_beats.max(0.0) * ticks_per_beat as f64).ceil() as u64;
        let start_beat = timeline.current_time();

        timeline.set_clock(ManualClock::new(tempo, ticks_per_beat).with_max_ticks(max_ticks))?;
        let result = timeline.run(Some(true));

        let end_beat = timeline.current_time();
        let finished = timeline.track_count() == 0 && timeline.pending_actions() == 0;
        timeline.set_stop_when_done(config.stop_when_done);
        timeline.set_clock(InternalClock::new(tempo, ticks_per_beat))?;
        result?;

        let ticks = ((end_beat - start_beat) * ticks_per_beat as f64).round() as u64;
        tracing::info!(ticks, end_beat, finished, "render complete");
        Ok(Rendered { ticks, end_beat, finished })
    }

    // --- Real-time playback ---

    pub fn play(&mut self) -> Result<()> {
        self.stop()?;
        let timeline = self
            .timeline
            .take()
            .ok_or(tl_engine::TimelineError::AlreadyRunning)?;
        self.playback = Some(timeline.start()?);
        Ok(())
    }

    /// Stop playback and take the timeline back.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(playback) = self.playback.take() {
            playback.stop()?;
            self.timeline = Some(playback.join()?);
        }
        Ok(())
    }

    /// Block until playback ends on its own.
    pub fn wait(&mut self) -> Result<()> {
        if let Some(playback) = self.playback.take() {
            self.timeline = Some(playback.join()?);
        }
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.is_running())
    }

    pub fn summary(&mut self) -> Result<String> {
        self.with_timeline(|timeline| timeline.summary())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(error = %err, "failed to stop playback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_ir::Sequence;

    fn controller(json: &str) -> Controller {
        Controller::new(TimelineConfig::from_json_str(json).unwrap()).unwrap()
    }

    #[test]
    fn render_plays_everything_out() {
        let mut ctl = controller(r#"{ "ticks_per_beat": 16 }"#);
        let out = RecordingOutput::new(24);
        let recording = out.recording();
        ctl.add_output(out).unwrap();
        ctl.schedule(
            EventSpec::new().with(params::NOTE, Sequence::once([60, 62, 64])),
            ScheduleOptions::new(),
        )
        .unwrap();

        let rendered = ctl.render(16.0).unwrap();
        assert!(rendered.finished);
        assert_eq!(rendered.end_beat, 3.0);
        assert_eq!(recording.note_ons().len(), 3);
        assert!(!ctl.config().stop_when_done);
    }

    #[test]
    fn render_respects_the_beat_limit() {
        let mut ctl = controller(r#"{ "ticks_per_beat": 16 }"#);
        ctl.schedule(EventSpec::new(), ScheduleOptions::new()).unwrap();
        let rendered = ctl.render(2.0).unwrap();
        assert!(!rendered.finished);
        assert_eq!(rendered.ticks, 32);
        assert_eq!(rendered.end_beat, 2.0);
    }

    #[test]
    fn default_quantize_comes_from_config() {
        let mut ctl = controller(r#"{ "ticks_per_beat": 4, "quantize": 2.0 }"#);
        ctl.schedule(EventSpec::new().with(params::NOTE, 60), ScheduleOptions::new().count(1))
            .unwrap();
        let pending = ctl.with_timeline(|tl| tl.pending_actions()).unwrap();
        assert_eq!(pending, 1);
    }

    #[test]
    fn play_and_stop_round_trip() {
        let mut ctl = controller(r#"{ "tempo": 600.0, "ticks_per_beat": 24 }"#);
        ctl.schedule(EventSpec::new(), ScheduleOptions::new().name("drone")).unwrap();
        ctl.play().unwrap();
        assert!(ctl.is_playing());
        std::thread::sleep(std::time::Duration::from_millis(20));
        ctl.stop().unwrap();
        assert!(!ctl.is_playing());
        let summary = ctl.summary().unwrap();
        assert!(summary.contains("drone"));
    }
}
