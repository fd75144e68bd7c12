//! The scheduler: owns the clock, tracks, deferred actions and outputs.

use std::fmt;

use slotmap::SlotMap;
use tl_ir::{
    beats_to_seconds, quantize_start, round_beats, seconds_to_beats, Event, DEFAULT_TEMPO,
    DEFAULT_TICKS_PER_BEAT,
};

use crate::action_queue::ActionQueue;
use crate::clock::{ClockControl, ClockSource, ClockTarget, InternalClock, TickOutcome};
use crate::error::{Result, TimelineError};
use crate::output::{NullOutput, OutputId, OutputSink, OutputSlot};
use crate::playback::Playback;
use crate::spec::{ActionFn, EventSpec};
use crate::track::{EventHook, Interpolation, Track, TrackId, TrackInfo, TrackOptions};

/// One-shot callback run when its scheduled beat comes due.
pub type DeferredAction = Box<dyn FnOnce(&mut Timeline) + Send>;

/// Work waiting in the action queue.
enum Deferred {
    /// Make a waiting track live
    Start { id: TrackId, index: Option<usize> },
    Update {
        id: TrackId,
        spec: EventSpec,
        interpolation: Option<Interpolation>,
    },
    Call(DeferredAction),
}

impl Deferred {
    fn track(&self) -> Option<TrackId> {
        match self {
            Deferred::Start { id, .. } | Deferred::Update { id, .. } => Some(*id),
            Deferred::Call(_) => None,
        }
    }
}

/// Per-call options for [`Timeline::schedule`].
#[derive(Clone, Debug)]
pub struct ScheduleOptions {
    /// Start on the next multiple of this many beats
    pub quantize: Option<f64>,
    /// Beats to wait after the (quantized) start
    pub delay: Option<f64>,
    /// Stop after this many events
    pub count: Option<usize>,
    pub interpolation: Interpolation,
    /// Target sink; the first registered sink when unset
    pub output: Option<OutputId>,
    pub name: Option<String>,
    /// Update the live track called `name` instead of adding a new one
    pub replace: bool,
    /// Evaluation position among live tracks; appended when unset
    pub track_index: Option<usize>,
    pub remove_when_done: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            quantize: None,
            delay: None,
            count: None,
            interpolation: Interpolation::None,
            output: None,
            name: None,
            replace: false,
            track_index: None,
            remove_when_done: true,
        }
    }
}

impl ScheduleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantize(mut self, beats: f64) -> Self {
        self.quantize = Some(beats);
        self
    }

    pub fn delay(mut self, beats: f64) -> Self {
        self.delay = Some(beats);
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn output(mut self, output: OutputId) -> Self {
        self.output = Some(output);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn track_index(mut self, index: usize) -> Self {
        self.track_index = Some(index);
        self
    }

    pub fn keep_when_done(mut self) -> Self {
        self.remove_when_done = false;
        self
    }
}

/// Fallbacks applied when a schedule call leaves quantize or delay unset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScheduleDefaults {
    pub quantize: Option<f64>,
    pub delay: f64,
}

/// Handles created by a single [`Timeline::schedule`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scheduled {
    One(TrackId),
    /// A multi-step action spec split into several tracks
    Many(Vec<TrackId>),
}

impl Scheduled {
    /// The first (or only) track.
    pub fn id(&self) -> Option<TrackId> {
        match self {
            Scheduled::One(id) => Some(*id),
            Scheduled::Many(ids) => ids.first().copied(),
        }
    }

    pub fn ids(&self) -> Vec<TrackId> {
        match self {
            Scheduled::One(id) => vec![*id],
            Scheduled::Many(ids) => ids.clone(),
        }
    }
}

/// Ways to look up a live track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackRef<'a> {
    Index(usize),
    Name(&'a str),
    Id(TrackId),
}

impl From<usize> for TrackRef<'_> {
    fn from(index: usize) -> Self {
        TrackRef::Index(index)
    }
}

impl<'a> From<&'a str> for TrackRef<'a> {
    fn from(name: &'a str) -> Self {
        TrackRef::Name(name)
    }
}

impl From<TrackId> for TrackRef<'_> {
    fn from(id: TrackId) -> Self {
        TrackRef::Id(id)
    }
}

/// A tick-driven scheduler for note and control events.
///
/// Each [`tick`](Timeline::tick) flushes due note-offs, fires due deferred
/// actions, advances every live track in order, advances every output by
/// its translated tick count, and finally moves the clock on by one tick.
pub struct Timeline {
    clock: Option<Box<dyn ClockSource>>,
    clock_control: ClockControl,
    current_time: f64,
    tracks: SlotMap<TrackId, Track>,
    /// Live tracks in evaluation order
    live: Vec<TrackId>,
    /// Scheduled tracks waiting for their start beat
    pending: Vec<TrackId>,
    actions: ActionQueue<Deferred>,
    outputs: SlotMap<OutputId, OutputSlot>,
    output_order: Vec<OutputId>,
    max_tracks: usize,
    ignore_exceptions: bool,
    stop_when_done: bool,
    defaults: ScheduleDefaults,
    event_hook: Option<EventHook>,
    fired: Vec<(ActionFn, Event)>,
    running: bool,
}

impl Timeline {
    /// Create a timeline driven by an internal real-time clock.
    pub fn new(tempo: f64, ticks_per_beat: u32) -> Self {
        Self::with_clock(InternalClock::new(tempo, ticks_per_beat))
    }

    pub fn with_clock(clock: impl ClockSource + 'static) -> Self {
        let clock_control = clock.control();
        Self {
            clock: Some(Box::new(clock)),
            clock_control,
            current_time: 0.0,
            tracks: SlotMap::with_key(),
            live: Vec::new(),
            pending: Vec::new(),
            actions: ActionQueue::new(),
            outputs: SlotMap::with_key(),
            output_order: Vec::new(),
            max_tracks: 0,
            ignore_exceptions: false,
            stop_when_done: false,
            defaults: ScheduleDefaults::default(),
            event_hook: None,
            fired: Vec::new(),
            running: false,
        }
    }

    /// Swap the clock source. Output translators follow the new resolution.
    pub fn set_clock(&mut self, clock: impl ClockSource + 'static) -> Result<()> {
        if self.running {
            return Err(TimelineError::AlreadyRunning);
        }
        self.clock_control = clock.control();
        self.clock = Some(Box::new(clock));
        self.rescale_outputs();
        Ok(())
    }

    pub fn clock_control(&self) -> ClockControl {
        self.clock_control.clone()
    }

    // --- Settings ---

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn max_tracks(&self) -> usize {
        self.max_tracks
    }

    /// Cap on scheduled tracks, counting those waiting to start; 0 means
    /// unbounded.
    pub fn set_max_tracks(&mut self, max_tracks: usize) {
        self.max_tracks = max_tracks;
    }

    pub fn ignore_exceptions(&self) -> bool {
        self.ignore_exceptions
    }

    /// When set, a failing track is dropped with a warning instead of
    /// aborting the tick.
    pub fn set_ignore_exceptions(&mut self, ignore: bool) {
        self.ignore_exceptions = ignore;
    }

    pub fn stop_when_done(&self) -> bool {
        self.stop_when_done
    }

    pub fn set_stop_when_done(&mut self, stop: bool) {
        self.stop_when_done = stop;
    }

    pub fn defaults(&self) -> ScheduleDefaults {
        self.defaults
    }

    pub fn set_defaults(&mut self, defaults: ScheduleDefaults) {
        self.defaults = defaults;
    }

    /// Observe every event as it is dispatched.
    pub fn set_event_hook<F>(&mut self, hook: F)
    where
        F: FnMut(TrackInfo<'_>, &Event) + Send + 'static,
    {
        self.event_hook = Some(Box::new(hook));
    }

    pub fn clear_event_hook(&mut self) {
        self.event_hook = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // --- Tempo and resolution ---

    /// Tempo in bpm, or `None` when externally clocked.
    pub fn tempo(&self) -> Option<f64> {
        self.clock_control.tempo()
    }

    pub fn set_tempo(&mut self, tempo: f64) -> Result<()> {
        self.clock_control.set_tempo(tempo)?;
        Ok(())
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.clock_control.ticks_per_beat()
    }

    pub fn set_ticks_per_beat(&mut self, ticks_per_beat: u32) -> Result<()> {
        self.clock_control.set_ticks_per_beat(ticks_per_beat)?;
        self.rescale_outputs();
        Ok(())
    }

    /// Length of one tick in beats.
    pub fn tick_duration(&self) -> f64 {
        1.0 / self.ticks_per_beat().max(1) as f64
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> Option<f64> {
        self.tempo().map(|tempo| seconds_to_beats(seconds, tempo))
    }

    pub fn beats_to_seconds(&self, beats: f64) -> Option<f64> {
        self.tempo().map(|tempo| beats_to_seconds(beats, tempo))
    }

    fn rescale_outputs(&mut self) {
        let ticks_per_beat = self.ticks_per_beat();
        for slot in self.outputs.values_mut() {
            slot.multiplier.set_input_rate(ticks_per_beat);
        }
    }

    // --- Outputs ---

    /// Register a sink. It gets its own clock translator.
    pub fn add_output(&mut self, sink: impl OutputSink + 'static) -> OutputId {
        self.add_boxed_output(Box::new(sink))
    }

    pub fn add_boxed_output(&mut self, sink: Box<dyn OutputSink>) -> OutputId {
        let ticks_per_beat = sink.ticks_per_beat();
        let id = self.outputs.insert(OutputSlot::new(sink, self.ticks_per_beat()));
        self.output_order.push(id);
        tracing::debug!(?id, ticks_per_beat, "output added");
        id
    }

    /// Replace every registered sink with `sink`.
    pub fn set_output(&mut self, sink: impl OutputSink + 'static) -> OutputId {
        self.outputs.clear();
        self.output_order.clear();
        self.add_output(sink)
    }

    pub fn remove_output(&mut self, id: OutputId) -> Result<Box<dyn OutputSink>> {
        let slot = self.outputs.remove(id).ok_or(TimelineError::OutputNotFound)?;
        self.output_order.retain(|o| *o != id);
        Ok(slot.sink)
    }

    /// The sole registered sink.
    pub fn output(&self) -> Result<OutputId> {
        match self.output_order.as_slice() {
            [] => Err(TimelineError::OutputNotFound),
            [id] => Ok(*id),
            many => Err(TimelineError::AmbiguousOutput(many.len())),
        }
    }

    pub fn output_ids(&self) -> &[OutputId] {
        &self.output_order
    }

    fn resolve_output(&mut self, requested: Option<OutputId>) -> Result<OutputId> {
        match requested {
            Some(id) if self.outputs.contains_key(id) => Ok(id),
            Some(_) => Err(TimelineError::OutputNotFound),
            None => match self.output_order.first() {
                Some(id) => Ok(*id),
                None => {
                    let id = self.add_output(NullOutput::new(self.ticks_per_beat()));
                    tracing::info!("no output registered, using a null output");
                    Ok(id)
                }
            },
        }
    }

    // --- Tick loop ---

    /// Advance the timeline by exactly one tick.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let now = self.current_time;
        if round_beats(now).fract() == 0.0 {
            tracing::debug!(
                beat = round_beats(now),
                tracks = self.live.len(),
                actions = self.actions.len(),
                "tick"
            );
        }

        // Note-offs go first: actions below may rewind a track.
        for id in self.live.clone() {
            if let Some(track) = self.tracks.get_mut(id) {
                track.process_note_offs(&mut self.outputs);
            }
        }

        for action in self.actions.take_due(now) {
            match action.function {
                Deferred::Start { id, index } => self.activate(id, index),
                Deferred::Update { id, spec, interpolation } => {
                    if let Some(track) = self.tracks.get_mut(id) {
                        track.update(spec, interpolation);
                    }
                }
                Deferred::Call(function) => function(self),
            }
        }

        let tick_duration = self.tick_duration();
        for id in self.live.clone() {
            if !self.live.contains(&id) {
                continue;
            }
            let now = self.current_time;
            let Some(track) = self.tracks.get_mut(id) else {
                continue;
            };
            if track.current_time() != now {
                track.set_current_time(now);
            }
            let mut ctx = crate::track::TickContext {
                tick_duration,
                outputs: &mut self.outputs,
                hook: self.event_hook.as_mut(),
                actions: &mut self.fired,
            };
            let result = track.tick(&mut ctx);

            for (action, event) in std::mem::take(&mut self.fired) {
                action(self, &event);
            }

            if let Err(source) = result {
                let name = self
                    .tracks
                    .get(id)
                    .and_then(|t| t.name())
                    .unwrap_or("<unnamed>")
                    .to_string();
                if !self.ignore_exceptions {
                    return Err(TimelineError::Track { name, source });
                }
                tracing::warn!(track = %name, error = %source, "track failed, removing");
                self.evict(id);
                continue;
            }

            if self
                .tracks
                .get(id)
                .is_some_and(|t| t.is_finished() && t.remove_when_done())
            {
                self.evict(id);
                tracing::info!(tracks = self.live.len(), "track finished, removing");
            }
        }

        if self.live.is_empty() && self.actions.is_empty() && self.stop_when_done {
            return Ok(TickOutcome::Exhausted);
        }

        for id in &self.output_order {
            if let Some(slot) = self.outputs.get_mut(*id) {
                slot.advance();
            }
        }

        self.current_time += tick_duration;
        Ok(TickOutcome::Continue)
    }

    fn evict(&mut self, id: TrackId) {
        self.live.retain(|t| *t != id);
        self.actions.retain(|a| a.function.track() != Some(id));
        if let Some(mut track) = self.tracks.remove(id) {
            track.release_notes(&mut self.outputs);
        }
    }

    // --- Scheduling ---

    /// Queue `function` to run at the next multiple of `quantize` beats
    /// plus `delay`.
    pub fn schedule_action<F>(&mut self, quantize: Option<f64>, delay: f64, function: F)
    where
        F: FnOnce(&mut Timeline) + Send + 'static,
    {
        let time = quantize_start(self.current_time, quantize, delay);
        self.actions.push(time, Deferred::Call(Box::new(function)));
    }

    /// Number of deferred actions still waiting to fire.
    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    /// Schedule a new track, or update a named one in place.
    pub fn schedule(&mut self, spec: EventSpec, options: ScheduleOptions) -> Result<Scheduled> {
        if options.replace && options.name.is_none() {
            return Err(TimelineError::ReplaceWithoutName);
        }
        self.check_output(options.output)?;
        let parts = spec.expand()?;

        if options.replace {
            if let Some(id) = self.find_scheduled(options.name.as_deref()) {
                // A split action spec updates with its first step only.
                if let Some((part, extra_delay)) = parts.into_iter().next() {
                    let (start, deferred) = self.start_for(&options, extra_delay);
                    let interpolation = Some(options.interpolation);
                    if deferred {
                        self.actions
                            .push(start, Deferred::Update { id, spec: part, interpolation });
                    } else if let Some(track) = self.tracks.get_mut(id) {
                        track.update(part, interpolation);
                    }
                    tracing::info!(track = ?options.name, start, "track updated");
                }
                return Ok(Scheduled::One(id));
            }
        }

        self.check_capacity(parts.len())?;
        let output = self.resolve_output(options.output)?;

        let mut ids = Vec::with_capacity(parts.len());
        for (part, extra_delay) in parts {
            let (start, deferred) = self.start_for(&options, extra_delay);
            let track_options = TrackOptions {
                name: options.name.clone(),
                count: options.count,
                interpolation: options.interpolation,
                remove_when_done: options.remove_when_done,
            };
            let id = self
                .tracks
                .insert_with_key(|id| Track::new(id, part, output, track_options, start));
            self.enqueue(id, options.track_index, start, deferred);
            ids.push(id);
        }

        match ids.as_slice() {
            [id] => Ok(Scheduled::One(*id)),
            _ => Ok(Scheduled::Many(ids)),
        }
    }

    /// Put a track back on the timeline, rewound to its first event.
    ///
    /// `name` and `output` in `options` override the track's own; its
    /// count, interpolation and removal settings are kept.
    pub fn schedule_track(&mut self, mut track: Track, options: ScheduleOptions) -> Result<TrackId> {
        self.check_output(options.output)?;
        self.check_capacity(1)?;
        let output = match options.output {
            Some(id) => id,
            None if self.outputs.contains_key(track.output()) => track.output(),
            None => self.resolve_output(None)?,
        };

        let (start, deferred) = self.start_for(&options, 0.0);
        track.reset();
        track.set_current_time(start);
        let name = options.name.clone();
        let id = self.tracks.insert_with_key(|id| {
            track.rebind(id, output, name);
            track
        });
        self.enqueue(id, options.track_index, start, deferred);
        Ok(id)
    }

    /// Start beat for a schedule call, and whether it lies ahead.
    fn start_for(&self, options: &ScheduleOptions, extra_delay: f64) -> (f64, bool) {
        let quantize = options.quantize.or(self.defaults.quantize);
        let delay = options.delay.unwrap_or(self.defaults.delay) + extra_delay;
        let start = quantize_start(self.current_time, quantize, delay);
        let deferred = quantize.is_some_and(|q| q > 0.0) || delay != 0.0;
        (start, deferred)
    }

    fn check_output(&self, requested: Option<OutputId>) -> Result<()> {
        match requested {
            Some(id) if !self.outputs.contains_key(id) => Err(TimelineError::OutputNotFound),
            _ => Ok(()),
        }
    }

    fn check_capacity(&self, new_tracks: usize) -> Result<()> {
        let scheduled = self.live.len() + self.pending.len();
        if self.max_tracks > 0 && scheduled + new_tracks > self.max_tracks {
            return Err(TimelineError::TrackLimitReached(self.max_tracks));
        }
        Ok(())
    }

    fn enqueue(&mut self, id: TrackId, index: Option<usize>, start: f64, deferred: bool) {
        if deferred {
            self.pending.push(id);
            self.actions.push(start, Deferred::Start { id, index });
            tracing::debug!(start, pending = self.pending.len(), "track waiting to start");
        } else {
            self.activate(id, index);
        }
    }

    /// Move a waiting track into the live set.
    fn activate(&mut self, id: TrackId, index: Option<usize>) {
        self.pending.retain(|t| *t != id);
        let Some(track) = self.tracks.get_mut(id) else {
            return;
        };
        if self.live.contains(&id) {
            return;
        }
        track.set_current_time(self.current_time);
        let index = index.map_or(self.live.len(), |i| i.min(self.live.len()));
        self.live.insert(index, id);
        tracing::info!(tracks = self.live.len(), "scheduled new track");
    }

    /// First track called `name`, live ones before waiting ones.
    fn find_scheduled(&self, name: Option<&str>) -> Option<TrackId> {
        let name = name?;
        self.live
            .iter()
            .chain(&self.pending)
            .copied()
            .find(|id| self.tracks.get(*id).is_some_and(|t| t.name() == Some(name)))
    }

    /// Remove a track, live or waiting to start, handing it back to the
    /// caller. Its sounding notes are released first.
    pub fn unschedule(&mut self, id: TrackId) -> Result<Track> {
        if self.live.contains(&id) {
            self.live.retain(|t| *t != id);
        } else if self.pending.contains(&id) {
            self.pending.retain(|t| *t != id);
        } else {
            return Err(TimelineError::TrackNotFound);
        }
        self.actions.retain(|a| a.function.track() != Some(id));
        let mut track = self.tracks.remove(id).ok_or(TimelineError::TrackNotFound)?;
        track.release_notes(&mut self.outputs);
        tracing::info!(track = ?track.name(), tracks = self.live.len(), "track unscheduled");
        Ok(track)
    }

    /// Look up a track by live position, or by name or id among live and
    /// waiting tracks.
    pub fn get_track<'a>(&self, track: impl Into<TrackRef<'a>>) -> Option<&Track> {
        let id = self.resolve_track(track.into())?;
        self.tracks.get(id)
    }

    pub fn get_track_mut<'a>(&mut self, track: impl Into<TrackRef<'a>>) -> Option<&mut Track> {
        let id = self.resolve_track(track.into())?;
        self.tracks.get_mut(id)
    }

    fn resolve_track(&self, track: TrackRef<'_>) -> Option<TrackId> {
        match track {
            TrackRef::Index(index) => self.live.get(index).copied(),
            TrackRef::Name(name) => self.find_scheduled(Some(name)),
            TrackRef::Id(id) => {
                (self.live.contains(&id) || self.pending.contains(&id)).then_some(id)
            }
        }
    }

    /// Live tracks in evaluation order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> + '_ {
        self.live.iter().filter_map(|id| self.tracks.get(*id))
    }

    pub fn track_count(&self) -> usize {
        self.live.len()
    }

    /// Tracks scheduled with a quantize or delay that have not started yet.
    pub fn waiting_track_count(&self) -> usize {
        self.pending.len()
    }

    /// Unschedule every track, live or waiting. Deferred actions from
    /// [`schedule_action`](Timeline::schedule_action) are kept.
    pub fn clear(&mut self) {
        let ids: Vec<_> = self.live.iter().chain(&self.pending).copied().collect();
        for id in ids {
            // Ids come from the scheduled sets, so this cannot miss.
            let _ = self.unschedule(id);
        }
    }

    // --- Lifecycle ---

    /// Rewind to t = 0 and reset every live track, releasing its notes.
    pub fn reset(&mut self) {
        self.current_time = 0.0;
        for id in &self.live {
            if let Some(track) = self.tracks.get_mut(*id) {
                track.release_notes(&mut self.outputs);
                track.reset();
            }
        }
    }

    /// Snap to the nearest whole beat, shifting tracks and pending
    /// actions by the same amount.
    pub fn reset_to_beat(&mut self) {
        let target = round_beats(self.current_time).round();
        let offset = target - self.current_time;
        self.current_time = target;
        for id in &self.live {
            if let Some(track) = self.tracks.get_mut(*id) {
                track.reset_to_beat();
            }
        }
        self.actions.shift(offset);
    }

    /// Run in the calling thread until the clock stops or, with
    /// `stop_when_done`, everything has played out.
    pub fn run(&mut self, stop_when_done: Option<bool>) -> Result<()> {
        if let Some(stop) = stop_when_done {
            self.stop_when_done = stop;
        }
        let mut clock = self.clock.take().ok_or(TimelineError::AlreadyRunning)?;
        self.start_outputs();
        let result = clock.run(self);
        self.clock = Some(clock);
        self.running = false;
        tracing::info!(time = self.current_time, "timeline finished");
        result
    }

    /// Run on a background thread, returning a handle to control it.
    pub fn start(mut self) -> Result<Playback> {
        let clock = self.clock.take().ok_or(TimelineError::AlreadyRunning)?;
        self.start_outputs();
        Ok(Playback::spawn(self, clock))
    }

    pub(crate) fn start_outputs(&mut self) {
        for id in &self.output_order {
            if let Some(slot) = self.outputs.get_mut(*id) {
                slot.sink.start();
            }
        }
        self.running = true;
        tracing::info!(
            tempo = ?self.tempo(),
            ticks_per_beat = self.ticks_per_beat(),
            "timeline started"
        );
    }

    pub(crate) fn finish_run(&mut self, clock: Box<dyn ClockSource>) {
        self.clock = Some(clock);
        self.running = false;
    }

    /// Silence every output and halt the clock.
    pub fn stop(&mut self) {
        tracing::info!("timeline stopping");
        for id in &self.output_order {
            if let Some(slot) = self.outputs.get_mut(*id) {
                slot.sink.all_notes_off();
                slot.sink.stop();
            }
        }
        self.clock_control.stop();
    }

    /// Multi-line description of outputs and tracks.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPO, DEFAULT_TICKS_PER_BEAT)
    }
}

impl ClockTarget for Timeline {
    fn tick(&mut self) -> Result<TickOutcome> {
        Timeline::tick(self)
    }

    fn reset_to_beat(&mut self) {
        Timeline::reset_to_beat(self)
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = if self.clock_control.is_external() { "external" } else { "internal" };
        match self.tempo() {
            Some(tempo) => writeln!(f, "Timeline (clock: {clock}, tempo {tempo})")?,
            None => writeln!(f, "Timeline (clock: {clock}, tempo unknown)")?,
        }
        writeln!(f, " - {} outputs", self.output_order.len())?;
        for id in &self.output_order {
            if let Some(slot) = self.outputs.get(*id) {
                writeln!(f, "   - {:?} at {} ticks per beat", id, slot.sink.ticks_per_beat())?;
            }
        }
        writeln!(f, " - {} tracks ({} waiting)", self.live.len(), self.pending.len())?;
        for track in self.tracks() {
            writeln!(
                f,
                "   - {} ({} events, next at {:.3})",
                track.name().unwrap_or("<unnamed>"),
                track.event_count(),
                track.next_event_time()
            )?;
        }
        Ok(())
    }
}
