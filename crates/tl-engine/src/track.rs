//! A single scheduled event sequence.

use std::collections::BTreeMap;

use slotmap::SlotMap;
use tl_ir::{is_due, params, round_beats, Event, EventKind, Pattern, PatternError, Value};

use crate::output::{OutputId, OutputSlot};
use crate::spec::{ActionFn, EventSpec, ParamValue};

slotmap::new_key_type! {
    /// Handle for a track owned by a timeline.
    pub struct TrackId;
}

/// Upper bound on zero-length events generated within one tick.
const MAX_EVENTS_PER_TICK: usize = 4096;

/// How control values move between successive control events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Jump to each value when its event fires
    #[default]
    None,
    /// Ramp from the previous value, reaching the new one when the event ends
    Linear,
}

/// Identity of the track that produced an event.
#[derive(Clone, Copy, Debug)]
pub struct TrackInfo<'a> {
    pub id: TrackId,
    pub name: Option<&'a str>,
}

/// Observer invoked once per dispatched event.
pub type EventHook = Box<dyn FnMut(TrackInfo<'_>, &Event) + Send>;

/// Borrowed timeline state a track needs while advancing.
pub(crate) struct TickContext<'a> {
    pub tick_duration: f64,
    pub outputs: &'a mut SlotMap<OutputId, OutputSlot>,
    pub hook: Option<&'a mut EventHook>,
    /// Action events fired by this track, run by the timeline afterwards
    pub actions: &'a mut Vec<(ActionFn, Event)>,
}

#[derive(Clone, Copy, Debug)]
struct NoteOff {
    time: f64,
    note: u8,
    channel: u8,
}

#[derive(Clone, Copy, Debug)]
struct ControlRamp {
    control: u8,
    channel: u8,
    from: f64,
    to: f64,
    start: f64,
    end: f64,
    last_sent: u8,
}

/// A spec resolved into generators.
struct EventStream {
    patterns: Vec<(String, Box<dyn Pattern>)>,
    actions: Option<Vec<ActionFn>>,
    action_pos: usize,
}

impl EventStream {
    fn from_spec(spec: EventSpec) -> Self {
        let mut patterns = Vec::new();
        let mut actions = None;
        for (key, value) in spec.into_params() {
            match value {
                ParamValue::Actions(steps) => actions = Some(steps),
                other => {
                    if let Some(p) = other.into_pattern() {
                        patterns.push((key, p));
                    }
                }
            }
        }
        Self { patterns, actions, action_pos: 0 }
    }

    /// Pull one event's worth of values. `Ok(None)` once any source runs dry.
    fn next(&mut self) -> Result<Option<(BTreeMap<String, Value>, Option<ActionFn>)>, PatternError> {
        let action = match &self.actions {
            Some(steps) => match steps.get(self.action_pos) {
                Some(step) => Some(step.clone()),
                None => return Ok(None),
            },
            None => None,
        };

        let mut values = BTreeMap::new();
        for (key, pattern) in &mut self.patterns {
            match pattern.next_value()? {
                Some(v) => {
                    values.insert(key.clone(), v);
                }
                None => return Ok(None),
            }
        }

        if action.is_some() {
            self.action_pos += 1;
        }
        Ok(Some((values, action)))
    }

    fn reset(&mut self) {
        for (_, pattern) in &mut self.patterns {
            pattern.reset();
        }
        self.action_pos = 0;
    }
}

/// Build a concrete event from one set of generated values.
fn build_event(mut values: BTreeMap<String, Value>, is_action: bool, time: f64) -> Event {
    let num = |values: &mut BTreeMap<String, Value>, key: &str| {
        values.remove(key).and_then(|v| v.as_f64())
    };
    let duration = num(&mut values, params::DURATION)
        .unwrap_or(params::DEFAULT_DURATION)
        .max(0.0);
    let gate = num(&mut values, params::GATE).unwrap_or(params::DEFAULT_GATE);
    let amplitude = values
        .remove(params::AMPLITUDE)
        .and_then(|v| v.as_u7())
        .unwrap_or(params::DEFAULT_AMPLITUDE);
    let channel = values
        .remove(params::CHANNEL)
        .and_then(|v| v.as_u7())
        .unwrap_or(params::DEFAULT_CHANNEL);
    let control = values.remove(params::CONTROL).and_then(|v| v.as_u7());
    let value = values.remove(params::VALUE);
    let note = values.remove(params::NOTE);

    let kind = if is_action {
        if let Some(v) = value {
            values.insert(params::VALUE.into(), v);
        }
        EventKind::Action
    } else if let Some(control) = control {
        let value = value.and_then(|v| v.as_u7()).unwrap_or(0);
        EventKind::Control { control, value }
    } else {
        match note {
            None => EventKind::Note { note: 60, amplitude, gate },
            Some(v) => match v.as_u7() {
                Some(note) => EventKind::Note { note, amplitude, gate },
                None => EventKind::Rest,
            },
        }
    };

    Event { time, duration, channel, kind, args: values }
}

/// One independently advancing sequence of events.
///
/// Tracks keep their own copy of the timeline clock so that note-off
/// bookkeeping survives parameter updates and beat resyncs.
pub struct Track {
    id: TrackId,
    name: Option<String>,
    output: OutputId,
    stream: EventStream,
    interpolation: Interpolation,
    max_event_count: Option<usize>,
    remove_when_done: bool,
    current_time: f64,
    next_event_time: f64,
    event_count: usize,
    exhausted: bool,
    note_offs: Vec<NoteOff>,
    last_control: Option<(u8, u8, f64)>,
    ramp: Option<ControlRamp>,
}

impl Track {
    pub(crate) fn new(
        id: TrackId,
        spec: EventSpec,
        output: OutputId,
        options: TrackOptions,
        start_time: f64,
    ) -> Self {
        Self {
            id,
            name: options.name,
            output,
            stream: EventStream::from_spec(spec),
            interpolation: options.interpolation,
            max_event_count: options.count,
            remove_when_done: options.remove_when_done,
            current_time: start_time,
            next_event_time: start_time,
            event_count: 0,
            exhausted: false,
            note_offs: Vec::new(),
            last_control: None,
            ramp: None,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn output(&self) -> OutputId {
        self.output
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    /// Events generated so far.
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn remove_when_done(&self) -> bool {
        self.remove_when_done
    }

    /// True once generation is over and every note has been released.
    pub fn is_finished(&self) -> bool {
        self.exhausted && self.note_offs.is_empty() && self.ramp.is_none()
    }

    /// Attach to a new slot and sink when re-added to a timeline.
    pub(crate) fn rebind(&mut self, id: TrackId, output: OutputId, name: Option<String>) {
        self.id = id;
        self.output = output;
        if name.is_some() {
            self.name = name;
        }
    }

    pub(crate) fn set_current_time(&mut self, time: f64) {
        let offset = time - self.current_time;
        self.shift(offset);
    }

    /// Replace this track's parameters. New events start at the track's
    /// current time; sounding notes still get their note-offs.
    pub fn update(&mut self, spec: EventSpec, interpolation: Option<Interpolation>) {
        self.stream = EventStream::from_spec(spec);
        if let Some(interpolation) = interpolation {
            self.interpolation = interpolation;
        }
        self.next_event_time = self.current_time;
        self.exhausted = false;
        self.ramp = None;
    }

    /// Rewind to t = 0 and restart every generator.
    ///
    /// Outstanding note-offs are dropped; a timeline releases them on the
    /// sink before calling this.
    pub fn reset(&mut self) {
        self.stream.reset();
        self.current_time = 0.0;
        self.next_event_time = 0.0;
        self.event_count = 0;
        self.exhausted = false;
        self.note_offs.clear();
        self.last_control = None;
        self.ramp = None;
    }

    /// Snap the clock to the nearest whole beat, moving pending events by
    /// the same amount.
    pub fn reset_to_beat(&mut self) {
        let offset = nearest_beat(self.current_time) - self.current_time;
        self.shift(offset);
    }

    fn shift(&mut self, offset: f64) {
        self.current_time += offset;
        self.next_event_time += offset;
        for off in &mut self.note_offs {
            off.time += offset;
        }
        if let Some(ramp) = &mut self.ramp {
            ramp.start += offset;
            ramp.end += offset;
        }
    }

    /// Send every note-off that has come due.
    pub(crate) fn process_note_offs(&mut self, outputs: &mut SlotMap<OutputId, OutputSlot>) {
        self.send_note_offs(outputs, false);
    }

    /// Send every outstanding note-off now, due or not.
    pub(crate) fn release_notes(&mut self, outputs: &mut SlotMap<OutputId, OutputSlot>) {
        self.send_note_offs(outputs, true);
    }

    fn send_note_offs(&mut self, outputs: &mut SlotMap<OutputId, OutputSlot>, all: bool) {
        if self.note_offs.is_empty() {
            return;
        }
        let now = self.current_time;
        let output = outputs.get_mut(self.output);
        let mut sink = output.map(|slot| &mut slot.sink);
        self.note_offs.retain(|off| {
            if !all && !is_due(off.time, now) {
                return true;
            }
            if let Some(sink) = sink.as_mut() {
                sink.note_off(off.note, off.channel);
            }
            false
        });
    }

    /// Advance by one tick, generating every event that has come due.
    pub(crate) fn tick(&mut self, ctx: &mut TickContext<'_>) -> Result<(), PatternError> {
        let mut generated = 0;
        while !self.exhausted && is_due(self.next_event_time, self.current_time) {
            if self.max_event_count.is_some_and(|max| self.event_count >= max) {
                self.exhausted = true;
                break;
            }
            let Some((values, action)) = self.stream.next()? else {
                self.exhausted = true;
                break;
            };
            let event = build_event(values, action.is_some(), self.current_time);
            self.next_event_time += event.duration;
            self.event_count += 1;
            self.perform(event, action, ctx);

            generated += 1;
            if generated >= MAX_EVENTS_PER_TICK {
                return Err(PatternError::msg("too many zero-length events in one tick"));
            }
        }
        if self.max_event_count.is_some_and(|max| self.event_count >= max) {
            self.exhausted = true;
        }

        self.advance_ramp(ctx);
        self.current_time += ctx.tick_duration;
        Ok(())
    }

    fn perform(&mut self, event: Event, action: Option<ActionFn>, ctx: &mut TickContext<'_>) {
        match event.kind {
            EventKind::Note { note, amplitude, .. } => {
                let sink = ctx.outputs.get_mut(self.output).map(|slot| &mut slot.sink);
                if let (Some(length), Some(sink)) = (event.note_length(), sink) {
                    sink.note_on(note, amplitude, event.channel);
                    self.note_offs.push(NoteOff {
                        time: self.current_time + length,
                        note,
                        channel: event.channel,
                    });
                } else if amplitude > 0 {
                    tracing::trace!(note, "no output sink for note");
                }
            }
            EventKind::Control { control, value } => {
                if let (Some(ramp), Some(slot)) = (self.ramp.take(), ctx.outputs.get_mut(self.output)) {
                    let target = ramp.to as u8;
                    if target != ramp.last_sent {
                        slot.sink.control(ramp.control, target, ramp.channel);
                    }
                }
                let sink = ctx.outputs.get_mut(self.output).map(|slot| &mut slot.sink);
                let previous = self
                    .last_control
                    .filter(|(c, ch, _)| *c == control && *ch == event.channel)
                    .map(|(_, _, v)| v);
                match (self.interpolation, previous) {
                    (Interpolation::Linear, Some(from)) if event.duration > 0.0 => {
                        self.ramp = Some(ControlRamp {
                            control,
                            channel: event.channel,
                            from,
                            to: value as f64,
                            start: self.current_time,
                            end: self.current_time + event.duration,
                            last_sent: from as u8,
                        });
                    }
                    _ => {
                        self.ramp = None;
                        if let Some(sink) = sink {
                            sink.control(control, value, event.channel);
                        }
                    }
                }
                self.last_control = Some((control, event.channel, value as f64));
            }
            EventKind::Rest => {}
            EventKind::Action => {
                if let Some(action) = action {
                    ctx.actions.push((action, event.clone()));
                }
            }
        }

        if let Some(hook) = ctx.hook.as_deref_mut() {
            let info = TrackInfo { id: self.id, name: self.name.as_deref() };
            hook(info, &event);
        }
    }

    /// Emit the interpolated control value for this tick.
    fn advance_ramp(&mut self, ctx: &mut TickContext<'_>) {
        let Some(ramp) = &mut self.ramp else {
            return;
        };
        let t = self.current_time;
        let done = is_due(ramp.end, t);
        let value = if done {
            ramp.to
        } else {
            let pos = ((t - ramp.start) / (ramp.end - ramp.start)).clamp(0.0, 1.0);
            ramp.from + (ramp.to - ramp.from) * pos
        };
        let value = value.round().clamp(0.0, 127.0) as u8;
        if value != ramp.last_sent {
            if let Some(slot) = ctx.outputs.get_mut(self.output) {
                slot.sink.control(ramp.control, value, ramp.channel);
            }
            ramp.last_sent = value;
        }
        if done {
            self.ramp = None;
        }
    }
}

fn nearest_beat(beats: f64) -> f64 {
    round_beats(beats).round()
}

/// Per-track settings chosen at scheduling time.
#[derive(Clone, Debug)]
pub(crate) struct TrackOptions {
    pub name: Option<String>,
    pub count: Option<usize>,
    pub interpolation: Interpolation,
    pub remove_when_done: bool,
}
