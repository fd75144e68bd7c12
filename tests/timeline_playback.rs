//! Integration tests: schedule tracks → run a clock → verify dispatched events.

use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::unbounded;
use tl_engine::{
    params, ClockPulse, EventKind, EventSpec, ExternalClock, ManualClock, ParamValue, PatternError,
    ScheduleOptions, TickOutcome, Timeline, TimelineError,
};
use tl_io::{Message, RecordingOutput, RingOutput};
use tl_ir::{FromFn, Sequence, Value};

type Events = Arc<Mutex<Vec<(Option<String>, f64, EventKind)>>>;

fn manual_timeline(ticks_per_beat: u32) -> (Timeline, Events) {
    let mut timeline = Timeline::with_clock(ManualClock::new(120.0, ticks_per_beat));
    let events: Events = Arc::default();
    let sink = events.clone();
    timeline.set_event_hook(move |info, event| {
        sink.lock()
            .unwrap()
            .push((info.name.map(str::to_string), event.time, event.kind.clone()));
    });
    (timeline, events)
}

fn failing_spec() -> EventSpec {
    let mut calls = 0;
    EventSpec::new().with(
        params::NOTE,
        ParamValue::pattern(FromFn::new(move || {
            calls += 1;
            if calls > 1 {
                Err(PatternError::msg("generator failed"))
            } else {
                Ok(Some(Value::Int(60)))
            }
        })),
    )
}

// --- Clock ---

#[test]
fn elapsed_time_matches_ticks_over_resolution() {
    let (mut timeline, _) = manual_timeline(480);
    for _ in 0..960 {
        timeline.tick().unwrap();
    }
    assert!((timeline.current_time() - 2.0).abs() < 1e-9);

    timeline.set_tempo(200.0).unwrap();
    for _ in 0..480 {
        timeline.tick().unwrap();
    }
    assert!((timeline.current_time() - 3.0).abs() < 1e-9);
}

#[test]
fn resolution_change_keeps_outputs_in_step() {
    let (mut timeline, _) = manual_timeline(480);
    let out = RecordingOutput::new(24);
    let recording = out.recording();
    timeline.add_output(out);
    timeline
        .schedule(EventSpec::new().with(params::NOTE, 60), ScheduleOptions::new())
        .unwrap();

    for _ in 0..480 {
        timeline.tick().unwrap();
    }
    timeline.set_ticks_per_beat(96).unwrap();
    for _ in 0..96 {
        timeline.tick().unwrap();
    }
    timeline.tick().unwrap();

    let stamps: Vec<u64> = recording.note_ons().iter().map(|m| m.tick).collect();
    assert_eq!(stamps, [0, 24, 48]);
}

// --- Scenario ---

#[test]
fn counted_track_plays_exactly_count_events() {
    let (mut timeline, events) = manual_timeline(480);
    timeline.set_tempo(120.0).unwrap();
    timeline
        .schedule(
            EventSpec::new().with(params::NOTE, Sequence::new([60, 62], None)),
            ScheduleOptions::new().count(4).name("counted"),
        )
        .unwrap();

    timeline.run(Some(true)).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 4);
    assert!(events.windows(2).all(|w| w[0].1 <= w[1].1));
    assert_eq!(timeline.track_count(), 0);
}

#[test]
fn quantized_tracks_line_up_on_the_beat() {
    let (mut timeline, events) = manual_timeline(480);
    for _ in 0..137 {
        timeline.tick().unwrap();
    }
    timeline
        .schedule(EventSpec::new(), ScheduleOptions::new().quantize(1.0).count(1).name("q"))
        .unwrap();
    timeline
        .schedule(
            EventSpec::new(),
            ScheduleOptions::new().quantize(1.0).delay(0.5).count(1).name("qd"),
        )
        .unwrap();
    for _ in 0..960 {
        timeline.tick().unwrap();
    }

    let events = events.lock().unwrap();
    let starts: Vec<_> = events.iter().map(|(name, t, _)| (name.clone().unwrap(), *t)).collect();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[0].0, "q");
    assert!((starts[0].1 - 1.0).abs() < 1e-9);
    assert_eq!(starts[1].0, "qd");
    assert!((starts[1].1 - 1.5).abs() < 1e-9);
}

#[test]
fn outputs_receive_translated_ticks() {
    let (mut timeline, _) = manual_timeline(480);
    let slow = RecordingOutput::new(24);
    let fast = RecordingOutput::new(96);
    let (slow_rec, fast_rec) = (slow.recording(), fast.recording());
    let slow_id = timeline.add_output(slow);
    let fast_id = timeline.add_output(fast);
    for id in [slow_id, fast_id] {
        timeline
            .schedule(
                EventSpec::new().with(params::NOTE, Sequence::once([60, 62, 64, 65])),
                ScheduleOptions::new().output(id),
            )
            .unwrap();
    }

    timeline.run(Some(true)).unwrap();

    let slow_ticks: Vec<u64> = slow_rec.note_ons().iter().map(|m| m.tick).collect();
    let fast_ticks: Vec<u64> = fast_rec.note_ons().iter().map(|m| m.tick).collect();
    assert_eq!(slow_ticks, [0, 24, 48, 72]);
    assert_eq!(fast_ticks, [0, 96, 192, 288]);
    assert_eq!(slow_rec.messages().first().map(|m| m.message), Some(Message::Start));
}

// --- Robustness ---

#[test]
fn track_failure_aborts_the_tick_by_default() {
    let (mut timeline, _) = manual_timeline(4);
    timeline
        .schedule(failing_spec().with(params::DURATION, 0.25), ScheduleOptions::new().name("bad"))
        .unwrap();
    timeline.tick().unwrap();
    let err = timeline.tick().unwrap_err();
    assert!(matches!(err, TimelineError::Track { ref name, .. } if name == "bad"));
    assert!(err.to_string().contains("generator failed"));
}

#[test]
fn ignored_failures_only_remove_the_failing_track() {
    let (mut timeline, events) = manual_timeline(4);
    timeline.set_ignore_exceptions(true);
    timeline
        .schedule(failing_spec().with(params::DURATION, 0.25), ScheduleOptions::new().name("bad"))
        .unwrap();
    timeline
        .schedule(
            EventSpec::new().with(params::DURATION, 0.25),
            ScheduleOptions::new().name("good"),
        )
        .unwrap();

    for _ in 0..5 {
        timeline.tick().unwrap();
    }

    assert_eq!(timeline.track_count(), 1);
    assert!(timeline.get_track("good").is_some());
    let events = events.lock().unwrap();
    let good = events.iter().filter(|e| e.0.as_deref() == Some("good")).count();
    let bad = events.iter().filter(|e| e.0.as_deref() == Some("bad")).count();
    assert_eq!(good, 5);
    assert_eq!(bad, 1);
}

// --- Lifecycle ---

#[test]
fn clear_leaves_nothing_to_play() {
    let (mut timeline, _) = manual_timeline(480);
    let out = RecordingOutput::new(24);
    let recording = out.recording();
    timeline.add_output(out);
    timeline.set_stop_when_done(true);
    for name in ["a", "b", "c"] {
        timeline
            .schedule(EventSpec::new(), ScheduleOptions::new().name(name))
            .unwrap();
    }
    timeline.tick().unwrap();
    timeline
        .schedule(EventSpec::new(), ScheduleOptions::new().quantize(1.0).name("late"))
        .unwrap();
    timeline.clear();
    assert_eq!(timeline.tracks().count(), 0);
    assert_eq!(timeline.waiting_track_count(), 0);
    assert_eq!(timeline.tick().unwrap(), TickOutcome::Exhausted);

    let offs = recording
        .messages()
        .iter()
        .filter(|m| matches!(m.message, Message::NoteOff { .. }))
        .count();
    assert_eq!(recording.note_ons().len(), 3);
    assert_eq!(offs, 3);
}

#[test]
fn unscheduled_tracks_cannot_be_removed_twice() {
    let (mut timeline, _) = manual_timeline(480);
    let id = timeline
        .schedule(EventSpec::new(), ScheduleOptions::new())
        .unwrap()
        .id()
        .unwrap();
    let track = timeline.unschedule(id).unwrap();
    assert_eq!(track.id(), id);
    assert!(matches!(timeline.unschedule(id), Err(TimelineError::TrackNotFound)));
}

#[test]
fn stop_silences_sounding_notes() {
    let (mut timeline, _) = manual_timeline(4);
    let out = RecordingOutput::new(4);
    let recording = out.recording();
    timeline.add_output(out);
    timeline
        .schedule(EventSpec::new().with(params::DURATION, 4.0), ScheduleOptions::new())
        .unwrap();
    timeline.tick().unwrap();
    timeline.stop();

    let messages: Vec<Message> = recording.messages().iter().map(|m| m.message).collect();
    assert_eq!(
        messages,
        [
            Message::NoteOn { note: 60, velocity: 64, channel: 0 },
            Message::NoteOff { note: 60, channel: 0 },
            Message::Stop,
        ]
    );
}

#[test]
fn reset_rewinds_every_track() {
    let (mut timeline, events) = manual_timeline(4);
    timeline
        .schedule(
            EventSpec::new().with(params::NOTE, Sequence::once([60, 62, 64])),
            ScheduleOptions::new(),
        )
        .unwrap();
    for _ in 0..6 {
        timeline.tick().unwrap();
    }
    timeline.reset();
    assert_eq!(timeline.current_time(), 0.0);
    timeline.tick().unwrap();

    let notes: Vec<_> = events
        .lock()
        .unwrap()
        .iter()
        .map(|(_, t, kind)| (*t, kind.clone()))
        .collect();
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[2].0, 0.0);
    assert!(matches!(notes[2].1, EventKind::Note { note: 60, .. }));
}

// --- Threads ---

#[test]
fn external_pulses_drive_the_timeline() {
    let (tx, rx) = unbounded();
    let mut timeline = Timeline::with_clock(ExternalClock::new(rx));
    let out = RecordingOutput::new(24);
    let recording = out.recording();
    timeline.add_output(out);
    timeline
        .schedule(
            EventSpec::new().with(params::NOTE, Sequence::once([60, 62])),
            ScheduleOptions::new(),
        )
        .unwrap();
    assert_eq!(timeline.tempo(), None);

    let playback = timeline.start().unwrap();
    for _ in 0..30 {
        tx.send(ClockPulse::Tick).unwrap();
    }
    while playback.with(|tl| tl.current_time()).unwrap() < 1.25 - 1e-9 {
        thread::yield_now();
    }
    playback.stop().unwrap();
    let timeline = playback.join().unwrap();

    assert!((timeline.current_time() - 1.25).abs() < 1e-9);
    assert_eq!(recording.note_ons().len(), 2);
}

#[test]
fn ring_output_feeds_another_thread() {
    let (mut timeline, _) = manual_timeline(480);
    let (out, mut rx) = RingOutput::new(24, 64);
    timeline.add_output(out);
    timeline
        .schedule(
            EventSpec::new().with(params::NOTE, Sequence::once([60, 64, 67])),
            ScheduleOptions::new(),
        )
        .unwrap();
    timeline.set_stop_when_done(true);

    let playback = timeline.start().unwrap();
    let reader = thread::spawn(move || {
        let mut notes = Vec::new();
        while notes.len() < 3 {
            for stamped in rx.drain() {
                if let Message::NoteOn { note, .. } = stamped.message {
                    notes.push((stamped.tick, note));
                }
            }
            thread::yield_now();
        }
        notes
    });

    playback.join().unwrap();
    assert_eq!(reader.join().unwrap(), [(0, 60), (24, 64), (48, 67)]);
}
