//! Tick-driven event scheduler.
//!
//! A [`Timeline`] advances a set of tracks one clock tick at a time,
//! fires deferred actions, and dispatches note and control events to
//! output sinks running at their own resolutions.

mod action_queue;
pub mod clock;
mod clock_multiplier;
mod error;
mod output;
mod playback;
mod spec;
mod timeline;
mod track;

pub use action_queue::{Action, ActionQueue};
pub use clock::{
    ClockControl, ClockPulse, ClockSource, ClockTarget, ExternalClock, InternalClock, ManualClock,
    TickOutcome, EXTERNAL_TICKS_PER_BEAT,
};
pub use clock_multiplier::ClockMultiplier;
pub use error::{ClockError, Result, TimelineError};
pub use output::{NullOutput, OutputId, OutputSink};
pub use playback::Playback;
pub use spec::{ActionFn, EventSpec, ParamValue};
pub use timeline::{DeferredAction, ScheduleDefaults, ScheduleOptions, Scheduled, Timeline, TrackRef};
pub use track::{EventHook, Interpolation, Track, TrackId, TrackInfo};

// Re-export the core types so callers only need this crate.
pub use tl_ir::{self, params, Event, EventKind, Pattern, PatternError, Value};
