//! Error types for the timeline and its clocks.

use tl_ir::PatternError;

/// Result alias carrying [`TimelineError`].
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Errors raised by timeline operations.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// `max_tracks` is set and already reached
    #[error("refusing to schedule track (hit limit of {0})")]
    TrackLimitReached(usize),
    /// The track is not in the live set
    #[error("track is not currently scheduled")]
    TrackNotFound,
    /// No output sink with the given id is registered
    #[error("output sink is not registered")]
    OutputNotFound,
    /// A sole output was requested but several are registered
    #[error("output sink is ambiguous for a timeline with {0} outputs")]
    AmbiguousOutput(usize),
    /// `replace` was requested without a track name
    #[error("must specify a track name if `replace` is specified")]
    ReplaceWithoutName,
    /// The event specification cannot be expanded
    #[error("invalid event specification: {0}")]
    InvalidSpec(String),
    /// A track's generator failed while advancing
    #[error("track `{name}` failed: {source}")]
    Track {
        name: String,
        #[source]
        source: PatternError,
    },
    #[error(transparent)]
    Clock(#[from] ClockError),
    /// The clock is already driving this timeline
    #[error("timeline is already running")]
    AlreadyRunning,
    /// Shared timeline state was poisoned by a panicking thread
    #[error("timeline state has been poisoned")]
    Poisoned,
    #[error("timeline thread panicked")]
    ThreadPanicked,
}

/// Errors raised by clock sources.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClockError {
    /// Tempo and resolution are dictated by the external device
    #[error("clock is driven externally; {0} cannot be set")]
    ExternallyDriven(&'static str),
    #[error("invalid tempo {0} bpm")]
    InvalidTempo(f64),
    #[error("invalid resolution {0} ticks per beat")]
    InvalidResolution(u32),
    /// The external pulse source hung up
    #[error("clock input disconnected")]
    Disconnected,
}
