//! Core IR types for the tickline scheduler.
//!
//! This crate defines the values, events and patterns that flow between
//! the timeline and its collaborators. Patterns produce values, tracks
//! turn values into events, and output sinks consume events.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod event;
pub mod params;
mod pattern;
mod time;
mod value;

pub use event::{Event, EventKind};
pub use pattern::{Constant, FromFn, Pattern, PatternError, Sequence};
pub use time::{
    beats_to_seconds, is_due, quantize_start, round_beats, seconds_to_beats, BEAT_PRECISION,
    DEFAULT_TEMPO, DEFAULT_TICKS_PER_BEAT,
};
pub use value::Value;
