//! Beat-based time arithmetic.
//!
//! Timeline time is an `f64` count of beats. Repeatedly adding
//! `1 / ticks_per_beat` drifts, so every comparison and every
//! quantization boundary goes through [`round_beats`] first.

/// Decimal places kept when comparing beat positions.
pub const BEAT_PRECISION: i32 = 8;

/// Default master resolution (pulses per quarter note).
pub const DEFAULT_TICKS_PER_BEAT: u32 = 480;

/// Default tempo, in beats per minute.
pub const DEFAULT_TEMPO: f64 = 120.0;

const PRECISION_SCALE: f64 = 100_000_000.0;

/// Round a beat position to [`BEAT_PRECISION`] decimal places.
pub fn round_beats(beats: f64) -> f64 {
    libm::round(beats * PRECISION_SCALE) / PRECISION_SCALE
}

/// True when something scheduled at `scheduled` is due at `now`.
pub fn is_due(scheduled: f64, now: f64) -> bool {
    round_beats(scheduled) <= round_beats(now)
}

/// Compute the start time for something scheduled at `now`.
///
/// With a non-zero `quantize` the start is the first multiple of `quantize`
/// at or after `now` (the boundary itself is inclusive), plus `delay`.
/// Without quantization the start is simply `now + delay`.
pub fn quantize_start(now: f64, quantize: Option<f64>, delay: f64) -> f64 {
    let base = match quantize {
        Some(q) if q > 0.0 => {
            let steps = libm::ceil(round_beats(round_beats(now) / q));
            steps * q
        }
        _ => now,
    };
    base + delay
}

/// Translate a duration in seconds to beats at `tempo` bpm.
pub fn seconds_to_beats(seconds: f64, tempo: f64) -> f64 {
    seconds * tempo / 60.0
}

/// Translate a duration in beats to seconds at `tempo` bpm.
pub fn beats_to_seconds(beats: f64, tempo: f64) -> f64 {
    beats * 60.0 / tempo
}
