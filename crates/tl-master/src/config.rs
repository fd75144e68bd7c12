//! Timeline settings loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tl_engine::{ScheduleDefaults, Timeline};
use tl_ir::{DEFAULT_TEMPO, DEFAULT_TICKS_PER_BEAT};

use crate::error::{ControllerError, Result};

/// Settings for a controller's timeline. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Beats per minute
    pub tempo: f64,
    pub ticks_per_beat: u32,
    /// 0 means unbounded
    pub max_tracks: usize,
    pub ignore_exceptions: bool,
    pub stop_when_done: bool,
    /// Applied when a schedule call gives no quantize
    pub quantize: Option<f64>,
    /// Applied when a schedule call gives no delay
    pub delay: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            max_tracks: 0,
            ignore_exceptions: false,
            stop_when_done: false,
            quantize: None,
            delay: 0.0,
        }
    }
}

impl TimelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ControllerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(ControllerError::InvalidConfig(format!(
                "tempo must be positive, got {}",
                self.tempo
            )));
        }
        if self.ticks_per_beat == 0 {
            return Err(ControllerError::InvalidConfig(
                "ticks_per_beat must be at least 1".into(),
            ));
        }
        if self.quantize.is_some_and(|q| q < 0.0) || self.delay < 0.0 {
            return Err(ControllerError::InvalidConfig(
                "quantize and delay cannot be negative".into(),
            ));
        }
        Ok(())
    }

    /// Copy the scheduling settings onto `timeline`.
    pub fn apply(&self, timeline: &mut Timeline) {
        timeline.set_max_tracks(self.max_tracks);
        timeline.set_ignore_exceptions(self.ignore_exceptions);
        timeline.set_stop_when_done(self.stop_when_done);
        timeline.set_defaults(ScheduleDefaults {
            quantize: self.quantize,
            delay: self.delay,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = TimelineConfig::from_json_str(r#"{ "tempo": 90.0 }"#).unwrap();
        assert_eq!(config.tempo, 90.0);
        assert_eq!(config.ticks_per_beat, 480);
        assert!(!config.stop_when_done);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            TimelineConfig::from_json_str(r#"{ "ticks_per_beat": 0 }"#),
            Err(ControllerError::InvalidConfig(_))
        ));
        assert!(matches!(
            TimelineConfig::from_json_str("{ tempo: }"),
            Err(ControllerError::Parse(_))
        ));
    }

    #[test]
    fn survives_a_json_round_trip() {
        let config = TimelineConfig {
            quantize: Some(1.0),
            max_tracks: 8,
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(TimelineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn load_reports_missing_files() {
        let err = TimelineConfig::load("/nonexistent/tickline.json").unwrap_err();
        assert!(matches!(err, ControllerError::Io { .. }));
    }
}
