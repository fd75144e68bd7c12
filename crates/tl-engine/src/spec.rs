//! Declarative event specifications.
//!
//! An [`EventSpec`] maps parameter names to [`ParamValue`]s. Tracks resolve
//! a spec once, when it is installed, into a fixed set of patterns.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tl_ir::{params, Constant, Event, Pattern, Sequence, Value};

use crate::error::{Result, TimelineError};
use crate::timeline::Timeline;

/// Callback executed by an `action` event. Receives the timeline and the
/// event that triggered it.
pub type ActionFn = Arc<dyn Fn(&mut Timeline, &Event) + Send + Sync>;

/// Source of values for one event parameter.
pub enum ParamValue {
    /// The same value for every event
    Value(Value),
    /// Each value once, in order
    List(Vec<Value>),
    /// An arbitrary generator
    Pattern(Box<dyn Pattern>),
    /// Callbacks fired once each, in order
    Actions(Vec<ActionFn>),
}

impl ParamValue {
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }

    pub fn pattern(pattern: impl Pattern + 'static) -> Self {
        ParamValue::Pattern(Box::new(pattern))
    }

    /// Resolve into a generator. Actions are handled by the track itself.
    pub(crate) fn into_pattern(self) -> Option<Box<dyn Pattern>> {
        match self {
            ParamValue::Value(v) => Some(Box::new(Constant(v))),
            ParamValue::List(vs) => Some(Box::new(Sequence::once(vs))),
            ParamValue::Pattern(p) => Some(p),
            ParamValue::Actions(_) => None,
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            ParamValue::List(vs) => f.debug_tuple("List").field(vs).finish(),
            ParamValue::Pattern(_) => f.write_str("Pattern(..)"),
            ParamValue::Actions(a) => write!(f, "Actions({})", a.len()),
        }
    }
}

impl From<Value> for ParamValue {
    fn from(v: Value) -> Self {
        ParamValue::Value(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Value(v.into())
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Value(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Value(v.into())
    }
}

impl From<Sequence> for ParamValue {
    fn from(p: Sequence) -> Self {
        ParamValue::Pattern(Box::new(p))
    }
}

impl From<Constant> for ParamValue {
    fn from(p: Constant) -> Self {
        ParamValue::Pattern(Box::new(p))
    }
}

/// Mapping of parameter name to value source.
#[derive(Debug, Default)]
pub struct EventSpec {
    params: BTreeMap<String, ParamValue>,
}

impl EventSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Add a single action callback.
    pub fn with_action<F>(self, action: F) -> Self
    where
        F: Fn(&mut Timeline, &Event) + Send + Sync + 'static,
    {
        self.with_actions(vec![Arc::new(action) as ActionFn])
    }

    /// Add a sequence of action callbacks, one per event.
    pub fn with_actions(mut self, actions: Vec<ActionFn>) -> Self {
        self.params.insert(params::ACTION.into(), ParamValue::Actions(actions));
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.params.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn into_params(self) -> BTreeMap<String, ParamValue> {
        self.params
    }

    /// Split a multi-step action spec into independent sequences.
    ///
    /// A spec whose `action` holds two or more callbacks becomes a head
    /// spec running only the first callback for the first duration, and a
    /// tail spec running the rest, which must start that many beats later.
    /// Literal parameters are shared by both halves; lists and patterns
    /// stay with the tail. Returns `(spec, 0.0)` untouched otherwise.
    pub(crate) fn expand(mut self) -> Result<Vec<(EventSpec, f64)>> {
        let steps = match self.params.get(params::ACTION) {
            Some(ParamValue::Actions(steps)) if steps.len() > 1 => steps.clone(),
            _ => return Ok(vec![(self, 0.0)]),
        };

        let (head_duration, tail_duration) = match self.params.remove(params::DURATION) {
            None => (params::DEFAULT_DURATION, None),
            Some(ParamValue::Value(v)) => {
                let d = v.as_f64().unwrap_or(params::DEFAULT_DURATION);
                (d, Some(ParamValue::Value(v)))
            }
            Some(ParamValue::List(mut vs)) => {
                if vs.is_empty() {
                    return Err(TimelineError::InvalidSpec(
                        "action sequence needs at least one duration".into(),
                    ));
                }
                let first = vs.remove(0);
                let d = first.as_f64().unwrap_or(params::DEFAULT_DURATION);
                (d, Some(ParamValue::List(vs)))
            }
            Some(other) => {
                return Err(TimelineError::InvalidSpec(format!(
                    "action sequence durations must be literal, got {other:?}"
                )));
            }
        };

        let mut head = EventSpec::new();
        for (key, value) in &self.params {
            if let ParamValue::Value(v) = value {
                head.set(key.clone(), v.clone());
            }
        }
        head.set(params::DURATION, head_duration);
        head = head.with_actions(vec![steps[0].clone()]);

        let mut tail = self;
        if let Some(d) = tail_duration {
            tail.set(params::DURATION, d);
        }
        tail = tail.with_actions(steps[1..].to_vec());

        Ok(vec![(head, 0.0), (tail, head_duration)])
    }
}
