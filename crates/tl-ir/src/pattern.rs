//! Value generators consumed by tracks.
//!
//! Only the minimal generators the scheduler needs live here: a constant,
//! a finite or repeating sequence, and a closure adapter. Anything richer
//! implements [`Pattern`] directly.

use alloc::string::String;
use alloc::vec::Vec;

use crate::value::Value;

/// Failure raised while generating a value.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern failed: {0}")]
    Failed(String),
}

impl PatternError {
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Failed(msg.into())
    }
}

/// A stateful generator of parameter values.
///
/// `Ok(None)` means the pattern is exhausted; the track that owns it
/// stops generating events.
pub trait Pattern: Send {
    fn next_value(&mut self) -> Result<Option<Value>, PatternError>;

    /// Rewind to the first value.
    fn reset(&mut self) {}
}

/// Repeats one value forever.
#[derive(Clone, Debug)]
pub struct Constant(pub Value);

impl Pattern for Constant {
    fn next_value(&mut self) -> Result<Option<Value>, PatternError> {
        Ok(Some(self.0.clone()))
    }
}

/// Steps through a list of values, `repeats` times (forever if `None`).
#[derive(Clone, Debug)]
pub struct Sequence {
    values: Vec<Value>,
    repeats: Option<usize>,
    pos: usize,
    pass: usize,
}

impl Sequence {
    pub fn new<I, V>(values: I, repeats: Option<usize>) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            repeats,
            pos: 0,
            pass: 0,
        }
    }

    /// Play the values exactly once.
    pub fn once<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(values, Some(1))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl Pattern for Sequence {
    fn next_value(&mut self) -> Result<Option<Value>, PatternError> {
        if self.values.is_empty() {
            return Ok(None);
        }
        if self.pos >= self.values.len() {
            self.pos = 0;
            self.pass += 1;
        }
        if self.repeats.is_some_and(|r| self.pass >= r) {
            return Ok(None);
        }
        let value = self.values[self.pos].clone();
        self.pos += 1;
        Ok(Some(value))
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.pass = 0;
    }
}

/// Adapts a closure into a pattern. Reset is a no-op.
pub struct FromFn<F>(pub F);

impl<F> FromFn<F>
where
    F: FnMut() -> Result<Option<Value>, PatternError> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Pattern for FromFn<F>
where
    F: FnMut() -> Result<Option<Value>, PatternError> + Send,
{
    fn next_value(&mut self) -> Result<Option<Value>, PatternError> {
        (self.0)()
    }
}
