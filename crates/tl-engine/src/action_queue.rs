//! Deferred one-shot work keyed by beat time.

use tl_ir::is_due;

/// A callback to run once the timeline reaches `time`.
pub struct Action<F> {
    pub time: f64,
    pub function: F,
}

/// Unordered collection of pending actions.
///
/// Firing is two-phase: [`ActionQueue::take_due`] moves every due action
/// out of the queue before any of them runs, so callbacks can push new
/// actions without disturbing the pass in progress.
pub struct ActionQueue<F> {
    actions: Vec<Action<F>>,
}

impl<F> ActionQueue<F> {
    pub fn new() -> Self {
        Self { actions: Vec::new() }
    }

    /// Queue `function` to run at beat `time`.
    pub fn push(&mut self, time: f64, function: F) {
        self.actions.push(Action { time, function });
    }

    /// Remove and return every action due at `now`, in insertion order.
    pub fn take_due(&mut self, now: f64) -> Vec<Action<F>> {
        if !self.actions.iter().any(|a| is_due(a.time, now)) {
            return Vec::new();
        }
        let (due, pending) = std::mem::take(&mut self.actions)
            .into_iter()
            .partition(|a| is_due(a.time, now));
        self.actions = pending;
        due
    }

    /// Earliest scheduled time, if any action is pending.
    pub fn next_time(&self) -> Option<f64> {
        self.actions.iter().map(|a| a.time).reduce(f64::min)
    }

    /// Shift every pending action by `offset` beats.
    pub fn shift(&mut self, offset: f64) {
        for action in &mut self.actions {
            action.time += offset;
        }
    }

    /// Drop every pending action for which `keep` returns false.
    pub fn retain(&mut self, keep: impl FnMut(&Action<F>) -> bool) {
        self.actions.retain(keep);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

impl<F> Default for ActionQueue<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_only_due_actions() {
        let mut queue = ActionQueue::new();
        queue.push(2.0, "late");
        queue.push(0.5, "early");
        queue.push(1.0, "on-time");

        let due: Vec<_> = queue.take_due(1.0).into_iter().map(|a| a.function).collect();
        assert_eq!(due, vec!["early", "on-time"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_time(), Some(2.0));
    }

    #[test]
    fn due_check_tolerates_drift() {
        let mut queue = ActionQueue::new();
        queue.push(1.0, ());
        let mut now = 0.0;
        for _ in 0..480 {
            now += 1.0 / 480.0;
        }
        assert_eq!(queue.take_due(now).len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn nothing_due_leaves_queue_untouched() {
        let mut queue = ActionQueue::new();
        queue.push(4.0, 1);
        assert!(queue.take_due(3.99).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn shift_moves_pending_actions() {
        let mut queue = ActionQueue::new();
        queue.push(2.0, ());
        queue.shift(-1.5);
        assert_eq!(queue.take_due(0.5).len(), 1);
    }

    #[test]
    fn retain_cancels_matching_actions() {
        let mut queue = ActionQueue::new();
        queue.push(1.0, 'a');
        queue.push(1.0, 'b');
        queue.push(2.0, 'a');
        queue.retain(|a| a.function != 'a');
        assert_eq!(queue.len(), 1);
        let due: Vec<_> = queue.take_due(2.0).into_iter().map(|a| a.function).collect();
        assert_eq!(due, ['b']);
    }
}
