//! Deterministic timer queue.
//!
//! The only temporal primitive the core needs from its host: callers schedule
//! events at absolute times on a monotonic clock they own, then drain due
//! events with [`TimerQueue::pop_due`]. There is no background thread and no
//! self-rescheduling callback chain; cancellation removes pending entries in
//! one operation.

use crate::numeric::Real;

/// Handle returned by [`TimerQueue::schedule`], usable to cancel the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct TimerEntry<E> {
    handle: u64,
    due: Real,
    event: E,
}

/// Ordered queue of future events on a caller-owned monotonic clock.
///
/// Events scheduled for the same due time fire in schedule order, so a
/// cycle-end event scheduled after the per-actuator transitions of its cycle
/// is guaranteed to fire after them.
#[derive(Debug)]
pub struct TimerQueue<E> {
    next_handle: u64,
    entries: Vec<TimerEntry<E>>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            entries: Vec::new(),
        }
    }

    /// Schedule `event` at absolute time `due` (seconds).
    pub fn schedule(&mut self, due: Real, event: E) -> TimerHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.entries.push(TimerEntry { handle, due, event });
        TimerHandle(handle)
    }

    /// Cancel one pending entry. Returns `false` if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle.0);
        self.entries.len() != before
    }

    /// Cancel every pending entry. Safe to call on an empty queue.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Pop the earliest event whose due time has been reached.
    ///
    /// Ties are broken by schedule order (handles are monotonic).
    pub fn pop_due(&mut self, now: Real) -> Option<E> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by(|(_, a), (_, b)| {
                a.due
                    .partial_cmp(&b.due)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.handle.cmp(&b.handle))
            })
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(idx).event)
    }

    /// Due time of the earliest pending entry, if any.
    pub fn next_due(&self) -> Option<Real> {
        self.entries
            .iter()
            .map(|e| e.due)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_due_order() {
        let mut q = TimerQueue::new();
        q.schedule(3.0, "c");
        q.schedule(1.0, "a");
        q.schedule(2.0, "b");

        assert_eq!(q.pop_due(10.0), Some("a"));
        assert_eq!(q.pop_due(10.0), Some("b"));
        assert_eq!(q.pop_due(10.0), Some("c"));
        assert_eq!(q.pop_due(10.0), None);
    }

    #[test]
    fn nothing_due_before_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(5.0, ());
        assert_eq!(q.pop_due(4.9), None);
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(5.0), Some(()));
    }

    #[test]
    fn same_due_time_fires_in_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(1.0, "first");
        q.schedule(1.0, "second");
        assert_eq!(q.pop_due(1.0), Some("first"));
        assert_eq!(q.pop_due(1.0), Some("second"));
    }

    #[test]
    fn cancel_removes_entry() {
        let mut q = TimerQueue::new();
        let h = q.schedule(1.0, "x");
        assert!(q.cancel(h));
        assert!(!q.cancel(h));
        assert_eq!(q.pop_due(2.0), None);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut q: TimerQueue<()> = TimerQueue::new();
        q.schedule(1.0, ());
        q.clear();
        q.clear();
        assert!(q.is_empty());
    }

    #[test]
    fn next_due_reports_earliest() {
        let mut q = TimerQueue::new();
        assert_eq!(q.next_due(), None);
        q.schedule(4.0, ());
        q.schedule(2.0, ());
        assert_eq!(q.next_due(), Some(2.0));
    }
}
