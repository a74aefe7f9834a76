//! Cancelable single-shot timers on the control thread.
//!
//! The control thread owns a [`Timers`] set and polls it with a monotonic
//! `Instant`. Nothing fires on its own: callers ask for [`Timers::expired`] and
//! dispatch the returned ids, ignoring ids whose owner has moved on.

use std::time::{Duration, Instant};

/// Identifies one scheduled timer. Ids are never reused by a `Timers` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Default)]
pub struct Timers {
    next_id: u64,
    /// Sorted by deadline, then by id.
    pending: Vec<(Instant, TimerId)>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a timer that expires `delay` after `now`.
    pub fn schedule(&mut self, now: Instant, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let deadline = now + delay;
        let index = self
            .pending
            .partition_point(|&(pending_deadline, _)| pending_deadline <= deadline);
        self.pending.insert(index, (deadline, id));
        id
    }

    /// Returns `false` if the timer already fired or was canceled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.pending.iter().position(|&(_, pending)| pending == id) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// `true` while the timer is scheduled and its deadline is still ahead of `now`.
    pub fn is_pending(&self, id: TimerId, now: Instant) -> bool {
        self.pending
            .iter()
            .any(|&(deadline, pending)| pending == id && deadline > now)
    }

    /// Removes and returns every timer whose deadline is at or before `now`,
    /// earliest first.
    pub fn expired(&mut self, now: Instant) -> Vec<TimerId> {
        let count = self
            .pending
            .partition_point(|&(deadline, _)| deadline <= now);
        self.pending.drain(..count).map(|(_, id)| id).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().map(|&(deadline, _)| deadline)
    }

    /// Cancels everything. Used on teardown.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_in_deadline_order() {
        let mut timers = Timers::new();
        let t0 = Instant::now();
        let late = timers.schedule(t0, Duration::from_millis(300));
        let early = timers.schedule(t0, Duration::from_millis(100));

        assert!(timers.expired(t0 + Duration::from_millis(50)).is_empty());
        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_millis(100)));
        assert_eq!(timers.expired(t0 + Duration::from_millis(400)), vec![early, late]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancel() {
        let mut timers = Timers::new();
        let t0 = Instant::now();
        let id = timers.schedule(t0, Duration::from_millis(10));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(timers.expired(t0 + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_is_pending_tracks_deadline() {
        let mut timers = Timers::new();
        let t0 = Instant::now();
        let id = timers.schedule(t0, Duration::from_millis(150));
        assert!(timers.is_pending(id, t0 + Duration::from_millis(149)));
        assert!(!timers.is_pending(id, t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_ids_not_reused_after_clear() {
        let mut timers = Timers::new();
        let t0 = Instant::now();
        let first = timers.schedule(t0, Duration::from_millis(1));
        timers.clear();
        let second = timers.schedule(t0, Duration::from_millis(1));
        assert_ne!(first, second);
        assert_eq!(timers.len(), 1);
    }
}
