//! Timer Service
//!
//! Deferred and periodic callbacks on simulation time. Callers schedule an
//! event value; `advance` returns the events whose deadlines elapsed, ordered
//! by deadline and then by handle, and the owner re-enters the simulation
//! with them. Nothing here blocks: a timer is a record in a sorted map.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Serialize, Deserialize};

/// Smallest interval a repeating timer may use.
pub const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// Opaque handle to a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Clone, Debug)]
struct Timer<E> {
    deadline: Duration,
    interval: Option<Duration>,
    /// Time left when paused. `Some` means the timer is paused.
    paused_remaining: Option<Duration>,
    event: E,
}

/// A timer that elapsed during `advance`.
#[derive(Clone, Debug, PartialEq)]
pub struct Fired<E> {
    /// Handle of the timer.
    pub handle: TimerHandle,
    /// Simulation time at which it elapsed.
    pub at: Duration,
    /// Scheduled event payload.
    pub event: E,
}

/// Scheduler over simulation time.
#[derive(Clone, Debug)]
pub struct TimerService<E> {
    now: Duration,
    next_handle: u64,
    timers: BTreeMap<TimerHandle, Timer<E>>,
}

impl<E: Clone> Default for TimerService<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> TimerService<E> {
    /// Create an empty service at time zero.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_handle: 1,
            timers: BTreeMap::new(),
        }
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `event` after `delay`. Repeating timers re-arm with the same delay.
    pub fn schedule(&mut self, delay: Duration, repeating: bool, event: E) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        let interval = repeating.then(|| delay.max(MIN_REPEAT_INTERVAL));
        self.timers.insert(handle, Timer {
            deadline: self.now + delay,
            interval,
            paused_remaining: None,
            event,
        });
        handle
    }

    /// Cancel a timer. Returns false if it was not pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    /// Pause a timer, keeping its remaining time.
    pub fn pause(&mut self, handle: TimerHandle) -> bool {
        let now = self.now;
        match self.timers.get_mut(&handle) {
            Some(timer) if timer.paused_remaining.is_none() => {
                timer.paused_remaining = Some(timer.deadline.saturating_sub(now));
                true
            }
            _ => false,
        }
    }

    /// Resume a paused timer.
    pub fn unpause(&mut self, handle: TimerHandle) -> bool {
        let now = self.now;
        match self.timers.get_mut(&handle) {
            Some(timer) => match timer.paused_remaining.take() {
                Some(remaining) => {
                    timer.deadline = now + remaining;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Is the timer still pending (paused or not)?
    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    /// Is the timer pending and paused?
    pub fn is_paused(&self, handle: TimerHandle) -> bool {
        self.timers
            .get(&handle)
            .map(|t| t.paused_remaining.is_some())
            .unwrap_or(false)
    }

    /// Time until the timer elapses.
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        self.timers.get(&handle).map(|t| {
            t.paused_remaining
                .unwrap_or_else(|| t.deadline.saturating_sub(self.now))
        })
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// True when nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Move time forward by `dt` and collect every elapsed event.
    ///
    /// A repeating timer fires once per elapsed interval, so a long frame can
    /// yield several events from the same handle.
    pub fn advance(&mut self, dt: Duration) -> Vec<Fired<E>> {
        let target = self.now + dt;
        let mut fired = Vec::new();

        loop {
            let next = self
                .timers
                .iter()
                .filter(|(_, t)| t.paused_remaining.is_none() && t.deadline <= target)
                .min_by_key(|(handle, t)| (t.deadline, **handle))
                .map(|(handle, _)| *handle);

            let Some(handle) = next else { break };

            let (at, event, repeat) = {
                let Some(timer) = self.timers.get_mut(&handle) else { break };
                let at = timer.deadline;
                if let Some(interval) = timer.interval {
                    timer.deadline += interval;
                }
                (at, timer.event.clone(), timer.interval.is_some())
            };
            if !repeat {
                self.timers.remove(&handle);
            }

            self.now = at;
            fired.push(Fired { handle, at, event });
        }

        self.now = target;
        fired
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut timers = TimerService::new();
        let h = timers.schedule(secs(2.0), false, "reload");

        assert!(timers.advance(secs(1.0)).is_empty());
        let fired = timers.advance(secs(1.0));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].event, "reload");
        assert!(!timers.is_active(h));
        assert!(timers.advance(secs(5.0)).is_empty());
    }

    #[test]
    fn test_repeating_fires_per_interval() {
        let mut timers = TimerService::new();
        timers.schedule(secs(1.0), true, 7u8);

        let fired = timers.advance(secs(3.5));
        assert_eq!(fired.len(), 3);
        assert_eq!(fired[2].at, secs(3.0));
    }

    #[test]
    fn test_cancel() {
        let mut timers = TimerService::new();
        let h = timers.schedule(secs(1.0), false, ());

        assert!(timers.cancel(h));
        assert!(!timers.cancel(h));
        assert!(timers.advance(secs(2.0)).is_empty());
    }

    #[test]
    fn test_pause_keeps_remaining() {
        let mut timers = TimerService::new();
        let h = timers.schedule(secs(1.0), true, ());

        timers.advance(secs(0.25));
        assert!(timers.pause(h));
        assert!(!timers.pause(h));
        assert!(timers.advance(secs(10.0)).is_empty());
        assert_eq!(timers.remaining(h), Some(secs(0.75)));

        assert!(timers.unpause(h));
        assert!(!timers.unpause(h));
        assert!(timers.advance(secs(0.5)).is_empty());
        assert_eq!(timers.advance(secs(0.25)).len(), 1);
    }

    #[test]
    fn test_deadline_order() {
        let mut timers = TimerService::new();
        timers.schedule(secs(3.0), false, 'c');
        timers.schedule(secs(1.0), false, 'a');
        timers.schedule(secs(2.0), false, 'b');

        let order: Vec<char> = timers.advance(secs(5.0)).into_iter().map(|f| f.event).collect();
        assert_eq!(order, vec!['a', 'b', 'c']);
    }

    #[test]
    fn test_same_deadline_orders_by_handle() {
        let mut timers = TimerService::new();
        let first = timers.schedule(secs(1.0), false, 1);
        let second = timers.schedule(secs(1.0), false, 2);

        let fired = timers.advance(secs(1.0));
        assert_eq!(fired[0].handle, first);
        assert_eq!(fired[1].handle, second);
    }

    #[test]
    fn test_zero_delay_repeating_is_bounded() {
        let mut timers = TimerService::new();
        timers.schedule(Duration::ZERO, true, ());

        let fired = timers.advance(Duration::from_millis(3));
        assert_eq!(fired.len(), 4);
    }
}
