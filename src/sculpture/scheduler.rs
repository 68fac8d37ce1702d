//! Debounce timer for full surface rebuilds.

use std::time::{Duration, Instant};

/// Fires once, `delay` after the most recent [`RebuildScheduler::schedule`]
#[derive(Debug, Clone)]
pub struct RebuildScheduler {
    delay: Duration,
    deadline: Option<Instant>,
}

impl RebuildScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Restart the countdown from `now`
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Make the rebuild due immediately
    pub fn force(&mut self, now: Instant) {
        self.deadline = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True once per expiry; clears the deadline when it fires
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_last_change() {
        let start = Instant::now();
        let mut scheduler = RebuildScheduler::new(Duration::from_secs(1));
        assert!(!scheduler.take_due(start));

        scheduler.schedule(start);
        scheduler.schedule(start + Duration::from_millis(600));
        // 1 s after the first change is too early
        assert!(!scheduler.take_due(start + Duration::from_millis(1000)));
        assert!(scheduler.take_due(start + Duration::from_millis(1600)));
        // Only once
        assert!(!scheduler.take_due(start + Duration::from_millis(2000)));
    }

    #[test]
    fn test_force_and_cancel() {
        let now = Instant::now();
        let mut scheduler = RebuildScheduler::new(Duration::from_secs(1));
        scheduler.force(now);
        assert!(scheduler.is_pending());
        assert!(scheduler.take_due(now));

        scheduler.schedule(now);
        scheduler.cancel();
        assert!(!scheduler.take_due(now + Duration::from_secs(5)));
    }
}
