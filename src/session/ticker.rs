// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::time::{Duration, Instant};

pub const DEFAULT_TICK: Duration = Duration::from_millis(30);

/// Fixed-period repeating timer driven by explicit polling.
///
/// A poll that arrives late fires once and re-arms one period after the poll, so
/// missed deadlines never pile up into a burst of cycles.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Option<Instant>,
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next: None,
        }
    }

    /// First tick fires one period after `now`. Restarting re-arms from `now`.
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next {
            Some(deadline) if now >= deadline => {
                self.next = Some(now + self.period);
                true
            }
            _ => false,
        }
    }

    /// Time left until the next tick; `None` when stopped.
    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        self.next.map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_after_one_period() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(30 * MS);
        assert!(!ticker.poll(t0));
        ticker.start(t0);
        assert!(!ticker.poll(t0 + 29 * MS));
        assert!(ticker.poll(t0 + 30 * MS));
        assert!(!ticker.poll(t0 + 31 * MS));
        assert!(ticker.poll(t0 + 60 * MS));
    }

    #[test]
    fn late_polls_are_coalesced() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(30 * MS);
        ticker.start(t0);
        // a 200ms stall yields one tick, not six
        assert!(ticker.poll(t0 + 200 * MS));
        assert!(!ticker.poll(t0 + 201 * MS));
        assert_eq!(ticker.until_next(t0 + 200 * MS), Some(30 * MS));
    }

    #[test]
    fn stop_disarms() {
        let t0 = Instant::now();
        let mut ticker = Ticker::default();
        ticker.start(t0);
        ticker.stop();
        assert!(!ticker.is_armed());
        assert!(!ticker.poll(t0 + Duration::from_secs(1)));
        assert_eq!(ticker.until_next(t0), None);
    }
}
