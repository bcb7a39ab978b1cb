//! Completion percentage and failure count during a drain

use tokio::sync::watch;

/// State published after each wave
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressSnapshot {
    /// Waves settled so far
    pub waves: usize,
    pub total: usize,
    pub remaining: usize,
    pub failed: usize,
    /// 0.0 ..= 100.0
    pub percent: f64,
}

impl ProgressSnapshot {
    /// Percentage rounded for display
    pub fn display_percent(&self) -> u8 {
        self.percent.round().clamp(0.0, 100.0) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Derives monotonic progress from the submitter's drain state and
/// publishes it to any number of observers.
#[derive(Debug)]
pub struct ProgressTracker {
    sender: watch::Sender<ProgressSnapshot>,
    current: ProgressSnapshot,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        let current = ProgressSnapshot {
            total,
            remaining: total,
            ..Default::default()
        };
        let (sender, _) = watch::channel(current);
        Self { sender, current }
    }

    /// Observe snapshots as waves settle
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> ProgressSnapshot {
        self.current
    }

    /// Record a settled wave
    pub fn record_wave(&mut self, remaining: usize, failed: usize) -> ProgressSnapshot {
        let percent = percent_complete(remaining, self.current.total).max(self.current.percent);
        self.current = ProgressSnapshot {
            waves: self.current.waves + 1,
            total: self.current.total,
            remaining,
            failed,
            percent,
        };
        self.sender.send_replace(self.current);
        self.current
    }
}

/// `100 − remaining / total × 100`, exactly 100 once nothing remains
pub fn percent_complete(remaining: usize, total: usize) -> f64 {
    if remaining == 0 || total == 0 {
        return 100.0;
    }
    100.0 - (remaining as f64 / total as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_250_rows_in_waves_of_100() {
        let mut tracker = ProgressTracker::new(250);

        assert_eq!(tracker.record_wave(150, 0).display_percent(), 40);
        assert_eq!(tracker.record_wave(50, 0).display_percent(), 80);
        let last = tracker.record_wave(0, 0);
        assert_eq!(last.percent, 100.0);
        assert!(last.is_complete());
        assert_eq!(last.waves, 3);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut tracker = ProgressTracker::new(10);
        let first = tracker.record_wave(5, 1);
        // A stale remaining count must not move progress backwards
        let second = tracker.record_wave(7, 1);
        assert!(second.percent >= first.percent);
    }

    #[test]
    fn test_hundred_only_when_empty() {
        assert!(percent_complete(1, 1_000_000) < 100.0);
        assert_eq!(percent_complete(0, 3), 100.0);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let mut tracker = ProgressTracker::new(4);
        let mut rx = tracker.subscribe();

        tracker.record_wave(2, 1);
        rx.changed().await.unwrap();
        let seen = *rx.borrow();
        assert_eq!(seen.remaining, 2);
        assert_eq!(seen.failed, 1);
        assert_eq!(seen.display_percent(), 50);
    }
}
