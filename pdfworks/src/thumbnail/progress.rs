//! Progress tracking for thumbnail runs.

use std::time::{Duration, Instant};

use serde::Serialize;

/// One progress event: `completed` of `total` pages are done.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    /// Pages finished so far, failed ones included.
    pub completed: usize,
    /// Pages in the run.
    pub total: usize,
}

impl Progress {
    /// Completed share in `0.0..=1.0`. Reaches `1.0` only when every page is done.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f32 / self.total as f32
    }

    /// Completed share as a percentage.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }

    /// True once every page is done.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Counts finished pages of a run.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    start_time: Instant,
}

impl ProgressTracker {
    /// Start tracking a run of `total` pages.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one finished page; never moves past the total.
    pub fn advance(&mut self) -> Progress {
        self.completed = (self.completed + 1).min(self.total);
        self.current()
    }

    /// Current state.
    pub fn current(&self) -> Progress {
        Progress {
            completed: self.completed,
            total: self.total,
        }
    }

    /// Time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic_and_capped() {
        let mut tracker = ProgressTracker::new(3);
        let fractions: Vec<f32> = (0..5).map(|_| tracker.advance().fraction()).collect();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(fractions[2], 1.0);
        assert_eq!(fractions[4], 1.0);
    }

    #[test]
    fn test_fraction_below_one_until_complete() {
        let mut tracker = ProgressTracker::new(10);
        for _ in 0..9 {
            let progress = tracker.advance();
            assert!(progress.fraction() < 1.0);
            assert!(!progress.is_complete());
        }
        assert!(tracker.advance().is_complete());
    }

    #[test]
    fn test_percent() {
        let progress = Progress {
            completed: 1,
            total: 4,
        };
        assert_eq!(progress.percent(), 25.0);
    }
}
