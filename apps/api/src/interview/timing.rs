//! Time Tracker: elapsed/remaining minutes and one-shot warnings.

use std::collections::BTreeSet;

use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeWarning {
    FiveMinutes,
    TwoMinutes,
    TimeUp,
}

impl TimeWarning {
    const ALL: [TimeWarning; 3] = [
        TimeWarning::FiveMinutes,
        TimeWarning::TwoMinutes,
        TimeWarning::TimeUp,
    ];

    /// Fires once remaining minutes drop to this value or below.
    fn threshold(self) -> u32 {
        match self {
            TimeWarning::FiveMinutes => 5,
            TimeWarning::TwoMinutes => 2,
            TimeWarning::TimeUp => 0,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            TimeWarning::FiveMinutes => "5 minutes remaining",
            TimeWarning::TwoMinutes => "2 minutes remaining - please conclude your thoughts",
            TimeWarning::TimeUp => "Time is up",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeStatus {
    pub elapsed_minutes: u32,
    pub remaining_minutes: u32,
    pub percentage_used: f64,
    /// Warnings crossed since the previous poll, in threshold order.
    pub new_warnings: Vec<TimeWarning>,
}

impl TimeStatus {
    pub fn is_expired(&self) -> bool {
        self.remaining_minutes == 0
    }
}

#[derive(Debug)]
pub struct TimeTracker {
    started: Instant,
    duration_minutes: u32,
    sent: BTreeSet<TimeWarning>,
}

impl TimeTracker {
    pub fn start(duration_minutes: u32) -> Self {
        Self {
            started: Instant::now(),
            duration_minutes,
            sent: BTreeSet::new(),
        }
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Whole minutes since start, rounded down.
    pub fn elapsed_minutes(&self) -> u32 {
        u32::try_from(self.started.elapsed().as_secs() / 60).unwrap_or(u32::MAX)
    }

    pub fn remaining_minutes(&self) -> u32 {
        self.duration_minutes.saturating_sub(self.elapsed_minutes())
    }

    /// Computes the current status and marks any newly crossed warnings as sent.
    pub fn poll(&mut self) -> TimeStatus {
        let elapsed_minutes = self.elapsed_minutes();
        let remaining_minutes = self.duration_minutes.saturating_sub(elapsed_minutes);
        let percentage_used = if self.duration_minutes == 0 {
            100.0
        } else {
            (f64::from(elapsed_minutes) / f64::from(self.duration_minutes) * 100.0).min(100.0)
        };

        let mut new_warnings = Vec::new();
        for warning in TimeWarning::ALL {
            if remaining_minutes <= warning.threshold() && self.sent.insert(warning) {
                new_warnings.push(warning);
            }
        }

        TimeStatus {
            elapsed_minutes,
            remaining_minutes,
            percentage_used,
            new_warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_no_warnings_early() {
        let mut tracker = TimeTracker::start(15);
        tokio::time::advance(Duration::from_secs(3 * 60 + 59)).await;
        let status = tracker.poll();
        assert_eq!(status.elapsed_minutes, 3);
        assert_eq!(status.remaining_minutes, 12);
        assert!(status.new_warnings.is_empty());
        assert!((status.percentage_used - 20.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_warning_fires_once() {
        let mut tracker = TimeTracker::start(15);
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        assert_eq!(tracker.poll().new_warnings, vec![TimeWarning::FiveMinutes]);
        assert!(tracker.poll().new_warnings.is_empty());

        tokio::time::advance(Duration::from_secs(3 * 60)).await;
        assert_eq!(tracker.poll().new_warnings, vec![TimeWarning::TwoMinutes]);
        assert!(tracker.poll().new_warnings.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_several_warnings_can_cross_in_one_poll() {
        let mut tracker = TimeTracker::start(15);
        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        let status = tracker.poll();
        assert!(status.is_expired());
        assert_eq!(
            status.new_warnings,
            vec![
                TimeWarning::FiveMinutes,
                TimeWarning::TwoMinutes,
                TimeWarning::TimeUp
            ]
        );
        assert_eq!(status.percentage_used, 100.0);
        assert!(tracker.poll().new_warnings.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_is_expired_immediately() {
        let mut tracker = TimeTracker::start(0);
        assert!(tracker.poll().is_expired());
    }
}
