//! Wall-clock discontinuities: system sleep/wake and large tick gaps.
//!
//! The countdown tracker counts real elapsed time, so after a sleep the first
//! tick would subtract the whole sleep duration. Whether that is wanted
//! depends on the host: with an explicit wake notification the baseline is
//! rebased and the sleep is not counted. A host without wake notifications
//! can set a gap threshold instead; a larger gap is treated as a wake.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::countdown::CountdownTracker;

/// A tick gap large enough to be treated as a sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discontinuity {
    pub gap_secs: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockDiscontinuityHandler {
    sleep_gap_threshold: Option<Duration>,
}

impl ClockDiscontinuityHandler {
    /// `None` disables gap detection; only explicit wakes rebase.
    pub fn new(sleep_gap_threshold: Option<Duration>) -> Self {
        Self {
            sleep_gap_threshold: sleep_gap_threshold.filter(|d| *d > Duration::zero()),
        }
    }

    pub fn sleep_gap_threshold(&self) -> Option<Duration> {
        self.sleep_gap_threshold
    }

    /// The system reported a wake. The time spent asleep is not counted.
    pub fn notify_wake(&self, tracker: &mut CountdownTracker, now: DateTime<Utc>) {
        if let Some(gap) = tracker.gap_since_last_tick(now) {
            info!(gap_secs = gap, "wake observed, countdown baseline rebased");
        }
        tracker.rebase(now);
    }

    /// Call before advancing the tracker. When the gap since the last tick
    /// exceeds the threshold, the baseline is rebased and the gap returned.
    pub fn check(&self, tracker: &mut CountdownTracker, now: DateTime<Utc>) -> Option<Discontinuity> {
        let threshold = self.sleep_gap_threshold?.num_seconds();
        let gap = tracker.gap_since_last_tick(now)?;
        if gap <= threshold {
            return None;
        }
        info!(gap_secs = gap, threshold_secs = threshold, "tick gap treated as sleep");
        tracker.rebase(now);
        Some(Discontinuity { gap_secs: gap })
    }
}
