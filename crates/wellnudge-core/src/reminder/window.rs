//! Work window calculation.
//!
//! Combines a reference instant's calendar day (in the caller's time zone)
//! with the preferences' start/end wall-clock times. No validation happens
//! here: an inverted window is returned as-is and reported by
//! [`WorkWindow::is_empty`].

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::preferences::Preferences;

/// Today's working period as absolute instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WorkWindow {
    /// `end <= start` means no reminder fires on this day.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Inclusive on both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        !self.is_empty() && instant >= self.start && instant <= self.end
    }
}

/// Work window on the calendar day of `reference`, interpreted in `reference`'s zone.
pub fn window_for<Tz: TimeZone>(preferences: &Preferences, reference: &DateTime<Tz>) -> WorkWindow {
    let tz = reference.timezone();
    let day = reference.date_naive();
    WorkWindow {
        start: resolve_local(&tz, day, preferences.work_start),
        end: resolve_local(&tz, day, preferences.work_end),
    }
}

/// Earliest instant for ambiguous local times; times inside a DST gap are
/// shifted forward by an hour.
fn resolve_local<Tz: TimeZone>(tz: &Tz, day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = NaiveDateTime::new(day, time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}
