//! Property tests for the per-category countdown arithmetic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use wellnudge_core::reminder::CountdownTracker;
use wellnudge_core::{Preferences, ReminderCategory};

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, h, m, s).unwrap()
}

fn water_only(interval_minutes: i64) -> Preferences {
    Preferences::default()
        .with_category(ReminderCategory::EyeRest, false, 20)
        .with_category(ReminderCategory::Movement, false, 45)
        .with_category(ReminderCategory::Water, true, interval_minutes)
}

proptest! {
    /// One-second ticks fire once per full interval and count down by one
    /// second otherwise.
    #[test]
    fn steady_ticks_fire_once_per_interval(interval_minutes in 1i64..=10, seconds in 0i64..3600) {
        let prefs = water_only(interval_minutes);
        let interval = interval_minutes * 60;
        let mut tracker = CountdownTracker::new();
        let t0 = at(9, 0, 0);

        let mut fires = 0;
        for offset in 0..=seconds {
            fires += tracker.advance(&(t0 + Duration::seconds(offset)), &prefs).len() as i64;
        }

        prop_assert_eq!(fires, seconds / interval);
        prop_assert_eq!(
            tracker.remaining_seconds_for(ReminderCategory::Water),
            Some(interval - seconds % interval)
        );
    }

    /// Ticks at any sub-second or uneven spacing charge exactly the wall-clock
    /// time that passed, in whole seconds.
    #[test]
    fn millisecond_gaps_add_up_to_wall_clock_time(
        interval_minutes in 1i64..=10,
        gaps in prop::collection::vec(1i64..=2500, 1..400),
    ) {
        let prefs = water_only(interval_minutes);
        let interval = interval_minutes * 60;
        let mut tracker = CountdownTracker::new();
        let mut now = at(9, 0, 0);
        tracker.advance(&now, &prefs);

        let mut fires = 0;
        for gap in &gaps {
            now += Duration::milliseconds(*gap);
            fires += tracker.advance(&now, &prefs).len() as i64;
        }

        let elapsed = gaps.iter().sum::<i64>() / 1000;
        prop_assert_eq!(fires, elapsed / interval);
        prop_assert_eq!(
            tracker.remaining_seconds_for(ReminderCategory::Water),
            Some(interval - elapsed % interval)
        );
    }

    /// Whatever the tick spacing, a running countdown stays within `1..=interval`
    /// and a tick fires at most once per category.
    #[test]
    fn remaining_stays_within_the_interval(
        interval_minutes in 1i64..=60,
        gaps in prop::collection::vec(1i64..=900, 1..40),
    ) {
        let prefs = water_only(interval_minutes);
        let interval = interval_minutes * 60;
        let mut tracker = CountdownTracker::new();
        let mut now = at(8, 0, 0);
        tracker.advance(&now, &prefs);

        for gap in gaps {
            now += Duration::seconds(gap);
            if now > at(17, 0, 0) {
                break;
            }
            let before = tracker.remaining_seconds_for(ReminderCategory::Water).unwrap_or(interval);
            let due = tracker.advance(&now, &prefs);
            let remaining = tracker.remaining_seconds_for(ReminderCategory::Water);

            prop_assert!(due.len() <= 1);
            prop_assert_eq!(due.is_empty(), before - gap > 0);
            let remaining = remaining.unwrap_or(0);
            prop_assert!(remaining > 0 && remaining <= interval);
        }
    }

    /// Outside the default 08:00-17:00 window nothing counts down or fires.
    #[test]
    fn no_countdown_outside_work_hours(
        hour in prop_oneof![0u32..8u32, 18u32..24u32],
        minute in 0u32..60u32,
        second in 0u32..60u32,
    ) {
        let prefs = Preferences::default();
        let mut tracker = CountdownTracker::new();
        let now = at(hour, minute, second);

        let due = tracker.advance(&now, &prefs);
        let later = tracker.advance(&(now + Duration::minutes(50)), &prefs);

        prop_assert!(due.is_empty());
        // From 07:10 on, fifty minutes later is inside the window, where a
        // fresh countdown starts but cannot fire yet.
        prop_assert!(later.is_empty());
        if hour != 7 {
            for category in ReminderCategory::ALL {
                prop_assert_eq!(tracker.remaining_seconds_for(category), None);
            }
        }
    }
}
