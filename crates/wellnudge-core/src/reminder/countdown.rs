//! Per-category countdowns driven by a periodic tick.
//!
//! The tracker owns no thread: the caller passes `now` on every tick and the
//! tracker subtracts the wall-clock time elapsed since the previous one.
//! Sub-second remainders carry over to the next tick, so the tick period
//! does not change how fast a countdown runs. A tick whose clock did not move
//! forward counts as one second.
//!
//! A category only counts down while it is enabled, has a positive interval,
//! and `now` falls inside today's work window. Otherwise its countdown is
//! cleared, so re-entering the window or re-enabling the category always
//! starts from a full interval. A countdown created (or restarted by an
//! interval change) on a tick holds the full interval after that tick; only
//! time spent running counts against it.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::window::window_for;
use super::ReminderCategory;
use crate::preferences::Preferences;

/// Running countdown for one category. Absent from the tracker when the
/// category is not counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    pub remaining_seconds: i64,
    /// Interval the countdown was last reset to.
    pub interval_seconds: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountdownTracker {
    states: BTreeMap<ReminderCategory, CountdownState>,
    last_tick: Option<DateTime<Utc>>,
    /// Milliseconds elapsed but not yet charged as a whole second.
    #[serde(default)]
    carry_millis: i64,
}

impl CountdownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn remaining_seconds_for(&self, category: ReminderCategory) -> Option<i64> {
        self.states.get(&category).map(|s| s.remaining_seconds)
    }

    pub fn state(&self, category: ReminderCategory) -> Option<&CountdownState> {
        self.states.get(&category)
    }

    pub fn last_tick(&self) -> Option<DateTime<Utc>> {
        self.last_tick
    }

    /// Whole seconds between the previous tick and `now`, if there was one.
    pub fn gap_since_last_tick(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_tick.map(|last| (now - last).num_seconds())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Rebase the elapsed-time baseline without touching any countdown.
    pub fn rebase(&mut self, now: DateTime<Utc>) {
        self.last_tick = Some(now);
        self.carry_millis = 0;
    }

    /// Whole seconds to charge for a tick at `now`.
    fn take_elapsed(&mut self, now: DateTime<Utc>) -> i64 {
        match self.last_tick.map(|last| (now - last).num_milliseconds()) {
            Some(gap) if gap > 0 => {
                let total = self.carry_millis.saturating_add(gap);
                self.carry_millis = total % 1000;
                total / 1000
            }
            _ => {
                self.carry_millis = 0;
                1
            }
        }
    }

    /// Advance every countdown to `now`. Returns the categories whose
    /// countdown crossed zero on this tick, each already reset to a full
    /// interval.
    pub fn advance<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
        preferences: &Preferences,
    ) -> Vec<ReminderCategory> {
        let now_utc = now.with_timezone(&Utc);
        let elapsed = self.take_elapsed(now_utc);
        self.last_tick = Some(now_utc);

        let in_window = window_for(preferences, now).contains(now_utc);
        let mut due = Vec::new();

        for category in ReminderCategory::ALL {
            let interval = match preferences.category(category).active_interval_secs() {
                Some(interval) if in_window => interval,
                _ => {
                    if self.states.remove(&category).is_some() {
                        debug!(%category, in_window, "countdown cleared");
                    }
                    continue;
                }
            };

            let mut remaining = match self.states.get(&category) {
                Some(state) if state.interval_seconds == interval => state.remaining_seconds - elapsed,
                Some(_) => {
                    debug!(%category, interval, "interval changed, countdown restarted");
                    interval
                }
                None => {
                    debug!(%category, interval, "countdown started");
                    interval
                }
            };

            if remaining <= 0 {
                debug!(%category, "countdown reached zero");
                due.push(category);
                remaining = interval;
            }

            self.states.insert(
                category,
                CountdownState {
                    remaining_seconds: remaining,
                    interval_seconds: interval,
                },
            );
        }

        due
    }

    /// Drop the countdown of every category `preferences` no longer runs.
    /// The next tick would clear them too; this makes the change visible at
    /// once.
    pub fn retain_active(&mut self, preferences: &Preferences) {
        self.states.retain(|category, _| {
            let active = preferences.category(*category).active_interval_secs().is_some();
            if !active {
                debug!(%category, "countdown cleared by preference change");
            }
            active
        });
    }

    /// Restart a running countdown from its full interval. A category that is
    /// not counting down stays absent; it starts fresh on its next tick anyway.
    pub fn reset(&mut self, category: ReminderCategory, preferences: &Preferences) {
        match preferences.category(category).active_interval_secs() {
            Some(interval) => {
                if let Some(state) = self.states.get_mut(&category) {
                    state.remaining_seconds = interval;
                    state.interval_seconds = interval;
                }
            }
            None => {
                self.states.remove(&category);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, h, m, s).unwrap()
    }

    fn only(category: ReminderCategory, interval: i64) -> Preferences {
        let mut prefs = Preferences::default();
        for c in ReminderCategory::ALL {
            prefs = prefs.with_category(c, c == category, interval);
        }
        prefs
    }

    #[test]
    fn first_tick_starts_a_full_interval() {
        let prefs = only(ReminderCategory::Water, 30);
        let mut tracker = CountdownTracker::new();
        assert!(tracker.advance(&at(9, 0, 0), &prefs).is_empty());
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), Some(30 * 60));
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::EyeRest), None);
    }

    #[test]
    fn one_second_cadence_decrements_by_one() {
        let prefs = only(ReminderCategory::EyeRest, 20);
        let mut tracker = CountdownTracker::new();
        let start = at(9, 0, 0);
        tracker.advance(&start, &prefs);
        for i in 1..=10 {
            let before = tracker.remaining_seconds_for(ReminderCategory::EyeRest).unwrap();
            tracker.advance(&(start + Duration::seconds(i)), &prefs);
            let after = tracker.remaining_seconds_for(ReminderCategory::EyeRest).unwrap();
            assert_eq!(before - after, 1);
        }
    }

    #[test]
    fn fires_once_and_resets_to_full_interval() {
        let prefs = only(ReminderCategory::Water, 1);
        let mut tracker = CountdownTracker::new();
        let start = at(9, 0, 0);
        let mut fired = 0;
        for i in 0..=60 {
            fired += tracker.advance(&(start + Duration::seconds(i)), &prefs).len();
        }
        assert_eq!(fired, 1);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), Some(60));
    }

    #[test]
    fn half_second_ticks_keep_real_time() {
        let prefs = only(ReminderCategory::Water, 1);
        let mut tracker = CountdownTracker::new();
        let start = at(9, 0, 0);
        let mut fired_at = Vec::new();
        for i in 0..=240 {
            let now = start + Duration::milliseconds(500 * i);
            if !tracker.advance(&now, &prefs).is_empty() {
                fired_at.push(now);
            }
        }
        assert_eq!(fired_at, vec![at(9, 1, 0), at(9, 2, 0)]);
    }

    #[test]
    fn jittered_ticks_carry_the_remainder() {
        let prefs = only(ReminderCategory::EyeRest, 20);
        let mut tracker = CountdownTracker::new();
        let start = at(9, 0, 0);
        tracker.advance(&start, &prefs);
        let mut now = start;
        for step in [1100, 900, 1300, 700, 1000] {
            now += Duration::milliseconds(step);
            tracker.advance(&now, &prefs);
        }
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::EyeRest), Some(20 * 60 - 5));
    }

    #[test]
    fn long_gap_counts_in_full() {
        let prefs = only(ReminderCategory::Movement, 45);
        let mut tracker = CountdownTracker::new();
        tracker.advance(&at(9, 0, 0), &prefs);
        let due = tracker.advance(&at(9, 50, 0), &prefs);
        assert_eq!(due, vec![ReminderCategory::Movement]);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Movement), Some(45 * 60));
    }

    #[test]
    fn backwards_clock_counts_as_one_second() {
        let prefs = only(ReminderCategory::Water, 30);
        let mut tracker = CountdownTracker::new();
        tracker.advance(&at(9, 0, 10), &prefs);
        tracker.advance(&at(9, 0, 5), &prefs);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), Some(30 * 60 - 1));
    }

    #[test]
    fn outside_window_clears_every_countdown() {
        let prefs = Preferences::default();
        let mut tracker = CountdownTracker::new();
        tracker.advance(&at(16, 59, 59), &prefs);
        assert!(tracker.remaining_seconds_for(ReminderCategory::Water).is_some());
        tracker.advance(&at(17, 0, 1), &prefs);
        for category in ReminderCategory::ALL {
            assert_eq!(tracker.remaining_seconds_for(category), None);
        }
    }

    #[test]
    fn window_entry_starts_a_full_interval() {
        let prefs = only(ReminderCategory::EyeRest, 20);
        let mut tracker = CountdownTracker::new();
        tracker.advance(&at(7, 59, 59), &prefs);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::EyeRest), None);
        tracker.advance(&at(8, 0, 0), &prefs);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::EyeRest), Some(20 * 60));

        let start = at(8, 0, 0);
        let mut fired_at = None;
        for i in 1..=(20 * 60) {
            let now = start + Duration::seconds(i);
            if !tracker.advance(&now, &prefs).is_empty() {
                fired_at = Some(now);
                break;
            }
        }
        assert_eq!(fired_at, Some(at(8, 20, 0)));
    }

    #[test]
    fn disabling_clears_and_reenabling_starts_fresh() {
        let enabled = only(ReminderCategory::Water, 1);
        let mut tracker = CountdownTracker::new();
        let start = at(10, 0, 0);
        for i in 0..=15 {
            tracker.advance(&(start + Duration::seconds(i)), &enabled);
        }
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), Some(45));

        let disabled = enabled.clone().with_category(ReminderCategory::Water, false, 1);
        tracker.advance(&(start + Duration::seconds(16)), &disabled);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), None);

        tracker.advance(&(start + Duration::seconds(17)), &enabled);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), Some(60));
    }

    #[test]
    fn interval_change_restarts_countdown() {
        let prefs = only(ReminderCategory::Water, 30);
        let mut tracker = CountdownTracker::new();
        tracker.advance(&at(9, 0, 0), &prefs);
        tracker.advance(&at(9, 10, 0), &prefs);
        let shorter = only(ReminderCategory::Water, 15);
        tracker.advance(&at(9, 10, 1), &shorter);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), Some(15 * 60));
    }

    #[test]
    fn zero_interval_is_treated_as_disabled() {
        let prefs = only(ReminderCategory::Water, 0);
        let mut tracker = CountdownTracker::new();
        assert!(tracker.advance(&at(9, 0, 0), &prefs).is_empty());
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), None);
    }

    #[test]
    fn retain_active_drops_only_disabled_categories() {
        let prefs = Preferences::default();
        let mut tracker = CountdownTracker::new();
        tracker.advance(&at(9, 0, 0), &prefs);
        tracker.advance(&at(9, 5, 0), &prefs);

        let without_water = prefs.clone().with_category(ReminderCategory::Water, false, 30);
        tracker.retain_active(&without_water);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), None);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::EyeRest), Some(15 * 60));
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Movement), Some(40 * 60));
    }

    #[test]
    fn reset_only_touches_running_countdowns() {
        let prefs = only(ReminderCategory::Water, 30);
        let mut tracker = CountdownTracker::new();
        tracker.advance(&at(9, 0, 0), &prefs);
        tracker.advance(&at(9, 5, 0), &prefs);
        tracker.reset(ReminderCategory::Water, &prefs);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::Water), Some(30 * 60));

        tracker.reset(ReminderCategory::EyeRest, &prefs);
        assert_eq!(tracker.remaining_seconds_for(ReminderCategory::EyeRest), None);
    }

    #[test]
    fn several_categories_can_fire_on_the_same_tick() {
        let prefs = Preferences::default()
            .with_category(ReminderCategory::Water, true, 10)
            .with_category(ReminderCategory::EyeRest, true, 10)
            .with_category(ReminderCategory::Movement, true, 60);
        let mut tracker = CountdownTracker::new();
        tracker.advance(&at(9, 0, 0), &prefs);
        let due = tracker.advance(&at(9, 10, 0), &prefs);
        assert_eq!(due, vec![ReminderCategory::Water, ReminderCategory::EyeRest]);
    }
}
