//! Reminder engine: the surface hosts drive.
//!
//! Owns every piece of reminder state and mutates it from one context only.
//! Like the countdown tracker underneath it, the engine has no internal
//! thread: the caller passes `now` to every operation and calls `tick()`
//! periodically (see [`crate::runtime`] for the tokio host).
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = ReminderEngine::new(Local, collaborators, EngineSettings::default());
//! engine.start(Utc::now());
//! // Every second:
//! for event in engine.tick(Utc::now()) { /* render */ }
//! // From the notification callback:
//! engine.on_trigger_fired(id, Utc::now());
//! ```

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collaborators::Collaborators;
use crate::events::Event;
use crate::preferences::Preferences;
use crate::reminder::{
    window_for, Activation, ActiveReminder, ClockDiscontinuityHandler, CountdownTracker,
    ReminderCategory, ReminderDispatcher, ResolveOutcome, ScheduledTrigger, SnoozeArmer,
    TriggerId, TriggerScheduler, TriggerSource, WorkWindow, MAX_TRIGGERS_PER_CATEGORY,
};

/// Host-level knobs that are not user preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Nominal tick period used by the runtime.
    pub tick_interval: StdDuration,
    /// Regular external triggers per category and day, clamped to `1..=64`.
    pub max_triggers_per_category: usize,
    /// Tick gaps above this are treated as an unreported sleep. Off when `None`.
    pub sleep_gap_threshold: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: StdDuration::from_secs(1),
            max_triggers_per_category: MAX_TRIGGERS_PER_CATEGORY,
            sleep_gap_threshold: None,
        }
    }
}

/// Per-category line of an [`EngineSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub category: ReminderCategory,
    pub enabled: bool,
    pub interval_minutes: i64,
    pub remaining_seconds: Option<i64>,
    pub next_due: Option<DateTime<Utc>>,
}

/// Read-only view for menus and status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub at: DateTime<Utc>,
    pub work_window: WorkWindow,
    pub in_work_window: bool,
    pub active: Option<ActiveReminder>,
    pub generation: u64,
    pub registered_triggers: usize,
    pub pending_snoozes: Vec<ScheduledTrigger>,
    pub categories: Vec<CategorySnapshot>,
}

pub struct ReminderEngine<Tz: TimeZone> {
    tz: Tz,
    collaborators: Collaborators,
    /// Snapshot the engine schedules against.
    preferences: Preferences,
    /// What the store returned last; a change here is a user edit.
    last_loaded: Preferences,
    countdown: CountdownTracker,
    triggers: TriggerScheduler,
    snoozes: SnoozeArmer,
    dispatcher: ReminderDispatcher,
    clock: ClockDiscontinuityHandler,
    settings: EngineSettings,
}

impl<Tz: TimeZone> ReminderEngine<Tz> {
    /// Wire the engine to its collaborators and read the first preference
    /// snapshot. Nothing is registered until [`start`](Self::start) or the
    /// first tick.
    pub fn new(tz: Tz, mut collaborators: Collaborators, settings: EngineSettings) -> Self {
        let preferences = collaborators.preferences.load();
        Self {
            tz,
            collaborators,
            last_loaded: preferences.clone(),
            preferences,
            countdown: CountdownTracker::new(),
            triggers: TriggerScheduler::new(settings.max_triggers_per_category),
            snoozes: SnoozeArmer::new(),
            dispatcher: ReminderDispatcher::new(),
            clock: ClockDiscontinuityHandler::new(settings.sleep_gap_threshold),
            settings,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn remaining_seconds_for(&self, category: ReminderCategory) -> Option<i64> {
        self.countdown.remaining_seconds_for(category)
    }

    pub fn active_reminder(&self) -> Option<ReminderCategory> {
        self.dispatcher.active().map(|a| a.category)
    }

    pub fn registered_triggers(&self) -> &[ScheduledTrigger] {
        self.triggers.registered()
    }

    pub fn pending_snoozes(&self) -> Vec<ScheduledTrigger> {
        self.snoozes.pending()
    }

    pub fn generation(&self) -> u64 {
        self.triggers.generation()
    }

    pub fn work_window(&self, now: DateTime<Utc>) -> WorkWindow {
        window_for(&self.preferences, &self.local(now))
    }

    /// Next regular slot for `category` after `now`, ignoring snoozes.
    pub fn next_due(&self, category: ReminderCategory, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        TriggerScheduler::next_due(category, &self.preferences, &self.local(now))
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> EngineSnapshot {
        let work_window = self.work_window(now);
        let categories = ReminderCategory::ALL
            .into_iter()
            .map(|category| {
                let preference = self.preferences.category(category);
                CategorySnapshot {
                    category,
                    enabled: preference.active_interval_secs().is_some(),
                    interval_minutes: preference.interval_minutes,
                    remaining_seconds: self.remaining_seconds_for(category),
                    next_due: self.next_due(category, now),
                }
            })
            .collect();

        EngineSnapshot {
            at: now,
            work_window,
            in_work_window: work_window.contains(now),
            active: self.dispatcher.active().copied(),
            generation: self.triggers.generation(),
            registered_triggers: self.triggers.registered().len(),
            pending_snoozes: self.snoozes.pending(),
            categories,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Register today's external triggers.
    pub fn start(&mut self, now: DateTime<Utc>) -> Event {
        info!(generation = self.triggers.generation(), "reminder engine starting");
        self.countdown.rebase(now);
        self.rebuild(now)
    }

    /// Advance the engine to `now`. Fire-and-continue: every category that
    /// came due is dispatched, in category order.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();

        let loaded = self.collaborators.preferences.load();
        if loaded != self.last_loaded {
            self.last_loaded = loaded.clone();
            events.push(self.on_preferences_changed(loaded, now));
        }

        if let Some(discontinuity) = self.clock.check(&mut self.countdown, now) {
            events.push(Event::ClockDiscontinuity {
                gap_secs: discontinuity.gap_secs,
                at: now,
            });
        }

        let local = self.local(now);
        if self.triggers.last_rebuild_day() != Some(local.date_naive()) {
            debug!(day = %local.date_naive(), "new local day, rebuilding external triggers");
            events.push(self.rebuild(now));
        }

        let mut due = self.countdown.advance(&local, &self.preferences);
        for snooze in self.snoozes.take_due(now) {
            // The snooze activation stands in for a countdown crossing on the same tick.
            due.retain(|category| *category != snooze.category);
            events.push(self.fire_snooze(snooze, now));
        }
        for category in due {
            events.push(self.activate(category, TriggerSource::Countdown, now));
        }

        events
    }

    /// Replace the preference snapshot and rebuild the external triggers.
    pub fn on_preferences_changed(&mut self, preferences: Preferences, now: DateTime<Utc>) -> Event {
        info!(
            work_start = %preferences.work_start,
            work_end = %preferences.work_end,
            "preferences changed"
        );
        self.preferences = preferences;
        self.countdown.retain_active(&self.preferences);
        self.rebuild(now)
    }

    /// Delivery callback from the notification channel.
    pub fn on_trigger_fired(&mut self, id: TriggerId, now: DateTime<Utc>) -> Event {
        let accepted = match id {
            TriggerId::Regular { .. } => self
                .triggers
                .accept_fire(&id)
                .map(|t| self.activate(t.category, TriggerSource::Scheduled, now)),
            TriggerId::Snooze(_) => self
                .snoozes
                .accept_fire(&id)
                .map(|t| self.fire_snooze(t, now)),
        };

        accepted.unwrap_or_else(|| {
            warn!(%id, generation = self.triggers.generation(), "stale trigger dropped");
            Event::StaleTriggerDropped { id, at: now }
        })
    }

    /// Dismiss the reminder on screen. Deferring arms a snooze; every outcome
    /// restarts the category's countdown. Nothing happens when no reminder is
    /// active.
    pub fn resolve_active_reminder(&mut self, outcome: ResolveOutcome, now: DateTime<Utc>) -> Vec<Event> {
        self.resolve_with(outcome, None, now)
    }

    /// Defer the reminder on screen by `minutes` instead of the snooze
    /// preference.
    pub fn defer_active_reminder(&mut self, minutes: Option<i64>, now: DateTime<Utc>) -> Vec<Event> {
        self.resolve_with(ResolveOutcome::Deferred, minutes, now)
    }

    /// Arm a one-shot reminder for `category`. `minutes` defaults to the
    /// preference's snooze duration.
    pub fn snooze(&mut self, category: ReminderCategory, minutes: Option<i64>, now: DateTime<Utc>) -> Event {
        let minutes = minutes.unwrap_or(self.preferences.snooze_minutes);
        let trigger = self
            .snoozes
            .arm(category, minutes, now, self.collaborators.notifications.as_mut());
        Event::SnoozeArmed {
            id: trigger.id,
            category,
            fire_at: trigger.at,
            at: now,
        }
    }

    /// Show a reminder right away, regardless of schedule or the full-screen
    /// preference. Countdowns are left alone.
    pub fn preview(&mut self, category: ReminderCategory, now: DateTime<Utc>) -> Event {
        let activation = self.dispatcher.activate(
            category,
            TriggerSource::Manual,
            now,
            true,
            self.collaborators.presentation.as_mut(),
        );
        activation_event(activation, TriggerSource::Manual, now)
    }

    /// The system resumed from sleep; the time asleep does not count.
    pub fn notify_wake(&mut self, now: DateTime<Utc>) -> Event {
        self.clock.notify_wake(&mut self.countdown, now);
        Event::WakeObserved { at: now }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn local(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.tz)
    }

    fn resolve_with(&mut self, outcome: ResolveOutcome, snooze_minutes: Option<i64>, now: DateTime<Utc>) -> Vec<Event> {
        let Some(resolved) = self.dispatcher.resolve(
            outcome,
            now,
            self.preferences.default_glass_ml,
            self.collaborators.presentation.as_mut(),
            self.collaborators.activity.as_mut(),
        ) else {
            return Vec::new();
        };

        let category = resolved.category;
        let mut events = vec![Event::ReminderResolved {
            category,
            outcome,
            at: now,
        }];
        if outcome == ResolveOutcome::Deferred {
            events.push(self.snooze(category, snooze_minutes, now));
        }
        self.countdown.reset(category, &self.preferences);
        events
    }

    fn rebuild(&mut self, now: DateTime<Utc>) -> Event {
        let preserved = self.snoozes.pending();
        let local = self.local(now);
        let report = self.triggers.rebuild(
            &self.preferences,
            &local,
            self.collaborators.notifications.as_mut(),
            &preserved,
        );
        Event::TriggersRebuilt {
            generation: report.generation,
            registered: report.registered,
            failed: report.failed,
            skipped_past: report.skipped_past,
            at: now,
        }
    }

    /// A snooze resets the regular countdown before activating, so the two
    /// channels do not fire the same category back to back.
    fn fire_snooze(&mut self, trigger: ScheduledTrigger, now: DateTime<Utc>) -> Event {
        self.countdown.reset(trigger.category, &self.preferences);
        self.activate(trigger.category, TriggerSource::Snooze, now)
    }

    fn activate(&mut self, category: ReminderCategory, source: TriggerSource, now: DateTime<Utc>) -> Event {
        let activation = self.dispatcher.activate(
            category,
            source,
            now,
            self.preferences.full_screen_enabled,
            self.collaborators.presentation.as_mut(),
        );
        activation_event(activation, source, now)
    }
}

fn activation_event(activation: Activation, source: TriggerSource, at: DateTime<Utc>) -> Event {
    match activation {
        Activation::Shown { category, replaced } => Event::ReminderShown {
            category,
            source,
            replaced,
            at,
        },
        Activation::Suppressed { category } => Event::ReminderSuppressed {
            category,
            source,
            at,
        },
    }
}
