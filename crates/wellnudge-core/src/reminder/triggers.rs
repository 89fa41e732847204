//! Externally registered one-shot triggers.
//!
//! The notification channel is a redundancy layer: if the in-process tick is
//! starved (app suspended, timer coalesced) the OS still delivers a reminder
//! at each work-hours slot. Every rebuild discards the old set, bumps a
//! generation counter and registers a fresh one, so a fire carrying an old
//! generation can be recognised and dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::window::window_for;
use super::ReminderCategory;
use crate::collaborators::NotificationChannel;
use crate::error::ValidationError;
use crate::preferences::Preferences;

/// Upper bound on regular triggers per category and day.
pub const MAX_TRIGGERS_PER_CATEGORY: usize = 64;

/// Identifier carried by every external trigger. Renders to a stable string
/// so it survives a round trip through the platform's notification ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerId {
    Regular {
        generation: u64,
        category: ReminderCategory,
        index: u32,
    },
    Snooze(Uuid),
}

impl TriggerId {
    pub fn new_snooze() -> Self {
        TriggerId::Snooze(Uuid::new_v4())
    }

    pub fn is_snooze(&self) -> bool {
        matches!(self, TriggerId::Snooze(_))
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerId::Regular {
                generation,
                category,
                index,
            } => write!(f, "{category}-g{generation}-{index}"),
            TriggerId::Snooze(uuid) => write!(f, "snooze-{uuid}"),
        }
    }
}

impl FromStr for TriggerId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedTriggerId(s.to_string());

        if let Some(raw) = s.strip_prefix("snooze-") {
            return Uuid::parse_str(raw)
                .map(TriggerId::Snooze)
                .map_err(|_| malformed());
        }

        let mut parts = s.rsplitn(3, '-');
        let index = parts.next().and_then(|p| p.parse::<u32>().ok());
        let generation = parts
            .next()
            .and_then(|p| p.strip_prefix('g'))
            .and_then(|p| p.parse::<u64>().ok());
        let category = parts.next().and_then(|p| p.parse::<ReminderCategory>().ok());

        match (category, generation, index) {
            (Some(category), Some(generation), Some(index)) => Ok(TriggerId::Regular {
                generation,
                category,
                index,
            }),
            _ => Err(malformed()),
        }
    }
}

impl Serialize for TriggerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TriggerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One absolute-time trigger on the external channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTrigger {
    pub id: TriggerId,
    pub category: ReminderCategory,
    pub at: DateTime<Utc>,
}

/// Outcome of a [`TriggerScheduler::rebuild`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub generation: u64,
    pub registered: usize,
    pub failed: usize,
    /// Planned slots already in the past, not registered.
    pub skipped_past: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerScheduler {
    generation: u64,
    max_per_category: usize,
    registered: Vec<ScheduledTrigger>,
    last_rebuild_day: Option<NaiveDate>,
}

impl Default for TriggerScheduler {
    fn default() -> Self {
        Self::new(MAX_TRIGGERS_PER_CATEGORY)
    }
}

impl TriggerScheduler {
    /// `max_per_category` is clamped to `1..=64`.
    pub fn new(max_per_category: usize) -> Self {
        Self {
            generation: 0,
            max_per_category: max_per_category.clamp(1, MAX_TRIGGERS_PER_CATEGORY),
            registered: Vec::new(),
            last_rebuild_day: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn registered(&self) -> &[ScheduledTrigger] {
        &self.registered
    }

    pub fn max_per_category(&self) -> usize {
        self.max_per_category
    }

    /// Local calendar day the current set was built for.
    pub fn last_rebuild_day(&self) -> Option<NaiveDate> {
        self.last_rebuild_day
    }

    /// Regular trigger instants for `now`'s day: `start, start + interval, ...`
    /// strictly before the window end, at most `max_per_category` per category.
    pub fn plan<Tz: TimeZone>(
        preferences: &Preferences,
        now: &DateTime<Tz>,
        max_per_category: usize,
    ) -> Vec<(ReminderCategory, DateTime<Utc>)> {
        let window = window_for(preferences, now);
        if window.is_empty() {
            return Vec::new();
        }

        let mut plan = Vec::new();
        for category in preferences.active_categories() {
            let Some(interval) = preferences.category(category).active_interval_secs() else {
                continue;
            };
            // An interval too large for chrono yields the window start only.
            let step = Duration::try_seconds(interval);
            let mut next = Some(window.start);
            let mut count = 0;
            while let Some(at) = next.filter(|at| *at < window.end && count < max_per_category) {
                plan.push((category, at));
                next = step.and_then(|step| at.checked_add_signed(step));
                count += 1;
            }
        }
        plan
    }

    /// Next regular slot for `category` strictly after `now` (or the window
    /// start when `now` precedes it). Ignores snoozes.
    pub fn next_due<Tz: TimeZone>(
        category: ReminderCategory,
        preferences: &Preferences,
        now: &DateTime<Tz>,
    ) -> Option<DateTime<Utc>> {
        let interval = preferences.category(category).active_interval_secs()?;
        let window = window_for(preferences, now);
        let now = now.with_timezone(&Utc);
        if window.is_empty() || now >= window.end {
            return None;
        }
        if now <= window.start {
            return Some(window.start);
        }
        let steps = (now - window.start).num_seconds() / interval + 1;
        let offset = steps.checked_mul(interval).and_then(Duration::try_seconds)?;
        let candidate = window.start.checked_add_signed(offset)?;
        (candidate < window.end).then_some(candidate)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Cancel everything on `channel`, then register today's plan under a new
    /// generation. Slots at or before `now` are skipped. `preserved` triggers
    /// (pending snoozes) are registered again under their own ids so that
    /// cancelling the channel does not drop them.
    pub fn rebuild<Tz: TimeZone>(
        &mut self,
        preferences: &Preferences,
        now: &DateTime<Tz>,
        channel: &mut dyn NotificationChannel,
        preserved: &[ScheduledTrigger],
    ) -> RebuildReport {
        channel.cancel_all();
        self.registered.clear();
        self.generation += 1;
        self.last_rebuild_day = Some(now.date_naive());

        let now_utc = now.with_timezone(&Utc);
        let mut report = RebuildReport {
            generation: self.generation,
            registered: 0,
            failed: 0,
            skipped_past: 0,
        };

        let plan = Self::plan(preferences, now, self.max_per_category);
        let mut next_index: BTreeMap<ReminderCategory, u32> = BTreeMap::new();
        for (category, at) in plan {
            let slot = next_index.entry(category).or_insert(0);
            let index = *slot;
            *slot += 1;

            if at <= now_utc {
                report.skipped_past += 1;
                continue;
            }

            let trigger = ScheduledTrigger {
                id: TriggerId::Regular {
                    generation: self.generation,
                    category,
                    index,
                },
                category,
                at,
            };
            match channel.register_trigger(&trigger) {
                Ok(()) => {
                    report.registered += 1;
                    self.registered.push(trigger);
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(id = %trigger.id, error = %err, "external trigger registration failed");
                }
            }
        }

        for trigger in preserved.iter().filter(|t| t.at > now_utc) {
            if let Err(err) = channel.register_trigger(trigger) {
                warn!(id = %trigger.id, error = %err, "could not re-register pending snooze");
            }
        }

        info!(
            generation = report.generation,
            registered = report.registered,
            failed = report.failed,
            skipped_past = report.skipped_past,
            "external triggers rebuilt"
        );
        report
    }

    /// Accept a delivered regular trigger. Returns it only if it belongs to
    /// the current generation and has not fired yet; stale or duplicate
    /// deliveries yield `None`.
    pub fn accept_fire(&mut self, id: &TriggerId) -> Option<ScheduledTrigger> {
        let position = self.registered.iter().position(|t| &t.id == id);
        match position {
            Some(position) => Some(self.registered.remove(position)),
            None => {
                debug!(%id, current_generation = self.generation, "ignoring stale trigger");
                None
            }
        }
    }
}
