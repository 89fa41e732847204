use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reminder::{ReminderCategory, ResolveOutcome, TriggerId, TriggerSource};

/// Every state change in the engine produces an Event.
/// Hosts render them; the runtime broadcasts them to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ReminderShown {
        category: ReminderCategory,
        source: TriggerSource,
        /// Reminder that was on screen and got replaced.
        replaced: Option<ReminderCategory>,
        at: DateTime<Utc>,
    },
    /// A reminder became due while full-screen takeover is turned off.
    ReminderSuppressed {
        category: ReminderCategory,
        source: TriggerSource,
        at: DateTime<Utc>,
    },
    ReminderResolved {
        category: ReminderCategory,
        outcome: ResolveOutcome,
        at: DateTime<Utc>,
    },
    SnoozeArmed {
        id: TriggerId,
        category: ReminderCategory,
        fire_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    TriggersRebuilt {
        generation: u64,
        registered: usize,
        failed: usize,
        skipped_past: usize,
        at: DateTime<Utc>,
    },
    /// An external trigger from an old generation, or one that already fired.
    StaleTriggerDropped {
        id: TriggerId,
        at: DateTime<Utc>,
    },
    WakeObserved {
        at: DateTime<Utc>,
    },
    /// Tick gap over the configured sleep threshold; treated like a wake.
    ClockDiscontinuity {
        gap_secs: i64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::ReminderShown { at, .. }
            | Event::ReminderSuppressed { at, .. }
            | Event::ReminderResolved { at, .. }
            | Event::SnoozeArmed { at, .. }
            | Event::TriggersRebuilt { at, .. }
            | Event::StaleTriggerDropped { at, .. }
            | Event::WakeObserved { at }
            | Event::ClockDiscontinuity { at, .. } => *at,
        }
    }
}
