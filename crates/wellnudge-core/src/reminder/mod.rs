//! Reminder scheduling and countdown core.
//!
//! Two independent channels decide when a reminder is due:
//!
//! - the in-process [`CountdownTracker`], advanced by a periodic tick, and
//! - externally registered one-shot triggers ([`TriggerScheduler`] for the
//!   regular work-hours sequence, [`SnoozeArmer`] for "remind me later").
//!
//! Both funnel into a single [`ReminderDispatcher`], which owns the one
//! reminder that may be on screen at a time.

mod clock;
mod countdown;
mod dispatcher;
mod snooze;
mod triggers;
mod window;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use clock::{ClockDiscontinuityHandler, Discontinuity};
pub use countdown::{CountdownState, CountdownTracker};
pub use dispatcher::{Activation, ActiveReminder, ReminderDispatcher};
pub use snooze::{SnoozeArmer, DEFAULT_SNOOZE_MINUTES};
pub use triggers::{
    RebuildReport, ScheduledTrigger, TriggerId, TriggerScheduler, MAX_TRIGGERS_PER_CATEGORY,
};
pub use window::{window_for, WorkWindow};

/// The fixed set of things the user is reminded about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderCategory {
    Water,
    EyeRest,
    Movement,
}

impl ReminderCategory {
    /// Every category, in display order.
    pub const ALL: [ReminderCategory; 3] = [
        ReminderCategory::Water,
        ReminderCategory::EyeRest,
        ReminderCategory::Movement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReminderCategory::Water => "water",
            ReminderCategory::EyeRest => "eye_rest",
            ReminderCategory::Movement => "movement",
        }
    }

    /// Human-readable label for menus and console output.
    pub fn label(self) -> &'static str {
        match self {
            ReminderCategory::Water => "Water",
            ReminderCategory::EyeRest => "Eye rest",
            ReminderCategory::Movement => "Movement",
        }
    }
}

impl fmt::Display for ReminderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "water" => Ok(ReminderCategory::Water),
            "eye_rest" | "eye-rest" | "eyerest" | "eye" => Ok(ReminderCategory::EyeRest),
            "movement" | "move" => Ok(ReminderCategory::Movement),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

/// How the user dismissed the reminder on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveOutcome {
    Completed,
    /// "Remind me later" -- arms a snooze.
    Deferred,
    Skipped,
}

impl ResolveOutcome {
    pub fn completed(self) -> bool {
        self == ResolveOutcome::Completed
    }
}

/// Which path asked for a reminder to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// In-process countdown reached zero.
    Countdown,
    /// Regular work-hours trigger delivered by the notification channel.
    Scheduled,
    Snooze,
    /// Explicit preview requested by the user.
    Manual,
}

/// Format seconds as `MM:SS` for menu display. Negative values clamp to zero.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
