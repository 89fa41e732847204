//! Single entry point that puts a reminder on screen.
//!
//! ```text
//! Idle --activate(A)--> Showing(A) --resolve--> Idle
//! Showing(A) --activate(B)--> Showing(B)     (hide A, then show B)
//! ```
//!
//! Last-due-wins: a reminder that becomes due while another is shown
//! replaces it instead of stacking a second takeover window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ReminderCategory, ResolveOutcome, TriggerSource};
use crate::collaborators::{ActivityEntry, ActivityLog, PresentationSurface};

/// The reminder currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveReminder {
    pub category: ReminderCategory,
    pub source: TriggerSource,
    pub shown_at: DateTime<Utc>,
}

/// What `activate` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activation {
    Shown {
        category: ReminderCategory,
        /// Category whose presentation was torn down first, if any.
        replaced: Option<ReminderCategory>,
    },
    /// Full-screen takeover is turned off; nothing was presented.
    Suppressed { category: ReminderCategory },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReminderDispatcher {
    active: Option<ActiveReminder>,
}

impl ReminderDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActiveReminder> {
        self.active.as_ref()
    }

    pub fn activate(
        &mut self,
        category: ReminderCategory,
        source: TriggerSource,
        now: DateTime<Utc>,
        full_screen_enabled: bool,
        surface: &mut dyn PresentationSurface,
    ) -> Activation {
        if !full_screen_enabled {
            info!(%category, ?source, "reminder due, full-screen takeover disabled");
            return Activation::Suppressed { category };
        }

        let replaced = self.active.take().map(|previous| {
            surface.hide();
            previous.category
        });
        surface.show(category);
        self.active = Some(ActiveReminder {
            category,
            source,
            shown_at: now,
        });

        match replaced {
            Some(previous) => info!(%category, %previous, ?source, "reminder replaced"),
            None => info!(%category, ?source, "reminder shown"),
        }
        Activation::Shown { category, replaced }
    }

    /// Tear down the active reminder and record how it ended. A completed
    /// water reminder also records `glass_ml` of intake; 0 records none.
    /// Returns the reminder that was resolved, or `None` when nothing was on
    /// screen.
    pub fn resolve(
        &mut self,
        outcome: ResolveOutcome,
        now: DateTime<Utc>,
        glass_ml: u32,
        surface: &mut dyn PresentationSurface,
        activity: &mut dyn ActivityLog,
    ) -> Option<ActiveReminder> {
        let Some(active) = self.active.take() else {
            debug!(?outcome, "resolve with no active reminder");
            return None;
        };

        surface.hide();
        let entry = ActivityEntry {
            category: active.category,
            completed: outcome.completed(),
            at: now,
            water_ml: (active.category == ReminderCategory::Water
                && outcome.completed()
                && glass_ml > 0)
                .then_some(glass_ml),
        };
        if let Err(err) = activity.record(&entry) {
            warn!(category = %active.category, error = %err, "activity log write failed");
        }
        info!(category = %active.category, ?outcome, "reminder resolved");
        Some(active)
    }
}
