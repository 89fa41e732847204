//! User-editable reminder preferences.
//!
//! The engine only ever reads a point-in-time snapshot of these. Values may be
//! transiently invalid while the user is editing them (zero interval, end of
//! day before start); the scheduling code treats such categories as disabled
//! rather than rejecting the snapshot.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::reminder::ReminderCategory;

/// Per-category switch and interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPreference {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minutes between reminders. Non-positive values disable the category.
    pub interval_minutes: i64,
}

impl CategoryPreference {
    pub fn new(enabled: bool, interval_minutes: i64) -> Self {
        Self {
            enabled,
            interval_minutes,
        }
    }

    /// Interval in seconds when the category is effectively active.
    pub fn active_interval_secs(&self) -> Option<i64> {
        if self.enabled && self.interval_minutes > 0 {
            Some(self.interval_minutes.saturating_mul(60))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_work_start", with = "hhmm")]
    pub work_start: NaiveTime,
    #[serde(default = "default_work_end", with = "hhmm")]
    pub work_end: NaiveTime,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: i64,
    /// Show a full-screen takeover when a reminder is due. When off, only
    /// the OS notification is visible.
    #[serde(default = "default_true")]
    pub full_screen_enabled: bool,
    /// Water logged when a water reminder is completed, in millilitres.
    #[serde(default = "default_glass_ml")]
    pub default_glass_ml: u32,
    #[serde(default = "default_water")]
    pub water: CategoryPreference,
    #[serde(default = "default_eye_rest")]
    pub eye_rest: CategoryPreference,
    #[serde(default = "default_movement")]
    pub movement: CategoryPreference,
}

fn default_true() -> bool {
    true
}
fn default_work_start() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()
}
fn default_work_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default()
}
fn default_snooze_minutes() -> i64 {
    5
}
fn default_glass_ml() -> u32 {
    250
}
fn default_water() -> CategoryPreference {
    CategoryPreference::new(true, 30)
}
fn default_eye_rest() -> CategoryPreference {
    CategoryPreference::new(true, 20)
}
fn default_movement() -> CategoryPreference {
    CategoryPreference::new(true, 45)
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            work_start: default_work_start(),
            work_end: default_work_end(),
            snooze_minutes: default_snooze_minutes(),
            full_screen_enabled: true,
            default_glass_ml: default_glass_ml(),
            water: default_water(),
            eye_rest: default_eye_rest(),
            movement: default_movement(),
        }
    }
}

impl Preferences {
    pub fn category(&self, category: ReminderCategory) -> &CategoryPreference {
        match category {
            ReminderCategory::Water => &self.water,
            ReminderCategory::EyeRest => &self.eye_rest,
            ReminderCategory::Movement => &self.movement,
        }
    }

    pub fn category_mut(&mut self, category: ReminderCategory) -> &mut CategoryPreference {
        match category {
            ReminderCategory::Water => &mut self.water,
            ReminderCategory::EyeRest => &mut self.eye_rest,
            ReminderCategory::Movement => &mut self.movement,
        }
    }

    /// Replace one category's switch and interval.
    pub fn with_category(mut self, category: ReminderCategory, enabled: bool, interval_minutes: i64) -> Self {
        *self.category_mut(category) = CategoryPreference::new(enabled, interval_minutes);
        self
    }

    pub fn with_work_hours(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.work_start = start;
        self.work_end = end;
        self
    }

    /// Categories that are enabled with a positive interval.
    pub fn active_categories(&self) -> impl Iterator<Item = ReminderCategory> + '_ {
        ReminderCategory::ALL
            .into_iter()
            .filter(|c| self.category(*c).active_interval_secs().is_some())
    }
}

/// Parse a wall-clock time given as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ValidationError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTimeOfDay(value.to_string()))
}

/// Serde adapter storing times of day as `"HH:MM"`.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).map_err(serde::de::Error::custom)
    }
}
