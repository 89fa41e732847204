//! "Remind me later" triggers.
//!
//! A snooze is a single one-shot trigger, independent from the regular
//! work-hours sequence. It is registered on the external channel and also
//! kept here, so the tick can fire it in-process when the channel is
//! unavailable. Whichever path reaches it first consumes the id; each armed
//! snooze fires at most once.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::triggers::{ScheduledTrigger, TriggerId};
use super::ReminderCategory;
use crate::collaborators::NotificationChannel;

/// Used when the configured snooze is not a positive number of minutes.
pub const DEFAULT_SNOOZE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnoozeArmer {
    pending: BTreeMap<TriggerId, ScheduledTrigger>,
}

impl SnoozeArmer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding snoozes, earliest first.
    pub fn pending(&self) -> Vec<ScheduledTrigger> {
        let mut pending: Vec<_> = self.pending.values().cloned().collect();
        pending.sort_by_key(|t| t.at);
        pending
    }

    pub fn is_pending(&self, id: &TriggerId) -> bool {
        self.pending.contains_key(id)
    }

    /// Arm a snooze for `category` at `now + delay_minutes` under a fresh id.
    /// A delay that is not positive, or too large to represent, falls back to
    /// [`DEFAULT_SNOOZE_MINUTES`].
    /// Registration failure on the external channel is logged; the snooze
    /// still fires from the tick.
    pub fn arm(
        &mut self,
        category: ReminderCategory,
        delay_minutes: i64,
        now: DateTime<Utc>,
        channel: &mut dyn NotificationChannel,
    ) -> ScheduledTrigger {
        let requested = if delay_minutes > 0 {
            Duration::try_minutes(delay_minutes).and_then(|delay| now.checked_add_signed(delay))
        } else {
            None
        };
        let (delay_minutes, at) = match requested {
            Some(at) => (delay_minutes, at),
            None => {
                if delay_minutes > 0 {
                    warn!(delay_minutes, "snooze delay out of range, using default");
                }
                (
                    DEFAULT_SNOOZE_MINUTES,
                    now + Duration::minutes(DEFAULT_SNOOZE_MINUTES),
                )
            }
        };
        let trigger = ScheduledTrigger {
            id: TriggerId::new_snooze(),
            category,
            at,
        };

        if let Err(err) = channel.register_trigger(&trigger) {
            warn!(id = %trigger.id, error = %err, "snooze kept in-process only");
        }
        info!(id = %trigger.id, %category, delay_minutes, "snooze armed");

        self.pending.insert(trigger.id, trigger.clone());
        trigger
    }

    /// Remove and return every snooze due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<ScheduledTrigger> {
        let due_ids: Vec<TriggerId> = self
            .pending
            .values()
            .filter(|t| t.at <= now)
            .map(|t| t.id)
            .collect();
        let mut due: Vec<_> = due_ids
            .iter()
            .filter_map(|id| self.pending.remove(id))
            .collect();
        due.sort_by_key(|t| t.at);
        due
    }

    /// Consume a snooze delivered by the external channel. `None` when the
    /// id is unknown or already fired in-process.
    pub fn accept_fire(&mut self, id: &TriggerId) -> Option<ScheduledTrigger> {
        self.pending.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::memory::MemoryNotificationChannel;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, h, m, 0).unwrap()
    }

    #[test]
    fn arm_registers_one_trigger_with_a_fresh_id() {
        let mut channel = MemoryNotificationChannel::new();
        let mut armer = SnoozeArmer::new();
        let first = armer.arm(ReminderCategory::Water, 5, at(10, 0), &mut channel);
        let second = armer.arm(ReminderCategory::Water, 5, at(10, 0), &mut channel);

        assert_ne!(first.id, second.id);
        assert!(first.id.is_snooze());
        assert_eq!(first.at, at(10, 5));
        assert_eq!(channel.pending().len(), 2);
        assert_eq!(armer.pending().len(), 2);
    }

    #[test]
    fn non_positive_delay_uses_default() {
        let mut channel = MemoryNotificationChannel::new();
        let mut armer = SnoozeArmer::new();
        let trigger = armer.arm(ReminderCategory::Movement, 0, at(10, 0), &mut channel);
        assert_eq!(trigger.at, at(10, DEFAULT_SNOOZE_MINUTES as u32));
    }

    #[test]
    fn unrepresentable_delay_uses_default() {
        let mut channel = MemoryNotificationChannel::new();
        let mut armer = SnoozeArmer::new();
        let trigger = armer.arm(ReminderCategory::Water, 1_000_000_000_000, at(9, 0), &mut channel);
        assert_eq!(trigger.at, at(9, DEFAULT_SNOOZE_MINUTES as u32));

        let trigger = armer.arm(ReminderCategory::Water, i64::MAX, at(9, 0), &mut channel);
        assert_eq!(trigger.at, at(9, DEFAULT_SNOOZE_MINUTES as u32));
        assert_eq!(channel.pending().len(), 2);
    }

    #[test]
    fn take_due_consumes_only_elapsed_snoozes() {
        let mut channel = MemoryNotificationChannel::new();
        let mut armer = SnoozeArmer::new();
        let early = armer.arm(ReminderCategory::Water, 5, at(10, 0), &mut channel);
        let late = armer.arm(ReminderCategory::EyeRest, 15, at(10, 0), &mut channel);

        assert!(armer.take_due(at(10, 4)).is_empty());
        assert_eq!(armer.take_due(at(10, 5)), vec![early]);
        assert!(armer.is_pending(&late.id));
    }

    #[test]
    fn each_snooze_fires_at_most_once() {
        let mut channel = MemoryNotificationChannel::new();
        let mut armer = SnoozeArmer::new();
        let trigger = armer.arm(ReminderCategory::Water, 5, at(10, 0), &mut channel);

        assert!(armer.accept_fire(&trigger.id).is_some());
        assert!(armer.accept_fire(&trigger.id).is_none());
        assert!(armer.take_due(at(11, 0)).is_empty());
    }

    #[test]
    fn rejected_registration_still_tracks_snooze() {
        let mut channel = MemoryNotificationChannel::new();
        channel.set_rejecting(true);
        let mut armer = SnoozeArmer::new();
        let trigger = armer.arm(ReminderCategory::Water, 5, at(10, 0), &mut channel);
        assert!(channel.pending().is_empty());
        assert_eq!(armer.take_due(at(10, 5)), vec![trigger]);
    }
}
