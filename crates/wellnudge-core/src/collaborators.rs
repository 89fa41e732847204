//! Seams between the reminder engine and its host.
//!
//! The engine talks to the outside world only through these four traits.
//! Production hosts wire real implementations (config file, OS notification
//! scheduler, full-screen window, SQLite log); [`memory`] provides in-process
//! ones for tests and the simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, NotificationError};
use crate::preferences::Preferences;
use crate::reminder::{ReminderCategory, ScheduledTrigger};

/// Source of the current preference snapshot. Called on every tick, so
/// implementations should be cheap when nothing changed.
pub trait PreferenceStore: Send {
    fn load(&mut self) -> Preferences;
}

/// External one-shot trigger scheduler (OS notifications or similar).
/// A registered trigger is delivered back to the engine by the host through
/// `on_trigger_fired` with the same id.
pub trait NotificationChannel: Send {
    fn register_trigger(&mut self, trigger: &ScheduledTrigger) -> Result<(), NotificationError>;

    /// Drop every trigger this channel has outstanding.
    fn cancel_all(&mut self);
}

/// The full-screen takeover window.
pub trait PresentationSurface: Send {
    fn show(&mut self, category: ReminderCategory);
    fn hide(&mut self);
}

/// One resolved reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub category: ReminderCategory,
    pub completed: bool,
    pub at: DateTime<Utc>,
    /// Water drunk, set only for a completed water reminder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_ml: Option<u32>,
}

pub trait ActivityLog: Send {
    fn record(&mut self, entry: &ActivityEntry) -> Result<(), CoreError>;
}

/// Everything the engine needs from its host, handed over at construction.
pub struct Collaborators {
    pub preferences: Box<dyn PreferenceStore>,
    pub notifications: Box<dyn NotificationChannel>,
    pub presentation: Box<dyn PresentationSurface>,
    pub activity: Box<dyn ActivityLog>,
}

/// In-memory collaborators.
///
/// Each type is a cheap handle over shared state: clone it, box one clone into
/// the engine and keep the other to inspect or drive it.
pub mod memory {
    use std::sync::{Arc, Mutex, MutexGuard};

    use chrono::{DateTime, Utc};

    use super::{
        ActivityEntry, ActivityLog, Collaborators, NotificationChannel, PreferenceStore,
        PresentationSurface,
    };
    use crate::error::{CoreError, DatabaseError, NotificationError};
    use crate::preferences::Preferences;
    use crate::reminder::{ReminderCategory, ScheduledTrigger};

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Preferences ──────────────────────────────────────────────────

    #[derive(Debug, Clone, Default)]
    pub struct MemoryPreferenceStore {
        inner: Arc<Mutex<Preferences>>,
    }

    impl MemoryPreferenceStore {
        pub fn new(preferences: Preferences) -> Self {
            Self {
                inner: Arc::new(Mutex::new(preferences)),
            }
        }

        pub fn set(&self, preferences: Preferences) {
            *lock(&self.inner) = preferences;
        }

        pub fn update(&self, f: impl FnOnce(&mut Preferences)) {
            f(&mut lock(&self.inner));
        }
    }

    impl PreferenceStore for MemoryPreferenceStore {
        fn load(&mut self) -> Preferences {
            lock(&self.inner).clone()
        }
    }

    // ── Notification channel ─────────────────────────────────────────

    #[derive(Debug, Default)]
    struct ChannelState {
        pending: Vec<ScheduledTrigger>,
        rejecting: bool,
        cancel_count: usize,
    }

    #[derive(Debug, Clone, Default)]
    pub struct MemoryNotificationChannel {
        inner: Arc<Mutex<ChannelState>>,
    }

    impl MemoryNotificationChannel {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registered triggers in registration order.
        pub fn pending(&self) -> Vec<ScheduledTrigger> {
            lock(&self.inner).pending.clone()
        }

        /// Refuse every registration, as a platform with revoked permission would.
        pub fn set_rejecting(&self, rejecting: bool) {
            lock(&self.inner).rejecting = rejecting;
        }

        pub fn cancel_count(&self) -> usize {
            lock(&self.inner).cancel_count
        }

        /// Remove and return every trigger due at or before `now`, earliest
        /// first. Lets a test or the simulator play the platform's part.
        pub fn take_due(&self, now: DateTime<Utc>) -> Vec<ScheduledTrigger> {
            let mut state = lock(&self.inner);
            let (mut due, rest): (Vec<_>, Vec<_>) =
                state.pending.drain(..).partition(|t| t.at <= now);
            state.pending = rest;
            due.sort_by_key(|t| t.at);
            due
        }
    }

    impl NotificationChannel for MemoryNotificationChannel {
        fn register_trigger(&mut self, trigger: &ScheduledTrigger) -> Result<(), NotificationError> {
            let mut state = lock(&self.inner);
            if state.rejecting {
                return Err(NotificationError::Rejected {
                    id: trigger.id.to_string(),
                    reason: "notifications disabled".to_string(),
                });
            }
            state.pending.retain(|t| t.id != trigger.id);
            state.pending.push(trigger.clone());
            Ok(())
        }

        fn cancel_all(&mut self) {
            let mut state = lock(&self.inner);
            state.pending.clear();
            state.cancel_count += 1;
        }
    }

    // ── Presentation ─────────────────────────────────────────────────

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PresentationCall {
        Show(ReminderCategory),
        Hide,
    }

    #[derive(Debug, Clone, Default)]
    pub struct RecordingPresentation {
        calls: Arc<Mutex<Vec<PresentationCall>>>,
    }

    impl RecordingPresentation {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<PresentationCall> {
            lock(&self.calls).clone()
        }

        pub fn clear(&self) {
            lock(&self.calls).clear();
        }
    }

    impl PresentationSurface for RecordingPresentation {
        fn show(&mut self, category: ReminderCategory) {
            lock(&self.calls).push(PresentationCall::Show(category));
        }

        fn hide(&mut self) {
            lock(&self.calls).push(PresentationCall::Hide);
        }
    }

    // ── Activity log ─────────────────────────────────────────────────

    #[derive(Debug, Default)]
    struct LogState {
        entries: Vec<ActivityEntry>,
        failing: bool,
    }

    #[derive(Debug, Clone, Default)]
    pub struct MemoryActivityLog {
        inner: Arc<Mutex<LogState>>,
    }

    impl MemoryActivityLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn entries(&self) -> Vec<ActivityEntry> {
            lock(&self.inner).entries.clone()
        }

        pub fn set_failing(&self, failing: bool) {
            lock(&self.inner).failing = failing;
        }
    }

    impl ActivityLog for MemoryActivityLog {
        fn record(&mut self, entry: &ActivityEntry) -> Result<(), CoreError> {
            let mut state = lock(&self.inner);
            if state.failing {
                return Err(DatabaseError::Locked.into());
            }
            state.entries.push(*entry);
            Ok(())
        }
    }

    // ── Bundle ───────────────────────────────────────────────────────

    /// One handle per in-memory collaborator.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryHandles {
        pub preferences: MemoryPreferenceStore,
        pub notifications: MemoryNotificationChannel,
        pub presentation: RecordingPresentation,
        pub activity: MemoryActivityLog,
    }

    impl MemoryHandles {
        pub fn new(preferences: Preferences) -> Self {
            Self {
                preferences: MemoryPreferenceStore::new(preferences),
                ..Self::default()
            }
        }

        /// Boxed clones for the engine; `self` keeps observing the same state.
        pub fn collaborators(&self) -> Collaborators {
            Collaborators {
                preferences: Box::new(self.preferences.clone()),
                notifications: Box::new(self.notifications.clone()),
                presentation: Box::new(self.presentation.clone()),
                activity: Box::new(self.activity.clone()),
            }
        }
    }
}
