//! # Wellnudge Core Library
//!
//! Core logic for the Wellnudge wellness reminder: drink water, rest your
//! eyes, move. All behaviour lives here; the `wellnudge` CLI and any desktop
//! shell are thin hosts over the same engine.
//!
//! ## Architecture
//!
//! - **Reminder engine**: a wall-clock-driven state machine. The caller passes
//!   `now` to every operation and invokes `tick()` periodically
//! - **Two trigger paths**: in-process per-category countdowns, and
//!   pre-registered one-shot triggers on an external notification channel.
//!   Both funnel into one dispatcher that keeps at most one reminder on screen
//! - **Collaborators**: preferences, notifications, presentation and activity
//!   logging are traits injected at construction
//! - **Storage**: TOML configuration and a SQLite activity log
//! - **Runtime**: a tokio task that owns the engine and serialises external
//!   callbacks onto it
//!
//! ## Key Components
//!
//! - [`ReminderEngine`]: the engine surface
//! - [`Preferences`]: user-editable reminder settings
//! - [`Config`]: application configuration management
//! - [`ActivityDb`]: resolved-reminder persistence

pub mod collaborators;
pub mod engine;
pub mod error;
pub mod events;
pub mod preferences;
pub mod reminder;
pub mod runtime;
pub mod storage;

pub use collaborators::{
    ActivityEntry, ActivityLog, Collaborators, NotificationChannel, PreferenceStore,
    PresentationSurface,
};
pub use engine::{CategorySnapshot, EngineSettings, EngineSnapshot, ReminderEngine};
pub use error::{ConfigError, CoreError, DatabaseError, NotificationError, Result, ValidationError};
pub use events::Event;
pub use preferences::{parse_time_of_day, CategoryPreference, Preferences};
pub use reminder::{
    format_countdown, ReminderCategory, ResolveOutcome, ScheduledTrigger, TriggerId,
    TriggerScheduler, TriggerSource,
};
pub use runtime::{EngineCommand, EngineHandle};
pub use storage::{
    ActivityDb, ActivityRecord, Config, EngineSettingsConfig, FilePreferenceStore, WaterRecord,
};
