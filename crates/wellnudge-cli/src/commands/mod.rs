pub mod config;
pub mod log;
pub mod plan;
pub mod run;
pub mod simulate;

use wellnudge_core::Event;

/// One-line human description of an engine event, without its timestamp.
pub fn describe(event: &Event) -> String {
    match event {
        Event::ReminderShown {
            category,
            source,
            replaced,
            ..
        } => match replaced {
            Some(previous) => format!("{} reminder ({source:?}), replacing {}", category.label(), previous.label()),
            None => format!("{} reminder ({source:?})", category.label()),
        },
        Event::ReminderSuppressed { category, .. } => {
            format!("{} reminder (notification only)", category.label())
        }
        Event::ReminderResolved { category, outcome, .. } => {
            format!("{} reminder resolved: {outcome:?}", category.label())
        }
        Event::SnoozeArmed { category, fire_at, .. } => {
            format!("{} snoozed until {}", category.label(), fire_at.format("%H:%M:%S"))
        }
        Event::TriggersRebuilt {
            generation,
            registered,
            failed,
            skipped_past,
            ..
        } => format!(
            "triggers rebuilt: generation {generation}, {registered} registered, {failed} failed, {skipped_past} already past"
        ),
        Event::StaleTriggerDropped { id, .. } => format!("stale trigger {id} dropped"),
        Event::WakeObserved { .. } => "wake observed".to_string(),
        Event::ClockDiscontinuity { gap_secs, .. } => format!("{gap_secs}s tick gap treated as sleep"),
    }
}
