//! Tokio host for [`ReminderEngine`].
//!
//! One task owns the engine. A periodic interval drives `tick()`, and every
//! external callback (notification delivery, wake, UI action) is posted as an
//! [`EngineCommand`] onto the same task, so engine state is never touched
//! from two places at once. Events are fanned out on a broadcast channel.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::engine::{EngineSnapshot, ReminderEngine};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::preferences::Preferences;
use crate::reminder::{ReminderCategory, ResolveOutcome, TriggerId};

/// Broadcast buffer; slow subscribers lag rather than block the engine.
const EVENT_CAPACITY: usize = 256;

const MIN_TICK: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub enum EngineCommand {
    TriggerFired(TriggerId),
    Wake,
    PreferencesChanged(Preferences),
    Resolve(ResolveOutcome),
    /// Defer the active reminder; `None` uses the snooze preference.
    Defer(Option<i64>),
    Snooze {
        category: ReminderCategory,
        minutes: Option<i64>,
    },
    Preview(ReminderCategory),
    Snapshot(oneshot::Sender<EngineSnapshot>),
    RemainingSeconds(ReminderCategory, oneshot::Sender<Option<i64>>),
    Shutdown,
}

/// Cloneable sender side of the engine task.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    pub fn send(&self, command: EngineCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| CoreError::EngineStopped)
    }

    pub fn trigger_fired(&self, id: TriggerId) -> Result<()> {
        self.send(EngineCommand::TriggerFired(id))
    }

    pub fn notify_wake(&self) -> Result<()> {
        self.send(EngineCommand::Wake)
    }

    pub fn preferences_changed(&self, preferences: Preferences) -> Result<()> {
        self.send(EngineCommand::PreferencesChanged(preferences))
    }

    pub fn resolve(&self, outcome: ResolveOutcome) -> Result<()> {
        self.send(EngineCommand::Resolve(outcome))
    }

    pub fn defer(&self, minutes: Option<i64>) -> Result<()> {
        self.send(EngineCommand::Defer(minutes))
    }

    pub fn snooze(&self, category: ReminderCategory, minutes: Option<i64>) -> Result<()> {
        self.send(EngineCommand::Snooze { category, minutes })
    }

    pub fn preview(&self, category: ReminderCategory) -> Result<()> {
        self.send(EngineCommand::Preview(category))
    }

    pub async fn snapshot(&self) -> Result<EngineSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot(reply))?;
        rx.await.map_err(|_| CoreError::EngineStopped)
    }

    pub async fn remaining_seconds_for(&self, category: ReminderCategory) -> Result<Option<i64>> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::RemainingSeconds(category, reply))?;
        rx.await.map_err(|_| CoreError::EngineStopped)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(EngineCommand::Shutdown)
    }
}

/// Start the engine task. Must be called inside a tokio runtime.
pub fn spawn<Tz>(engine: ReminderEngine<Tz>) -> (EngineHandle, broadcast::Receiver<Event>, JoinHandle<()>)
where
    Tz: TimeZone + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let (events, subscriber) = broadcast::channel(EVENT_CAPACITY);
    let task = tokio::spawn(run(engine, rx, events));
    (EngineHandle { tx }, subscriber, task)
}

async fn run<Tz>(
    mut engine: ReminderEngine<Tz>,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    events: broadcast::Sender<Event>,
) where
    Tz: TimeZone + Send + 'static,
{
    let period = engine.settings().tick_interval.max(MIN_TICK);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    publish(&events, engine.start(Utc::now()));
    info!(tick_ms = period.as_millis() as u64, "reminder engine running");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for event in engine.tick(Utc::now()) {
                    publish(&events, event);
                }
            }
            command = commands.recv() => {
                let Some(command) = command else { break };
                if matches!(command, EngineCommand::Shutdown) {
                    break;
                }
                handle(&mut engine, command, &events);
            }
        }
    }

    info!("reminder engine stopped");
}

fn handle<Tz: TimeZone>(engine: &mut ReminderEngine<Tz>, command: EngineCommand, events: &broadcast::Sender<Event>) {
    let now = Utc::now();
    debug!(?command, "engine command");
    match command {
        EngineCommand::TriggerFired(id) => publish(events, engine.on_trigger_fired(id, now)),
        EngineCommand::Wake => publish(events, engine.notify_wake(now)),
        EngineCommand::PreferencesChanged(preferences) => {
            publish(events, engine.on_preferences_changed(preferences, now))
        }
        EngineCommand::Resolve(outcome) => {
            for event in engine.resolve_active_reminder(outcome, now) {
                publish(events, event);
            }
        }
        EngineCommand::Defer(minutes) => {
            for event in engine.defer_active_reminder(minutes, now) {
                publish(events, event);
            }
        }
        EngineCommand::Snooze { category, minutes } => {
            publish(events, engine.snooze(category, minutes, now))
        }
        EngineCommand::Preview(category) => publish(events, engine.preview(category, now)),
        EngineCommand::Snapshot(reply) => {
            let _ = reply.send(engine.snapshot(now));
        }
        EngineCommand::RemainingSeconds(category, reply) => {
            let _ = reply.send(engine.remaining_seconds_for(category));
        }
        EngineCommand::Shutdown => {}
    }
}

fn publish(events: &broadcast::Sender<Event>, event: Event) {
    // No subscribers is not an error.
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::memory::{MemoryHandles, PresentationCall};
    use crate::engine::EngineSettings;

    fn quiet_preferences() -> Preferences {
        let mut prefs = Preferences::default();
        for category in ReminderCategory::ALL {
            prefs = prefs.with_category(category, false, 30);
        }
        prefs
    }

    async fn next_matching(
        rx: &mut broadcast::Receiver<Event>,
        f: impl Fn(&Event) -> bool,
    ) -> Event {
        loop {
            let event = rx.recv().await.unwrap();
            if f(&event) {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn commands_are_applied_on_the_engine_task() {
        let handles = MemoryHandles::new(quiet_preferences());
        let engine = ReminderEngine::new(Utc, handles.collaborators(), EngineSettings::default());
        let (handle, mut events, task) = spawn(engine);

        handle.preview(ReminderCategory::EyeRest).unwrap();
        let shown = next_matching(&mut events, |e| matches!(e, Event::ReminderShown { .. })).await;
        assert!(matches!(
            shown,
            Event::ReminderShown {
                category: ReminderCategory::EyeRest,
                ..
            }
        ));

        handle.resolve(ResolveOutcome::Completed).unwrap();
        next_matching(&mut events, |e| matches!(e, Event::ReminderResolved { .. })).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.active, None);
        assert_eq!(
            handles.presentation.calls(),
            vec![PresentationCall::Show(ReminderCategory::EyeRest), PresentationCall::Hide]
        );
        assert_eq!(handles.activity.entries().len(), 1);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn sending_after_shutdown_reports_stopped() {
        let handles = MemoryHandles::new(quiet_preferences());
        let engine = ReminderEngine::new(Utc, handles.collaborators(), EngineSettings::default());
        let (handle, _events, task) = spawn(engine);

        handle.shutdown().unwrap();
        task.await.unwrap();

        assert!(matches!(handle.notify_wake(), Err(CoreError::EngineStopped)));
        assert!(matches!(handle.snapshot().await, Err(CoreError::EngineStopped)));
    }

    #[tokio::test]
    async fn snooze_command_arms_a_trigger() {
        let handles = MemoryHandles::new(quiet_preferences());
        let engine = ReminderEngine::new(Utc, handles.collaborators(), EngineSettings::default());
        let (handle, mut events, task) = spawn(engine);

        handle.snooze(ReminderCategory::Water, Some(15)).unwrap();
        let armed = next_matching(&mut events, |e| matches!(e, Event::SnoozeArmed { .. })).await;
        let Event::SnoozeArmed { id, fire_at, at, .. } = armed else {
            unreachable!()
        };
        assert_eq!(fire_at - at, chrono::Duration::minutes(15));
        assert!(handles.notifications.pending().iter().any(|t| t.id == id));

        handle.shutdown().unwrap();
        task.await.unwrap();
    }
}
