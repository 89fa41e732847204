//! Foreground reminder daemon.
//!
//! Wires the engine to real collaborators: preferences from `config.toml`
//! (edits are picked up while running), the activity database, a console
//! stand-in for the full-screen window, and a notification channel backed by
//! one sleeping tokio task per registered trigger. Reminders are answered on
//! stdin.

use std::collections::HashMap;
use std::error::Error;

use chrono::{Local, Utc};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wellnudge_core::{
    ActivityDb, Collaborators, Config, EngineHandle, Event, FilePreferenceStore,
    NotificationChannel, NotificationError, PreferenceStore, Preferences, PresentationSurface,
    ReminderCategory, ReminderEngine, ResolveOutcome, ScheduledTrigger, TriggerId,
};

use super::describe;

const HELP: &str = "commands: done | later [MIN] | skip | wake | status | test <category> | quit";

#[derive(Args)]
pub struct RunArgs {
    /// Never take over the screen; reminders appear as notifications only
    #[arg(long)]
    no_full_screen: bool,
}

/// Delivers each registered trigger from its own tokio task at the trigger's
/// instant. Fired ids come back on an mpsc channel.
struct TimerChannel {
    runtime: Handle,
    fired: mpsc::UnboundedSender<TriggerId>,
    timers: HashMap<TriggerId, JoinHandle<()>>,
}

impl TimerChannel {
    fn new(runtime: Handle, fired: mpsc::UnboundedSender<TriggerId>) -> Self {
        Self {
            runtime,
            fired,
            timers: HashMap::new(),
        }
    }
}

impl NotificationChannel for TimerChannel {
    fn register_trigger(&mut self, trigger: &ScheduledTrigger) -> Result<(), NotificationError> {
        if self.fired.is_closed() {
            return Err(NotificationError::Closed);
        }
        let delay = (trigger.at - Utc::now()).to_std().unwrap_or_default();
        let id = trigger.id;
        let fired = self.fired.clone();
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(id);
        });
        if let Some(previous) = self.timers.insert(id, timer) {
            previous.abort();
        }
        self.timers.retain(|_, timer| !timer.is_finished());
        Ok(())
    }

    fn cancel_all(&mut self) {
        debug!(count = self.timers.len(), "cancelling notification timers");
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

/// Prints the reminder where the full-screen window would be.
struct ConsolePresentation;

impl PresentationSurface for ConsolePresentation {
    fn show(&mut self, category: ReminderCategory) {
        let message = match category {
            ReminderCategory::Water => "Time to drink some water.",
            ReminderCategory::EyeRest => "Look at something 20 feet away for 20 seconds.",
            ReminderCategory::Movement => "Stand up and move around for a minute.",
        };
        println!();
        println!("==== {} ====", category.label());
        println!("{message}");
        println!("  done | later [MIN] | skip");
    }

    fn hide(&mut self) {
        println!("==== dismissed ====");
    }
}

/// Forces `full_screen_enabled` off on every snapshot.
struct NotificationsOnly(FilePreferenceStore);

impl PreferenceStore for NotificationsOnly {
    fn load(&mut self) -> Preferences {
        let mut preferences = self.0.load();
        preferences.full_screen_enabled = false;
        preferences
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(args))
}

async fn serve(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let store = FilePreferenceStore::open()?;
    info!(path = %store.path().display(), "watching preferences");
    let preferences: Box<dyn PreferenceStore> = if args.no_full_screen {
        Box::new(NotificationsOnly(store))
    } else {
        Box::new(store)
    };

    let (fired_tx, mut fired_rx) = mpsc::unbounded_channel();
    let collaborators = Collaborators {
        preferences,
        notifications: Box::new(TimerChannel::new(Handle::current(), fired_tx)),
        presentation: Box::new(ConsolePresentation),
        activity: Box::new(ActivityDb::open()?),
    };
    let engine = ReminderEngine::new(Local, collaborators, config.engine.to_settings());
    let (handle, mut events, task) = wellnudge_core::runtime::spawn(engine);

    println!("wellnudge running. {HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match dispatch(&handle, line.trim()).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("error: {e}"),
                },
                None => {
                    debug!("stdin closed, running without console input");
                    stdin_open = false;
                }
            },
            Some(id) = fired_rx.recv() => handle.trigger_fired(id)?,
            event = events.recv() => match event {
                Ok(event) => render(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event output lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    // Already stopped is fine.
    let _ = handle.shutdown();
    task.await?;
    Ok(())
}

fn render(event: &Event) {
    match event {
        Event::ReminderShown { .. } | Event::TriggersRebuilt { .. } => {
            debug!(?event, "engine event");
        }
        Event::ReminderSuppressed { category, .. } => {
            println!("[notification] {}", category.label());
        }
        _ => println!(
            "{}  {}",
            event.at().with_timezone(&Local).format("%H:%M:%S"),
            describe(event)
        ),
    }
}

/// Handle one console line. Returns `false` when the daemon should stop.
async fn dispatch(handle: &EngineHandle, line: &str) -> Result<bool, Box<dyn Error>> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(true);
    };
    let argument = words.next();

    match command {
        "done" => handle.resolve(ResolveOutcome::Completed)?,
        "skip" => handle.resolve(ResolveOutcome::Skipped)?,
        "later" => {
            let minutes = argument.map(str::parse::<i64>).transpose()?;
            handle.defer(minutes)?;
        }
        "wake" => handle.notify_wake()?,
        "status" => {
            let snapshot = handle.snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        "test" => match argument.map(str::parse::<ReminderCategory>) {
            Some(category) => handle.preview(category?)?,
            None => println!("usage: test <water|eye_rest|movement>"),
        },
        "quit" | "exit" => return Ok(false),
        _ => println!("{HELP}"),
    }
    Ok(true)
}
