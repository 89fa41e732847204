//! Replay a working day on a virtual clock.
//!
//! The engine runs against in-memory collaborators and the configured
//! preferences, ticking once per `--step`. Every reminder shown is completed
//! automatically `--respond-after` seconds later. Times are wall-clock in
//! UTC on today's date so the output is reproducible.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use clap::Args;
use wellnudge_core::collaborators::memory::MemoryHandles;
use wellnudge_core::{
    parse_time_of_day, Config, Event, ReminderCategory, ReminderEngine, ResolveOutcome,
};

use super::describe;

#[derive(Args)]
pub struct SimulateArgs {
    /// Virtual start time (HH:MM)
    #[arg(long, default_value = "07:55")]
    from: String,
    /// Virtual end time (HH:MM)
    #[arg(long, default_value = "17:05")]
    to: String,
    /// Seconds between ticks
    #[arg(long, default_value = "1")]
    step: i64,
    /// Seconds before a shown reminder is completed
    #[arg(long, default_value = "30")]
    respond_after: i64,
    /// Also deliver the registered external triggers at their instants
    #[arg(long)]
    deliver_triggers: bool,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

fn virtual_instant(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    let time = parse_time_of_day(raw)?;
    let today = Utc::now().date_naive();
    Ok(NaiveDateTime::new(today, time).and_utc())
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let from = virtual_instant(&args.from)?;
    let to = virtual_instant(&args.to)?;
    if to < from {
        return Err(format!("--to {} is before --from {}", args.to, args.from).into());
    }
    let step = Duration::try_seconds(args.step.max(1)).ok_or("--step is out of range")?;
    let respond_after =
        Duration::try_seconds(args.respond_after.max(0)).ok_or("--respond-after is out of range")?;

    let config = Config::load()?;
    let handles = MemoryHandles::new(config.preferences.clone());
    let mut engine = ReminderEngine::new(Utc, handles.collaborators(), config.engine.to_settings());

    let mut shown: BTreeMap<ReminderCategory, usize> = BTreeMap::new();
    let mut respond_at: Option<DateTime<Utc>> = None;
    let mut emit = |event: Event, respond_at: &mut Option<DateTime<Utc>>| -> Result<(), serde_json::Error> {
        if let Event::ReminderShown { category, at, .. } = &event {
            *shown.entry(*category).or_default() += 1;
            *respond_at = at.checked_add_signed(respond_after);
        }
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}  {}", event.at().format("%H:%M:%S"), describe(&event));
        }
        Ok(())
    };

    emit(engine.start(from), &mut respond_at)?;
    let mut now = from;
    while now <= to {
        for event in engine.tick(now) {
            emit(event, &mut respond_at)?;
        }
        if args.deliver_triggers {
            for trigger in handles.notifications.take_due(now) {
                emit(engine.on_trigger_fired(trigger.id, now), &mut respond_at)?;
            }
        }
        if respond_at.is_some_and(|at| at <= now) {
            respond_at = None;
            for event in engine.resolve_active_reminder(ResolveOutcome::Completed, now) {
                emit(event, &mut respond_at)?;
            }
        }
        match now.checked_add_signed(step) {
            Some(next) => now = next,
            None => break,
        }
    }

    if !args.json {
        println!();
        for category in ReminderCategory::ALL {
            println!(
                "{:<9} {} shown",
                category.label(),
                shown.get(&category).copied().unwrap_or(0)
            );
        }
    }
    Ok(())
}
