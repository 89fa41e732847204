use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use wellnudge_core::reminder::{window_for, WorkWindow};
use wellnudge_core::{Config, ReminderCategory, TriggerScheduler};

#[derive(Serialize)]
struct CategoryPlan {
    category: ReminderCategory,
    enabled: bool,
    interval_minutes: i64,
    next_due: Option<DateTime<Utc>>,
    triggers: Vec<DateTime<Utc>>,
}

#[derive(Serialize)]
struct PlanReport {
    now: DateTime<Utc>,
    work_window: WorkWindow,
    in_work_window: bool,
    categories: Vec<CategoryPlan>,
}

fn hhmm(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let preferences = &config.preferences;
    let now = Local::now();
    let now_utc = now.with_timezone(&Utc);

    let work_window = window_for(preferences, &now);
    let plan = TriggerScheduler::plan(preferences, &now, config.engine.max_triggers_per_category);
    let categories = ReminderCategory::ALL
        .into_iter()
        .map(|category| {
            let preference = preferences.category(category);
            CategoryPlan {
                category,
                enabled: preference.active_interval_secs().is_some(),
                interval_minutes: preference.interval_minutes,
                next_due: TriggerScheduler::next_due(category, preferences, &now),
                triggers: plan
                    .iter()
                    .filter(|(c, _)| *c == category)
                    .map(|(_, at)| *at)
                    .collect(),
            }
        })
        .collect();

    let report = PlanReport {
        now: now_utc,
        work_window,
        in_work_window: work_window.contains(now_utc),
        categories,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.work_window.is_empty() {
        println!("Work window: empty, no reminders today");
    } else {
        println!(
            "Work window: {} - {} ({})",
            hhmm(report.work_window.start),
            hhmm(report.work_window.end),
            if report.in_work_window { "open" } else { "closed" }
        );
    }
    for line in &report.categories {
        if !line.enabled {
            println!("  {:<9} off", line.category.label());
            continue;
        }
        println!(
            "  {:<9} every {:>3} min  next {:<5}  {} triggers today",
            line.category.label(),
            line.interval_minutes,
            line.next_due.map(hhmm).unwrap_or_else(|| "-".to_string()),
            line.triggers.len()
        );
    }
    Ok(())
}
