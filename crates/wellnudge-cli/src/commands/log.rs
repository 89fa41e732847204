use chrono::{Duration, Local, Utc};
use serde::Serialize;
use wellnudge_core::{ActivityDb, ActivityRecord, WaterRecord};

#[derive(Serialize)]
struct LogReport {
    reminders: Vec<ActivityRecord>,
    water: Vec<WaterRecord>,
    water_today_ml: u64,
}

pub fn run(limit: usize, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = ActivityDb::open()?;
    let midnight = Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|start| start.with_timezone(&Utc))
        .ok_or("cannot resolve local midnight")?;
    let report = LogReport {
        reminders: db.recent(limit)?,
        water: db.recent_water(limit)?,
        water_today_ml: db.water_total_ml(midnight, midnight + Duration::days(1))?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.reminders.is_empty() {
        println!("no reminders resolved yet");
        return Ok(());
    }
    for record in &report.reminders {
        println!(
            "{}  {:<9} {}",
            record.at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.category.label(),
            if record.completed { "done" } else { "not done" }
        );
    }
    println!();
    println!("water today: {} ml", report.water_today_ml);
    for record in &report.water {
        println!(
            "{}  +{} ml",
            record.at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.amount_ml
        );
    }
    Ok(())
}
