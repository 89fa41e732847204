//! SQLite-backed activity log.
//!
//! One row per resolved reminder in `reminder_log`, plus one row in
//! `water_record` per glass logged by completing a water reminder.
//! Aggregation into streaks or charts is left to whoever reads the tables.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::collaborators::{ActivityEntry, ActivityLog};
use crate::error::{CoreError, DatabaseError};
use crate::reminder::ReminderCategory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub category: ReminderCategory,
    pub completed: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterRecord {
    pub id: i64,
    pub amount_ml: u32,
    pub at: DateTime<Utc>,
}

fn parse_at(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

/// SQLite database for the activity log.
pub struct ActivityDb {
    conn: Connection,
}

impl ActivityDb {
    /// Open the database at `~/.config/wellnudge/wellnudge.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("wellnudge.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reminder_log (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                category  TEXT NOT NULL,
                completed INTEGER NOT NULL,
                at        TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reminder_log_at ON reminder_log(at);

            CREATE TABLE IF NOT EXISTS water_record (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                amount_ml INTEGER NOT NULL,
                at        TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_water_record_at ON water_record(at);",
        )?;
        Ok(())
    }

    /// Insert one entry and return its `reminder_log` row id. Water intake
    /// on the entry goes to `water_record` in the same transaction.
    pub fn insert(&self, entry: &ActivityEntry) -> Result<i64, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO reminder_log (category, completed, at) VALUES (?1, ?2, ?3)",
            params![entry.category.as_str(), entry.completed, entry.at.to_rfc3339()],
        )?;
        let id = tx.last_insert_rowid();
        if let Some(amount_ml) = entry.water_ml {
            tx.execute(
                "INSERT INTO water_record (amount_ml, at) VALUES (?1, ?2)",
                params![amount_ml, entry.at.to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ActivityRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, category, completed, at
             FROM reminder_log
             ORDER BY at DESC, id DESC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, category, completed, at) = row?;
            let category = category
                .parse::<ReminderCategory>()
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            records.push(ActivityRecord {
                id,
                category,
                completed,
                at: parse_at(&at)?,
            });
        }
        Ok(records)
    }

    /// Most recent water records first.
    pub fn recent_water(&self, limit: usize) -> Result<Vec<WaterRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, amount_ml, at
             FROM water_record
             ORDER BY at DESC, id DESC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, amount_ml, at) = row?;
            records.push(WaterRecord {
                id,
                amount_ml,
                at: parse_at(&at)?,
            });
        }
        Ok(records)
    }

    /// Total millilitres logged in `[from, to)`.
    pub fn water_total_ml(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(amount_ml), 0) FROM water_record WHERE at >= ?1 AND at < ?2",
            params![from.to_rfc3339(), to.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}

impl ActivityLog for ActivityDb {
    fn record(&mut self, entry: &ActivityEntry) -> Result<(), CoreError> {
        self.insert(entry)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry(category: ReminderCategory, completed: bool, minute: u32) -> ActivityEntry {
        ActivityEntry {
            category,
            completed,
            at: Utc.with_ymd_and_hms(2026, 3, 9, 10, minute, 0).unwrap(),
            water_ml: None,
        }
    }

    #[test]
    fn record_and_read_back() {
        let mut db = ActivityDb::open_memory().unwrap();
        db.record(&entry(ReminderCategory::Water, true, 0)).unwrap();
        db.record(&entry(ReminderCategory::EyeRest, false, 5)).unwrap();

        let recent = db.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].category, ReminderCategory::EyeRest);
        assert!(!recent[0].completed);
        assert_eq!(recent[1].category, ReminderCategory::Water);
        assert_eq!(recent[1].at - recent[0].at, Duration::minutes(-5));
    }

    #[test]
    fn recent_respects_limit() {
        let db = ActivityDb::open_memory().unwrap();
        for minute in 0..5 {
            db.insert(&entry(ReminderCategory::Movement, true, minute)).unwrap();
        }
        let recent = db.recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].at, entry(ReminderCategory::Movement, true, 4).at);
    }

    #[test]
    fn completed_water_adds_a_water_record() {
        let mut db = ActivityDb::open_memory().unwrap();
        let glass = |minute| ActivityEntry {
            water_ml: Some(300),
            ..entry(ReminderCategory::Water, true, minute)
        };
        db.record(&glass(0)).unwrap();
        db.record(&entry(ReminderCategory::Water, false, 10)).unwrap();
        db.record(&glass(20)).unwrap();

        assert_eq!(db.recent(10).unwrap().len(), 3);
        let water = db.recent_water(10).unwrap();
        assert_eq!(water.len(), 2);
        assert_eq!(water[0].amount_ml, 300);
        assert_eq!(water[0].at, glass(20).at);

        let day = Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(db.water_total_ml(day, day + Duration::days(1)).unwrap(), 600);
        assert_eq!(db.water_total_ml(glass(10).at, glass(20).at).unwrap(), 0);
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.db");
        {
            let db = ActivityDb::open_at(&path).unwrap();
            db.insert(&entry(ReminderCategory::Water, true, 1)).unwrap();
        }
        let db = ActivityDb::open_at(&path).unwrap();
        assert_eq!(db.recent(10).unwrap().len(), 1);
    }
}
