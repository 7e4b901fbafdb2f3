use chrono::NaiveDate;
use rusqlite::{params, Connection, Result, Row};
use std::path::Path;

use crate::error::ScheduleError;
use crate::models::{DateUpdate, Priority, Topic};
use crate::scheduler::commit::BatchSink;

/// Topic store gateway. The scheduler reads scoped snapshots through it
/// and writes date fields back; it never creates or deletes topics on its
/// own.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                plan_id TEXT NOT NULL,
                title TEXT NOT NULL,
                subject TEXT,
                priority TEXT CHECK(priority IN ('high', 'moderate', 'low')),
                estimated_hours REAL NOT NULL DEFAULT 1.0,
                study_date TEXT,
                practice_date TEXT,
                first_revision_date TEXT,
                second_revision_date TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_topics_scope ON topics(owner_id, plan_id);
            CREATE INDEX IF NOT EXISTS idx_topics_study_date ON topics(study_date);
            "#,
        )?;
        Ok(())
    }

    // Collaborator surface: topics are created and completed outside the
    // scheduling engine.
    pub fn add_topic(
        &self,
        owner_id: &str,
        plan_id: &str,
        title: &str,
        subject: Option<&str>,
        priority: Option<Priority>,
        estimated_hours: f64,
    ) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO topics (owner_id, plan_id, title, subject, priority, estimated_hours)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                owner_id,
                plan_id,
                title,
                subject,
                priority.map(|p| p.as_str()),
                estimated_hours
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_completed(&self, topic_id: i64, completed: bool) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE topics SET completed = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![completed as i32, topic_id],
        )?;
        Ok(rows > 0)
    }

    pub fn list_topics(&self, owner_id: &str, plan_id: &str) -> Result<Vec<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE owner_id = ?1 AND plan_id = ?2 ORDER BY id",
            SELECT_TOPIC
        ))?;
        let rows = stmt.query_map(params![owner_id, plan_id], topic_from_row)?;
        rows.collect()
    }

    /// Snapshot of the schedulable backlog: everything in scope that is
    /// not completed, in creation order.
    pub fn incomplete_topics(&self, owner_id: &str, plan_id: &str) -> Result<Vec<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE owner_id = ?1 AND plan_id = ?2 AND completed = 0 ORDER BY id",
            SELECT_TOPIC
        ))?;
        let rows = stmt.query_map(params![owner_id, plan_id], topic_from_row)?;
        rows.collect()
    }

    /// Topics in scope scheduled for `today` or later; the reschedule
    /// operation only ever touches these.
    pub fn future_topics(
        &self,
        owner_id: &str,
        plan_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE owner_id = ?1 AND plan_id = ?2 AND completed = 0 \
             AND study_date IS NOT NULL AND study_date >= ?3 \
             ORDER BY study_date, id",
            SELECT_TOPIC
        ))?;
        let rows = stmt.query_map(params![owner_id, plan_id, today], topic_from_row)?;
        rows.collect()
    }

    /// Writes one batch of date updates inside a single transaction.
    pub fn apply_date_batch(&self, batch: &[DateUpdate]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut touched = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                UPDATE topics
                SET study_date = ?1,
                    practice_date = ?2,
                    first_revision_date = ?3,
                    second_revision_date = ?4,
                    updated_at = datetime('now')
                WHERE id = ?5
                "#,
            )?;
            for update in batch {
                touched += stmt.execute(params![
                    update.study_date,
                    update.practice_date,
                    update.first_revision_date,
                    update.second_revision_date,
                    update.topic_id
                ])?;
            }
        }
        tx.commit()?;
        Ok(touched)
    }

    /// Inverse of scheduling: nulls all four date fields for the scope.
    pub fn clear_schedule(&self, owner_id: &str, plan_id: &str) -> Result<usize> {
        let rows = self.conn.execute(
            r#"
            UPDATE topics
            SET study_date = NULL,
                practice_date = NULL,
                first_revision_date = NULL,
                second_revision_date = NULL,
                updated_at = datetime('now')
            WHERE owner_id = ?1 AND plan_id = ?2
            "#,
            params![owner_id, plan_id],
        )?;
        Ok(rows)
    }
}

impl BatchSink for Database {
    fn apply_batch(&self, batch: &[DateUpdate]) -> std::result::Result<usize, ScheduleError> {
        self.apply_date_batch(batch).map_err(ScheduleError::from)
    }
}

const SELECT_TOPIC: &str = r#"
    SELECT id, owner_id, plan_id, title, subject, priority, estimated_hours,
           study_date, practice_date, first_revision_date, second_revision_date,
           completed, created_at, updated_at
    FROM topics
"#;

fn topic_from_row(row: &Row) -> Result<Topic> {
    let priority_str: Option<String> = row.get(5)?;
    Ok(Topic {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        plan_id: row.get(2)?,
        title: row.get(3)?,
        subject: row.get(4)?,
        priority: priority_str.as_deref().and_then(Priority::from_str),
        estimated_hours: row.get(6)?,
        study_date: row.get(7)?,
        practice_date: row.get(8)?,
        first_revision_date: row.get(9)?,
        second_revision_date: row.get(10)?,
        completed: row.get::<_, i32>(11)? != 0,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
