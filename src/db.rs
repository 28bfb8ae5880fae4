use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

use crate::models::{BugReport, CreateBugRequest, Metadata, MetadataValue, Priority, Status};

const SCHEMA_VERSION: i32 = 1;

const BUG_COLUMNS: &str =
    "id, title, description, screenshot_url, created_at, status, priority";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap_or(0);

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS bugs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
                    description TEXT,
                    screenshot_url TEXT,
                    created_at TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'OPEN',
                    priority TEXT NOT NULL DEFAULT 'MEDIUM'
                );

                -- One row per metadata key; values are JSON-encoded scalars
                CREATE TABLE IF NOT EXISTS bug_metadata (
                    bug_id INTEGER NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    PRIMARY KEY (bug_id, key),
                    FOREIGN KEY (bug_id) REFERENCES bugs(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_bugs_status ON bugs(status);
                CREATE INDEX IF NOT EXISTS idx_bug_metadata_bug ON bug_metadata(bug_id);
                "#,
            )?;

            self.conn
                .execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
        }

        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(())
    }

    /// Insert a bug with its metadata. Status starts at OPEN and a missing
    /// priority is stored as MEDIUM.
    pub fn create_bug(&self, request: &CreateBugRequest) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let priority = request.priority.unwrap_or_default();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO bugs (title, description, screenshot_url, created_at, status, priority) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                request.title,
                request.description,
                request.screenshot_url,
                now,
                Status::Open,
                priority
            ],
        )?;
        let id = tx.last_insert_rowid();

        if let Some(metadata) = &request.metadata {
            upsert_metadata(&tx, id, metadata)?;
        }

        tx.commit()?;
        Ok(id)
    }

    pub fn get_bug(&self, id: i64) -> Result<Option<BugReport>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM bugs WHERE id = ?1", BUG_COLUMNS))?;

        let bug = stmt.query_row([id], bug_from_row).optional()?;

        match bug {
            Some(mut bug) => {
                let metadata = self.get_metadata(id)?;
                if !metadata.is_empty() {
                    bug.metadata = Some(metadata);
                }
                Ok(Some(bug))
            }
            None => Ok(None),
        }
    }

    /// All bugs, newest first.
    pub fn list_bugs(&self) -> Result<Vec<BugReport>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM bugs ORDER BY id DESC", BUG_COLUMNS))?;

        let mut bugs = stmt
            .query_map([], bug_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut metadata = self.all_metadata()?;
        for bug in &mut bugs {
            bug.metadata = metadata.remove(&bug.id);
        }

        Ok(bugs)
    }

    pub fn update_status(&self, id: i64, status: Status) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE bugs SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        Ok(rows > 0)
    }

    pub fn update_priority(&self, id: i64, priority: Priority) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE bugs SET priority = ?1 WHERE id = ?2",
            params![priority, id],
        )?;
        Ok(rows > 0)
    }

    /// Merge `metadata` into the bug's existing metadata. Keys already present
    /// are overwritten.
    pub fn merge_metadata(&self, id: i64, metadata: &Metadata) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM bugs WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(false);
        }

        upsert_metadata(&tx, id, metadata)?;
        tx.commit()?;
        Ok(true)
    }

    pub fn delete_bug(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM bugs WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    pub fn get_metadata(&self, bug_id: i64) -> Result<Metadata> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM bug_metadata WHERE bug_id = ?1 ORDER BY key")?;
        let metadata = stmt
            .query_map([bug_id], |row| {
                Ok((row.get::<_, String>(0)?, metadata_value(row, 1)?))
            })?
            .collect::<std::result::Result<Metadata, _>>()?;
        Ok(metadata)
    }

    fn all_metadata(&self) -> Result<HashMap<i64, Metadata>> {
        let mut stmt = self
            .conn
            .prepare("SELECT bug_id, key, value FROM bug_metadata")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    metadata_value(row, 2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut grouped: HashMap<i64, Metadata> = HashMap::new();
        for (bug_id, key, value) in rows {
            grouped.entry(bug_id).or_default().insert(key, value);
        }
        Ok(grouped)
    }
}

fn upsert_metadata(conn: &Connection, bug_id: i64, metadata: &Metadata) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO bug_metadata (bug_id, key, value) VALUES (?1, ?2, ?3)",
    )?;
    for (key, value) in metadata {
        let encoded = serde_json::to_string(value)?;
        stmt.execute(params![bug_id, key, encoded])?;
    }
    Ok(())
}

fn bug_from_row(row: &Row<'_>) -> rusqlite::Result<BugReport> {
    Ok(BugReport {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        screenshot_url: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
        status: row.get(5)?,
        priority: row.get(6)?,
        metadata: None,
    })
}

fn metadata_value(row: &Row<'_>, idx: usize) -> rusqlite::Result<MetadataValue> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
