//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::StopReason;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageSink, Storage, StorageError, StorageResult};
use crate::storage::{PageRecord, RunOutcome, RunRecord, RunStatus};
use crate::CrawlerError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const PAGE_COLUMNS: &str = "url, title, description, content, links, scraped_at";

const RUN_COLUMNS: &str = "id, seed, started_at, finished_at, config_hash, status, stop_reason,
     pages_persisted, pages_failed";

/// SQLite storage backend
///
/// The connection sits behind a mutex so a single instance can be shared
/// between the crawl loop's blocking persistence tasks.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) a database file and initializes the schema
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, CrawlerError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn query_pages(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<PageRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, StoredPage::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StoredPage::into_record).collect()
    }
}

/// Raw column values of a `pages` row before decoding
struct StoredPage {
    url: String,
    title: String,
    description: String,
    content: String,
    links: String,
    scraped_at: String,
}

impl StoredPage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            content: row.get(3)?,
            links: row.get(4)?,
            scraped_at: row.get(5)?,
        })
    }

    fn into_record(self) -> StorageResult<PageRecord> {
        let links: Vec<String> = serde_json::from_str(&self.links)?;
        let scraped_at = DateTime::parse_from_rfc3339(&self.scraped_at)
            .map_err(|e| {
                StorageError::InvalidValue(format!(
                    "scraped_at '{}' for {}: {}",
                    self.scraped_at, self.url, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(PageRecord {
            url: self.url,
            title: self.title,
            description: self.description,
            content: self.content,
            links,
            scraped_at,
        })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let stop_reason: Option<String> = row.get(6)?;
    Ok(RunRecord {
        id: row.get(0)?,
        seed: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Failed),
        stop_reason: stop_reason.as_deref().and_then(StopReason::from_db_string),
        pages_persisted: row.get::<_, i64>(7)?.max(0) as u64,
        pages_failed: row.get::<_, i64>(8)?.max(0) as u64,
    })
}

fn timestamp(at: &DateTime<Utc>) -> String {
    // Fixed-width UTC timestamps keep lexical and chronological order identical
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Escapes LIKE wildcards so user queries match literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl PageSink for SqliteStorage {
    fn upsert(&self, record: &PageRecord) -> StorageResult<()> {
        let links = serde_json::to_string(&record.links)?;
        let now = timestamp(&Utc::now());

        self.conn()?.execute(
            "INSERT INTO pages (url, title, description, content, links, scraped_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                content = excluded.content,
                links = excluded.links,
                scraped_at = excluded.scraped_at,
                updated_at = excluded.updated_at",
            params![
                record.url,
                record.title,
                record.description,
                record.content,
                links,
                timestamp(&record.scraped_at),
                now
            ],
        )?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    // ===== Page Management =====

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let stored = self
            .conn()?
            .query_row(
                &format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS),
                params![url],
                StoredPage::from_row,
            )
            .optional()?;

        stored.map(StoredPage::into_record).transpose()
    }

    fn list_pages(&self) -> StorageResult<Vec<PageRecord>> {
        self.query_pages(
            &format!(
                "SELECT {} FROM pages ORDER BY scraped_at DESC, id DESC",
                PAGE_COLUMNS
            ),
            [],
        )
    }

    fn search_pages(&self, query: &str) -> StorageResult<Vec<PageRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_pages();
        }

        self.query_pages(
            &format!(
                "SELECT {} FROM pages
                 WHERE title LIKE ?1 ESCAPE '\\'
                    OR description LIKE ?1 ESCAPE '\\'
                    OR content LIKE ?1 ESCAPE '\\'
                 ORDER BY scraped_at DESC, id DESC",
                PAGE_COLUMNS
            ),
            params![like_pattern(query)],
        )
    }

    fn delete_page(&self, url: &str) -> StorageResult<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM pages WHERE url = ?1", params![url])?;
        Ok(removed > 0)
    }

    fn clear_pages(&self) -> StorageResult<u64> {
        let removed = self.conn()?.execute("DELETE FROM pages", [])?;
        Ok(removed as u64)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&self, seed: &str, config_hash: &str) -> StorageResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs (seed, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                seed,
                timestamp(&Utc::now()),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_run(&self, run_id: i64, outcome: &RunOutcome) -> StorageResult<()> {
        let updated = self.conn()?.execute(
            "UPDATE runs SET status = ?1, stop_reason = ?2, pages_persisted = ?3,
             pages_failed = ?4, finished_at = ?5 WHERE id = ?6",
            params![
                outcome.status.to_db_string(),
                outcome.stop_reason.map(|r| r.to_db_string()),
                outcome.pages_persisted as i64,
                outcome.pages_failed as i64,
                timestamp(&Utc::now()),
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn()?
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn()?
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;
        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}
