//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{PageRecord, RunOutcome, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The write-only boundary the crawl loop persists through
///
/// Implementations must be idempotent per URL: upserting the same URL twice
/// leaves exactly one stored record holding the most recent values.
pub trait PageSink: Send + Sync {
    /// Inserts the record, or replaces the stored record with the same URL
    fn upsert(&self, record: &PageRecord) -> StorageResult<()>;
}

/// Full knowledge-base storage backend
///
/// Adds the read and management operations used by hosts around the crawler.
/// The crawl loop itself only ever needs [`PageSink`].
pub trait Storage: PageSink {
    // ===== Page Management =====

    /// Gets a page by URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Lists all pages, most recently scraped first
    fn list_pages(&self) -> StorageResult<Vec<PageRecord>>;

    /// Case-insensitive substring search over title, description and content,
    /// most recently scraped first
    fn search_pages(&self, query: &str) -> StorageResult<Vec<PageRecord>>;

    /// Deletes a page by URL, returning true when a page was removed
    fn delete_page(&self, url: &str) -> StorageResult<bool>;

    /// Deletes every page, returning the number removed
    fn clear_pages(&self) -> StorageResult<u64>;

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new crawl run in the `running` status
    ///
    /// # Arguments
    ///
    /// * `seed` - The seed URL or domain the run was started with
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&self, seed: &str, config_hash: &str) -> StorageResult<i64>;

    /// Records the final status and counts of a run with a finish timestamp
    fn finish_run(&self, run_id: i64, outcome: &RunOutcome) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Lists the most recent runs, newest first
    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;
}
