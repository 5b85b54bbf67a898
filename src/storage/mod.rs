//! Storage module for persisting crawled pages
//!
//! This module handles all database operations for the crawler, including:
//! - The `PageSink` upsert boundary the crawl loop writes through
//! - SQLite database initialization and schema management
//! - Knowledge-base management (list, search, delete, clear)
//! - Crawl run bookkeeping

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PageSink, Storage, StorageError, StorageResult};

use crate::state::StopReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One crawled page, keyed by its URL
///
/// Created once per successful fetch and extraction and never mutated
/// afterwards; a later crawl of the same URL produces a new record that
/// replaces this one in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Absolute URL, unique key in the store
    pub url: String,

    /// Text of the first `<title>` element (possibly empty)
    pub title: String,

    /// Value of `<meta name="description">` (possibly empty)
    pub description: String,

    /// Plain text of the page body, whitespace-collapsed and length-capped
    pub content: String,

    /// Same-site links discovered on the page, in document order
    pub links: Vec<String>,

    /// When the page was extracted
    pub scraped_at: DateTime<Utc>,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub seed: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub stop_reason: Option<StopReason>,
    pub pages_persisted: u64,
    pub pages_failed: u64,
}

/// Final numbers of a crawl run, written when the run finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub stop_reason: Option<StopReason>,
    pub pages_persisted: u64,
    pub pages_failed: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
