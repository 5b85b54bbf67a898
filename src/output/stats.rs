//! Statistics generation from the knowledge-base database
//!
//! This module provides functionality for extracting and displaying
//! knowledge-base statistics from the storage layer.

use crate::storage::{RunRecord, RunStatus, Storage, StorageResult};

/// Number of recent runs included in the statistics
pub const RECENT_RUN_LIMIT: usize = 5;

/// Knowledge-base statistics summary
#[derive(Debug, Clone)]
pub struct KnowledgeBaseStats {
    /// Total number of stored pages
    pub total_pages: u64,

    /// Most recent crawl runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

impl KnowledgeBaseStats {
    /// Pages persisted across the listed runs
    pub fn recent_pages_persisted(&self) -> u64 {
        self.recent_runs.iter().map(|r| r.pages_persisted).sum()
    }

    /// Number of listed runs that were interrupted before finishing
    pub fn interrupted_runs(&self) -> usize {
        self.recent_runs
            .iter()
            .filter(|r| r.status == RunStatus::Interrupted)
            .count()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(KnowledgeBaseStats)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<KnowledgeBaseStats> {
    let total_pages = storage.count_pages()?;
    let recent_runs = storage.list_runs(RECENT_RUN_LIMIT)?;

    Ok(KnowledgeBaseStats {
        total_pages,
        recent_runs,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &KnowledgeBaseStats) {
    println!("=== Knowledge Base Statistics ===\n");

    println!("Overview:");
    println!("  Stored pages: {}", stats.total_pages);
    println!();

    if stats.recent_runs.is_empty() {
        println!("No crawl runs recorded yet.");
        return;
    }

    println!("Recent Runs ({}):", stats.recent_runs.len());
    for run in &stats.recent_runs {
        let stop = run
            .stop_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{} {} [{}] stop: {}, persisted: {}, failed: {}, started: {}",
            run.id,
            run.seed,
            run.status.to_db_string(),
            stop,
            run.pages_persisted,
            run.pages_failed,
            run.started_at
        );
    }
    println!();

    println!(
        "Pages persisted by recent runs: {} ({} interrupted)",
        stats.recent_pages_persisted(),
        stats.interrupted_runs()
    );
}
