//! Scheduler for managing the crawl frontier and politeness pacing
//!
//! This module handles:
//! - FIFO frontier of discovered URLs (breadth-first order)
//! - Visited and queued membership so no URL is fetched twice
//! - The fixed politeness delay between consecutive fetches

use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// Scheduler manages the frontier queue and request pacing for one crawl run
///
/// The scheduler is single-owner state: one crawl run, one scheduler, no
/// sharing across tasks.
#[derive(Debug)]
pub struct Scheduler {
    /// URLs waiting to be fetched, oldest first
    frontier: VecDeque<Url>,

    /// String forms of everything currently in `frontier`
    queued: HashSet<String>,

    /// URLs already dequeued for fetching, whatever the outcome
    visited: HashSet<String>,

    /// Delay slept before every fetch except the first
    politeness_delay: Duration,

    /// Number of fetches paced so far
    fetches: usize,
}

impl Scheduler {
    /// Creates a scheduler whose frontier holds only `seed`
    pub fn new(seed: Url, politeness_delay: Duration) -> Self {
        let mut scheduler = Self {
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            politeness_delay,
            fetches: 0,
        };
        scheduler.queued.insert(seed.to_string());
        scheduler.frontier.push_back(seed);
        scheduler
    }

    /// Appends a URL to the back of the frontier
    ///
    /// Returns false (and does nothing) if the URL is unparsable, already
    /// visited, or already waiting in the frontier.
    pub fn add_to_frontier(&mut self, url: &str) -> bool {
        if self.visited.contains(url) || self.queued.contains(url) {
            return false;
        }

        match Url::parse(url) {
            Ok(parsed) => {
                self.queued.insert(url.to_string());
                self.frontier.push_back(parsed);
                true
            }
            Err(e) => {
                tracing::debug!("Not queueing unparsable URL {}: {}", url, e);
                false
            }
        }
    }

    /// Removes and returns the oldest frontier entry
    pub fn next_url(&mut self) -> Option<Url> {
        let url = self.frontier.pop_front()?;
        self.queued.remove(url.as_str());
        Some(url)
    }

    /// Records a URL as visited. Returns false if it already was.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Returns true if the URL has already been dequeued for fetching
    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Waits out the politeness delay before the next fetch
    ///
    /// The first call returns immediately.
    pub async fn pace(&mut self) {
        if self.fetches > 0 && !self.politeness_delay.is_zero() {
            tokio::time::sleep(self.politeness_delay).await;
        }
        self.fetches += 1;
    }

    /// Returns the number of URLs waiting in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Returns true if the frontier is empty
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Returns the number of visited URLs
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    pub fn queued(&self) -> &HashSet<String> {
        &self.queued
    }
}
