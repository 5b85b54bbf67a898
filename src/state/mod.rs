//! State module for tracking crawl progress
//!
//! - `CrawlPhase`: the phase machine a single crawl run moves through
//! - `StopReason`: why a run's frontier loop stopped

mod crawl_phase;

pub use crawl_phase::{CrawlPhase, StopReason};
