//! Crawl phase definitions for a single crawl run
//!
//! A run moves `Seeded → Running → {Drained | BudgetReached | Cancelled} → Done`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current phase of one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Frontier holds only the seed; nothing fetched yet
    Seeded,

    /// The frontier loop is processing URLs
    Running,

    /// The frontier ran empty
    Drained,

    /// The visited set reached the page budget
    BudgetReached,

    /// An external cancellation signal was observed
    Cancelled,

    /// The result has been assembled
    Done,
}

/// Why the frontier loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Drained,
    BudgetReached,
    Cancelled,
}

impl CrawlPhase {
    /// Returns true if the run may move from this phase to `next`
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        matches!(
            (self, next),
            (Seeded, Running)
                | (Running, Drained)
                | (Running, BudgetReached)
                | (Running, Cancelled)
                | (Drained, Done)
                | (BudgetReached, Done)
                | (Cancelled, Done)
        )
    }

    /// Returns true once the frontier loop has stopped
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            Self::Drained | Self::BudgetReached | Self::Cancelled | Self::Done
        )
    }

    /// The stop reason carried by a stopping phase
    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            Self::Drained => Some(StopReason::Drained),
            Self::BudgetReached => Some(StopReason::BudgetReached),
            Self::Cancelled => Some(StopReason::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeded => "seeded",
            Self::Running => "running",
            Self::Drained => "drained",
            Self::BudgetReached => "budget_reached",
            Self::Cancelled => "cancelled",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StopReason {
    /// Converts the stop reason to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Drained => "drained",
            Self::BudgetReached => "budget_reached",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a stop reason from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "drained" => Some(Self::Drained),
            "budget_reached" => Some(Self::BudgetReached),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
