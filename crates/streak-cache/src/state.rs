//! Cache Entry State Machine
//!
//! ```text
//! Empty
//!   ↓ first read
//! Fetching ──── failed, nothing cached ──▶ Empty
//!   ↓ resolved          ↓ failed
//! Fresh                Stale (last good value kept)
//!   ↓ window expired / invalidated
//! Stale
//!   ↓ read, tick, focus, reconnect
//! Fetching
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Never populated
    Empty,
    /// A refresh is in flight
    Fetching,
    /// Populated and inside the freshness window
    Fresh,
    /// Populated but expired, invalidated, or last refresh failed
    Stale,
}

impl EntryState {
    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, target: EntryState) -> bool {
        match (self, target) {
            (EntryState::Empty, EntryState::Fetching) => true,
            // A refresh detached by invalidation resolved with nothing newer started
            (EntryState::Empty, EntryState::Stale) => true,
            (EntryState::Fetching, EntryState::Fresh) => true,
            (EntryState::Fetching, EntryState::Stale) => true,
            (EntryState::Fetching, EntryState::Empty) => true,
            (EntryState::Fresh, EntryState::Stale) => true,
            // Polling refreshes regardless of freshness
            (EntryState::Fresh, EntryState::Fetching) => true,
            (EntryState::Stale, EntryState::Fetching) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Empty => "empty",
            EntryState::Fetching => "fetching",
            EntryState::Fresh => "fresh",
            EntryState::Stale => "stale",
        }
    }
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" => Ok(EntryState::Empty),
            "fetching" => Ok(EntryState::Fetching),
            "fresh" => Ok(EntryState::Fresh),
            "stale" => Ok(EntryState::Stale),
            _ => Err(format!("Unknown entry state: {}", s)),
        }
    }
}
