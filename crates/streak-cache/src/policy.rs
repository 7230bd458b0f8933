//! Refresh policy

use std::time::Duration;

/// How one entry is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPolicy {
    /// How long a fetched value is served without refetching
    pub freshness: Duration,
    /// Fetch attempts per refresh, including the first
    pub attempts: u32,
    /// Fixed pause between attempts
    pub retry_delay: Duration,
}

impl EntryPolicy {
    pub fn history() -> Self {
        Self {
            freshness: Duration::from_secs(30),
            attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn active() -> Self {
        Self {
            freshness: Duration::from_secs(2),
            attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub history: EntryPolicy,
    pub active: EntryPolicy,
    /// Period of the proactive `active` refresh
    pub poll_interval: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            history: EntryPolicy::history(),
            active: EntryPolicy::active(),
            poll_interval: Duration::from_secs(5),
        }
    }
}
