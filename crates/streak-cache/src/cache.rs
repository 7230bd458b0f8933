//! The two timer entries and how they are fetched

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use streak_gateway::SessionGateway;
use streak_session::{reconcile_with_store, SnapshotStore, TimerSession};

use crate::entry::QueryEntry;
use crate::navigator::Navigator;
use crate::policy::CachePolicy;
use crate::state::EntryState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKey {
    History,
    Active,
}

impl EntryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKey::History => "history",
            EntryKey::Active => "active",
        }
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone)]
pub struct TimerCache {
    history: QueryEntry<Vec<TimerSession>>,
    active: QueryEntry<Option<TimerSession>>,
}

impl TimerCache {
    pub fn new(
        gateway: Arc<dyn SessionGateway>,
        store: Arc<dyn SnapshotStore>,
        navigator: Arc<dyn Navigator>,
        policy: &CachePolicy,
    ) -> Self {
        let history = {
            let gateway = Arc::clone(&gateway);
            QueryEntry::new(
                EntryKey::History.as_str(),
                policy.history,
                Vec::new(),
                Arc::clone(&navigator),
                move || {
                    let gateway = Arc::clone(&gateway);
                    async move { gateway.fetch_history().await }
                },
            )
        };

        // Every successful fetch is reconciled against the snapshot before
        // it reaches the cache.
        let active = QueryEntry::new(
            EntryKey::Active.as_str(),
            policy.active,
            None,
            navigator,
            move || {
                let gateway = Arc::clone(&gateway);
                let store = Arc::clone(&store);
                async move {
                    let server = gateway.fetch_active().await?;
                    Ok(reconcile_with_store(server, store.as_ref()))
                }
            },
        );

        Self { history, active }
    }

    pub fn history(&self) -> &QueryEntry<Vec<TimerSession>> {
        &self.history
    }

    pub fn active(&self) -> &QueryEntry<Option<TimerSession>> {
        &self.active
    }

    pub fn state(&self, key: EntryKey) -> EntryState {
        match key {
            EntryKey::History => self.history.state(),
            EntryKey::Active => self.active.state(),
        }
    }

    pub fn is_stale(&self, key: EntryKey) -> bool {
        match key {
            EntryKey::History => self.history.is_stale(),
            EntryKey::Active => self.active.is_stale(),
        }
    }

    /// Refresh one entry, sharing any fetch already in flight for it.
    pub async fn request_refresh(&self, key: EntryKey) {
        match key {
            EntryKey::History => {
                self.history.request_refresh().await;
            }
            EntryKey::Active => {
                self.active.request_refresh().await;
            }
        }
    }

    pub fn invalidate_all(&self) {
        self.history.invalidate();
        self.active.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::SignInRedirect;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use streak_gateway::GatewayError;
    use streak_session::{LocalSnapshot, MemorySnapshotStore, SnapshotSlot};
    use url::Url;

    #[derive(Default)]
    struct StubGateway {
        active: Mutex<Option<TimerSession>>,
        history_calls: AtomicUsize,
        active_calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionGateway for StubGateway {
        async fn fetch_history(&self) -> streak_gateway::Result<Vec<TimerSession>> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.active.lock().iter().cloned().collect())
        }

        async fn fetch_active(&self) -> streak_gateway::Result<Option<TimerSession>> {
            self.active_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.active.lock().clone())
        }

        async fn start(&self, _is_abstinence: bool) -> streak_gateway::Result<TimerSession> {
            Err(GatewayError::Validation("not supported".to_string()))
        }

        async fn end(&self) -> streak_gateway::Result<TimerSession> {
            Err(GatewayError::Validation("not supported".to_string()))
        }
    }

    fn session(id: &str) -> TimerSession {
        TimerSession {
            id: id.to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            end_time: None,
            is_abstinence: false,
        }
    }

    fn cache(gateway: Arc<StubGateway>, store: Arc<MemorySnapshotStore>) -> TimerCache {
        let navigator = Arc::new(SignInRedirect::new(
            &Url::parse("http://localhost:5000").unwrap(),
        ));
        TimerCache::new(gateway, store, navigator, &CachePolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_fetch_is_reconciled() {
        let gateway = Arc::new(StubGateway::default());
        *gateway.active.lock() = Some(session("42"));
        let store = Arc::new(MemorySnapshotStore::new());
        let local_start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 59, 59).unwrap();
        store
            .save(&LocalSnapshot {
                session_id: "42".to_string(),
                start_time: Some(local_start),
                is_abstinence: Some(false),
                elapsed_secs: None,
            })
            .unwrap();

        let cache = cache(Arc::clone(&gateway), Arc::clone(&store));
        let active = cache.active().read().await.unwrap();

        assert_eq!(active.start_time, local_start);
        assert_eq!(cache.state(EntryKey::Active), EntryState::Fresh);
        assert_eq!(cache.state(EntryKey::History), EntryState::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_active_clears_snapshot() {
        let gateway = Arc::new(StubGateway::default());
        let store = Arc::new(MemorySnapshotStore::new());
        store.save(&LocalSnapshot::from_session(&session("42"))).unwrap();
        store.record_elapsed(600).unwrap();

        let cache = cache(gateway, Arc::clone(&store));

        assert_eq!(cache.active().read().await, None);
        for slot in SnapshotSlot::ALL {
            assert_eq!(store.get(slot).unwrap(), None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_and_invalidate_by_key() {
        let gateway = Arc::new(StubGateway::default());
        let cache = cache(Arc::clone(&gateway), Arc::new(MemorySnapshotStore::new()));

        cache.request_refresh(EntryKey::History).await;
        cache.request_refresh(EntryKey::Active).await;
        assert!(!cache.is_stale(EntryKey::History));
        assert!(!cache.is_stale(EntryKey::Active));

        cache.invalidate_all();
        assert!(cache.is_stale(EntryKey::History));
        assert!(cache.is_stale(EntryKey::Active));

        *gateway.active.lock() = Some(session("5"));
        assert_eq!(cache.history().read().await.len(), 1);
        assert_eq!(cache.active().read().await.map(|s| s.id), Some("5".to_string()));
        assert_eq!(gateway.history_calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.active_calls.load(Ordering::SeqCst), 2);
    }
}
