//! Timer client
//!
//! Owns the cache for the lifetime of the process. Reads go through the
//! cache; mutations go straight to the gateway and invalidate both entries
//! once the server has accepted them.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use streak_cache::{CachePolicy, Navigator, RefreshScheduler, SignInRedirect, TimerCache};
use streak_gateway::{HttpGateway, SessionGateway};
use streak_session::{LocalSnapshot, SnapshotSlot, SnapshotStore, TimerSession};
use streak_storage::Database;

use crate::config::Config;
use crate::Result;

pub struct TimerClient {
    gateway: Arc<dyn SessionGateway>,
    store: Arc<dyn SnapshotStore>,
    cache: TimerCache,
    poll_interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl TimerClient {
    pub fn create(
        policy: CachePolicy,
        gateway: Arc<dyn SessionGateway>,
        store: Arc<dyn SnapshotStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let cache = TimerCache::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            navigator,
            &policy,
        );
        let (shutdown, _) = watch::channel(false);

        Self {
            gateway,
            store,
            cache,
            poll_interval: policy.poll_interval,
            shutdown,
        }
    }

    /// Wire up the HTTP gateway and the on-disk snapshot described by
    /// `config`. The returned redirect publishes sign-in requests.
    pub fn open(config: &Config) -> Result<(Self, Arc<SignInRedirect>)> {
        config.validate()?;

        let db = Database::open(&config.database_path)?;

        let gateway_config = config.gateway_config()?;
        let gateway = HttpGateway::new(&gateway_config)?;
        let navigator = Arc::new(SignInRedirect::new(&gateway_config.base_url));

        tracing::info!(
            base_url = %gateway_config.base_url,
            database = %config.database_path.display(),
            "Timer client opened"
        );

        let client = Self::create(
            config.policy.cache_policy(),
            Arc::new(gateway),
            Arc::new(db),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
        );
        Ok((client, navigator))
    }

    pub fn cache(&self) -> &TimerCache {
        &self.cache
    }

    /// Every recorded session, running ones included.
    pub async fn history(&self) -> Vec<TimerSession> {
        self.cache.history().read().await
    }

    /// The running session after reconciliation, if any.
    pub async fn active(&self) -> Option<TimerSession> {
        self.cache.active().read().await
    }

    pub fn peek_history(&self) -> Vec<TimerSession> {
        self.cache.history().peek()
    }

    pub fn peek_active(&self) -> Option<TimerSession> {
        self.cache.active().peek()
    }

    pub async fn start_timer(&self, is_abstinence: bool) -> streak_gateway::Result<TimerSession> {
        let session = self.gateway.start(is_abstinence).await.map_err(|e| {
            tracing::warn!(error = %e, is_abstinence, "Failed to start timer");
            e
        })?;

        self.cache.invalidate_all();

        if let Err(e) = self.store.save(&LocalSnapshot::from_session(&session)) {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to write timer snapshot");
        }

        tracing::info!(session_id = %session.id, is_abstinence, "Timer started");
        Ok(session)
    }

    /// The snapshot is left alone here; the next active fetch sees no
    /// running session and clears it.
    pub async fn end_timer(&self) -> streak_gateway::Result<TimerSession> {
        let session = self.gateway.end().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to end timer");
            e
        })?;

        self.cache.invalidate_all();

        tracing::info!(session_id = %session.id, "Timer ended");
        Ok(session)
    }

    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    /// Persist the elapsed seconds shown for `session`.
    ///
    /// The elapsed slot is only ever written next to a matching session id.
    /// A session started elsewhere, or one that replaced the stored session,
    /// gets a full snapshot so reconciliation can clear it later.
    pub fn record_elapsed(&self, session: &TimerSession, secs: i64) -> Result<()> {
        let stored = self.store.get(SnapshotSlot::SessionId)?;

        if stored.as_deref() == Some(session.id.as_str()) {
            self.store.record_elapsed(secs)?;
        } else {
            tracing::debug!(
                session_id = %session.id,
                stored = ?stored,
                "Writing snapshot for untracked session"
            );
            let mut snapshot = LocalSnapshot::from_session(session);
            snapshot.elapsed_secs = Some(secs);
            self.store.save(&snapshot)?;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn scheduler(&self) -> RefreshScheduler {
        RefreshScheduler::new(
            self.cache.clone(),
            self.poll_interval,
            self.shutdown.subscribe(),
        )
    }

    /// Stop every scheduler handed out by this client. Later triggers are
    /// ignored; reads keep working.
    pub fn dispose(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!("Timer client disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        *self.shutdown.borrow()
    }
}
