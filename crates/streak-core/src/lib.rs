//! STREAK Core
//!
//! Composes the gateway, the reconciliation cache and the local snapshot
//! behind one client object. Callers read `history` and `active` and call
//! `start_timer` / `end_timer`; everything else is wiring.

mod client;
mod config;
mod error;

pub use client::TimerClient;
pub use config::{Config, PolicyConfig};
pub use error::CoreError;

// Re-export core components
pub use streak_cache::{
    CachePolicy, EntryKey, EntryPolicy, EntryState, Navigator, RefreshScheduler, SignInRedirect,
    TimerCache,
};
pub use streak_gateway::{GatewayConfig, GatewayError, HttpGateway, SessionGateway};
pub use streak_session::{LocalSnapshot, MemorySnapshotStore, SnapshotSlot, SnapshotStore, TimerSession};
pub use streak_storage::{Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
