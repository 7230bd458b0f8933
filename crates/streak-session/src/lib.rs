//! STREAK Timer Sessions
//!
//! - A `TimerSession` is created and mutated only by the server; the client
//!   holds a read-only projection
//! - The local snapshot mirrors the active session so its perceived start
//!   time survives a restart
//! - Reconciliation merges the server's active session with the snapshot

mod error;
mod reconcile;
mod session;
mod snapshot;

pub use error::SessionError;
pub use reconcile::{reconcile, reconcile_with_store, Reconciled, SnapshotEffect};
pub use session::TimerSession;
pub use snapshot::{LocalSnapshot, MemorySnapshotStore, SnapshotSlot, SnapshotStore};

pub type Result<T> = std::result::Result<T, SessionError>;
