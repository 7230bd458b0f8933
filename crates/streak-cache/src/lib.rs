//! STREAK Reconciliation Cache
//!
//! Two cached values, `history` and `active`, each with its own refresh
//! policy. Reads never fail: they serve the last good value (or an empty
//! one) and refresh in the background when it has gone stale.
//!
//! ```text
//! Empty ──▶ Fetching ──▶ Fresh ──▶ Stale ──▶ Fetching ──▶ ...
//!              │                              ▲
//!              └── failed ──▶ Stale / Empty ──┘
//! ```

mod cache;
mod entry;
mod navigator;
mod policy;
mod scheduler;
mod state;

pub use cache::{EntryKey, TimerCache};
pub use entry::QueryEntry;
pub use navigator::{Navigator, SignInRedirect};
pub use policy::{CachePolicy, EntryPolicy};
pub use scheduler::RefreshScheduler;
pub use state::EntryState;
