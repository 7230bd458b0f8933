//! Gateway trait

use async_trait::async_trait;

use streak_session::TimerSession;

use crate::Result;

/// Remote operations on the timer session resource.
///
/// `fetch_history` and `fetch_active` treat a missing resource as an empty
/// result, not an error.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// All sessions in server order
    async fn fetch_history(&self) -> Result<Vec<TimerSession>>;

    /// The open session, if any
    async fn fetch_active(&self) -> Result<Option<TimerSession>>;

    async fn start(&self, is_abstinence: bool) -> Result<TimerSession>;

    async fn end(&self) -> Result<TimerSession>;
}
