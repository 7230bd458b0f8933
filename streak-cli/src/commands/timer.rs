//! Timer commands
use chrono::Utc;
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use streak_core::TimerSession;

use super::CommandResult;
use crate::state::AppState;

/// The running session with the elapsed time as of the read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    #[serde(flatten)]
    pub session: TimerSession,
    pub elapsed_secs: i64,
}

impl From<TimerSession> for ActiveTimer {
    fn from(session: TimerSession) -> Self {
        let elapsed_secs = session.elapsed(Utc::now()).num_seconds();
        Self {
            session,
            elapsed_secs,
        }
    }
}

/// Reads never fail outright; a pending sign-in is the one thing worth
/// reporting instead of the empty value.
fn signed_in<T>(state: &AppState, data: T) -> CommandResult<T> {
    if state.redirect().is_pending() {
        return CommandResult::err(format!(
            "Authentication expired, sign in at {}",
            state.redirect().location()
        ));
    }
    CommandResult::ok(data)
}

pub async fn history(state: &AppState) -> CommandResult<Vec<TimerSession>> {
    let sessions = state.client().history().await;
    signed_in(state, sessions)
}

pub async fn active(state: &AppState) -> CommandResult<Option<ActiveTimer>> {
    let active = state.client().active().await.map(ActiveTimer::from);
    if let Some(timer) = &active {
        record_elapsed(state, timer);
    }
    signed_in(state, active)
}

pub async fn start(state: &AppState, abstinence: bool) -> CommandResult<TimerSession> {
    state.client().start_timer(abstinence).await.into()
}

pub async fn end(state: &AppState) -> CommandResult<TimerSession> {
    state.client().end_timer().await.into()
}

fn record_elapsed(state: &AppState, timer: &ActiveTimer) {
    if let Err(e) = state.client().record_elapsed(&timer.session, timer.elapsed_secs) {
        tracing::warn!(session_id = %timer.session.id, error = %e, "Failed to record elapsed time");
    }
}

fn print<T: Serialize>(result: &CommandResult<T>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(result)?);
    Ok(())
}

/// Poll until Ctrl-C or a sign-in redirect. Each poll interval drives one
/// scheduler tick and prints the value that tick fetched.
pub async fn watch(state: &AppState) -> anyhow::Result<()> {
    let client = state.client();
    let scheduler = client.scheduler();
    let mut redirect = state.redirect().subscribe();

    print(&active(state).await)?;

    let mut interval = tokio::time::interval(client.poll_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = async {
                interval.tick().await;
                scheduler.on_tick().await;
            } => {
                let active = client.peek_active().map(ActiveTimer::from);
                if let Some(timer) = &active {
                    record_elapsed(state, timer);
                }
                print(&signed_in(state, active))?;
            }
            changed = redirect.changed() => {
                if changed.is_err() || redirect.borrow().is_some() {
                    print(&signed_in(state, ()))?;
                    break;
                }
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
        }
    }

    client.dispose();
    Ok(())
}
