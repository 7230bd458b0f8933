//! Reconciliation of the server's active session with the local snapshot
//!
//! ```text
//! server  snapshot          result                         snapshot
//! ------  ----------------  -----------------------------  --------
//! Some    same id, earlier  server with snapshot start     kept
//! Some    other / none      server unchanged               kept
//! None    present           None                           cleared
//! None    none              None                           untouched
//! ```

use crate::session::TimerSession;
use crate::snapshot::{LocalSnapshot, SnapshotStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotEffect {
    Keep,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Effective active session shown to callers
    pub session: Option<TimerSession>,
    /// What must happen to the stored snapshot
    pub effect: SnapshotEffect,
}

/// Merge a server fetch result with the snapshot. Pure.
///
/// The snapshot start time is trusted only when the ids match and it is not
/// later than the server's start time. The comparison has no tolerance.
pub fn reconcile(server: Option<&TimerSession>, snapshot: Option<&LocalSnapshot>) -> Reconciled {
    let Some(server) = server else {
        let effect = if snapshot.is_some() {
            SnapshotEffect::Clear
        } else {
            SnapshotEffect::Keep
        };
        return Reconciled {
            session: None,
            effect,
        };
    };

    let mut session = server.clone();
    if let Some(local_start) = snapshot
        .filter(|s| s.session_id == server.id)
        .and_then(|s| s.start_time)
    {
        if local_start <= server.start_time {
            session.start_time = local_start;
        }
    }

    Reconciled {
        session: Some(session),
        effect: SnapshotEffect::Keep,
    }
}

/// Load the snapshot from `store`, reconcile, and apply the snapshot effect.
///
/// Store failures never hide the server value: a failed load reconciles
/// against no snapshot, a failed clear is logged.
pub fn reconcile_with_store(
    server: Option<TimerSession>,
    store: &dyn SnapshotStore,
) -> Option<TimerSession> {
    let snapshot = match store.load() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read local snapshot");
            None
        }
    };

    let reconciled = reconcile(server.as_ref(), snapshot.as_ref());

    if let (Some(server), Some(effective)) = (&server, &reconciled.session) {
        if server.start_time != effective.start_time {
            tracing::debug!(
                session_id = %effective.id,
                server_start = %server.start_time,
                local_start = %effective.start_time,
                "Using locally observed start time"
            );
        }
    }

    if reconciled.effect == SnapshotEffect::Clear {
        match store.clear_all() {
            Ok(()) => tracing::info!(
                session_id = ?snapshot.as_ref().map(|s| s.session_id.as_str()),
                "No active session on server, cleared local snapshot"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to clear local snapshot"),
        }
    }

    reconciled.session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{MemorySnapshotStore, SnapshotSlot};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn server(id: &str, start: DateTime<Utc>) -> TimerSession {
        TimerSession {
            id: id.to_string(),
            start_time: start,
            end_time: None,
            is_abstinence: true,
        }
    }

    fn snapshot(id: &str, start: Option<DateTime<Utc>>) -> LocalSnapshot {
        LocalSnapshot {
            session_id: id.to_string(),
            start_time: start,
            is_abstinence: Some(false),
            elapsed_secs: Some(10),
        }
    }

    #[test]
    fn test_matching_earlier_snapshot_start_wins() {
        for offset in [0, 1, 59, 3600] {
            let server = server("42", at(0));
            let local = snapshot("42", Some(at(-offset)));

            let result = reconcile(Some(&server), Some(&local));
            let session = result.session.unwrap();

            assert_eq!(session.start_time, at(-offset));
            assert_eq!(session.id, server.id);
            assert_eq!(session.end_time, server.end_time);
            // Mode flag always comes from the server
            assert!(session.is_abstinence);
            assert_eq!(result.effect, SnapshotEffect::Keep);
        }
    }

    #[test]
    fn test_later_snapshot_start_ignored() {
        let server = server("42", at(0));
        let local = snapshot("42", Some(at(1)));

        let result = reconcile(Some(&server), Some(&local));
        assert_eq!(result.session, Some(server));
        assert_eq!(result.effect, SnapshotEffect::Keep);
    }

    #[test]
    fn test_mismatched_or_missing_snapshot_leaves_server_value() {
        let server = server("42", at(0));

        for local in [
            Some(snapshot("41", Some(at(-30)))),
            Some(snapshot("42", None)),
            None,
        ] {
            let result = reconcile(Some(&server), local.as_ref());
            assert_eq!(result.session.as_ref(), Some(&server));
            assert_eq!(result.effect, SnapshotEffect::Keep);
        }
    }

    #[test]
    fn test_no_server_session_clears_existing_snapshot() {
        let local = snapshot("42", Some(at(0)));

        let result = reconcile(None, Some(&local));
        assert_eq!(result.session, None);
        assert_eq!(result.effect, SnapshotEffect::Clear);
    }

    #[test]
    fn test_no_server_session_and_no_snapshot_is_noop() {
        let result = reconcile(None, None);
        assert_eq!(result.session, None);
        assert_eq!(result.effect, SnapshotEffect::Keep);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let server = server("42", at(0));
        let local = snapshot("42", Some(at(-5)));

        let first = reconcile(Some(&server), Some(&local));
        let second = reconcile(Some(&server), Some(&local));
        assert_eq!(first, second);

        // Feeding the merged value back in changes nothing either
        let again = reconcile(first.session.as_ref(), Some(&local));
        assert_eq!(again, first);
    }

    #[test]
    fn test_with_store_clears_all_slots() {
        let store = MemorySnapshotStore::new();
        store.save(&snapshot("42", Some(at(0)))).unwrap();

        let result = reconcile_with_store(None, &store);

        assert_eq!(result, None);
        for slot in SnapshotSlot::ALL {
            assert_eq!(store.get(slot).unwrap(), None);
        }
    }

    #[test]
    fn test_with_store_keeps_snapshot_for_active_session() {
        let store = MemorySnapshotStore::new();
        let local = snapshot("42", Some(at(-3)));
        store.save(&local).unwrap();

        let result = reconcile_with_store(Some(server("42", at(0))), &store).unwrap();

        assert_eq!(result.start_time, at(-3));
        assert_eq!(store.load().unwrap(), Some(local));
    }

    #[test]
    fn test_with_store_rereads_every_time() {
        let store = MemorySnapshotStore::new();
        let server = server("42", at(0));

        assert_eq!(
            reconcile_with_store(Some(server.clone()), &store).unwrap().start_time,
            at(0)
        );

        // Written by someone else between fetches
        store.save(&snapshot("42", Some(at(-8)))).unwrap();
        assert_eq!(
            reconcile_with_store(Some(server), &store).unwrap().start_time,
            at(-8)
        );
    }
}
