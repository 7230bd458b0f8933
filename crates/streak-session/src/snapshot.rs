//! Local snapshot of the active session
//!
//! Four named slots in a durable key space. The slots may be written by
//! another process at any time, so callers re-read them instead of keeping
//! a copy around.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use streak_storage::Database;

use crate::session::TimerSession;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSlot {
    SessionId,
    StartTime,
    IsAbstinence,
    ElapsedTime,
}

impl SnapshotSlot {
    pub const ALL: [SnapshotSlot; 4] = [
        SnapshotSlot::SessionId,
        SnapshotSlot::StartTime,
        SnapshotSlot::IsAbstinence,
        SnapshotSlot::ElapsedTime,
    ];

    /// Key under which the slot is stored
    pub fn key(&self) -> &'static str {
        match self {
            SnapshotSlot::SessionId => "timer.session_id",
            SnapshotSlot::StartTime => "timer.start_time",
            SnapshotSlot::IsAbstinence => "timer.is_abstinence",
            SnapshotSlot::ElapsedTime => "timer.elapsed_secs",
        }
    }
}

impl std::fmt::Display for SnapshotSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Best-effort mirror of the active session. Not authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    pub session_id: String,
    /// `None` when the slot is empty or does not hold an RFC 3339 instant
    pub start_time: Option<DateTime<Utc>>,
    pub is_abstinence: Option<bool>,
    pub elapsed_secs: Option<i64>,
}

impl LocalSnapshot {
    pub fn from_session(session: &TimerSession) -> Self {
        Self {
            session_id: session.id.clone(),
            start_time: Some(session.start_time),
            is_abstinence: Some(session.is_abstinence),
            elapsed_secs: None,
        }
    }
}

/// Durable key-value capability over the four snapshot slots.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, slot: SnapshotSlot) -> Result<Option<String>>;

    fn set(&self, slot: SnapshotSlot, value: &str) -> Result<()>;

    fn clear(&self, slot: SnapshotSlot) -> Result<()>;

    /// Read the snapshot. It exists only if the session id slot is populated.
    fn load(&self) -> Result<Option<LocalSnapshot>> {
        let Some(session_id) = self.get(SnapshotSlot::SessionId)? else {
            return Ok(None);
        };

        let start_time = self.get(SnapshotSlot::StartTime)?.and_then(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    tracing::debug!(value = %raw, error = %e, "Ignoring unparsable snapshot start time");
                })
                .ok()
        });
        let is_abstinence = self
            .get(SnapshotSlot::IsAbstinence)?
            .and_then(|raw| raw.parse::<bool>().ok());
        let elapsed_secs = self
            .get(SnapshotSlot::ElapsedTime)?
            .and_then(|raw| raw.parse::<i64>().ok());

        Ok(Some(LocalSnapshot {
            session_id,
            start_time,
            is_abstinence,
            elapsed_secs,
        }))
    }

    fn save(&self, snapshot: &LocalSnapshot) -> Result<()> {
        self.set(SnapshotSlot::SessionId, &snapshot.session_id)?;

        match snapshot.start_time {
            Some(start) => self.set(SnapshotSlot::StartTime, &start.to_rfc3339())?,
            None => self.clear(SnapshotSlot::StartTime)?,
        }
        match snapshot.is_abstinence {
            Some(flag) => self.set(SnapshotSlot::IsAbstinence, &flag.to_string())?,
            None => self.clear(SnapshotSlot::IsAbstinence)?,
        }
        match snapshot.elapsed_secs {
            Some(secs) => self.set(SnapshotSlot::ElapsedTime, &secs.to_string())?,
            None => self.clear(SnapshotSlot::ElapsedTime)?,
        }

        Ok(())
    }

    fn record_elapsed(&self, secs: i64) -> Result<()> {
        self.set(SnapshotSlot::ElapsedTime, &secs.to_string())
    }

    /// Empty all four slots.
    fn clear_all(&self) -> Result<()> {
        for slot in SnapshotSlot::ALL {
            self.clear(slot)?;
        }
        Ok(())
    }
}

impl SnapshotStore for Database {
    fn get(&self, slot: SnapshotSlot) -> Result<Option<String>> {
        Ok(self.get_slot(slot.key())?)
    }

    fn set(&self, slot: SnapshotSlot, value: &str) -> Result<()> {
        Ok(self.set_slot(slot.key(), value)?)
    }

    fn clear(&self, slot: SnapshotSlot) -> Result<()> {
        Ok(self.remove_slot(slot.key())?)
    }

    fn clear_all(&self) -> Result<()> {
        let keys = SnapshotSlot::ALL.map(|slot| slot.key());
        Ok(self.remove_slots(&keys)?)
    }
}

/// Process-local store, for tests and clients that run without a database.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slots: Mutex<HashMap<SnapshotSlot, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, slot: SnapshotSlot) -> Result<Option<String>> {
        Ok(self.slots.lock().get(&slot).cloned())
    }

    fn set(&self, slot: SnapshotSlot, value: &str) -> Result<()> {
        self.slots.lock().insert(slot, value.to_string());
        Ok(())
    }

    fn clear(&self, slot: SnapshotSlot) -> Result<()> {
        self.slots.lock().remove(&slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> LocalSnapshot {
        LocalSnapshot {
            session_id: "42".to_string(),
            start_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 59, 58).unwrap()),
            is_abstinence: Some(true),
            elapsed_secs: Some(120),
        }
    }

    fn assert_store_roundtrip(store: &dyn SnapshotStore) {
        assert_eq!(store.load().unwrap(), None);

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));

        store.clear_all().unwrap();
        assert_eq!(store.load().unwrap(), None);
        for slot in SnapshotSlot::ALL {
            assert_eq!(store.get(slot).unwrap(), None, "slot {slot} not cleared");
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySnapshotStore::new();
        assert_store_roundtrip(&store);
        assert!(store.is_empty());
    }

    #[test]
    fn test_database_store() {
        let db = Database::open_in_memory().unwrap();
        assert_store_roundtrip(&db);
    }

    #[test]
    fn test_snapshot_requires_session_id() {
        let store = MemorySnapshotStore::new();
        store
            .set(SnapshotSlot::StartTime, "2024-05-01T10:00:00Z")
            .unwrap();
        store.record_elapsed(30).unwrap();

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_bad_slot_values_read_as_absent() {
        let store = MemorySnapshotStore::new();
        store.set(SnapshotSlot::SessionId, "7").unwrap();
        store.set(SnapshotSlot::StartTime, "yesterday").unwrap();
        store.set(SnapshotSlot::IsAbstinence, "maybe").unwrap();

        let snapshot = store.load().unwrap().unwrap();
        assert_eq!(snapshot.session_id, "7");
        assert_eq!(snapshot.start_time, None);
        assert_eq!(snapshot.is_abstinence, None);
        assert_eq!(snapshot.elapsed_secs, None);
    }

    #[test]
    fn test_save_clears_missing_fields() {
        let store = MemorySnapshotStore::new();
        store.save(&sample()).unwrap();

        let mut partial = sample();
        partial.elapsed_secs = None;
        store.save(&partial).unwrap();

        assert_eq!(store.get(SnapshotSlot::ElapsedTime).unwrap(), None);
    }

    #[test]
    fn test_from_session() {
        let session = TimerSession {
            id: "9".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            end_time: None,
            is_abstinence: true,
        };

        let snapshot = LocalSnapshot::from_session(&session);
        assert_eq!(snapshot.session_id, "9");
        assert_eq!(snapshot.start_time, Some(session.start_time));
        assert_eq!(snapshot.is_abstinence, Some(true));
        assert_eq!(snapshot.elapsed_secs, None);
    }
}
