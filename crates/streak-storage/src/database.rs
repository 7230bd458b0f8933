//! Database connection and slot operations

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

/// Shared handle to the local SQLite database.
///
/// Clones share one connection; every access goes through the mutex, so the
/// slot table can be read and written from any task.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database file, creating its directory if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        // WAL so a second process reading the slots does not block writers
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn get_slot(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM local_slots WHERE key = ?1",
                    [key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_slot(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO local_slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, updated_at],
            )?;
            Ok(())
        })
    }

    pub fn remove_slot(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM local_slots WHERE key = ?1", [key])?;
            Ok(())
        })
    }

    /// Remove several slots in one transaction; either all go or none do.
    pub fn remove_slots(&self, keys: &[&str]) -> Result<()> {
        self.transaction(|conn| {
            for key in keys {
                conn.execute("DELETE FROM local_slots WHERE key = ?1", [key])?;
            }
            Ok(())
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let count: i32 =
                conn.query_row("SELECT COUNT(*) FROM local_slots", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_slot_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_slot("timer.session_id").unwrap(), None);

        db.set_slot("timer.session_id", "42").unwrap();
        db.set_slot("timer.session_id", "43").unwrap();
        assert_eq!(db.get_slot("timer.session_id").unwrap().as_deref(), Some("43"));

        db.remove_slot("timer.session_id").unwrap();
        assert_eq!(db.get_slot("timer.session_id").unwrap(), None);
    }

    #[test]
    fn test_remove_slots_leaves_others() {
        let db = Database::open_in_memory().unwrap();
        db.set_slot("a", "1").unwrap();
        db.set_slot("b", "2").unwrap();
        db.set_slot("c", "3").unwrap();

        db.remove_slots(&["a", "b", "missing"]).unwrap();

        assert_eq!(db.get_slot("a").unwrap(), None);
        assert_eq!(db.get_slot("b").unwrap(), None);
        assert_eq!(db.get_slot("c").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_slots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streak.db");

        {
            let db = Database::open(&path).unwrap();
            db.set_slot("timer.start_time", "2024-05-01T10:00:00+00:00")
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.get_slot("timer.start_time").unwrap().as_deref(),
            Some("2024-05-01T10:00:00+00:00")
        );
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("streak.db");

        let db = Database::open(&path).unwrap();
        db.set_slot("timer.session_id", "1").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_open_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let result = Database::open(blocker.join("streak.db"));
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn test_clones_share_connection() {
        let db = Database::open_in_memory().unwrap();
        let other = db.clone();
        db.set_slot("k", "v").unwrap();
        assert_eq!(other.get_slot("k").unwrap().as_deref(), Some("v"));
    }
}
