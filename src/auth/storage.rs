use std::sync::Mutex;

use anyhow::{Result, anyhow};
use rusqlite::Connection;

use super::oauth::Identity;

const SLOT: &str = "agent";

/// Keeps the signed-in agent identity in the local state database.
pub struct IdentityStore {
    conn: Mutex<Connection>,
}

impl IdentityStore {
    /// Open or create the identity table in the given database path.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:"
            && let Some(dir) = std::path::Path::new(path).parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS identity (
                slot TEXT PRIMARY KEY,
                data TEXT NOT NULL
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("identity store lock poisoned"))
    }

    pub fn get(&self) -> Result<Option<Identity>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT data FROM identity WHERE slot = ?1")?;
        let mut rows = stmt.query([SLOT])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    /// Store the identity (upsert).
    pub fn set(&self, identity: &Identity) -> Result<()> {
        let json = serde_json::to_string(identity)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO identity (slot, data) VALUES (?1, ?2)
             ON CONFLICT(slot) DO UPDATE SET data = excluded.data",
            [SLOT, &json],
        )?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM identity WHERE slot = ?1", [SLOT])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str) -> Identity {
        Identity {
            email: email.into(),
            id_token: "tok".into(),
            expires: u64::MAX,
        }
    }

    #[test]
    fn empty_store_has_no_identity() {
        let store = IdentityStore::open(":memory:").unwrap();
        assert!(store.get().unwrap().is_none());
    }

    #[test]
    fn set_replaces_previous() {
        let store = IdentityStore::open(":memory:").unwrap();
        store.set(&identity("a@example.com")).unwrap();
        store.set(&identity("b@example.com")).unwrap();
        assert_eq!(store.get().unwrap().unwrap().email, "b@example.com");
    }

    #[test]
    fn clear_is_idempotent() {
        let store = IdentityStore::open(":memory:").unwrap();
        store.clear().unwrap();
        store.set(&identity("a@example.com")).unwrap();
        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
    }
}
