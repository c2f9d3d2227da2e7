//! SQLite-backed status backend.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};

use super::{ItemRecord, ItemState, StatusBackend, StatusError};
use crate::item::ItemId;

/// SQLite status backend. Only changed rows are written on each flush.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database file and its table.
    pub fn new(path: &Path) -> Result<Self, StatusError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StatusError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, StatusError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StatusError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS item_status (
                domain TEXT PRIMARY KEY,
                item_id TEXT NOT NULL,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_item_status_state ON item_status(state);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StatusError> {
        self.conn
            .lock()
            .map_err(|_| StatusError::Database("connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl StatusBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn read_all(&self) -> Result<HashMap<String, ItemRecord>, StatusError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT domain, item_id, state FROM item_status")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = HashMap::new();
        for row in rows {
            let (domain, id_json, state) = row?;
            let id: ItemId = serde_json::from_str(&id_json)?;
            let state: ItemState = state.parse()?;
            entries.insert(domain, ItemRecord { id, state });
        }
        Ok(entries)
    }

    async fn persist(
        &self,
        entries: &HashMap<String, ItemRecord>,
        changed: &[String],
    ) -> Result<(), StatusError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO item_status (domain, item_id, state, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(domain) DO UPDATE SET
                    item_id = excluded.item_id,
                    state = excluded.state,
                    updated_at = excluded.updated_at
                "#,
            )?;
            for domain in changed {
                let Some(record) = entries.get(domain) else {
                    continue;
                };
                let id_json = serde_json::to_string(&record.id)?;
                stmt.execute(params![domain, id_json, record.state.as_str(), now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
