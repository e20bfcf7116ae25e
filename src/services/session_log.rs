//! Finished-session history

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::PersistenceStore;
use crate::error::PersistenceError;

/// Key holding the JSON array written by [`StoreSessionLog`]
pub const HISTORY_KEY: &str = "session_history";

/// One finished focus session. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub start_time: i64,
    pub end_time: i64,
    pub duration: u64,
    pub completed: bool,
}

pub trait SessionLog: Send + Sync {
    fn append(&self, record: &SessionRecord) -> Result<(), PersistenceError>;
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySessionLog {
    records: Mutex<Vec<SessionRecord>>,
}

impl MemorySessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl SessionLog for MemorySessionLog {
    fn append(&self, record: &SessionRecord) -> Result<(), PersistenceError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| PersistenceError::Unavailable(format!("Failed to lock session log: {}", e)))?;
        records.push(record.clone());
        Ok(())
    }
}

/// Appends to a JSON array stored under [`HISTORY_KEY`].
pub struct StoreSessionLog {
    store: Arc<dyn PersistenceStore>,
    // Serializes read-modify-write of the array
    write_lock: Mutex<()>,
}

impl StoreSessionLog {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn records(&self) -> Result<Vec<SessionRecord>, PersistenceError> {
        match self.store.get(HISTORY_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn completed_sessions(&self) -> Result<usize, PersistenceError> {
        Ok(self.records()?.iter().filter(|r| r.completed).count())
    }
}

impl SessionLog for StoreSessionLog {
    fn append(&self, record: &SessionRecord) -> Result<(), PersistenceError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PersistenceError::Unavailable(format!("Failed to lock session log: {}", e)))?;
        let mut records = self.records()?;
        records.push(record.clone());
        let serialized = serde_json::to_string(&records)?;
        self.store.set(HISTORY_KEY, &serialized)
    }
}
