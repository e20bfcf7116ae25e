//! Debounced writer for a single persistence key
//!
//! High-frequency callers `submit` the latest value; it reaches the store at
//! most once per interval. Recovery checkpoints call `flush` to write
//! whatever is pending right away. A failed write or removal stays pending
//! so the next `submit` window or `flush` retries it.

use std::time::Duration;

use crate::{error::PersistenceError, services::PersistenceStore};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Write(String),
    Remove,
}

#[derive(Debug)]
pub struct Debounced {
    key: &'static str,
    interval_ms: i64,
    last_write_ms: Option<i64>,
    pending: Option<Pending>,
}

impl Debounced {
    pub fn new(key: &'static str, interval: Duration) -> Self {
        Self {
            key,
            interval_ms: i64::try_from(interval.as_millis()).unwrap_or(i64::MAX),
            last_write_ms: None,
            pending: None,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Queue `value`, writing it immediately if the window has elapsed.
    /// A newer value replaces a pending removal. Returns whether a write
    /// happened.
    pub fn submit(
        &mut self,
        store: &dyn PersistenceStore,
        value: String,
        now_ms: i64,
    ) -> Result<bool, PersistenceError> {
        self.pending = Some(Pending::Write(value));
        if self.is_due(now_ms) {
            self.flush(store, now_ms)
        } else {
            Ok(false)
        }
    }

    /// Apply the pending write or removal, if any, regardless of the window.
    pub fn flush(
        &mut self,
        store: &dyn PersistenceStore,
        now_ms: i64,
    ) -> Result<bool, PersistenceError> {
        let Some(pending) = self.pending.take() else {
            return Ok(false);
        };

        let result = match &pending {
            Pending::Write(value) => store.set(self.key, value),
            Pending::Remove => store.remove(self.key),
        };
        match result {
            Ok(()) => {
                self.last_write_ms = Some(now_ms);
                Ok(true)
            }
            Err(e) => {
                self.pending = Some(pending);
                Err(e)
            }
        }
    }

    /// Drop any pending value and delete the key. A failed delete stays
    /// pending until a later `flush` or `clear` succeeds.
    pub fn clear(
        &mut self,
        store: &dyn PersistenceStore,
        now_ms: i64,
    ) -> Result<(), PersistenceError> {
        self.pending = Some(Pending::Remove);
        self.flush(store, now_ms).map(|_| ())
    }

    fn is_due(&self, now_ms: i64) -> bool {
        match self.last_write_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    #[test]
    fn writes_at_most_once_per_interval() {
        let store = MemoryStore::new();
        let mut writer = Debounced::new("k", Duration::from_secs(1));

        assert!(writer.submit(&store, "a".into(), 0).unwrap());
        assert!(!writer.submit(&store, "b".into(), 400).unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("a"));
        assert!(writer.has_pending());

        assert!(writer.submit(&store, "c".into(), 1_000).unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("c"));
        assert!(!writer.has_pending());
    }

    #[test]
    fn flush_ignores_the_window() {
        let store = MemoryStore::new();
        let mut writer = Debounced::new("k", Duration::from_secs(60));

        writer.submit(&store, "a".into(), 0).unwrap();
        writer.submit(&store, "b".into(), 10).unwrap();
        assert!(writer.flush(&store, 20).unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("b"));

        // Nothing pending, nothing written.
        assert!(!writer.flush(&store, 30).unwrap());
    }

    #[test]
    fn failed_write_stays_pending() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        let mut writer = Debounced::new("k", Duration::from_secs(1));

        assert!(writer.submit(&store, "a".into(), 0).is_err());
        assert!(writer.has_pending());

        store.fail_writes(false);
        assert!(writer.submit(&store, "b".into(), 1).unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn clear_removes_key() {
        let store = MemoryStore::new();
        let mut writer = Debounced::new("k", Duration::from_secs(1));
        writer.submit(&store, "a".into(), 0).unwrap();
        writer.clear(&store, 5).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(!writer.has_pending());
    }

    #[test]
    fn failed_clear_is_retried_by_flush() {
        let store = MemoryStore::new();
        let mut writer = Debounced::new("k", Duration::from_secs(1));
        writer.submit(&store, "running".into(), 0).unwrap();

        store.fail_writes(true);
        assert!(writer.clear(&store, 10).is_err());
        assert!(writer.has_pending());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("running"));

        store.fail_writes(false);
        assert!(writer.flush(&store, 20).unwrap());
        assert_eq!(store.get("k").unwrap(), None);
        assert!(!writer.has_pending());
    }
}
