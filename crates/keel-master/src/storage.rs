//! Key-value storage seam shared by every undecorated registry.
//!
//! The master never talks to a concrete store directly. Registries encode
//! their objects as JSON and hand the bytes to a [`StorageBackend`]; the
//! in-process [`InMemoryStorage`] honours per-key time-to-live so the event
//! registry can expire entries the same way a real store would. Expired
//! entries are dropped on the next create or list.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::clock::{Clock, SystemClock};

/// Errors reported by storage backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A create targeted a key that is already present.
    #[error("key '{key}' already exists")]
    AlreadyExists {
        /// Conflicting key.
        key: String,
    },
    /// The key does not exist or has expired.
    #[error("key '{key}' not found")]
    NotFound {
        /// Missing key.
        key: String,
    },
    /// The backend cannot serve requests.
    #[error("storage backend unavailable: {message}")]
    Unavailable {
        /// Human-readable cause.
        message: String,
    },
}

impl StorageError {
    /// Builds an `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Minimal key-value contract consumed by the registries.
pub trait StorageBackend: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Stores a new value, failing when `key` is already taken.
    fn create(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Removes `key`.
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Returns every live value whose key starts with `prefix`, ordered by key.
    fn list(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Process-local storage backend.
pub struct InMemoryStorage {
    entries: RwLock<BTreeMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Builds an empty store driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Builds an empty store that reads time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            clock,
        }
    }

    fn poisoned() -> StorageError {
        StorageError::unavailable("storage lock poisoned")
    }

    fn purge_expired(entries: &mut BTreeMap<String, Entry>, now: Instant) {
        entries.retain(|_, entry| entry.is_live(now));
    }
}

impl StorageBackend for InMemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let now = self.clock.now();
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn create(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        Self::purge_expired(&mut entries, now);
        if entries.contains_key(key) {
            return Err(StorageError::AlreadyExists {
                key: key.to_owned(),
            });
        }
        let expires_at = ttl.and_then(|ttl| now.checked_add(ttl));
        entries.insert(key.to_owned(), Entry { value, expires_at });
        Ok(())
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(
            key.to_owned(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        match entries.remove(key) {
            Some(entry) if entry.is_live(now) => Ok(()),
            _ => Err(StorageError::NotFound {
                key: key.to_owned(),
            }),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        Self::purge_expired(&mut entries, now);
        Ok(entries
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, entry)| entry.value.clone())
            .collect())
    }
}
