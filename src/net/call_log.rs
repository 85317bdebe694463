//! Bounded diagnostic log of outbound API calls.
//!
//! DESIGN
//! ======
//! Entries are kept as one JSON array under [`LOG_KEY`], oldest first. An
//! append reads the array, pushes, trims from the front down to capacity, and
//! writes it back while holding a process-wide lock so concurrent tasks never
//! lose each other's entries.
//!
//! ERROR HANDLING
//! ==============
//! [`CallLog::record`] is a non-critical side effect of every API call. Its
//! failures are traced and dropped; they never reach the caller whose call is
//! being recorded. Reads and clears are explicit user actions and do return
//! errors.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::storage::{Storage, StorageError};

pub const LOG_KEY: &str = "bilco_api_logs";
pub const DEFAULT_CAPACITY: usize = 100;
/// Status recorded when the call failed before any response arrived.
pub const UNRESOLVED_STATUS: u16 = 500;

#[derive(Debug, thiserror::Error)]
pub enum CallLogError {
    #[error("call log storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("call log is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("call log lock poisoned")]
    Poisoned,
}

/// One outbound call as seen by the diagnostics view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogEntry {
    pub id: String,
    pub method: String,
    /// Server-relative route; the base origin is stripped.
    pub path: String,
    pub status: u16,
    pub duration_ms: f64,
    /// RFC 3339 UTC.
    pub timestamp: String,
}

impl CallLogEntry {
    #[must_use]
    pub fn new(method: &str, base_url: &str, path: &str, status: u16, elapsed: Duration) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method: method.to_owned(),
            path: strip_origin(base_url, path).to_owned(),
            status,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        }
    }
}

/// Drop `base_url` from the front of `url` so only the route remains.
#[must_use]
pub fn strip_origin<'a>(base_url: &str, url: &'a str) -> &'a str {
    if base_url.is_empty() {
        return url;
    }
    url.strip_prefix(base_url).unwrap_or(url)
}

/// Handle to the persisted call log. Clones share storage and lock.
#[derive(Clone)]
pub struct CallLog {
    storage: Arc<dyn Storage>,
    capacity: usize,
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for CallLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallLog").field("capacity", &self.capacity).finish_non_exhaustive()
    }
}

impl CallLog {
    /// `capacity` is clamped to at least one entry.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, capacity: usize) -> Self {
        Self { storage, capacity: capacity.max(1), lock: Arc::new(Mutex::new(())) }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `entry`, best-effort. Never fails and never panics.
    pub fn record(&self, entry: CallLogEntry) {
        // Non-critical: a broken log must not change the recorded call's outcome.
        if let Err(error) = self.append(entry) {
            tracing::debug!(%error, "call log append skipped");
        }
    }

    /// Append `entry` and evict from the front beyond capacity.
    ///
    /// A stored log that no longer parses is replaced rather than blocking
    /// every later append.
    pub fn append(&self, entry: CallLogEntry) -> Result<(), CallLogError> {
        let _guard = self.lock.lock().map_err(|_| CallLogError::Poisoned)?;

        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(CallLogError::Json(error)) => {
                tracing::warn!(%error, "discarding unreadable call log");
                Vec::new()
            }
            Err(other) => return Err(other),
        };

        entries.push(entry);
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }

        let rendered = serde_json::to_string(&entries)?;
        self.storage.set(LOG_KEY, &rendered)?;
        Ok(())
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Result<Vec<CallLogEntry>, CallLogError> {
        let _guard = self.lock.lock().map_err(|_| CallLogError::Poisoned)?;
        self.load()
    }

    /// Drop the whole log.
    pub fn clear(&self) -> Result<(), CallLogError> {
        let _guard = self.lock.lock().map_err(|_| CallLogError::Poisoned)?;
        self.storage.remove(LOG_KEY)?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<CallLogEntry>, CallLogError> {
        match self.storage.get(LOG_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
#[path = "call_log_test.rs"]
mod tests;
