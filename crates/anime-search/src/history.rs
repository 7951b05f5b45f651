//! Recent-search history.
//!
//! A short, most-recent-first list of queries that produced a successful
//! search. Persisted as a JSON array of strings under a single storage key.
//! Storage failures never surface: the in-memory list stays authoritative and
//! an unreadable persisted copy loads as an empty history.

use crate::models::qualifies;
use crate::ports::KeyValueStore;
use tracing::{debug, warn};

/// Maximum number of remembered queries
pub const MAX_HISTORY_ENTRIES: usize = 5;

pub struct SearchHistoryStore {
    entries: Vec<String>,
    storage: Box<dyn KeyValueStore>,
    key: String,
}

impl SearchHistoryStore {
    /// Load the persisted history, falling back to empty on any failure
    pub fn load(storage: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();

        let entries = match storage.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(entries) => sanitize(entries),
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding unreadable search history");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Search history storage unavailable");
                Vec::new()
            }
        };

        debug!(key = %key, entries = entries.len(), "Search history loaded");
        Self {
            entries,
            storage,
            key,
        }
    }

    /// Remember a successful query; sub-minimum input is ignored
    pub fn record(&mut self, query: &str) {
        let query = query.trim();
        if !qualifies(query) {
            return;
        }

        self.entries.retain(|entry| entry != query);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(MAX_HISTORY_ENTRIES);

        debug!(query = %query, entries = self.entries.len(), "Recorded search");
        self.persist();
    }

    /// Forget everything, including the persisted copy
    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(e) = self.storage.remove(&self.key) {
            warn!(key = %self.key, error = %e, "Failed to remove persisted search history");
        }
    }

    /// Entries, most recent first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.entries)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.storage
                    .set(&self.key, &raw)
                    .map_err(|e| e.to_string())
            });

        if let Err(e) = result {
            warn!(key = %self.key, error = %e, "Failed to persist search history");
        }
    }
}

impl std::fmt::Debug for SearchHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchHistoryStore")
            .field("key", &self.key)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Re-establish the list invariants on data read back from storage
fn sanitize(raw: Vec<String>) -> Vec<String> {
    let mut entries: Vec<String> = Vec::with_capacity(MAX_HISTORY_ENTRIES);
    for entry in raw {
        let entry = entry.trim();
        if qualifies(entry) && !entries.iter().any(|e| e == entry) {
            entries.push(entry.to_string());
        }
        if entries.len() == MAX_HISTORY_ENTRIES {
            break;
        }
    }
    entries
}
