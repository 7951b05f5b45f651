//! Capabilities the search pipeline needs from its host.
//!
//! Each one is injected so the pipeline runs the same under the CLI and
//! under tests with a manual clock and in-memory stores.

use reqwest::Url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Source of the current time for debouncing
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by tokio's time source (honours paused test time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset_ns: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward; clones of this clock observe the change
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        // The closure always returns Some, so the update cannot fail
        let _ = self
            .offset_ns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |offset| {
                Some(offset.saturating_add(nanos))
            });
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_ns.load(Ordering::SeqCst))
    }
}

/// Key-value storage failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable string storage
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store; contents are lost with the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Query parameters of the shareable URL
pub trait UrlSync: Send {
    fn param(&self, name: &str) -> Option<String>;
    fn set_param(&mut self, name: &str, value: &str);
    fn remove_param(&mut self, name: &str);
}

/// URL kept in memory; other query parameters are preserved
#[derive(Debug, Clone)]
pub struct UrlState {
    url: Url,
}

impl UrlState {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn rewrite(&mut self, name: &str, value: Option<&str>) {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != name)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() && value.is_none() {
            self.url.set_query(None);
            return;
        }

        let mut pairs = self.url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        if let Some(value) = value {
            pairs.append_pair(name, value);
        }
    }
}

impl UrlSync for UrlState {
    fn param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    fn set_param(&mut self, name: &str, value: &str) {
        self.rewrite(name, Some(value));
    }

    fn remove_param(&mut self, name: &str) {
        self.rewrite(name, None);
    }
}

/// Viewport control (the window.scrollTo equivalent)
pub trait ScrollPort: Send {
    fn scroll_to_top(&mut self);
}

/// Scroll port for hosts without a viewport; records the request in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogScroll;

impl ScrollPort for LogScroll {
    fn scroll_to_top(&mut self) {
        tracing::debug!("Scroll to top requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let observer = clock.clone();
        let start = observer.now();

        clock.advance(Duration::from_millis(250));
        assert_eq!(observer.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn test_manual_clock_keeps_sub_millisecond_steps() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.advance(Duration::from_micros(400));
        clock.advance(Duration::from_micros(600));
        assert_eq!(clock.now() - start, Duration::from_millis(1));

        clock.advance(Duration::from_nanos(1));
        assert_eq!(clock.now() - start, Duration::from_nanos(1_000_001));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "[\"naruto\"]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[\"naruto\"]"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_url_state_set_and_remove() {
        let mut url = UrlState::new(Url::parse("https://app.test/search?tab=tv").unwrap());
        assert_eq!(url.param("q"), None);

        url.set_param("q", "one piece");
        assert_eq!(url.param("q").as_deref(), Some("one piece"));
        assert_eq!(url.param("tab").as_deref(), Some("tv"));

        url.set_param("q", "bleach");
        assert_eq!(url.url().as_str(), "https://app.test/search?tab=tv&q=bleach");

        url.remove_param("q");
        assert_eq!(url.url().as_str(), "https://app.test/search?tab=tv");
    }

    #[test]
    fn test_url_state_drops_empty_query() {
        let mut url = UrlState::new(Url::parse("https://app.test/?q=gundam").unwrap());
        url.remove_param("q");
        assert_eq!(url.url().as_str(), "https://app.test/");
    }
}
