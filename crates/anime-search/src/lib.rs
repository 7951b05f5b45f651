//! Anime search client library.
//!
//! This library provides a debounced, cancellable search pipeline over the
//! Jikan API v4, with paginated and sorted results, categorized errors and a
//! persisted history of recent searches.

pub mod api;
pub mod debounce;
pub mod detail;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod models;
pub mod orchestrator;
pub mod ports;
pub mod state;
pub mod storage;

pub use api::{AnimeApi, ApiError, JikanClient, RateLimiter};
pub use debounce::Debouncer;
pub use detail::{DetailLoader, DetailState};
pub use error::{ErrorCategory, FetchContext, SearchError};
pub use history::{SearchHistoryStore, MAX_HISTORY_ENTRIES};
pub use lifecycle::{Attempt, AttemptId, RequestLifecycle};
pub use models::{qualifies, Pagination, SearchPage, SearchQuery, SortKey, MIN_QUERY_LEN};
pub use orchestrator::{Ports, SearchOrchestrator, SearchView, UiEvent, QUERY_PARAM};
pub use ports::{Clock, KeyValueStore, LogScroll, ManualClock, MemoryStore, SystemClock, UrlState, UrlSync};
pub use state::{SearchAction, SearchPhase, SearchState};
pub use storage::FileStore;
