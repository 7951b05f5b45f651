//! Central search state.
//!
//! `SearchState` is the single source of truth read by the presentation
//! layer. It only changes through `dispatch`, one `SearchAction` at a time,
//! so every transition below is the complete list of ways it can move.

use crate::api::{AnimeSummary, ApiError};
use crate::error::{FetchContext, SearchError};
use crate::history::SearchHistoryStore;
use crate::models::{Pagination, SearchPage, SearchQuery, SortKey};
use tracing::{debug, warn};

/// Where the current search stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// No qualifying query has been fetched yet, or the last error was dismissed
    Idle,
    Loading,
    Success,
    Failed,
}

/// Every way the state can change
#[derive(Debug)]
pub enum SearchAction {
    QueryChanged(String),
    PageChanged(u32),
    SortChanged(SortKey),
    ErrorCleared,
    FetchStarted,
    FetchSucceeded { query: SearchQuery, page: SearchPage },
    FetchFailed(ApiError),
    HistoryCleared,
}

#[derive(Debug)]
pub struct SearchState {
    query: String,
    page: u32,
    sort: SortKey,
    results: Vec<AnimeSummary>,
    pagination: Pagination,
    phase: SearchPhase,
    error: Option<SearchError>,
    history: SearchHistoryStore,
}

impl SearchState {
    pub fn new(history: SearchHistoryStore) -> Self {
        Self {
            query: String::new(),
            page: 1,
            sort: SortKey::Default,
            results: Vec::new(),
            pagination: Pagination::default(),
            phase: SearchPhase::Idle,
            error: None,
            history,
        }
    }

    /// Apply one transition
    pub fn dispatch(&mut self, action: SearchAction) {
        match action {
            SearchAction::QueryChanged(query) => self.query = query,
            SearchAction::PageChanged(page) => self.page = page.max(1),
            SearchAction::SortChanged(sort) => self.sort = sort,
            SearchAction::ErrorCleared => {
                self.error = None;
                if self.phase == SearchPhase::Failed {
                    self.phase = SearchPhase::Idle;
                }
            }
            SearchAction::FetchStarted => {
                self.phase = SearchPhase::Loading;
                self.error = None;
            }
            SearchAction::FetchSucceeded { query, page } => {
                debug!(
                    query = %query.text,
                    page = page.pagination.current_page,
                    results = page.items.len(),
                    "Search succeeded"
                );
                self.results = page.items;
                self.pagination = page.pagination;
                self.error = None;
                self.phase = SearchPhase::Success;
                self.history.record(&query.text);
            }
            SearchAction::FetchFailed(error) => {
                // A cancelled attempt leaves everything exactly as it was
                let Some(search_error) = SearchError::from_api(&error, FetchContext::Search) else {
                    debug!("Ignoring cancelled fetch");
                    return;
                };
                warn!(
                    category = %search_error.category,
                    error = %error,
                    "Search failed"
                );
                self.results.clear();
                self.error = Some(search_error);
                self.phase = SearchPhase::Failed;
            }
            SearchAction::HistoryCleared => self.history.clear(),
        }
    }

    /// Active query text
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    /// The (query, page, sort) triple a fetch would be issued for
    pub fn search_query(&self) -> SearchQuery {
        SearchQuery::new(self.query.clone(), self.page, self.sort)
    }

    pub fn results(&self) -> &[AnimeSummary] {
        &self.results
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SearchPhase::Loading
    }

    pub fn error(&self) -> Option<&SearchError> {
        self.error.as_ref()
    }

    pub fn history(&self) -> &[String] {
        self.history.entries()
    }
}
