//! Search orchestration.
//!
//! Decides when to fetch. Typed input goes through the debouncer; a settled
//! value that qualifies becomes the active query and resets the page. Any
//! change to the (query, page, sort) triple while a fetch is required starts
//! a new attempt, superseding the previous one. Settlements come back over a
//! channel and are applied only if their attempt is still the current one.
//!
//! All state changes happen on the task that owns the orchestrator; spawned
//! fetch tasks only perform I/O and report back.

use crate::api::{AnimeApi, AnimeSummary, ApiError};
use crate::debounce::Debouncer;
use crate::error::SearchError;
use crate::lifecycle::{AttemptId, RequestLifecycle};
use crate::models::{qualifies, Pagination, SearchPage, SearchQuery, SortKey};
use crate::ports::{Clock, ScrollPort, UrlSync};
use crate::state::{SearchAction, SearchState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// URL query parameter mirroring the active query
pub const QUERY_PARAM: &str = "q";

/// Inbound user actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    InputChanged(String),
    Clear,
    SortChanged(SortKey),
    HistoryPicked(String),
    ClearHistory,
    PrevPage,
    NextPage,
    Retry,
}

/// Outcome of one fetch attempt, reported by its task
#[derive(Debug)]
pub struct Settlement {
    pub attempt: AttemptId,
    pub query: SearchQuery,
    pub outcome: Result<SearchPage, ApiError>,
}

/// Host capabilities the orchestrator drives
pub struct Ports {
    pub api: Arc<dyn AnimeApi>,
    pub clock: Arc<dyn Clock>,
    pub url: Box<dyn UrlSync>,
    pub scroll: Box<dyn ScrollPort>,
}

/// Read-only snapshot for the presentation layer
#[derive(Debug, Clone, Copy)]
pub struct SearchView<'a> {
    pub input_value: &'a str,
    pub query: &'a str,
    pub page: u32,
    pub sort_key: SortKey,
    pub is_loading: bool,
    pub results: &'a [AnimeSummary],
    pub pagination: &'a Pagination,
    pub error: Option<&'a SearchError>,
    pub history_entries: &'a [String],
}

pub struct SearchOrchestrator {
    state: SearchState,
    input: String,
    debouncer: Debouncer<String>,
    lifecycle: RequestLifecycle,
    api: Arc<dyn AnimeApi>,
    clock: Arc<dyn Clock>,
    url: Box<dyn UrlSync>,
    scroll: Box<dyn ScrollPort>,
    /// Set by changes that warrant a fetch, cleared once one settles
    fetch_required: bool,
    /// (query, page, sort) as last seen by the fetch reaction
    observed: SearchQuery,
    bootstrapped: bool,
    disposed: bool,
    settlements_tx: mpsc::UnboundedSender<Settlement>,
    settlements_rx: mpsc::UnboundedReceiver<Settlement>,
}

impl SearchOrchestrator {
    /// Create an orchestrator. Nothing is fetched until `bootstrap` (or `run`).
    pub fn new(state: SearchState, ports: Ports, debounce: Duration) -> Self {
        let (settlements_tx, settlements_rx) = mpsc::unbounded_channel();
        let observed = state.search_query();

        // Seed the input from the URL so the debouncer starts settled on it
        let input = ports
            .url
            .param(QUERY_PARAM)
            .filter(|q| qualifies(q))
            .unwrap_or_default();

        Self {
            state,
            debouncer: Debouncer::new(input.clone(), debounce),
            input,
            lifecycle: RequestLifecycle::new(),
            api: ports.api,
            clock: ports.clock,
            url: ports.url,
            scroll: ports.scroll,
            fetch_required: false,
            observed,
            bootstrapped: false,
            disposed: false,
            settlements_tx,
            settlements_rx,
        }
    }

    /// Adopt the query from the URL, once. Must run inside a tokio runtime.
    pub fn bootstrap(&mut self) {
        if self.bootstrapped || self.disposed {
            return;
        }
        self.bootstrapped = true;

        if qualifies(&self.input) {
            info!(query = %self.input.trim(), "Starting from URL query");
            let query = self.input.clone();
            self.adopt_query(&query);
            self.react();
        } else {
            self.state.dispatch(SearchAction::ErrorCleared);
            self.url.remove_param(QUERY_PARAM);
        }
    }

    /// Handle one user action
    pub fn handle(&mut self, event: UiEvent) {
        if self.disposed {
            return;
        }
        debug!(event = ?event, "UI event");

        match event {
            UiEvent::InputChanged(text) | UiEvent::HistoryPicked(text) => self.set_input(text),
            UiEvent::Clear => {
                self.set_input(String::new());
                self.state.dispatch(SearchAction::ErrorCleared);
                self.url.remove_param(QUERY_PARAM);
            }
            UiEvent::SortChanged(sort) => {
                self.state.dispatch(SearchAction::SortChanged(sort));
                self.state.dispatch(SearchAction::PageChanged(1));
                self.fetch_required = true;
                self.scroll.scroll_to_top();
                self.react();
            }
            UiEvent::ClearHistory => self.state.dispatch(SearchAction::HistoryCleared),
            UiEvent::PrevPage => {
                if self.state.pagination().has_prev {
                    let page = self.state.page().saturating_sub(1);
                    self.change_page(page);
                }
            }
            UiEvent::NextPage => {
                if self.state.pagination().has_next {
                    let page = self.state.page() + 1;
                    self.change_page(page);
                }
            }
            UiEvent::Retry => self.retry(),
        }
    }

    /// Settle the debounced input if its quiet period is over.
    /// Returns whether anything changed.
    pub fn tick(&mut self) -> bool {
        match self.debouncer.poll(self.clock.now()) {
            Some(settled) => {
                self.on_settled_input(settled);
                true
            }
            None => false,
        }
    }

    /// Re-issue the current logical fetch
    pub fn retry(&mut self) {
        let query = self.state.search_query();
        if !qualifies(&query.text) {
            return;
        }
        self.fetch_required = true;
        self.observed = query.clone();
        self.start_fetch(query);
    }

    /// Wait for the next fetch task to report back
    pub async fn next_settlement(&mut self) -> Option<Settlement> {
        self.settlements_rx.recv().await
    }

    /// Apply settlements until the current fetch has landed
    pub async fn settled(&mut self) -> &SearchState {
        while self.state.is_loading() && self.lifecycle.is_active() {
            match self.settlements_rx.recv().await {
                Some(settlement) => {
                    self.apply(settlement);
                }
                None => break,
            }
        }
        &self.state
    }

    /// Apply a settlement if its attempt is still authoritative.
    /// Returns `false` when it was discarded.
    pub fn apply(&mut self, settlement: Settlement) -> bool {
        if !self.lifecycle.finish(settlement.attempt) {
            debug!(
                attempt = %settlement.attempt,
                query = %settlement.query.text,
                page = settlement.query.page,
                "Discarding superseded settlement"
            );
            return false;
        }

        match settlement.outcome {
            Ok(page) => self.state.dispatch(SearchAction::FetchSucceeded {
                query: settlement.query,
                page,
            }),
            Err(error) => self.state.dispatch(SearchAction::FetchFailed(error)),
        }
        self.fetch_required = false;
        true
    }

    /// Cancel the in-flight attempt and drop any pending input
    pub fn dispose(&mut self) {
        self.lifecycle.cancel();
        self.debouncer.dispose();
        self.disposed = true;
    }

    /// Drive the orchestrator until `events` closes or `shutdown` fires.
    ///
    /// `observer` sees a fresh view after every change. The clock must follow
    /// tokio time (`SystemClock`), since debounce deadlines are slept on.
    pub async fn run<F>(
        mut self,
        mut events: mpsc::Receiver<UiEvent>,
        shutdown: CancellationToken,
        mut observer: F,
    ) -> SearchState
    where
        F: FnMut(&SearchView<'_>),
    {
        self.bootstrap();
        observer(&self.view());

        loop {
            let deadline = self.debouncer.deadline();

            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                Some(settlement) = self.settlements_rx.recv() => {
                    if !self.apply(settlement) {
                        continue;
                    }
                }
                _ = sleep_until(deadline) => {
                    if !self.tick() {
                        continue;
                    }
                }
            }

            observer(&self.view());
        }

        debug!("Search orchestrator stopping");
        self.dispose();
        self.state
    }

    pub fn view(&self) -> SearchView<'_> {
        SearchView {
            input_value: &self.input,
            query: self.state.query(),
            page: self.state.page(),
            sort_key: self.state.sort(),
            is_loading: self.state.is_loading(),
            results: self.state.results(),
            pagination: self.state.pagination(),
            error: self.state.error(),
            history_entries: self.state.history(),
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_fetch_required(&self) -> bool {
        self.fetch_required
    }

    fn set_input(&mut self, text: String) {
        self.debouncer.push(text.clone(), self.clock.now());
        self.input = text;
    }

    fn on_settled_input(&mut self, settled: String) {
        if qualifies(&settled) {
            self.adopt_query(&settled);
        } else {
            debug!(input = %settled, "Input too short to search");
            self.state.dispatch(SearchAction::ErrorCleared);
            self.fetch_required = false;
            self.url.remove_param(QUERY_PARAM);
        }
        self.react();
    }

    fn adopt_query(&mut self, text: &str) {
        let text = text.trim();
        debug!(query = %text, "Adopting query");
        self.state.dispatch(SearchAction::QueryChanged(text.to_string()));
        self.state.dispatch(SearchAction::PageChanged(1));
        self.fetch_required = true;
        self.url.set_param(QUERY_PARAM, text);
    }

    fn change_page(&mut self, page: u32) {
        self.state.dispatch(SearchAction::PageChanged(page));
        self.fetch_required = true;
        self.scroll.scroll_to_top();
        self.react();
    }

    /// Fetch reaction: runs whenever (query, page, sort) may have changed
    fn react(&mut self) {
        let current = self.state.search_query();
        if current == self.observed {
            return;
        }
        self.observed = current.clone();

        if self.fetch_required && qualifies(&current.text) {
            self.start_fetch(current);
        }
    }

    fn start_fetch(&mut self, query: SearchQuery) {
        let attempt = self.lifecycle.begin();
        self.state.dispatch(SearchAction::FetchStarted);

        debug!(
            attempt = %attempt.id,
            query = %query.text,
            page = query.page,
            sort = %query.sort,
            "Starting fetch"
        );

        let api = Arc::clone(&self.api);
        let settlements = self.settlements_tx.clone();
        tokio::spawn(async move {
            let outcome = api.search(&query, &attempt.token).await;
            // The receiver is gone only when the orchestrator itself is
            let _ = settlements.send(Settlement {
                attempt: attempt.id,
                query,
                outcome,
            });
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
        }
        None => std::future::pending().await,
    }
}
