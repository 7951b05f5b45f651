//! Fetch-on-demand of a single title's full record.
//!
//! Works like the search pipeline in miniature: each `load` starts a new
//! attempt that supersedes the previous one, the fetch runs on its own task,
//! and only the current attempt's settlement reaches the state.

use crate::api::{AnimeApi, AnimeDetails, ApiError};
use crate::error::{FetchContext, SearchError};
use crate::lifecycle::{AttemptId, RequestLifecycle};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// What the detail view shows
#[derive(Debug, Default)]
pub struct DetailState {
    pub anime: Option<AnimeDetails>,
    pub is_loading: bool,
    pub error: Option<SearchError>,
}

#[derive(Debug)]
pub struct DetailSettlement {
    pub attempt: AttemptId,
    pub mal_id: u32,
    pub outcome: Result<AnimeDetails, ApiError>,
}

pub struct DetailLoader {
    api: Arc<dyn AnimeApi>,
    lifecycle: RequestLifecycle,
    last_id: Option<u32>,
    state: DetailState,
    settlements_tx: mpsc::UnboundedSender<DetailSettlement>,
    settlements_rx: mpsc::UnboundedReceiver<DetailSettlement>,
}

impl DetailLoader {
    pub fn new(api: Arc<dyn AnimeApi>) -> Self {
        let (settlements_tx, settlements_rx) = mpsc::unbounded_channel();
        Self {
            api,
            lifecycle: RequestLifecycle::new(),
            last_id: None,
            state: DetailState::default(),
            settlements_tx,
            settlements_rx,
        }
    }

    /// Start fetching `mal_id`, superseding any load in flight
    pub fn load(&mut self, mal_id: u32) {
        self.last_id = Some(mal_id);
        self.state.is_loading = true;
        self.state.error = None;

        let attempt = self.lifecycle.begin();
        debug!(attempt = %attempt.id, mal_id, "Loading anime details");

        let api = Arc::clone(&self.api);
        let settlements = self.settlements_tx.clone();
        tokio::spawn(async move {
            let outcome = api.anime_detail(mal_id, &attempt.token).await;
            let _ = settlements.send(DetailSettlement {
                attempt: attempt.id,
                mal_id,
                outcome,
            });
        });
    }

    /// Load the last requested id again. No-op before the first load.
    pub fn retry(&mut self) {
        if let Some(mal_id) = self.last_id {
            self.load(mal_id);
        }
    }

    pub async fn next_settlement(&mut self) -> Option<DetailSettlement> {
        self.settlements_rx.recv().await
    }

    /// Apply a settlement if it belongs to the current load
    pub fn apply(&mut self, settlement: DetailSettlement) -> bool {
        if !self.lifecycle.finish(settlement.attempt) {
            debug!(
                attempt = %settlement.attempt,
                mal_id = settlement.mal_id,
                "Discarding superseded detail"
            );
            return false;
        }

        match settlement.outcome {
            Ok(anime) => {
                self.state.anime = Some(anime);
                self.state.error = None;
            }
            Err(error) => match SearchError::from_api(&error, FetchContext::Detail) {
                Some(detail_error) => {
                    warn!(
                        mal_id = settlement.mal_id,
                        category = %detail_error.category,
                        error = %error,
                        "Detail fetch failed"
                    );
                    self.state.anime = None;
                    self.state.error = Some(detail_error);
                }
                None => return false,
            },
        }
        self.state.is_loading = false;
        true
    }

    /// Wait until the current load settles
    pub async fn settled(&mut self) -> &DetailState {
        while self.lifecycle.is_active() {
            match self.settlements_rx.recv().await {
                Some(settlement) => {
                    self.apply(settlement);
                }
                None => break,
            }
        }
        &self.state
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    /// Cancel the load in flight
    pub fn dispose(&mut self) {
        self.lifecycle.cancel();
        self.state.is_loading = false;
    }
}
