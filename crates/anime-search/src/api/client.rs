//! Jikan API client with rate limiting and cancellation.

use super::error::ApiError;
use super::rate_limiter::RateLimiter;
use super::types::*;
use crate::models::{SearchPage, SearchQuery};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Request};
use serde::de::DeserializeOwned;
use shared::config::ApiConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The anime database as seen by the search pipeline
///
/// Every call takes the cancellation token of its attempt; once the token is
/// cancelled the call must resolve to `ApiError::Cancelled` promptly.
#[async_trait]
pub trait AnimeApi: Send + Sync {
    /// One page of search results
    async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, ApiError>;

    /// Full record of a single title
    async fn anime_detail(
        &self,
        mal_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetails, ApiError>;
}

/// Jikan API v4 client
pub struct JikanClient {
    /// HTTP client
    client: Client,
    /// Base URL for Jikan API
    base_url: String,
    /// Results per page
    page_size: u32,
    /// Rate limiter shared by all in-flight calls
    rate_limiter: Mutex<RateLimiter>,
}

impl JikanClient {
    /// Create a new Jikan client
    pub fn new(
        base_url: impl Into<String>,
        page_size: u32,
        timeout: Duration,
        user_agent: &str,
        rate_limiter: RateLimiter,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size,
            rate_limiter: Mutex::new(rate_limiter),
        })
    }

    /// Create a client from the `[api]` config section
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.page_size,
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
            RateLimiter::new(
                config.rate_limit.requests_per_second,
                config.rate_limit.requests_per_minute,
            ),
        )
    }

    /// Build `GET /anime?q=..&page=..&limit=..[&order_by=..&sort=desc]`
    fn search_request(&self, query: &SearchQuery) -> Result<Request, ApiError> {
        self.client
            .get(format!("{}/anime", self.base_url))
            .query(&query.to_params(self.page_size))
            .build()
            .map_err(ApiError::from)
    }

    /// Build `GET /anime/{id}/full`
    fn detail_request(&self, mal_id: u32) -> Result<Request, ApiError> {
        self.client
            .get(format!("{}/anime/{}/full", self.base_url, mal_id))
            .build()
            .map_err(ApiError::from)
    }

    /// Send a request after rate limiting, racing every await against `cancel`
    async fn execute<T: DeserializeOwned>(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        let url = request.url().clone();

        let work = async {
            let minute_count = {
                let mut limiter = self.rate_limiter.lock().await;
                limiter.acquire().await;
                limiter.current_minute_count()
            };

            debug!(url = %url, minute_count, "Making API request");
            let response = self.client.execute(request).await?;
            let status = response.status();

            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                warn!(url = %url, status = %status, "Request failed");
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let data = response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;
            debug!(url = %url, "Request successful");
            Ok(data)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url = %url, "Request aborted");
                Err(ApiError::Cancelled)
            }
            result = work => result,
        }
    }
}

#[async_trait]
impl AnimeApi for JikanClient {
    async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, ApiError> {
        info!(
            query = %query.text,
            page = query.page,
            sort = %query.sort,
            "Searching anime"
        );
        let request = self.search_request(query)?;
        let response: PaginatedResponse<AnimeSummary> = self.execute(request, cancel).await?;
        Ok(SearchPage::from(response))
    }

    async fn anime_detail(
        &self,
        mal_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetails, ApiError> {
        info!(mal_id = mal_id, "Fetching anime details");
        let request = self.detail_request(mal_id)?;
        let response: DataResponse<AnimeDetails> = self.execute(request, cancel).await?;
        Ok(response.data)
    }
}
