//! Jikan API v4 client implementation.
//!
//! This module provides a rate-limited, cancellable client for the Jikan API
//! (MyAnimeList unofficial API) behind the `AnimeApi` trait.

pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod types;

pub use client::{AnimeApi, JikanClient};
pub use error::ApiError;
pub use rate_limiter::RateLimiter;
pub use types::*;
