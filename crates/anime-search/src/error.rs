//! User-facing error categories for failed fetches.
//!
//! Every failed call is reduced to one `ErrorCategory`; the category alone
//! decides the message shown and whether a retry is worth offering.

use crate::api::ApiError;
use serde::{Deserialize, Serialize};

/// Category of a failed fetch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    /// Superseded or aborted attempt. Never shown to the user.
    Cancelled,
    RateLimited,
    ServerError,
    NotFound,
    Network,
    Generic,
}

/// Which fetch failed; only changes the wording of some messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchContext {
    Search,
    Detail,
}

impl ErrorCategory {
    /// Classify a failed call. Rules are checked in order.
    pub fn classify(error: &ApiError) -> Self {
        if error.is_cancelled() {
            return ErrorCategory::Cancelled;
        }

        match error.status() {
            Some(429) => ErrorCategory::RateLimited,
            Some(status) if status >= 500 => ErrorCategory::ServerError,
            Some(404) => ErrorCategory::NotFound,
            Some(_) => ErrorCategory::Network,
            None => ErrorCategory::Generic,
        }
    }

    /// Message shown to the user for this category
    pub fn message(&self, context: FetchContext) -> &'static str {
        match (self, context) {
            (ErrorCategory::Cancelled, _) => "Request cancelled",
            (ErrorCategory::RateLimited, _) => {
                "The anime API is currently busy. Please try again in a moment."
            }
            (ErrorCategory::ServerError, _) => {
                "The anime API is experiencing issues. Please try again later."
            }
            (ErrorCategory::NotFound, FetchContext::Search) => "No anime found matching your search.",
            (ErrorCategory::NotFound, FetchContext::Detail) => "Anime not found.",
            (ErrorCategory::Network, FetchContext::Search) => {
                "Failed to fetch anime data. Please check your connection."
            }
            (ErrorCategory::Network, FetchContext::Detail) => {
                "Failed to fetch anime details. Please check your connection."
            }
            (ErrorCategory::Generic, _) => "An unexpected error occurred.",
        }
    }

    /// Whether the presentation layer should offer a retry action
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorCategory::Cancelled | ErrorCategory::NotFound)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::RateLimited => "rateLimited",
            ErrorCategory::ServerError => "serverError",
            ErrorCategory::NotFound => "notFound",
            ErrorCategory::Network => "network",
            ErrorCategory::Generic => "generic",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error carried in state: a category tag plus its user-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchError {
    pub category: ErrorCategory,
    pub message: String,
}

impl SearchError {
    pub fn new(category: ErrorCategory, context: FetchContext) -> Self {
        Self {
            category,
            message: category.message(context).to_string(),
        }
    }

    /// Classify a failed call, or `None` when it was cancelled
    pub fn from_api(error: &ApiError, context: FetchContext) -> Option<Self> {
        match ErrorCategory::classify(error) {
            ErrorCategory::Cancelled => None,
            category => Some(Self::new(category, context)),
        }
    }
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.category)
    }
}
