//! Data models for the search pipeline.
//!
//! Defines the query value (text, page, sort order), the pagination metadata
//! derived from a response, and the page of results handed back by the API.

use crate::api::{AnimeSummary, PaginatedResponse};
use serde::{Deserialize, Serialize};

/// Minimum trimmed length for a query to trigger a fetch
pub const MIN_QUERY_LEN: usize = 3;

/// Whether the text, once trimmed, is long enough to search for
pub fn qualifies(text: &str) -> bool {
    text.trim().chars().count() >= MIN_QUERY_LEN
}

/// Result ordering requested from the API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Default,
    Rating,
    Members,
}

impl SortKey {
    /// `order_by` value for the API; `None` keeps the API's own ordering
    pub fn order_by(&self) -> Option<&'static str> {
        match self {
            SortKey::Default => None,
            SortKey::Rating => Some("score"),
            SortKey::Members => Some("members"),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Default => write!(f, "default"),
            SortKey::Rating => write!(f, "rating"),
            SortKey::Members => write!(f, "members"),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(SortKey::Default),
            "rating" => Ok(SortKey::Rating),
            "members" => Ok(SortKey::Members),
            _ => Err(anyhow::anyhow!("Invalid sort key: {}", s)),
        }
    }
}

/// One logical search: any field change supersedes the previous query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub page: u32,
    pub sort: SortKey,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, page: u32, sort: SortKey) -> Self {
        Self {
            text: text.into(),
            page: page.max(1),
            sort,
        }
    }

    /// Query parameters for `GET /anime`
    pub fn to_params(&self, page_size: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.text.clone()),
            ("page", self.page.to_string()),
            ("limit", page_size.to_string()),
        ];

        if let Some(order_by) = self.sort.order_by() {
            params.push(("order_by", order_by.to_string()));
            params.push(("sort", "desc".to_string()));
        }

        params
    }
}

/// Pagination derived from the most recent successful response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub total: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            last_page: 1,
            total: 0,
            has_next: false,
            has_prev: false,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub items: Vec<AnimeSummary>,
    pub pagination: Pagination,
}

impl From<PaginatedResponse<AnimeSummary>> for SearchPage {
    fn from(response: PaginatedResponse<AnimeSummary>) -> Self {
        let meta = response.pagination;
        // has_prev is derived locally, the API value is not trusted
        let pagination = Pagination {
            current_page: meta.current_page,
            last_page: meta.last_visible_page,
            total: meta.items.map(|items| items.total).unwrap_or(0),
            has_next: meta.has_next_page,
            has_prev: meta.current_page > 1,
        };

        Self {
            items: response.data,
            pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PaginationItems, PaginationMeta};

    fn response(current_page: u32, has_next_page: bool) -> PaginatedResponse<AnimeSummary> {
        PaginatedResponse {
            data: Vec::new(),
            pagination: PaginationMeta {
                last_visible_page: 9,
                has_next_page,
                current_page,
                items: Some(PaginationItems {
                    count: 20,
                    total: 170,
                    per_page: 20,
                }),
            },
        }
    }

    #[test]
    fn test_qualifies_counts_trimmed_chars() {
        assert!(!qualifies(""));
        assert!(!qualifies("  ab  "));
        assert!(qualifies(" abc "));
        assert!(qualifies("進撃の"));
    }

    #[test]
    fn test_sort_key_params() {
        let default = SearchQuery::new("gundam", 1, SortKey::Default).to_params(20);
        assert_eq!(
            default,
            vec![
                ("q", "gundam".to_string()),
                ("page", "1".to_string()),
                ("limit", "20".to_string()),
            ]
        );

        let rating = SearchQuery::new("gundam", 2, SortKey::Rating).to_params(20);
        assert!(rating.contains(&("order_by", "score".to_string())));
        assert!(rating.contains(&("sort", "desc".to_string())));

        let members = SearchQuery::new("gundam", 2, SortKey::Members).to_params(20);
        assert!(members.contains(&("order_by", "members".to_string())));
    }

    #[test]
    fn test_sort_key_round_trip_names() {
        for key in [SortKey::Default, SortKey::Rating, SortKey::Members] {
            assert_eq!(key.to_string().parse::<SortKey>().unwrap(), key);
        }
        assert!("score".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_page_is_at_least_one() {
        assert_eq!(SearchQuery::new("naruto", 0, SortKey::Default).page, 1);
    }

    #[test]
    fn test_has_prev_is_derived_locally() {
        let first = SearchPage::from(response(1, true));
        assert!(!first.pagination.has_prev);
        assert!(first.pagination.has_next);
        assert_eq!(first.pagination.total, 170);
        assert_eq!(first.pagination.last_page, 9);

        let third = SearchPage::from(response(3, false));
        assert!(third.pagination.has_prev);
        assert!(!third.pagination.has_next);
    }
}
