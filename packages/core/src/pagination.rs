// ABOUTME: Pagination utilities for list endpoints
// ABOUTME: Provides standardized query parameters and page metadata

use serde::{Deserialize, Deserializer, Serialize};

/// Default page size for paginated queries
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size to prevent performance issues
pub const MAX_PAGE_SIZE: i64 = 100;

/// Minimum page number (1-indexed)
pub const MIN_PAGE: i64 = 1;

/// Query parameters for pagination
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    /// Page number (1-indexed, defaults to 1)
    #[serde(default = "default_page", deserialize_with = "lenient_page")]
    pub page: i64,

    /// Number of items per page (defaults to DEFAULT_PAGE_SIZE, max MAX_PAGE_SIZE)
    #[serde(default = "default_limit", deserialize_with = "lenient_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    MIN_PAGE
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Parse an optional integer query value, treating garbage as absent.
pub fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse::<i64>().ok()))
}

fn lenient_page<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_lenient_i64(deserializer)?.unwrap_or_else(default_page))
}

fn lenient_limit<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_lenient_i64(deserializer)?.unwrap_or_else(default_limit))
}

impl PaginationParams {
    /// Create new pagination params with defaults
    pub fn new() -> Self {
        Self {
            page: MIN_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create pagination params with custom values
    pub fn with_page_and_limit(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }

    /// Build from already-parsed query values, defaulting whatever is absent
    pub fn from_options(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(MIN_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// Validate and normalize pagination parameters
    /// Returns (limit, offset) suitable for SQL queries
    pub fn validate(&self) -> (i64, i64) {
        let page = self.page();

        // Clamp limit between 1 and MAX_PAGE_SIZE
        let limit = self.limit.clamp(1, MAX_PAGE_SIZE);

        // Calculate offset (0-indexed for SQL)
        let offset = (page - 1).saturating_mul(limit);

        (limit, offset)
    }

    /// Get SQL LIMIT clause value
    pub fn limit(&self) -> i64 {
        self.validate().0
    }

    /// Get SQL OFFSET clause value
    pub fn offset(&self) -> i64 {
        self.validate().1
    }

    /// Get the current page number
    pub fn page(&self) -> i64 {
        self.page.max(MIN_PAGE)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata about pagination state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationMeta {
    /// Current page number (1-indexed)
    pub page: i64,

    /// Items per page
    pub limit: i64,

    /// Total number of items across all pages
    pub total_count: i64,

    /// Total number of pages
    pub total_pages: i64,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from params and total count
    pub fn new(params: &PaginationParams, total_count: i64) -> Self {
        let page = params.page();
        let limit = params.limit();
        let total_pages = (total_count + limit - 1) / limit;

        Self {
            page,
            limit,
            total_count,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > MIN_PAGE,
        }
    }
}
