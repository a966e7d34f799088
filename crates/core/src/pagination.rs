//! Page-number pagination shared by meme and comment listings.

use museum_common::{AppError, AppResult};
use serde::Serialize;

/// A validated, 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Resolve optional `page`/`limit` parameters against defaults and an
    /// upper bound on the page size.
    pub fn resolve(
        page: Option<u64>,
        limit: Option<u64>,
        default_limit: u64,
        max_limit: u64,
    ) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);

        if page == 0 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if limit == 0 || limit > max_limit {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {max_limit}"
            )));
        }

        Ok(Self { page, limit })
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Pagination metadata for a result set of `total_items` rows.
    #[must_use]
    pub const fn meta(self, total_items: u64) -> Pagination {
        Pagination {
            current_page: self.page,
            total_pages: total_items.div_ceil(self.limit),
            total_items,
            items_per_page: self.limit,
        }
    }
}

/// Pagination block returned next to listed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
}
