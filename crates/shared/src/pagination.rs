//! Offset pagination helpers for admin listing endpoints.

use serde::Deserialize;

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page/limit query parameters, as sent by the admin dashboard.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl PageParams {
    /// Resolves the effective limit, clamped to `[1, MAX_PAGE_SIZE]`.
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Resolves the 1-based page number (minimum 1).
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Computes the SQL offset for the resolved page and limit.
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = PageParams {
            page: None,
            limit: None,
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_offset_math() {
        let p = PageParams {
            page: Some(3),
            limit: Some(25),
        };
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn test_clamping() {
        let p = PageParams {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), MAX_PAGE_SIZE);

        let p = PageParams {
            page: Some(-5),
            limit: Some(0),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 1);
    }
}
