use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Standard success envelope for every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Error envelope; `errors` lists individual validation failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|l| *l > 0)
            .map(|l| l.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(params: PageParams, total: i64) -> Self {
        let page = params.page();
        let limit = params.limit();
        Self {
            current: page,
            pages: total.max(0).saturating_add(limit - 1) / limit,
            total,
            has_next: page.saturating_mul(limit) < total,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 0);

        let params = PageParams {
            page: Some(0),
            limit: Some(-5),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_extreme_page_values_do_not_overflow() {
        let params = PageParams {
            page: Some(i64::MAX),
            limit: Some(i64::MAX),
        };
        assert_eq!(params.limit(), MAX_PAGE_SIZE);
        assert_eq!(params.offset(), i64::MAX);

        let p = Pagination::new(params, 3);
        assert_eq!(p.pages, 1);
        assert!(!p.has_next);
        assert!(p.has_prev);

        let p = Pagination::new(
            PageParams {
                page: Some(1),
                limit: Some(i64::MAX),
            },
            i64::MAX,
        );
        assert_eq!(p.pages, i64::MAX / MAX_PAGE_SIZE);
        assert!(p.has_next);
    }

    #[test]
    fn test_pagination_math() {
        let params = PageParams {
            page: Some(2),
            limit: Some(10),
        };
        let p = Pagination::new(params, 25);
        assert_eq!(p.pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let last = Pagination::new(
            PageParams {
                page: Some(3),
                limit: Some(10),
            },
            25,
        );
        assert!(!last.has_next);

        let empty = Pagination::new(PageParams::default(), 0);
        assert_eq!(empty.pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }
}
