use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

const MAX_LIMIT: i64 = 100;
/// Keeps `(page - 1) * limit` inside `i64`.
const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Returns `(page, limit, offset)`; `default_limit` applies when no limit was sent.
    pub fn normalize(&self, default_limit: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT);
        let offset = (page - 1) * limit;
        (page, limit, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    #[serde(alias = "createdAt")]
    CreatedAt,
    Price,
    Rating,
    Name,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Category slug.
    pub category: Option<String>,
    /// Brand slug.
    pub brand: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub search: Option<String>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
    /// Defaults to `true`; pass `false` to include sold-out products.
    pub in_stock: Option<bool>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

impl SearchQuery {
    /// The trimmed search term, if any.
    pub fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn limit_or(&self, default_limit: i64) -> u64 {
        self.limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT) as u64
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    pub fn limit_or(&self, default_limit: i64) -> u64 {
        self.limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(Pagination::default().normalize(12), (1, 12, 0));
        assert_eq!(Pagination::new(3, 10).normalize(12), (3, 10, 20));
        assert_eq!(Pagination::new(0, 1000).normalize(12), (1, 100, 0));
        assert_eq!(Pagination::new(-4, 0).normalize(12), (1, 1, 0));
    }

    #[test]
    fn huge_page_number_does_not_overflow_offset() {
        let (page, limit, offset) = Pagination::new(i64::MAX, 100).normalize(12);
        assert_eq!(page, MAX_PAGE);
        assert_eq!(limit, 100);
        assert_eq!(offset, (MAX_PAGE - 1) * 100);
        assert!(offset >= 0);

        let (_, _, offset) = Pagination::new(i64::MAX, 1).normalize(12);
        assert_eq!(offset, MAX_PAGE - 1);
    }

    #[test]
    fn search_term_is_trimmed() {
        let query = SearchQuery {
            q: Some("  phone ".into()),
            limit: None,
        };
        assert_eq!(query.term(), Some("phone"));
        assert_eq!(query.limit_or(10), 10);

        let blank = SearchQuery {
            q: Some("   ".into()),
            limit: Some(500),
        };
        assert_eq!(blank.term(), None);
        assert_eq!(blank.limit_or(10), 100);
    }

    #[test]
    fn sort_by_accepts_camel_case() {
        let sort: ProductSortBy = serde_json::from_str("\"createdAt\"").unwrap();
        assert!(matches!(sort, ProductSortBy::CreatedAt));
        let sort: ProductSortBy = serde_json::from_str("\"rating\"").unwrap();
        assert!(matches!(sort, ProductSortBy::Rating));
    }
}
