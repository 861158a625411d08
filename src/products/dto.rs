use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;

pub const PER_PAGE: i64 = 10;
pub const MAX_PAGE: i64 = 200;

#[derive(Debug, Serialize)]
pub struct ItemResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: Meta,
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub count: usize,
    pub per_page: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub links: PaginationLinks,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaginationLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl Pagination {
    /// `base_url` is the listing URL without a query string.
    pub fn new(total: i64, count: usize, current_page: i64, base_url: &str) -> Self {
        let total_pages = ((total + PER_PAGE - 1) / PER_PAGE).max(1);
        let link = |page: i64| format!("{base_url}?page={page}");
        let links = PaginationLinks {
            previous: (current_page > 1).then(|| link((current_page - 1).min(total_pages))),
            next: (current_page < total_pages).then(|| link(current_page + 1)),
        };
        Self {
            total,
            count,
            per_page: PER_PAGE,
            current_page,
            total_pages,
            links,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
}

impl ListQuery {
    /// Page number in `1..=MAX_PAGE`; absent or blank means the first page.
    pub fn page(&self) -> Result<i64, ValidationErrors> {
        let Some(raw) = self.page.as_deref().map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(1);
        };
        let mut errors = ValidationErrors::new();
        match raw.parse::<i64>() {
            Ok(page) if page < 1 => errors.add("page", "The page must be at least 1."),
            Ok(page) if page > MAX_PAGE => {
                errors.add("page", format!("The page must not be greater than {MAX_PAGE}."))
            }
            Ok(page) => return Ok(page),
            Err(_) => errors.add("page", "The page must be an integer."),
        }
        Err(errors)
    }
}
