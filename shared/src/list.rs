//! List request/response types shared by every paginated endpoint
//!
//! Query string: `page`, `pageSize`, `orderBy` (comma separated, `-` prefix
//! for descending) and `search`. Sort fields are whitelisted per resource
//! through [`SortField`] so the resolved `ORDER BY` clause only ever contains
//! known column names.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: u32 = 30;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_SEARCH_LEN: usize = 128;
pub const DEFAULT_ORDER_BY: &str = "-createdAt";

/// Raw list parameters as received on the query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub order_by: Option<String>,
    pub search: Option<String>,
}

/// Public (camelCase) sort field and the column it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    pub field: &'static str,
    pub column: &'static str,
}

impl SortField {
    pub const fn new(field: &'static str, column: &'static str) -> Self {
        Self { field, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: &'static str,
    pub descending: bool,
}

/// Validated list parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub page: u32,
    pub page_size: u32,
    pub order: Vec<OrderTerm>,
    pub search: Option<String>,
}

impl ListQuery {
    /// Validate paging and resolve `orderBy` against the allowed fields.
    pub fn resolve(&self, fields: &[SortField]) -> AppResult<ListRequest> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::validation("page must be at least 1").with_detail("field", "page"));
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(
                AppError::validation(format!("pageSize must be between 1 and {MAX_PAGE_SIZE}"))
                    .with_detail("field", "pageSize"),
            );
        }

        let raw = self
            .order_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_ORDER_BY);

        let mut order = Vec::new();
        for term in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (name, descending) = match term.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (term.strip_prefix('+').unwrap_or(term), false),
            };
            let field = fields.iter().find(|f| f.field == name).ok_or_else(|| {
                AppError::validation(format!("cannot order by '{name}'"))
                    .with_detail("field", "orderBy")
                    .with_detail("value", name)
            })?;
            if !order.iter().any(|t: &OrderTerm| t.column == field.column) {
                order.push(OrderTerm {
                    column: field.column,
                    descending,
                });
            }
        }

        Ok(ListRequest {
            page,
            page_size,
            order,
            search: self.search.as_deref().and_then(normalize_search),
        })
    }
}

impl ListRequest {
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    /// `ORDER BY` body built from whitelisted columns, with `id` as tiebreaker.
    ///
    /// `prefix` qualifies columns when the query joins tables (e.g. `"p."`).
    pub fn order_clause(&self, prefix: &str) -> String {
        let mut parts: Vec<String> = self
            .order
            .iter()
            .map(|t| {
                format!(
                    "{prefix}{} {}",
                    t.column,
                    if t.descending { "DESC" } else { "ASC" }
                )
            })
            .collect();
        if !self.order.iter().any(|t| t.column == "id") {
            parts.push(format!("{prefix}id ASC"));
        }
        parts.join(", ")
    }

    /// `ILIKE` pattern for the search term, if any
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(|s| format!("%{}%", escape_like(s)))
    }
}

/// Paginated list envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
    pub has_more: bool,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, total_count: i64, request: &ListRequest) -> Self {
        let page_size = i64::from(request.page_size.max(1));
        let total_pages = if total_count <= 0 {
            0
        } else {
            (total_count + page_size - 1) / page_size
        };
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
            total_pages,
            has_more: i64::from(request.page) < total_pages,
        }
    }
}

/// Trim, collapse inner whitespace and cap the length of a search term.
pub fn normalize_search(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(MAX_SEARCH_LEN).collect())
}

/// Escape `LIKE` wildcards so user input matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const FIELDS: &[SortField] = &[
        SortField::new("name", "name"),
        SortField::new("createdAt", "created_at"),
        SortField::new("occurredOn", "occurred_on"),
    ];

    #[test]
    fn test_defaults() {
        let req = ListQuery::default().resolve(FIELDS).unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(
            req.order,
            vec![OrderTerm {
                column: "created_at",
                descending: true
            }]
        );
        assert_eq!(req.offset(), 0);
        assert_eq!(req.order_clause(""), "created_at DESC, id ASC");
        assert!(req.search.is_none());
    }

    #[test]
    fn test_order_by_parsing() {
        let query = ListQuery {
            order_by: Some("name, -occurredOn,name".into()),
            ..Default::default()
        };
        let req = query.resolve(FIELDS).unwrap();
        assert_eq!(req.order_clause("e."), "e.name ASC, e.occurred_on DESC, e.id ASC");
    }

    #[test]
    fn test_unknown_order_field_rejected() {
        let query = ListQuery {
            order_by: Some("password".into()),
            ..Default::default()
        };
        let err = query.resolve(FIELDS).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.unwrap()["field"], "orderBy");
    }

    #[test]
    fn test_page_bounds() {
        let zero_page = ListQuery {
            page: Some(0),
            ..Default::default()
        };
        assert!(zero_page.resolve(FIELDS).is_err());

        let too_big = ListQuery {
            page_size: Some(MAX_PAGE_SIZE + 1),
            ..Default::default()
        };
        assert!(too_big.resolve(FIELDS).is_err());

        let third = ListQuery {
            page: Some(3),
            page_size: Some(20),
            ..Default::default()
        }
        .resolve(FIELDS)
        .unwrap();
        assert_eq!(third.offset(), 40);
        assert_eq!(third.limit(), 20);
    }

    #[test]
    fn test_search_normalization() {
        assert_eq!(normalize_search("   "), None);
        assert_eq!(
            normalize_search("  blue \t  shirt\n"),
            Some("blue shirt".to_string())
        );
        let long = "a".repeat(300);
        assert_eq!(normalize_search(&long).unwrap().len(), MAX_SEARCH_LEN);
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let req = ListQuery {
            search: Some("50%_off".into()),
            ..Default::default()
        }
        .resolve(FIELDS)
        .unwrap();
        assert_eq!(req.search_pattern().unwrap(), "%50\\%\\_off%");
    }

    #[test]
    fn test_list_response_page_math() {
        let req = ListQuery {
            page: Some(2),
            page_size: Some(10),
            ..Default::default()
        }
        .resolve(FIELDS)
        .unwrap();

        let resp = ListResponse::new(vec![1, 2, 3], 23, &req);
        assert_eq!(resp.total_pages, 3);
        assert!(resp.has_more);

        let last = ListResponse::new(Vec::<i32>::new(), 20, &req);
        assert_eq!(last.total_pages, 2);
        assert!(!last.has_more);

        let empty = ListResponse::new(Vec::<i32>::new(), 0, &req);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_more);
    }

    #[test]
    fn test_list_response_serializes_camel_case() {
        let req = ListQuery::default().resolve(FIELDS).unwrap();
        let json = serde_json::to_value(ListResponse::new(vec!["x"], 1, &req)).unwrap();
        for key in ["items", "totalCount", "page", "pageSize", "totalPages", "hasMore"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
