//! # Query Filters
//!
//! The `QueryFilter` value object drives every list and count read.
//!
//! ## Normalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  A filter is always paginated                           │
//! │                                                                         │
//! │  page(0)        → page 1                                               │
//! │  limit(0)       → limit 25 (DEFAULT_LIMIT)                             │
//! │  limit(10_000)  → limit 100 (MAX_LIMIT)                                │
//! │  no filter      → QueryFilter::default() (page 1, limit 25)            │
//! │                                                                         │
//! │  Normalization happens on construction, so the SQL compiler never      │
//! │  sees a filter that would produce an unbounded query.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exact-match constraints live in a `BTreeMap`, so two equal filters
//! always iterate their constraints in the same order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};

// =============================================================================
// Sort
// =============================================================================

/// Ordering direction for list reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    /// SQL keyword for this direction.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// A requested ordering: column plus direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

// =============================================================================
// Field Value
// =============================================================================

/// A typed value for an exact-match constraint.
///
/// From JSON every string is `Text`, even one that looks like a date;
/// `Timestamp` is only built in code via `From<DateTime<Utc>>`. Date
/// ranges go through the `created_*` / `updated_*` bounds instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

// =============================================================================
// Query Filter
// =============================================================================

/// Pagination, ordering and constraints for a list or count read.
///
/// ## Example
/// ```rust
/// use storefront_core::filter::QueryFilter;
///
/// let filter = QueryFilter::new().page(3).limit(20).where_eq("brand", "Acme");
/// assert_eq!(filter.offset(), 40);
/// assert_eq!(filter.constraints().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QueryFilterParams", into = "QueryFilterParams")]
pub struct QueryFilter {
    page: u32,
    limit: u32,
    sort: Option<Sort>,
    created_after: Option<DateTime<Utc>>,
    created_before: Option<DateTime<Utc>>,
    updated_after: Option<DateTime<Utc>>,
    updated_before: Option<DateTime<Utc>>,
    include_archived: bool,
    constraints: BTreeMap<String, FieldValue>,
}

impl Default for QueryFilter {
    fn default() -> Self {
        QueryFilter {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort: None,
            created_after: None,
            created_before: None,
            updated_after: None,
            updated_before: None,
            include_archived: false,
            constraints: BTreeMap::new(),
        }
    }
}

impl QueryFilter {
    /// The default filter: page 1, 25 rows, live rows only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the 1-based page. `0` is treated as the first page.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Sets the page size. `0` means the default, anything above
    /// [`MAX_LIMIT`] is clamped.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = match limit {
            0 => DEFAULT_LIMIT,
            n => n.min(MAX_LIMIT),
        };
        self
    }

    /// Orders results by `column`.
    pub fn sort_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort {
            column: column.into(),
            direction,
        });
        self
    }

    /// Only rows created strictly after `at`.
    pub fn created_after(mut self, at: DateTime<Utc>) -> Self {
        self.created_after = Some(at);
        self
    }

    /// Only rows created strictly before `at`.
    pub fn created_before(mut self, at: DateTime<Utc>) -> Self {
        self.created_before = Some(at);
        self
    }

    /// Only rows updated strictly after `at`.
    pub fn updated_after(mut self, at: DateTime<Utc>) -> Self {
        self.updated_after = Some(at);
        self
    }

    /// Only rows updated strictly before `at`.
    pub fn updated_before(mut self, at: DateTime<Utc>) -> Self {
        self.updated_before = Some(at);
        self
    }

    /// Includes soft-deleted rows in the result.
    pub fn include_archived(mut self, include: bool) -> Self {
        self.include_archived = include;
        self
    }

    /// Adds an exact-match constraint. A later call for the same column
    /// replaces the earlier one.
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.constraints.insert(column.into(), value.into());
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn current_page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.limit
    }

    /// Rows skipped before this page: `(page - 1) * limit`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn created_after_bound(&self) -> Option<DateTime<Utc>> {
        self.created_after
    }

    pub fn created_before_bound(&self) -> Option<DateTime<Utc>> {
        self.created_before
    }

    pub fn updated_after_bound(&self) -> Option<DateTime<Utc>> {
        self.updated_after
    }

    pub fn updated_before_bound(&self) -> Option<DateTime<Utc>> {
        self.updated_before
    }

    pub fn includes_archived(&self) -> bool {
        self.include_archived
    }

    /// Exact-match constraints in column-name order.
    pub fn constraints(&self) -> &BTreeMap<String, FieldValue> {
        &self.constraints
    }
}

// =============================================================================
// Wire Form
// =============================================================================

/// The loosely-typed shape a filter arrives in from the API layer.
///
/// Every field is optional; converting into [`QueryFilter`] applies the
/// same normalization as the builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct QueryFilterParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
    #[ts(as = "Option<String>")]
    pub created_after: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub created_before: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub updated_after: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub updated_before: Option<DateTime<Utc>>,
    pub include_archived: Option<bool>,
    #[ts(type = "Record<string, string | number | boolean>")]
    pub equals: BTreeMap<String, FieldValue>,
}

impl From<QueryFilterParams> for QueryFilter {
    fn from(params: QueryFilterParams) -> Self {
        let mut filter = QueryFilter::new()
            .page(params.page.unwrap_or(DEFAULT_PAGE))
            .limit(params.limit.unwrap_or(DEFAULT_LIMIT))
            .include_archived(params.include_archived.unwrap_or(false));

        if let Some(column) = params.sort_by {
            filter = filter.sort_by(column, params.sort_direction.unwrap_or_default());
        }

        filter.created_after = params.created_after;
        filter.created_before = params.created_before;
        filter.updated_after = params.updated_after;
        filter.updated_before = params.updated_before;
        filter.constraints = params.equals;
        filter
    }
}

impl From<QueryFilter> for QueryFilterParams {
    fn from(filter: QueryFilter) -> Self {
        let (sort_by, sort_direction) = match filter.sort {
            Some(sort) => (Some(sort.column), Some(sort.direction)),
            None => (None, None),
        };

        QueryFilterParams {
            page: Some(filter.page),
            limit: Some(filter.limit),
            sort_by,
            sort_direction,
            created_after: filter.created_after,
            created_before: filter.created_before,
            updated_after: filter.updated_after,
            updated_before: filter.updated_before,
            include_archived: Some(filter.include_archived),
            equals: filter.constraints,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
