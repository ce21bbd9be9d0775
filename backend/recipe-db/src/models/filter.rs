//! Pagination and time-range filtering for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 250;
/// Hard cap on search results
pub const SEARCH_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Caller-supplied list options
///
/// Out-of-range `page` and `limit` values are coerced rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub include_archived: bool,
    /// Column to order by; the primary id is always the final tie-break
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

/// Which timestamp column a predicate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeColumn {
    CreatedAt,
    LastUpdatedAt,
}

impl TimeColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeColumn::CreatedAt => "created_at",
            TimeColumn::LastUpdatedAt => "last_updated_at",
        }
    }
}

/// A single inclusive-exclusive time bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePredicate {
    pub column: TimeColumn,
    /// `>=` when true, `<` otherwise
    pub lower_bound: bool,
    pub value: DateTime<Utc>,
}

impl QueryFilter {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn page(&self) -> u32 {
        match self.page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => DEFAULT_PAGE,
        }
    }

    pub fn limit(&self) -> u32 {
        match self.limit {
            Some(l) if l >= 1 => u32::try_from(l).map_or(MAX_LIMIT, |l| l.min(MAX_LIMIT)),
            _ => DEFAULT_LIMIT,
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page()) - 1) * i64::from(self.limit())
    }

    pub fn time_predicates(&self) -> Vec<TimePredicate> {
        [
            (TimeColumn::CreatedAt, true, self.created_after),
            (TimeColumn::CreatedAt, false, self.created_before),
            (TimeColumn::LastUpdatedAt, true, self.updated_after),
            (TimeColumn::LastUpdatedAt, false, self.updated_before),
        ]
        .into_iter()
        .filter_map(|(column, lower_bound, value)| {
            value.map(|value| TimePredicate {
                column,
                lower_bound,
                value,
            })
        })
        .collect()
    }

    pub fn has_time_predicates(&self) -> bool {
        self.created_after.is_some()
            || self.created_before.is_some()
            || self.updated_after.is_some()
            || self.updated_before.is_some()
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page={} limit={} include_archived={}",
            self.page(),
            self.limit(),
            self.include_archived
        )?;
        for (name, value) in [
            ("created_after", self.created_after),
            ("created_before", self.created_before),
            ("updated_after", self.updated_after),
            ("updated_before", self.updated_before),
        ] {
            if let Some(value) = value {
                write!(f, " {}={}", name, value.to_rfc3339())?;
            }
        }
        if let Some(sort_by) = &self.sort_by {
            write!(f, " sort_by={} {}", sort_by, self.sort_direction.as_sql())?;
        }
        Ok(())
    }
}

/// One page of results plus the counts that frame it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilteredResult<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    /// Rows matching the filter, ignoring pagination
    pub filtered_count: u64,
    /// Rows in scope, ignoring the filter's time bounds
    pub total_count: u64,
}

impl<T> QueryFilteredResult<T> {
    pub fn new(data: Vec<T>, filter: &QueryFilter, filtered_count: u64, total_count: u64) -> Self {
        Self {
            data,
            page: filter.page(),
            limit: filter.limit(),
            filtered_count,
            total_count,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryFilteredResult<U> {
        QueryFilteredResult {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            filtered_count: self.filtered_count,
            total_count: self.total_count,
        }
    }
}
