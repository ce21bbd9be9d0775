//! List-query construction
//!
//! Every paginated list is a single round-trip: the page of rows plus two
//! sub-counts riding on each row.
//!
//! * `filtered_count` counts rows in scope that satisfy the filter's time
//!   bounds, ignoring `LIMIT`/`OFFSET`.
//! * `total_count` counts rows in scope without the time bounds.
//!
//! Scope is the joins, the archive predicate (unless archived rows are
//! requested) and the optional ownership predicate. Arguments are ordered
//! filtered-count, total-count, main query, then limit and offset.

mod args;
mod placeholders;

pub use args::{bind_all, QueryArg};
pub use placeholders::rewrite_placeholders;

use crate::models::filter::{QueryFilter, SortDirection, SEARCH_LIMIT};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("ownership column and owner id must be provided together")]
    IncompleteOwnership,

    #[error("parent column {0} has no id")]
    MissingParentId(String),

    #[error("no columns selected")]
    NoColumns,

    #[error("unterminated quote in query text")]
    UnterminatedQuote,

    #[error("{placeholders} placeholders for {args} arguments")]
    PlaceholderMismatch { placeholders: usize, args: usize },
}

/// SQL text with `$N` placeholders and its ordered arguments
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<QueryArg>,
}

impl BuiltQuery {
    pub fn query(&self) -> Query<'_, Postgres, PgArguments> {
        bind_all(sqlx::query(&self.sql), self.args.iter().cloned())
    }
}

/// `LEFT JOIN <table> ON <table>.<column> = <references>`
///
/// With `live_only` the join also requires `<table>.archived_at IS NULL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Join<'a> {
    pub table: &'a str,
    pub column: &'a str,
    pub references: &'a str,
    pub live_only: bool,
}

impl Join<'_> {
    fn clause(&self) -> String {
        let mut clause = format!(
            " LEFT JOIN {t} ON {t}.{c} = {r}",
            t = self.table,
            c = self.column,
            r = self.references
        );
        if self.live_only {
            clause.push_str(&format!(" AND {}.archived_at IS NULL", self.table));
        }
        clause
    }
}

#[derive(Debug, Clone)]
pub struct ListQuery<'a> {
    table: &'a str,
    columns: &'a [&'a str],
    joins: Vec<Join<'a>>,
    group_bys: Vec<&'a str>,
    ownership_column: &'a str,
    owner_id: &'a str,
    parents: Vec<(&'a str, &'a str)>,
    filter: &'a QueryFilter,
    include_archived: bool,
}

impl<'a> ListQuery<'a> {
    pub fn new(table: &'a str, columns: &'a [&'a str], filter: &'a QueryFilter) -> Self {
        Self {
            table,
            columns,
            joins: Vec::new(),
            group_bys: Vec::new(),
            ownership_column: "",
            owner_id: "",
            parents: Vec::new(),
            filter,
            include_archived: filter.include_archived,
        }
    }

    pub fn join(mut self, join: Join<'a>) -> Self {
        self.joins.push(join);
        self
    }

    pub fn group_by(mut self, column: &'a str) -> Self {
        self.group_bys.push(column);
        self
    }

    /// Restrict to rows whose `column` equals `owner_id`
    ///
    /// A bare column belongs to the listed table; `table.column` may name a
    /// joined table. Leaving both empty produces a site-wide list.
    pub fn owned_by(mut self, column: &'a str, owner_id: &'a str) -> Self {
        self.ownership_column = column;
        self.owner_id = owner_id;
        self
    }

    /// Also require `column = parent_id`, usually on a joined parent table
    pub fn within(mut self, column: &'a str, parent_id: &'a str) -> Self {
        self.parents.push((column, parent_id));
        self
    }

    pub fn include_archived(mut self, include_archived: bool) -> Self {
        self.include_archived = include_archived;
        self
    }

    pub fn build(&self) -> Result<BuiltQuery, QueryBuildError> {
        self.try_build().map_err(|e| {
            error!(query_error = true, table = self.table, error = %e, "building list query");
            e
        })
    }

    fn try_build(&self) -> Result<BuiltQuery, QueryBuildError> {
        self.validate()?;

        let table = self.table;
        let mut args = Vec::new();

        let (filtered_predicates, filtered_args) = self.predicates(true);
        let (total_predicates, total_args) = self.predicates(false);
        let (main_predicates, main_args) = self.predicates(true);
        args.extend(filtered_args);
        args.extend(total_args);
        args.extend(main_args);

        let joins: String = self.joins.iter().map(Join::clause).collect();
        // A join can repeat a row, so the counts only see each id once
        let counted = if self.joins.is_empty() {
            format!("COUNT({table}.id)")
        } else {
            format!("COUNT(DISTINCT {table}.id)")
        };

        let mut sql = format!(
            "SELECT {}, (SELECT {counted} FROM {table}{joins}{}) AS filtered_count, (SELECT {counted} FROM {table}{joins}{}) AS total_count FROM {table}{joins}",
            self.columns.join(", "),
            where_clause(&filtered_predicates),
            where_clause(&total_predicates),
        );

        sql.push_str(&where_clause(&main_predicates));

        sql.push_str(&format!(" GROUP BY {table}.id"));
        for group_by in &self.group_bys {
            sql.push_str(", ");
            sql.push_str(group_by);
        }

        sql.push_str(&format!(" ORDER BY {}", self.order_by()));

        sql.push_str(" LIMIT ? OFFSET ?");
        args.push(QueryArg::BigInt(i64::from(self.filter.limit())));
        args.push(QueryArg::BigInt(self.filter.offset()));

        let sql = rewrite_placeholders(&sql, args.len())?;
        Ok(BuiltQuery { sql, args })
    }

    fn validate(&self) -> Result<(), QueryBuildError> {
        ensure_identifier(self.table)?;

        if self.columns.is_empty() {
            return Err(QueryBuildError::NoColumns);
        }
        for column in self.columns {
            ensure_qualified_identifier(column)?;
        }

        for join in &self.joins {
            ensure_identifier(join.table)?;
            ensure_identifier(join.column)?;
            ensure_qualified_identifier(join.references)?;
        }

        for group_by in &self.group_bys {
            ensure_qualified_identifier(group_by)?;
        }

        match (self.ownership_column.is_empty(), self.owner_id.is_empty()) {
            (true, true) => {}
            (false, false) => ensure_qualified_identifier(self.ownership_column)?,
            _ => return Err(QueryBuildError::IncompleteOwnership),
        }

        for (column, parent_id) in &self.parents {
            ensure_qualified_identifier(column)?;
            if parent_id.is_empty() {
                return Err(QueryBuildError::MissingParentId(column.to_string()));
            }
        }

        if let Some(sort_by) = &self.filter.sort_by {
            ensure_identifier(sort_by)?;
        }

        Ok(())
    }

    fn predicates(&self, with_time_bounds: bool) -> (Vec<String>, Vec<QueryArg>) {
        let table = self.table;
        let mut predicates = Vec::new();
        let mut args = Vec::new();

        if !self.include_archived {
            predicates.push(format!("{table}.archived_at IS NULL"));
        }

        if !self.ownership_column.is_empty() {
            if self.ownership_column.contains('.') {
                predicates.push(format!("{} = ?", self.ownership_column));
            } else {
                predicates.push(format!("{table}.{} = ?", self.ownership_column));
            }
            args.push(QueryArg::Text(self.owner_id.to_string()));
        }

        for (column, parent_id) in &self.parents {
            if column.contains('.') {
                predicates.push(format!("{column} = ?"));
            } else {
                predicates.push(format!("{table}.{column} = ?"));
            }
            args.push(QueryArg::Text(parent_id.to_string()));
        }

        if with_time_bounds {
            for predicate in self.filter.time_predicates() {
                let op = if predicate.lower_bound { ">=" } else { "<" };
                predicates.push(format!("{table}.{} {op} ?", predicate.column.as_str()));
                args.push(QueryArg::Timestamp(predicate.value));
            }
        }

        (predicates, args)
    }

    fn order_by(&self) -> String {
        let table = self.table;
        let direction = self.filter.sort_direction.as_sql();
        match self.filter.sort_by.as_deref() {
            Some(column) if column != "id" => {
                format!("{table}.{column} {direction}, {table}.id {direction}")
            }
            _ => format!("{table}.id {direction}"),
        }
    }
}

fn where_clause(predicates: &[String]) -> String {
    if predicates.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", predicates.join(" AND "))
    }
}

/// A bare SQL identifier: ASCII letters, digits and underscores
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn ensure_identifier(s: &str) -> Result<(), QueryBuildError> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(QueryBuildError::InvalidIdentifier(s.to_string()))
    }
}

/// `column` or `table.column`
fn ensure_qualified_identifier(s: &str) -> Result<(), QueryBuildError> {
    let valid = match s.split_once('.') {
        Some((table, column)) => is_identifier(table) && is_identifier(column),
        None => is_identifier(s),
    };
    if valid {
        Ok(())
    } else {
        Err(QueryBuildError::InvalidIdentifier(s.to_string()))
    }
}

/// Case-insensitive substring search over one text column
///
/// Returns at most [`SEARCH_LIMIT`] non-archived rows ordered by the search
/// column. LIKE wildcards in `term` match literally.
pub fn search_query(
    table: &str,
    columns: &[&str],
    search_column: &str,
    term: &str,
    ownership: Option<(&str, &str)>,
) -> Result<BuiltQuery, QueryBuildError> {
    let build = || -> Result<BuiltQuery, QueryBuildError> {
        ensure_identifier(table)?;
        ensure_identifier(search_column)?;
        if columns.is_empty() {
            return Err(QueryBuildError::NoColumns);
        }
        for column in columns {
            ensure_qualified_identifier(column)?;
        }

        let mut args = vec![QueryArg::Text(like_pattern(term))];
        let mut sql = format!(
            "SELECT {} FROM {table} WHERE {table}.archived_at IS NULL AND {table}.{search_column} ILIKE ?",
            columns.join(", ")
        );

        if let Some((column, owner_id)) = ownership {
            ensure_identifier(column)?;
            if owner_id.is_empty() {
                return Err(QueryBuildError::IncompleteOwnership);
            }
            sql.push_str(&format!(" AND {table}.{column} = ?"));
            args.push(QueryArg::Text(owner_id.to_string()));
        }

        sql.push_str(&format!(
            " ORDER BY {table}.{search_column} {}, {table}.id {} LIMIT ?",
            SortDirection::Asc.as_sql(),
            SortDirection::Asc.as_sql()
        ));
        args.push(QueryArg::BigInt(SEARCH_LIMIT));

        let sql = rewrite_placeholders(&sql, args.len())?;
        Ok(BuiltQuery { sql, args })
    };

    build().map_err(|e| {
        error!(query_error = true, table, error = %e, "building search query");
        e
    })
}

/// Wrap `term` in `%` and escape LIKE metacharacters
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
