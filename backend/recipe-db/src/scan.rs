//! Positional row scanning
//!
//! Rows are decoded column by column in SELECT order. List queries carry
//! two trailing count columns which are read from the first row only.

use crate::error::{DatabaseError, DbResult};
use crate::models::{QueryFilter, QueryFilteredResult};
use futures::TryStreamExt;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Decode, Executor, Postgres, Row, Type};
use std::str::FromStr;

/// Walks a row's columns left to right
pub struct RowCursor<'r> {
    row: &'r PgRow,
    index: usize,
}

impl<'r> RowCursor<'r> {
    pub fn new(row: &'r PgRow) -> Self {
        Self { row, index: 0 }
    }

    pub fn next<T>(&mut self) -> Result<T, sqlx::Error>
    where
        T: Decode<'r, Postgres> + Type<Postgres>,
    {
        let value = self.row.try_get(self.index)?;
        self.index += 1;
        Ok(value)
    }

    /// Decode a text column into a `FromStr` type
    pub fn next_parsed<T>(&mut self) -> Result<T, sqlx::Error>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw: String = self.next()?;
        raw.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    pub fn position(&self) -> usize {
        self.index
    }
}

/// Types that can be read off the front of a row
pub trait ScanRow: Sized {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error>;
}

pub fn scan_row<T: ScanRow>(row: &PgRow) -> Result<T, sqlx::Error> {
    T::scan(&mut RowCursor::new(row))
}

/// Scan an aggregate followed by `filtered_count, total_count`
pub fn scan_row_with_counts<T: ScanRow>(row: &PgRow) -> Result<(T, i64, i64), sqlx::Error> {
    let mut cursor = RowCursor::new(row);
    let value = T::scan(&mut cursor)?;
    let filtered_count: i64 = cursor.next()?;
    let total_count: i64 = cursor.next()?;
    Ok((value, filtered_count, total_count))
}

/// Fetch exactly one row; no rows is [`DatabaseError::NotFound`]
pub async fn fetch_one_scanned<'q, 'e, 'c: 'e, T, E>(
    executor: E,
    query: Query<'q, Postgres, PgArguments>,
    context: &'static str,
) -> DbResult<T>
where
    T: ScanRow,
    E: 'e + Executor<'c, Database = Postgres>,
    'q: 'e,
{
    let row = query
        .fetch_one(executor)
        .await
        .map_err(DatabaseError::context(context))?;
    scan_row(&row).map_err(DatabaseError::context(context))
}

/// Stream every row into a `Vec`
pub async fn fetch_all_scanned<'q, 'e, 'c: 'e, T, E>(
    executor: E,
    query: Query<'q, Postgres, PgArguments>,
    context: &'static str,
) -> DbResult<Vec<T>>
where
    T: ScanRow,
    E: 'e + Executor<'c, Database = Postgres>,
    'q: 'e,
{
    let mut rows = query.fetch(executor);
    let mut out = Vec::new();

    while let Some(row) = rows
        .try_next()
        .await
        .map_err(DatabaseError::context(context))?
    {
        out.push(scan_row(&row).map_err(DatabaseError::context(context))?);
    }

    Ok(out)
}

/// Stream a list query's page, taking counts from the first row
///
/// An empty page reports zero for both counts.
pub async fn fetch_page_scanned<'q, 'e, 'c: 'e, T, E>(
    executor: E,
    query: Query<'q, Postgres, PgArguments>,
    filter: &QueryFilter,
    context: &'static str,
) -> DbResult<QueryFilteredResult<T>>
where
    T: ScanRow,
    E: 'e + Executor<'c, Database = Postgres>,
    'q: 'e,
{
    let mut rows = query.fetch(executor);
    let mut data = Vec::new();
    let mut counts: Option<(i64, i64)> = None;

    while let Some(row) = rows
        .try_next()
        .await
        .map_err(DatabaseError::context(context))?
    {
        let (value, filtered_count, total_count) =
            scan_row_with_counts::<T>(&row).map_err(DatabaseError::context(context))?;
        counts.get_or_insert((filtered_count, total_count));
        data.push(value);
    }

    let (filtered_count, total_count) = counts.unwrap_or((0, 0));
    Ok(QueryFilteredResult::new(
        data,
        filter,
        u64::try_from(filtered_count).unwrap_or(0),
        u64::try_from(total_count).unwrap_or(0),
    ))
}
