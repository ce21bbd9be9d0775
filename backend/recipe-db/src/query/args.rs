use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

/// A value bound to a positional placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArg {
    Text(String),
    Timestamp(DateTime<Utc>),
    BigInt(i64),
    Bool(bool),
}

impl QueryArg {
    pub fn bind<'q>(
        self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            QueryArg::Text(v) => query.bind(v),
            QueryArg::Timestamp(v) => query.bind(v),
            QueryArg::BigInt(v) => query.bind(v),
            QueryArg::Bool(v) => query.bind(v),
        }
    }
}

impl From<&str> for QueryArg {
    fn from(value: &str) -> Self {
        QueryArg::Text(value.to_string())
    }
}

impl From<String> for QueryArg {
    fn from(value: String) -> Self {
        QueryArg::Text(value)
    }
}

impl From<DateTime<Utc>> for QueryArg {
    fn from(value: DateTime<Utc>) -> Self {
        QueryArg::Timestamp(value)
    }
}

impl From<i64> for QueryArg {
    fn from(value: i64) -> Self {
        QueryArg::BigInt(value)
    }
}

impl From<bool> for QueryArg {
    fn from(value: bool) -> Self {
        QueryArg::Bool(value)
    }
}

/// Bind arguments in order
pub fn bind_all<'q>(
    query: Query<'q, Postgres, PgArguments>,
    args: impl IntoIterator<Item = QueryArg>,
) -> Query<'q, Postgres, PgArguments> {
    args.into_iter().fold(query, |query, arg| arg.bind(query))
}
