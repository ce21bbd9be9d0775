//! Error types for the recipe data-access layer

use crate::query::QueryBuildError;
use db_pool::PoolError;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Result type alias for repository operations
pub type DbResult<T> = Result<T, DatabaseError>;

/// PostgreSQL unique violation
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL query_canceled (statement timeout or explicit cancel)
const QUERY_CANCELED: &str = "57014";

/// Broad classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Transient,
    Cancelled,
    Internal,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("invalid id provided for {0}")]
    InvalidId(&'static str),

    #[error("empty input provided")]
    EmptyInput,

    /// Input failed validation; the counterpart of a missing input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found")]
    NotFound,

    #[error("conflict while {context}")]
    Conflict {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("operation cancelled while {context}")]
    Cancelled { context: &'static str },

    #[error("database not ready after {attempts} attempts")]
    NotReady { attempts: u32 },

    #[error("query construction failed: {0}")]
    QueryConstruction(#[from] QueryBuildError),

    #[error("database error while {context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration failed: {0}")]
    Migration(#[from] MigrateError),

    #[error("pool error: {0}")]
    Pool(PoolError),
}

impl DatabaseError {
    /// Translate a driver error, keeping the operation context
    pub fn from_sqlx(context: &'static str, err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return DatabaseError::NotFound;
        }

        let code = err
            .as_database_error()
            .and_then(|db_err| db_err.code().map(|c| c.into_owned()));

        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => DatabaseError::Conflict {
                context,
                source: err,
            },
            Some(QUERY_CANCELED) => DatabaseError::Cancelled { context },
            _ => DatabaseError::Query {
                context,
                source: err,
            },
        }
    }

    /// Closure form for `map_err`
    pub fn context(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |err| Self::from_sqlx(context, err)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::InvalidId(_)
            | DatabaseError::EmptyInput
            | DatabaseError::InvalidInput(_) => ErrorKind::Validation,
            DatabaseError::NotFound => ErrorKind::NotFound,
            DatabaseError::Conflict { .. } => ErrorKind::Conflict,
            DatabaseError::Cancelled { .. } => ErrorKind::Cancelled,
            DatabaseError::NotReady { .. } => ErrorKind::Transient,
            DatabaseError::Query { source, .. } if is_transient_sqlx(source) => {
                ErrorKind::Transient
            }
            DatabaseError::Pool(PoolError::NotReady { .. }) => ErrorKind::Transient,
            DatabaseError::QueryConstruction(_)
            | DatabaseError::Query { .. }
            | DatabaseError::Migration(_)
            | DatabaseError::Pool(_) => ErrorKind::Internal,
        }
    }

    /// Check if error is transient (caller may retry)
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DatabaseError::Conflict { .. })
    }
}

impl From<PoolError> for DatabaseError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::NotReady { attempts, .. } => DatabaseError::NotReady { attempts },
            other => DatabaseError::Pool(other),
        }
    }
}

fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = DatabaseError::from_sqlx("fetching meal plan", sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn pool_timeouts_are_transient() {
        let err = DatabaseError::from_sqlx("fetching user", sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[test]
    fn other_driver_errors_are_internal() {
        let err = DatabaseError::from_sqlx(
            "decoding user",
            sqlx::Error::ColumnNotFound("username".to_string()),
        );
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("decoding user"));
    }

    #[test]
    fn validation_errors_classify() {
        assert_eq!(
            DatabaseError::InvalidId("meal plan").kind(),
            ErrorKind::Validation
        );
        assert_eq!(DatabaseError::EmptyInput.kind(), ErrorKind::Validation);
        assert_eq!(
            DatabaseError::InvalidInput("name".into()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn pool_not_ready_becomes_not_ready() {
        let err: DatabaseError = PoolError::NotReady {
            attempts: 3,
            last_error: None,
        }
        .into();
        assert!(matches!(err, DatabaseError::NotReady { attempts: 3 }));
        assert!(err.is_transient());
    }
}
