//! Scoped transactions
//!
//! [`run_in_transaction`] begins, runs the body, and commits. An `Err` from
//! the body rolls back explicitly; a panic or a dropped future leaves the
//! rollback to the transaction guard.

use crate::error::{DatabaseError, DbResult};
use futures::future::BoxFuture;
use sqlx::{Acquire, PgConnection, Postgres};
use tracing::{debug, warn};

/// Run `body` inside a transaction on `executor`
///
/// `executor` is a pool (fresh connection) or a connection. A connection
/// that is already inside a transaction gets a savepoint. The body should
/// own what it captures.
///
/// ```ignore
/// let plan = run_in_transaction(&pool, move |conn| {
///     Box::pin(async move { repo.create_meal_plan(conn, &input).await })
/// })
/// .await?;
/// ```
pub async fn run_in_transaction<'a, A, T, F>(executor: A, body: F) -> DbResult<T>
where
    A: Acquire<'a, Database = Postgres>,
    F: for<'t> FnOnce(&'t mut PgConnection) -> BoxFuture<'t, DbResult<T>> + Send,
    T: Send,
{
    let mut tx = executor
        .begin()
        .await
        .map_err(DatabaseError::context("beginning transaction"))?;

    match body(&mut *tx).await {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(DatabaseError::context("committing transaction"))?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Failed to roll back transaction");
            }
            debug!(error = %e, "Transaction rolled back");
            Err(e)
        }
    }
}
