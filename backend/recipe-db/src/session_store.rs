//! Postgres-backed session storage for the host's session manager

use crate::clock::Clock;
use crate::error::{DatabaseError, DbResult};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Stores opaque session blobs keyed by token in the `sessions` table
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// The session data for `token`, unless it is missing or expired
    #[instrument(skip_all)]
    pub async fn find(&self, token: &str) -> DbResult<Option<Vec<u8>>> {
        if token.is_empty() {
            return Err(DatabaseError::EmptyInput);
        }

        let row = sqlx::query("SELECT data FROM sessions WHERE token = $1 AND expiry > $2")
            .bind(token)
            .bind(self.clock.now())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::context("finding session"))?;

        row.map(|r| r.try_get::<Vec<u8>, _>("data"))
            .transpose()
            .map_err(DatabaseError::context("finding session"))
    }

    /// Insert or replace the session
    #[instrument(skip_all, fields(expiry = %expiry))]
    pub async fn commit(&self, token: &str, data: &[u8], expiry: DateTime<Utc>) -> DbResult<()> {
        if token.is_empty() {
            return Err(DatabaseError::EmptyInput);
        }

        sqlx::query(
            r#"
            INSERT INTO sessions (token, data, expiry) VALUES ($1, $2, $3)
            ON CONFLICT (token) DO UPDATE SET data = EXCLUDED.data, expiry = EXCLUDED.expiry
            "#,
        )
        .bind(token)
        .bind(data)
        .bind(expiry)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::context("committing session"))?;

        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn delete(&self, token: &str) -> DbResult<()> {
        if token.is_empty() {
            return Err(DatabaseError::EmptyInput);
        }

        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::context("deleting session"))?;

        Ok(())
    }

    /// Remove every expired session, returning how many went
    pub async fn delete_expired(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expiry < $1")
            .bind(self.clock.now())
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::context("deleting expired sessions"))?;

        Ok(result.rows_affected())
    }

    /// Periodically purge expired sessions until the handle is aborted
    pub fn spawn_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();

        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Session cleanup starting");

            loop {
                tokio::time::sleep(interval).await;

                match store.delete_expired().await {
                    Ok(0) => debug!("No expired sessions"),
                    Ok(removed) => info!(removed, "Expired sessions removed"),
                    Err(e) => error!(error = %e, "Session cleanup failed"),
                }
            }
        })
    }
}
