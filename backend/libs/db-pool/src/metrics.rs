//! Pool gauges, checkout latency and readiness counters
//!
//! Every series carries a `service` label so several pools in one process
//! stay distinguishable.

use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};
use sqlx::{pool::PoolConnection, PgPool, Postgres};
use std::time::Instant;

/// Checkout latency buckets, in seconds; anything past 5s is a saturated pool
const CHECKOUT_BUCKETS: &[f64] = &[0.0005, 0.002, 0.01, 0.05, 0.25, 1.0, 5.0];

lazy_static::lazy_static! {
    static ref POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "db_pool_connections",
        "Connections held by the pool, split into idle, in_use and limit",
        &["service", "state"]
    ).expect("pool gauge registers once per process");

    static ref POOL_CHECKOUT_SECONDS: HistogramVec = register_histogram_vec!(
        "db_pool_checkout_seconds",
        "Wait before a pooled connection was handed to a repository",
        &["service"],
        CHECKOUT_BUCKETS.to_vec()
    ).expect("checkout histogram registers once per process");

    static ref POOL_CHECKOUT_FAILURES: IntCounterVec = register_int_counter_vec!(
        "db_pool_checkout_failures_total",
        "Checkouts that returned an error instead of a connection",
        &["service", "reason"]
    ).expect("checkout counter registers once per process");

    static ref READINESS_PINGS: IntCounterVec = register_int_counter_vec!(
        "db_readiness_pings_total",
        "SELECT 1 probes issued while waiting for the server",
        &["outcome"]
    ).expect("readiness counter registers once per process");
}

/// Snapshot the pool's connection counts into the gauges
pub(crate) fn update_pool_metrics(pool: &PgPool, service: &str) {
    let open = pool.size() as i64;
    let idle = pool.num_idle() as i64;
    let limit = pool.options().get_max_connections() as i64;

    for (state, value) in [("idle", idle), ("in_use", open - idle), ("limit", limit)] {
        POOL_CONNECTIONS
            .with_label_values(&[service, state])
            .set(value);
    }
}

pub(crate) fn record_readiness_attempt(success: bool) {
    let outcome = if success { "ok" } else { "failed" };
    READINESS_PINGS.with_label_values(&[outcome]).inc();
}

fn failure_reason(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::PoolTimedOut => "timeout",
        sqlx::Error::PoolClosed => "closed",
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => "network",
        _ => "other",
    }
}

/// Check a connection out of `pool`, timing the wait
pub async fn acquire_with_metrics(
    pool: &PgPool,
    service: &str,
) -> Result<PoolConnection<Postgres>, sqlx::Error> {
    let started = Instant::now();
    let checkout = pool.acquire().await;

    POOL_CHECKOUT_SECONDS
        .with_label_values(&[service])
        .observe(started.elapsed().as_secs_f64());

    if let Err(e) = &checkout {
        POOL_CHECKOUT_FAILURES
            .with_label_values(&[service, failure_reason(e)])
            .inc();
    }

    checkout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_counter_tracks_outcomes() {
        let before = READINESS_PINGS.with_label_values(&["failed"]).get();
        record_readiness_attempt(false);
        assert_eq!(READINESS_PINGS.with_label_values(&["failed"]).get(), before + 1);
    }

    #[test]
    fn pool_errors_map_to_reasons() {
        assert_eq!(failure_reason(&sqlx::Error::PoolTimedOut), "timeout");
        assert_eq!(failure_reason(&sqlx::Error::PoolClosed), "closed");
        assert_eq!(failure_reason(&sqlx::Error::RowNotFound), "other");
    }
}
