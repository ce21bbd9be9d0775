//! Sweeps meal plans whose voting deadline has passed
//!
//! Each cycle lists live plans still awaiting votes past their deadline and
//! finalises them on the votes that were cast. A failing plan is logged and
//! the sweep moves on.

use crate::error::DbResult;
use crate::finalizer::MealPlanFinalizer;
use crate::repository::MealPlanRepository;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub finalized: usize,
    pub failed: usize,
}

/// Run sweeps forever, sleeping `interval` before each one
pub async fn run(
    finalizer: MealPlanFinalizer,
    meal_plans: Arc<dyn MealPlanRepository>,
    interval: Duration,
) {
    info!(
        interval_secs = interval.as_secs(),
        "Starting expired meal plan finalizer"
    );

    loop {
        sleep(interval).await;

        let cycle_start = Instant::now();
        match sweep_once(&finalizer, meal_plans.as_ref()).await {
            Ok(report) => {
                if report.examined > 0 {
                    info!(
                        examined = report.examined,
                        finalized = report.finalized,
                        failed = report.failed,
                        duration_ms = cycle_start.elapsed().as_millis() as u64,
                        "Expired meal plan sweep completed"
                    );
                } else {
                    debug!("No expired meal plans");
                }
            }
            Err(e) => {
                error!(
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "Expired meal plan sweep failed"
                );
            }
        }
    }
}

/// One pass over every expired plan
///
/// Only the listing query can fail the sweep; per-plan errors are counted.
pub async fn sweep_once(
    finalizer: &MealPlanFinalizer,
    meal_plans: &dyn MealPlanRepository,
) -> DbResult<SweepReport> {
    let plans = meal_plans
        .get_unfinalized_meal_plans_with_expired_voting_periods()
        .await?;

    let mut report = SweepReport {
        examined: plans.len(),
        ..SweepReport::default()
    };

    for plan in plans {
        match finalizer
            .finalize_expired(&plan.id, &plan.belongs_to_household)
            .await
        {
            Ok(true) => report.finalized += 1,
            Ok(false) => {
                debug!(meal_plan.id = %plan.id, "Expired meal plan left unfinalized")
            }
            Err(e) => {
                report.failed += 1;
                warn!(meal_plan.id = %plan.id, error = %e, "Failed to finalize expired meal plan");
            }
        }
    }

    Ok(report)
}
