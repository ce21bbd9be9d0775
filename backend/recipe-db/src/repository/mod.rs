//! Per-entity repositories
//!
//! Each entity has a small capability trait and a `Pg*` implementation.
//! Reads run on the shared pool. Writes take a `&mut PgConnection`, which
//! is either a pooled connection or a live transaction, so multi-statement
//! operations compose under [`crate::tx::run_in_transaction`].

mod households;
mod meal_plan_events;
mod meal_plan_option_votes;
mod meal_plan_options;
mod meal_plans;
mod meals;
mod recipe_steps;
mod recipes;
mod users;
mod valid_ingredients;

pub use households::{HouseholdRepository, PgHouseholdRepository};
pub use meal_plan_events::{MealPlanEventRepository, PgMealPlanEventRepository};
pub use meal_plan_option_votes::{MealPlanOptionVoteRepository, PgMealPlanOptionVoteRepository};
pub use meal_plan_options::{MealPlanOptionRepository, PgMealPlanOptionRepository};
pub use meal_plans::{MealPlanRepository, PgMealPlanRepository};
pub use meals::{MealRepository, PgMealRepository};
pub use recipe_steps::{PgRecipeStepRepository, RecipeStepRepository};
pub use recipes::{PgRecipeRepository, RecipeRepository};
pub use users::{PgUserRepository, UserRepository};
pub use valid_ingredients::{PgValidIngredientRepository, ValidIngredientRepository};

use crate::clock::Clock;
use crate::error::{DatabaseError, DbResult};
use crate::models::{QueryFilter, QueryFilteredResult};
use crate::query::ListQuery;
use crate::scan::{fetch_page_scanned, ScanRow};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgConnection, PgPool, Postgres};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

/// State shared by every repository: the pool and the clock
#[derive(Clone)]
pub struct DbContext {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl DbContext {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Run a built list query and scan its page
    pub(crate) async fn fetch_list<T: ScanRow>(
        &self,
        list: ListQuery<'_>,
        filter: &QueryFilter,
        context: &'static str,
    ) -> DbResult<QueryFilteredResult<T>> {
        let built = list.build()?;
        debug!(sql = %built.sql, args = built.args.len(), "Running list query");
        fetch_page_scanned(&self.pool, built.query(), filter, context).await
    }

    pub(crate) async fn exists(
        &self,
        query: Query<'_, Postgres, PgArguments>,
        context: &'static str,
    ) -> DbResult<bool> {
        use sqlx::Row;

        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::context(context))?;
        row.try_get::<bool, _>(0)
            .map_err(DatabaseError::context(context))
    }
}

/// Reject empty or blank ids before touching the database
pub(crate) fn require_id(kind: &'static str, id: &str) -> DbResult<()> {
    if id.trim().is_empty() {
        Err(DatabaseError::InvalidId(kind))
    } else {
        Ok(())
    }
}

pub(crate) fn validate_input<T: Validate>(input: &T) -> DbResult<()> {
    input
        .validate()
        .map_err(|e| DatabaseError::InvalidInput(e.to_string()))
}

/// Execute a write statement, returning rows affected
pub(crate) async fn perform_write(
    conn: &mut PgConnection,
    query: Query<'_, Postgres, PgArguments>,
    context: &'static str,
) -> DbResult<u64> {
    let result = query
        .execute(conn)
        .await
        .map_err(DatabaseError::context(context))?;
    debug!(rows_affected = result.rows_affected(), context, "Write executed");
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected() {
        assert!(matches!(
            require_id("meal plan", "  "),
            Err(DatabaseError::InvalidId("meal plan"))
        ));
        assert!(require_id("meal plan", "plan-1").is_ok());
    }
}
