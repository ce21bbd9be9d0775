use super::meal_plan_events::{fetch_events_for_plan, insert_meal_plan_event, validate_event_input};
use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::DbResult;
use crate::models::{
    MealPlan, MealPlanDatabaseCreationInput, MealPlanStatus, QueryFilter, QueryFilteredResult,
};
use crate::query::ListQuery;
use crate::scan::{fetch_all_scanned, fetch_one_scanned, RowCursor, ScanRow};
use crate::tx::run_in_transaction;
use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{debug, info, instrument, warn};

const MEAL_PLANS_TABLE: &str = "meal_plans";

const MEAL_PLAN_COLUMNS: &[&str] = &[
    "meal_plans.id",
    "meal_plans.notes",
    "meal_plans.status",
    "meal_plans.voting_deadline",
    "meal_plans.grocery_list_initialized",
    "meal_plans.tasks_created",
    "meal_plans.created_by_user",
    "meal_plans.belongs_to_household",
    "meal_plans.created_at",
    "meal_plans.last_updated_at",
    "meal_plans.archived_at",
];

impl ScanRow for MealPlan {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(MealPlan {
            id: cursor.next()?,
            notes: cursor.next()?,
            status: cursor.next_parsed()?,
            voting_deadline: cursor.next()?,
            grocery_list_initialized: cursor.next()?,
            tasks_created: cursor.next()?,
            created_by_user: cursor.next()?,
            belongs_to_household: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
            events: Vec::new(),
        })
    }
}

#[async_trait]
pub trait MealPlanRepository: Send + Sync {
    async fn meal_plan_exists(&self, meal_plan_id: &str, household_id: &str) -> DbResult<bool>;

    /// Loads the plan, then its events, options and votes with follow-up reads
    async fn get_meal_plan(&self, meal_plan_id: &str, household_id: &str) -> DbResult<MealPlan>;

    async fn get_meal_plans(
        &self,
        household_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<MealPlan>>;

    /// Creates the plan with its events and their options in one transaction
    async fn create_meal_plan(
        &self,
        conn: &mut PgConnection,
        input: &MealPlanDatabaseCreationInput,
    ) -> DbResult<MealPlan>;

    async fn update_meal_plan(&self, conn: &mut PgConnection, updated: &MealPlan) -> DbResult<()>;

    async fn archive_meal_plan(
        &self,
        conn: &mut PgConnection,
        meal_plan_id: &str,
        household_id: &str,
    ) -> DbResult<()>;

    /// Flip an awaiting plan to finalized
    ///
    /// Returns whether this call made the transition.
    async fn finalize_meal_plan(
        &self,
        conn: &mut PgConnection,
        meal_plan_id: &str,
        household_id: &str,
    ) -> DbResult<bool>;

    /// Live plans still awaiting votes whose deadline is behind the clock
    ///
    /// Shallow: events are not loaded.
    async fn get_unfinalized_meal_plans_with_expired_voting_periods(&self)
        -> DbResult<Vec<MealPlan>>;

    async fn mark_grocery_list_initialized(
        &self,
        conn: &mut PgConnection,
        meal_plan_id: &str,
    ) -> DbResult<()>;

    async fn mark_tasks_created(&self, conn: &mut PgConnection, meal_plan_id: &str)
        -> DbResult<()>;
}

#[derive(Clone)]
pub struct PgMealPlanRepository {
    db: DbContext,
}

impl PgMealPlanRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealPlanRepository for PgMealPlanRepository {
    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, household.id = %household_id))]
    async fn meal_plan_exists(&self, meal_plan_id: &str, household_id: &str) -> DbResult<bool> {
        require_id("meal plan", meal_plan_id)?;
        require_id("household", household_id)?;

        self.db
            .exists(
                sqlx::query(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM meal_plans
                        WHERE meal_plans.archived_at IS NULL
                            AND meal_plans.id = $1
                            AND meal_plans.belongs_to_household = $2
                    )
                    "#,
                )
                .bind(meal_plan_id)
                .bind(household_id),
                "checking meal plan existence",
            )
            .await
    }

    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, household.id = %household_id))]
    async fn get_meal_plan(&self, meal_plan_id: &str, household_id: &str) -> DbResult<MealPlan> {
        require_id("meal plan", meal_plan_id)?;
        require_id("household", household_id)?;

        let sql = format!(
            r#"
            SELECT {}
            FROM meal_plans
            WHERE meal_plans.archived_at IS NULL
                AND meal_plans.id = $1
                AND meal_plans.belongs_to_household = $2
            "#,
            MEAL_PLAN_COLUMNS.join(", ")
        );
        let mut meal_plan: MealPlan = fetch_one_scanned(
            self.db.pool(),
            sqlx::query(&sql).bind(meal_plan_id).bind(household_id),
            "fetching meal plan",
        )
        .await?;

        meal_plan.events = fetch_events_for_plan(self.db.pool(), &meal_plan.id).await?;
        debug!(events = meal_plan.events.len(), "Meal plan hydrated");

        Ok(meal_plan)
    }

    #[instrument(skip_all, fields(household.id = %household_id, filter = %filter))]
    async fn get_meal_plans(
        &self,
        household_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<MealPlan>> {
        require_id("household", household_id)?;

        self.db
            .fetch_list(
                ListQuery::new(MEAL_PLANS_TABLE, MEAL_PLAN_COLUMNS, filter)
                    .owned_by("belongs_to_household", household_id),
                filter,
                "fetching meal plans",
            )
            .await
    }

    #[instrument(skip_all, fields(
        meal_plan.id = %input.id,
        household.id = %input.belongs_to_household,
        events = input.events.len()
    ))]
    async fn create_meal_plan(
        &self,
        conn: &mut PgConnection,
        input: &MealPlanDatabaseCreationInput,
    ) -> DbResult<MealPlan> {
        validate_input(input)?;
        for event in &input.events {
            validate_event_input(event)?;
        }
        let created_at = self.db.now();
        let input = input.clone();

        let meal_plan = run_in_transaction(conn, move |tx| {
            Box::pin(async move {
                perform_write(
                    &mut *tx,
                    sqlx::query(
                        r#"
                        INSERT INTO meal_plans (
                            id, notes, status, voting_deadline, created_by_user,
                            belongs_to_household, created_at
                        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                        "#,
                    )
                    .bind(&input.id)
                    .bind(&input.notes)
                    .bind(MealPlanStatus::AwaitingVotes.as_str())
                    .bind(input.voting_deadline)
                    .bind(&input.created_by_user)
                    .bind(&input.belongs_to_household)
                    .bind(created_at),
                    "creating meal plan",
                )
                .await?;

                let mut events = Vec::with_capacity(input.events.len());
                for event in &input.events {
                    events.push(insert_meal_plan_event(&mut *tx, event, created_at).await?);
                }

                Ok(MealPlan {
                    id: input.id,
                    notes: input.notes,
                    status: MealPlanStatus::AwaitingVotes,
                    voting_deadline: input.voting_deadline,
                    grocery_list_initialized: false,
                    tasks_created: false,
                    created_by_user: input.created_by_user,
                    belongs_to_household: input.belongs_to_household,
                    created_at,
                    last_updated_at: None,
                    archived_at: None,
                    events,
                })
            })
        })
        .await?;

        info!("Meal plan created");
        Ok(meal_plan)
    }

    #[instrument(skip_all, fields(meal_plan.id = %updated.id, household.id = %updated.belongs_to_household))]
    async fn update_meal_plan(&self, conn: &mut PgConnection, updated: &MealPlan) -> DbResult<()> {
        require_id("meal plan", &updated.id)?;
        require_id("household", &updated.belongs_to_household)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE meal_plans SET
                    notes = $1,
                    status = $2,
                    voting_deadline = $3,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND belongs_to_household = $4 AND id = $5
                "#,
            )
            .bind(&updated.notes)
            .bind(updated.status.as_str())
            .bind(updated.voting_deadline)
            .bind(&updated.belongs_to_household)
            .bind(&updated.id),
            "updating meal plan",
        )
        .await?;

        info!("Meal plan updated");
        Ok(())
    }

    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, household.id = %household_id))]
    async fn archive_meal_plan(
        &self,
        conn: &mut PgConnection,
        meal_plan_id: &str,
        household_id: &str,
    ) -> DbResult<()> {
        require_id("meal plan", meal_plan_id)?;
        require_id("household", household_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE meal_plans SET archived_at = NOW() WHERE archived_at IS NULL AND belongs_to_household = $1 AND id = $2",
            )
            .bind(household_id)
            .bind(meal_plan_id),
            "archiving meal plan",
        )
        .await?;

        info!("Meal plan archived");
        Ok(())
    }

    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, household.id = %household_id))]
    async fn finalize_meal_plan(
        &self,
        conn: &mut PgConnection,
        meal_plan_id: &str,
        household_id: &str,
    ) -> DbResult<bool> {
        require_id("meal plan", meal_plan_id)?;
        require_id("household", household_id)?;

        let rows = perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE meal_plans SET status = $1, last_updated_at = NOW()
                WHERE archived_at IS NULL
                    AND id = $2
                    AND belongs_to_household = $3
                    AND status = $4
                "#,
            )
            .bind(MealPlanStatus::Finalized.as_str())
            .bind(meal_plan_id)
            .bind(household_id)
            .bind(MealPlanStatus::AwaitingVotes.as_str()),
            "finalizing meal plan",
        )
        .await?;

        if rows == 0 {
            warn!("Meal plan was not awaiting votes");
            return Ok(false);
        }

        info!("Meal plan finalized");
        Ok(true)
    }

    #[instrument(skip_all)]
    async fn get_unfinalized_meal_plans_with_expired_voting_periods(
        &self,
    ) -> DbResult<Vec<MealPlan>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM meal_plans
            WHERE meal_plans.archived_at IS NULL
                AND meal_plans.status = $1
                AND meal_plans.voting_deadline < $2
            ORDER BY meal_plans.voting_deadline, meal_plans.id
            "#,
            MEAL_PLAN_COLUMNS.join(", ")
        );
        let plans: Vec<MealPlan> = fetch_all_scanned(
            self.db.pool(),
            sqlx::query(&sql)
                .bind(MealPlanStatus::AwaitingVotes.as_str())
                .bind(self.db.now()),
            "fetching expired meal plans",
        )
        .await?;

        debug!(count = plans.len(), "Found meal plans with expired voting periods");
        Ok(plans)
    }

    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id))]
    async fn mark_grocery_list_initialized(
        &self,
        conn: &mut PgConnection,
        meal_plan_id: &str,
    ) -> DbResult<()> {
        require_id("meal plan", meal_plan_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE meal_plans SET grocery_list_initialized = TRUE, last_updated_at = NOW() WHERE archived_at IS NULL AND id = $1",
            )
            .bind(meal_plan_id),
            "marking grocery list initialized",
        )
        .await?;

        info!("Meal plan grocery list marked initialized");
        Ok(())
    }

    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id))]
    async fn mark_tasks_created(
        &self,
        conn: &mut PgConnection,
        meal_plan_id: &str,
    ) -> DbResult<()> {
        require_id("meal plan", meal_plan_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE meal_plans SET tasks_created = TRUE, last_updated_at = NOW() WHERE archived_at IS NULL AND id = $1",
            )
            .bind(meal_plan_id),
            "marking meal plan tasks created",
        )
        .await?;

        info!("Meal plan tasks marked created");
        Ok(())
    }
}
