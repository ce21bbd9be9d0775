use super::meal_plan_options::{fetch_options_for_event, insert_meal_plan_option};
use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::DbResult;
use crate::models::{
    MealPlanEvent, MealPlanEventDatabaseCreationInput, QueryFilter, QueryFilteredResult,
};
use crate::query::ListQuery;
use crate::scan::{fetch_all_scanned, fetch_one_scanned, RowCursor, ScanRow};
use crate::tx::run_in_transaction;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

const MEAL_PLAN_EVENTS_TABLE: &str = "meal_plan_events";

const MEAL_PLAN_EVENT_COLUMNS: &[&str] = &[
    "meal_plan_events.id",
    "meal_plan_events.notes",
    "meal_plan_events.starts_at",
    "meal_plan_events.ends_at",
    "meal_plan_events.meal_name",
    "meal_plan_events.belongs_to_meal_plan",
    "meal_plan_events.created_at",
    "meal_plan_events.last_updated_at",
    "meal_plan_events.archived_at",
];

impl ScanRow for MealPlanEvent {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(MealPlanEvent {
            id: cursor.next()?,
            notes: cursor.next()?,
            starts_at: cursor.next()?,
            ends_at: cursor.next()?,
            meal_name: cursor.next_parsed()?,
            belongs_to_meal_plan: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
            options: Vec::new(),
        })
    }
}

/// Live events of a plan in start order, hydrated down to votes
pub(super) async fn fetch_events_for_plan(
    pool: &PgPool,
    meal_plan_id: &str,
) -> DbResult<Vec<MealPlanEvent>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM meal_plan_events
        WHERE meal_plan_events.archived_at IS NULL
            AND meal_plan_events.belongs_to_meal_plan = $1
        ORDER BY meal_plan_events.starts_at, meal_plan_events.id
        "#,
        MEAL_PLAN_EVENT_COLUMNS.join(", ")
    );
    let mut events: Vec<MealPlanEvent> = fetch_all_scanned(
        pool,
        sqlx::query(&sql).bind(meal_plan_id),
        "fetching meal plan events",
    )
    .await?;

    for event in &mut events {
        event.options = fetch_options_for_event(pool, &event.id).await?;
    }

    Ok(events)
}

/// Insert an event and its options on `conn`
pub(super) async fn insert_meal_plan_event(
    conn: &mut PgConnection,
    input: &MealPlanEventDatabaseCreationInput,
    created_at: DateTime<Utc>,
) -> DbResult<MealPlanEvent> {
    perform_write(
        &mut *conn,
        sqlx::query(
            r#"
            INSERT INTO meal_plan_events (
                id, notes, starts_at, ends_at, meal_name, belongs_to_meal_plan, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&input.id)
        .bind(&input.notes)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.meal_name.as_str())
        .bind(&input.belongs_to_meal_plan)
        .bind(created_at),
        "creating meal plan event",
    )
    .await?;

    let mut options = Vec::with_capacity(input.options.len());
    for option in &input.options {
        options.push(insert_meal_plan_option(&mut *conn, option, created_at).await?);
    }

    Ok(MealPlanEvent {
        id: input.id.clone(),
        notes: input.notes.clone(),
        starts_at: input.starts_at,
        ends_at: input.ends_at,
        meal_name: input.meal_name,
        belongs_to_meal_plan: input.belongs_to_meal_plan.clone(),
        created_at,
        last_updated_at: None,
        archived_at: None,
        options,
    })
}

pub(super) fn validate_event_input(input: &MealPlanEventDatabaseCreationInput) -> DbResult<()> {
    validate_input(input)?;
    for option in &input.options {
        validate_input(option)?;
    }
    Ok(())
}

#[async_trait]
pub trait MealPlanEventRepository: Send + Sync {
    async fn meal_plan_event_exists(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
    ) -> DbResult<bool>;

    /// Loads the event with its options and their votes
    async fn get_meal_plan_event(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
    ) -> DbResult<MealPlanEvent>;

    async fn get_meal_plan_events(
        &self,
        meal_plan_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<MealPlanEvent>>;

    /// Creates the event and any options it carries in one transaction
    async fn create_meal_plan_event(
        &self,
        conn: &mut PgConnection,
        input: &MealPlanEventDatabaseCreationInput,
    ) -> DbResult<MealPlanEvent>;

    async fn update_meal_plan_event(
        &self,
        conn: &mut PgConnection,
        updated: &MealPlanEvent,
    ) -> DbResult<()>;

    async fn archive_meal_plan_event(
        &self,
        conn: &mut PgConnection,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
    ) -> DbResult<()>;
}

#[derive(Clone)]
pub struct PgMealPlanEventRepository {
    db: DbContext,
}

impl PgMealPlanEventRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealPlanEventRepository for PgMealPlanEventRepository {
    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, meal_plan_event.id = %meal_plan_event_id))]
    async fn meal_plan_event_exists(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
    ) -> DbResult<bool> {
        require_id("meal plan", meal_plan_id)?;
        require_id("meal plan event", meal_plan_event_id)?;

        self.db
            .exists(
                sqlx::query(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM meal_plan_events
                        JOIN meal_plans ON meal_plan_events.belongs_to_meal_plan = meal_plans.id
                        WHERE meal_plan_events.archived_at IS NULL
                            AND meal_plans.archived_at IS NULL
                            AND meal_plan_events.belongs_to_meal_plan = $1
                            AND meal_plan_events.id = $2
                    )
                    "#,
                )
                .bind(meal_plan_id)
                .bind(meal_plan_event_id),
                "checking meal plan event existence",
            )
            .await
    }

    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, meal_plan_event.id = %meal_plan_event_id))]
    async fn get_meal_plan_event(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
    ) -> DbResult<MealPlanEvent> {
        require_id("meal plan", meal_plan_id)?;
        require_id("meal plan event", meal_plan_event_id)?;

        let sql = format!(
            r#"
            SELECT {}
            FROM meal_plan_events
            JOIN meal_plans ON meal_plan_events.belongs_to_meal_plan = meal_plans.id
            WHERE meal_plan_events.archived_at IS NULL
                AND meal_plans.archived_at IS NULL
                AND meal_plan_events.belongs_to_meal_plan = $1
                AND meal_plan_events.id = $2
            "#,
            MEAL_PLAN_EVENT_COLUMNS.join(", ")
        );
        let mut event: MealPlanEvent = fetch_one_scanned(
            self.db.pool(),
            sqlx::query(&sql).bind(meal_plan_id).bind(meal_plan_event_id),
            "fetching meal plan event",
        )
        .await?;

        event.options = fetch_options_for_event(self.db.pool(), &event.id).await?;
        Ok(event)
    }

    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, filter = %filter))]
    async fn get_meal_plan_events(
        &self,
        meal_plan_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<MealPlanEvent>> {
        require_id("meal plan", meal_plan_id)?;

        self.db
            .fetch_list(
                ListQuery::new(MEAL_PLAN_EVENTS_TABLE, MEAL_PLAN_EVENT_COLUMNS, filter)
                    .owned_by("belongs_to_meal_plan", meal_plan_id),
                filter,
                "fetching meal plan events",
            )
            .await
    }

    #[instrument(skip_all, fields(meal_plan.id = %input.belongs_to_meal_plan, meal_plan_event.id = %input.id))]
    async fn create_meal_plan_event(
        &self,
        conn: &mut PgConnection,
        input: &MealPlanEventDatabaseCreationInput,
    ) -> DbResult<MealPlanEvent> {
        validate_event_input(input)?;
        let created_at = self.db.now();
        let input = input.clone();

        let event = run_in_transaction(conn, move |tx| {
            Box::pin(async move { insert_meal_plan_event(tx, &input, created_at).await })
        })
        .await?;

        info!("Meal plan event created");
        Ok(event)
    }

    #[instrument(skip_all, fields(meal_plan_event.id = %updated.id))]
    async fn update_meal_plan_event(
        &self,
        conn: &mut PgConnection,
        updated: &MealPlanEvent,
    ) -> DbResult<()> {
        require_id("meal plan event", &updated.id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE meal_plan_events SET
                    notes = $1,
                    starts_at = $2,
                    ends_at = $3,
                    meal_name = $4,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND belongs_to_meal_plan = $5 AND id = $6
                "#,
            )
            .bind(&updated.notes)
            .bind(updated.starts_at)
            .bind(updated.ends_at)
            .bind(updated.meal_name.as_str())
            .bind(&updated.belongs_to_meal_plan)
            .bind(&updated.id),
            "updating meal plan event",
        )
        .await?;

        info!("Meal plan event updated");
        Ok(())
    }

    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, meal_plan_event.id = %meal_plan_event_id))]
    async fn archive_meal_plan_event(
        &self,
        conn: &mut PgConnection,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
    ) -> DbResult<()> {
        require_id("meal plan", meal_plan_id)?;
        require_id("meal plan event", meal_plan_event_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE meal_plan_events SET archived_at = NOW() WHERE archived_at IS NULL AND belongs_to_meal_plan = $1 AND id = $2",
            )
            .bind(meal_plan_id)
            .bind(meal_plan_event_id),
            "archiving meal plan event",
        )
        .await?;

        info!("Meal plan event archived");
        Ok(())
    }
}
