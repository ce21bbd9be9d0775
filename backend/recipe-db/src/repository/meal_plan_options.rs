use super::meal_plan_option_votes::fetch_votes_for_option;
use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::DbResult;
use crate::models::{
    MealPlanOption, MealPlanOptionDatabaseCreationInput, QueryFilter, QueryFilteredResult,
};
use crate::query::{Join, ListQuery};
use crate::scan::{fetch_all_scanned, fetch_one_scanned, RowCursor, ScanRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

const MEAL_PLAN_OPTIONS_TABLE: &str = "meal_plan_options";

const MEAL_PLAN_OPTION_COLUMNS: &[&str] = &[
    "meal_plan_options.id",
    "meal_plan_options.assigned_cook",
    "meal_plan_options.assigned_dishwasher",
    "meal_plan_options.chosen",
    "meal_plan_options.tiebroken",
    "meal_plan_options.meal_scale",
    "meal_plan_options.meal_id",
    "meal_plan_options.notes",
    "meal_plan_options.belongs_to_meal_plan_event",
    "meal_plan_options.created_at",
    "meal_plan_options.last_updated_at",
    "meal_plan_options.archived_at",
];

/// Lists reach the plan id through the live parent event
const PARENT_EVENT: Join<'static> = Join {
    table: "meal_plan_events",
    column: "id",
    references: "meal_plan_options.belongs_to_meal_plan_event",
    live_only: true,
};

const OPTION_ANCESTRY: &str = r#"
    FROM meal_plan_options
    JOIN meal_plan_events ON meal_plan_options.belongs_to_meal_plan_event = meal_plan_events.id
    JOIN meal_plans ON meal_plan_events.belongs_to_meal_plan = meal_plans.id
    WHERE meal_plan_options.archived_at IS NULL
        AND meal_plan_events.archived_at IS NULL
        AND meal_plans.archived_at IS NULL
        AND meal_plans.id = $1
        AND meal_plan_events.id = $2
        AND meal_plan_options.id = $3
"#;

impl ScanRow for MealPlanOption {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(MealPlanOption {
            id: cursor.next()?,
            assigned_cook: cursor.next()?,
            assigned_dishwasher: cursor.next()?,
            chosen: cursor.next()?,
            tiebroken: cursor.next()?,
            meal_scale: cursor.next()?,
            meal_id: cursor.next()?,
            notes: cursor.next()?,
            belongs_to_meal_plan_event: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
            votes: Vec::new(),
        })
    }
}

/// Live options on one event, each with its votes
///
/// One follow-up read per option.
pub(super) async fn fetch_options_for_event(
    pool: &PgPool,
    event_id: &str,
) -> DbResult<Vec<MealPlanOption>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM meal_plan_options
        WHERE meal_plan_options.archived_at IS NULL
            AND meal_plan_options.belongs_to_meal_plan_event = $1
        ORDER BY meal_plan_options.created_at, meal_plan_options.id
        "#,
        MEAL_PLAN_OPTION_COLUMNS.join(", ")
    );
    let mut options: Vec<MealPlanOption> = fetch_all_scanned(
        pool,
        sqlx::query(&sql).bind(event_id),
        "fetching meal plan options",
    )
    .await?;

    for option in &mut options {
        option.votes = fetch_votes_for_option(pool, &option.id).await?;
    }

    Ok(options)
}

pub(super) async fn insert_meal_plan_option(
    conn: &mut PgConnection,
    input: &MealPlanOptionDatabaseCreationInput,
    created_at: DateTime<Utc>,
) -> DbResult<MealPlanOption> {
    perform_write(
        conn,
        sqlx::query(
            r#"
            INSERT INTO meal_plan_options (
                id, assigned_cook, assigned_dishwasher, meal_scale, meal_id, notes,
                belongs_to_meal_plan_event, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&input.id)
        .bind(&input.assigned_cook)
        .bind(&input.assigned_dishwasher)
        .bind(input.meal_scale)
        .bind(&input.meal_id)
        .bind(&input.notes)
        .bind(&input.belongs_to_meal_plan_event)
        .bind(created_at),
        "creating meal plan option",
    )
    .await?;

    Ok(MealPlanOption {
        id: input.id.clone(),
        assigned_cook: input.assigned_cook.clone(),
        assigned_dishwasher: input.assigned_dishwasher.clone(),
        chosen: false,
        tiebroken: false,
        meal_scale: input.meal_scale,
        meal_id: input.meal_id.clone(),
        notes: input.notes.clone(),
        belongs_to_meal_plan_event: input.belongs_to_meal_plan_event.clone(),
        created_at,
        last_updated_at: None,
        archived_at: None,
        votes: Vec::new(),
    })
}

#[async_trait]
pub trait MealPlanOptionRepository: Send + Sync {
    async fn meal_plan_option_exists(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
    ) -> DbResult<bool>;

    /// Loads the option with its votes
    async fn get_meal_plan_option(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
    ) -> DbResult<MealPlanOption>;

    async fn get_meal_plan_options(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<MealPlanOption>>;

    async fn create_meal_plan_option(
        &self,
        conn: &mut PgConnection,
        input: &MealPlanOptionDatabaseCreationInput,
    ) -> DbResult<MealPlanOption>;

    async fn update_meal_plan_option(
        &self,
        conn: &mut PgConnection,
        updated: &MealPlanOption,
    ) -> DbResult<()>;

    async fn archive_meal_plan_option(
        &self,
        conn: &mut PgConnection,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
    ) -> DbResult<()>;

    /// Mark an option as its event's winner
    ///
    /// Only an unchosen, live option is updated. Returns whether a row
    /// changed; `false` means another finaliser got there first.
    async fn finalize_meal_plan_option(
        &self,
        conn: &mut PgConnection,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
        tiebroken: bool,
    ) -> DbResult<bool>;
}

#[derive(Clone)]
pub struct PgMealPlanOptionRepository {
    db: DbContext,
}

impl PgMealPlanOptionRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealPlanOptionRepository for PgMealPlanOptionRepository {
    #[instrument(skip_all, fields(
        meal_plan.id = %meal_plan_id,
        meal_plan_event.id = %meal_plan_event_id,
        meal_plan_option.id = %meal_plan_option_id
    ))]
    async fn meal_plan_option_exists(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
    ) -> DbResult<bool> {
        require_id("meal plan", meal_plan_id)?;
        require_id("meal plan event", meal_plan_event_id)?;
        require_id("meal plan option", meal_plan_option_id)?;

        let sql = format!("SELECT EXISTS (SELECT 1 {OPTION_ANCESTRY})");
        self.db
            .exists(
                sqlx::query(&sql)
                    .bind(meal_plan_id)
                    .bind(meal_plan_event_id)
                    .bind(meal_plan_option_id),
                "checking meal plan option existence",
            )
            .await
    }

    #[instrument(skip_all, fields(
        meal_plan.id = %meal_plan_id,
        meal_plan_event.id = %meal_plan_event_id,
        meal_plan_option.id = %meal_plan_option_id
    ))]
    async fn get_meal_plan_option(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
    ) -> DbResult<MealPlanOption> {
        require_id("meal plan", meal_plan_id)?;
        require_id("meal plan event", meal_plan_event_id)?;
        require_id("meal plan option", meal_plan_option_id)?;

        let sql = format!(
            "SELECT {} {OPTION_ANCESTRY}",
            MEAL_PLAN_OPTION_COLUMNS.join(", ")
        );
        let mut option: MealPlanOption = fetch_one_scanned(
            self.db.pool(),
            sqlx::query(&sql)
                .bind(meal_plan_id)
                .bind(meal_plan_event_id)
                .bind(meal_plan_option_id),
            "fetching meal plan option",
        )
        .await?;

        option.votes = fetch_votes_for_option(self.db.pool(), &option.id).await?;
        Ok(option)
    }

    #[instrument(skip_all, fields(
        meal_plan.id = %meal_plan_id,
        meal_plan_event.id = %meal_plan_event_id,
        filter = %filter
    ))]
    async fn get_meal_plan_options(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<MealPlanOption>> {
        require_id("meal plan", meal_plan_id)?;
        require_id("meal plan event", meal_plan_event_id)?;

        self.db
            .fetch_list(
                ListQuery::new(MEAL_PLAN_OPTIONS_TABLE, MEAL_PLAN_OPTION_COLUMNS, filter)
                    .join(PARENT_EVENT)
                    .owned_by("belongs_to_meal_plan_event", meal_plan_event_id)
                    .within("meal_plan_events.belongs_to_meal_plan", meal_plan_id),
                filter,
                "fetching meal plan options",
            )
            .await
    }

    #[instrument(skip_all, fields(
        meal_plan_event.id = %input.belongs_to_meal_plan_event,
        meal_plan_option.id = %input.id
    ))]
    async fn create_meal_plan_option(
        &self,
        conn: &mut PgConnection,
        input: &MealPlanOptionDatabaseCreationInput,
    ) -> DbResult<MealPlanOption> {
        validate_input(input)?;

        let option = insert_meal_plan_option(conn, input, self.db.now()).await?;
        info!("Meal plan option created");
        Ok(option)
    }

    #[instrument(skip_all, fields(meal_plan_option.id = %updated.id))]
    async fn update_meal_plan_option(
        &self,
        conn: &mut PgConnection,
        updated: &MealPlanOption,
    ) -> DbResult<()> {
        require_id("meal plan option", &updated.id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE meal_plan_options SET
                    assigned_cook = $1,
                    assigned_dishwasher = $2,
                    meal_scale = $3,
                    meal_id = $4,
                    notes = $5,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND belongs_to_meal_plan_event = $6 AND id = $7
                "#,
            )
            .bind(&updated.assigned_cook)
            .bind(&updated.assigned_dishwasher)
            .bind(updated.meal_scale)
            .bind(&updated.meal_id)
            .bind(&updated.notes)
            .bind(&updated.belongs_to_meal_plan_event)
            .bind(&updated.id),
            "updating meal plan option",
        )
        .await?;

        info!("Meal plan option updated");
        Ok(())
    }

    #[instrument(skip_all, fields(
        meal_plan_event.id = %meal_plan_event_id,
        meal_plan_option.id = %meal_plan_option_id
    ))]
    async fn archive_meal_plan_option(
        &self,
        conn: &mut PgConnection,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
    ) -> DbResult<()> {
        require_id("meal plan event", meal_plan_event_id)?;
        require_id("meal plan option", meal_plan_option_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE meal_plan_options SET archived_at = NOW() WHERE archived_at IS NULL AND belongs_to_meal_plan_event = $1 AND id = $2",
            )
            .bind(meal_plan_event_id)
            .bind(meal_plan_option_id),
            "archiving meal plan option",
        )
        .await?;

        info!("Meal plan option archived");
        Ok(())
    }

    #[instrument(skip_all, fields(
        meal_plan_event.id = %meal_plan_event_id,
        meal_plan_option.id = %meal_plan_option_id,
        tiebroken = tiebroken
    ))]
    async fn finalize_meal_plan_option(
        &self,
        conn: &mut PgConnection,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
        tiebroken: bool,
    ) -> DbResult<bool> {
        require_id("meal plan event", meal_plan_event_id)?;
        require_id("meal plan option", meal_plan_option_id)?;

        let rows = perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE meal_plan_options SET
                    chosen = TRUE,
                    tiebroken = $1,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL
                    AND belongs_to_meal_plan_event = $2
                    AND id = $3
                    AND chosen = FALSE
                "#,
            )
            .bind(tiebroken)
            .bind(meal_plan_event_id)
            .bind(meal_plan_option_id),
            "finalizing meal plan option",
        )
        .await?;

        if rows == 0 {
            warn!("Meal plan option was already chosen or archived");
            return Ok(false);
        }

        info!("Meal plan option finalized");
        Ok(true)
    }
}
