use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::DbResult;
use crate::models::{QueryFilter, QueryFilteredResult, RecipeStep, RecipeStepDatabaseCreationInput};
use crate::query::ListQuery;
use crate::scan::{fetch_one_scanned, RowCursor, ScanRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{info, instrument};

const RECIPE_STEPS_TABLE: &str = "recipe_steps";

pub(super) const RECIPE_STEP_COLUMNS: &[&str] = &[
    "recipe_steps.id",
    "recipe_steps.step_index",
    "recipe_steps.explicit_instructions",
    "recipe_steps.notes",
    "recipe_steps.minimum_estimated_time_in_seconds",
    "recipe_steps.maximum_estimated_time_in_seconds",
    "recipe_steps.minimum_temperature_in_celsius",
    "recipe_steps.maximum_temperature_in_celsius",
    "recipe_steps.optional",
    "recipe_steps.belongs_to_recipe",
    "recipe_steps.created_at",
    "recipe_steps.last_updated_at",
    "recipe_steps.archived_at",
];

impl ScanRow for RecipeStep {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(RecipeStep {
            id: cursor.next()?,
            index: cursor.next()?,
            explicit_instructions: cursor.next()?,
            notes: cursor.next()?,
            minimum_estimated_time_in_seconds: cursor.next()?,
            maximum_estimated_time_in_seconds: cursor.next()?,
            minimum_temperature_in_celsius: cursor.next()?,
            maximum_temperature_in_celsius: cursor.next()?,
            optional: cursor.next()?,
            belongs_to_recipe: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
        })
    }
}

#[async_trait]
pub trait RecipeStepRepository: Send + Sync {
    async fn recipe_step_exists(&self, recipe_id: &str, recipe_step_id: &str) -> DbResult<bool>;

    async fn get_recipe_step(&self, recipe_id: &str, recipe_step_id: &str)
        -> DbResult<RecipeStep>;

    async fn get_recipe_steps(
        &self,
        recipe_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<RecipeStep>>;

    async fn create_recipe_step(
        &self,
        conn: &mut PgConnection,
        input: &RecipeStepDatabaseCreationInput,
    ) -> DbResult<RecipeStep>;

    async fn update_recipe_step(&self, conn: &mut PgConnection, updated: &RecipeStep)
        -> DbResult<()>;

    async fn archive_recipe_step(
        &self,
        conn: &mut PgConnection,
        recipe_id: &str,
        recipe_step_id: &str,
    ) -> DbResult<()>;
}

#[derive(Clone)]
pub struct PgRecipeStepRepository {
    db: DbContext,
}

impl PgRecipeStepRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }
}

/// Shared by step creation and recipe creation
pub(super) async fn insert_recipe_step(
    conn: &mut PgConnection,
    input: &RecipeStepDatabaseCreationInput,
    created_at: DateTime<Utc>,
) -> DbResult<RecipeStep> {
    perform_write(
        conn,
        sqlx::query(
            r#"
            INSERT INTO recipe_steps (
                id, step_index, explicit_instructions, notes,
                minimum_estimated_time_in_seconds, maximum_estimated_time_in_seconds,
                minimum_temperature_in_celsius, maximum_temperature_in_celsius,
                optional, belongs_to_recipe, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&input.id)
        .bind(input.index)
        .bind(&input.explicit_instructions)
        .bind(&input.notes)
        .bind(input.minimum_estimated_time_in_seconds)
        .bind(input.maximum_estimated_time_in_seconds)
        .bind(input.minimum_temperature_in_celsius)
        .bind(input.maximum_temperature_in_celsius)
        .bind(input.optional)
        .bind(&input.belongs_to_recipe)
        .bind(created_at),
        "creating recipe step",
    )
    .await?;

    Ok(RecipeStep {
        id: input.id.clone(),
        index: input.index,
        explicit_instructions: input.explicit_instructions.clone(),
        notes: input.notes.clone(),
        minimum_estimated_time_in_seconds: input.minimum_estimated_time_in_seconds,
        maximum_estimated_time_in_seconds: input.maximum_estimated_time_in_seconds,
        minimum_temperature_in_celsius: input.minimum_temperature_in_celsius,
        maximum_temperature_in_celsius: input.maximum_temperature_in_celsius,
        optional: input.optional,
        belongs_to_recipe: input.belongs_to_recipe.clone(),
        created_at,
        last_updated_at: None,
        archived_at: None,
    })
}

#[async_trait]
impl RecipeStepRepository for PgRecipeStepRepository {
    #[instrument(skip_all, fields(recipe.id = %recipe_id, recipe_step.id = %recipe_step_id))]
    async fn recipe_step_exists(&self, recipe_id: &str, recipe_step_id: &str) -> DbResult<bool> {
        require_id("recipe", recipe_id)?;
        require_id("recipe step", recipe_step_id)?;

        self.db
            .exists(
                sqlx::query(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM recipe_steps
                        JOIN recipes ON recipe_steps.belongs_to_recipe = recipes.id
                        WHERE recipe_steps.archived_at IS NULL
                            AND recipe_steps.belongs_to_recipe = $1
                            AND recipe_steps.id = $2
                            AND recipes.archived_at IS NULL
                    )
                    "#,
                )
                .bind(recipe_id)
                .bind(recipe_step_id),
                "checking recipe step existence",
            )
            .await
    }

    #[instrument(skip_all, fields(recipe.id = %recipe_id, recipe_step.id = %recipe_step_id))]
    async fn get_recipe_step(
        &self,
        recipe_id: &str,
        recipe_step_id: &str,
    ) -> DbResult<RecipeStep> {
        require_id("recipe", recipe_id)?;
        require_id("recipe step", recipe_step_id)?;

        let sql = format!(
            r#"
            SELECT {}
            FROM recipe_steps
            JOIN recipes ON recipe_steps.belongs_to_recipe = recipes.id
            WHERE recipe_steps.archived_at IS NULL
                AND recipe_steps.belongs_to_recipe = $1
                AND recipe_steps.id = $2
                AND recipes.archived_at IS NULL
            "#,
            RECIPE_STEP_COLUMNS.join(", ")
        );
        fetch_one_scanned(
            self.db.pool(),
            sqlx::query(&sql).bind(recipe_id).bind(recipe_step_id),
            "fetching recipe step",
        )
        .await
    }

    #[instrument(skip_all, fields(recipe.id = %recipe_id, filter = %filter))]
    async fn get_recipe_steps(
        &self,
        recipe_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<RecipeStep>> {
        require_id("recipe", recipe_id)?;

        self.db
            .fetch_list(
                ListQuery::new(RECIPE_STEPS_TABLE, RECIPE_STEP_COLUMNS, filter)
                    .owned_by("belongs_to_recipe", recipe_id),
                filter,
                "fetching recipe steps",
            )
            .await
    }

    #[instrument(skip_all, fields(recipe.id = %input.belongs_to_recipe, recipe_step.id = %input.id))]
    async fn create_recipe_step(
        &self,
        conn: &mut PgConnection,
        input: &RecipeStepDatabaseCreationInput,
    ) -> DbResult<RecipeStep> {
        validate_input(input)?;

        let step = insert_recipe_step(conn, input, self.db.now()).await?;
        info!("Recipe step created");
        Ok(step)
    }

    #[instrument(skip_all, fields(recipe_step.id = %updated.id))]
    async fn update_recipe_step(
        &self,
        conn: &mut PgConnection,
        updated: &RecipeStep,
    ) -> DbResult<()> {
        require_id("recipe step", &updated.id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE recipe_steps SET
                    step_index = $1,
                    explicit_instructions = $2,
                    notes = $3,
                    minimum_estimated_time_in_seconds = $4,
                    maximum_estimated_time_in_seconds = $5,
                    minimum_temperature_in_celsius = $6,
                    maximum_temperature_in_celsius = $7,
                    optional = $8,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND belongs_to_recipe = $9 AND id = $10
                "#,
            )
            .bind(updated.index)
            .bind(&updated.explicit_instructions)
            .bind(&updated.notes)
            .bind(updated.minimum_estimated_time_in_seconds)
            .bind(updated.maximum_estimated_time_in_seconds)
            .bind(updated.minimum_temperature_in_celsius)
            .bind(updated.maximum_temperature_in_celsius)
            .bind(updated.optional)
            .bind(&updated.belongs_to_recipe)
            .bind(&updated.id),
            "updating recipe step",
        )
        .await?;

        info!("Recipe step updated");
        Ok(())
    }

    #[instrument(skip_all, fields(recipe.id = %recipe_id, recipe_step.id = %recipe_step_id))]
    async fn archive_recipe_step(
        &self,
        conn: &mut PgConnection,
        recipe_id: &str,
        recipe_step_id: &str,
    ) -> DbResult<()> {
        require_id("recipe", recipe_id)?;
        require_id("recipe step", recipe_step_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE recipe_steps SET archived_at = NOW() WHERE archived_at IS NULL AND belongs_to_recipe = $1 AND id = $2",
            )
            .bind(recipe_id)
            .bind(recipe_step_id),
            "archiving recipe step",
        )
        .await?;

        info!("Recipe step archived");
        Ok(())
    }
}
