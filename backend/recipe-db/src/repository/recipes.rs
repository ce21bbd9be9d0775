use super::recipe_steps::{insert_recipe_step, RECIPE_STEP_COLUMNS};
use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::{DatabaseError, DbResult};
use crate::models::{QueryFilter, QueryFilteredResult, Recipe, RecipeDatabaseCreationInput};
use crate::query::{search_query, ListQuery};
use crate::scan::{fetch_all_scanned, fetch_one_scanned, RowCursor, ScanRow};
use crate::tx::run_in_transaction;
use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{info, instrument};

const RECIPES_TABLE: &str = "recipes";

const RECIPE_COLUMNS: &[&str] = &[
    "recipes.id",
    "recipes.name",
    "recipes.source",
    "recipes.description",
    "recipes.inspired_by_recipe_id",
    "recipes.minimum_estimated_portions",
    "recipes.maximum_estimated_portions",
    "recipes.seal_of_approval",
    "recipes.created_by_user",
    "recipes.created_at",
    "recipes.last_updated_at",
    "recipes.archived_at",
];

impl ScanRow for Recipe {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(Recipe {
            id: cursor.next()?,
            name: cursor.next()?,
            source: cursor.next()?,
            description: cursor.next()?,
            inspired_by_recipe_id: cursor.next()?,
            minimum_estimated_portions: cursor.next()?,
            maximum_estimated_portions: cursor.next()?,
            seal_of_approval: cursor.next()?,
            created_by_user: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
            steps: Vec::new(),
        })
    }
}

#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn recipe_exists(&self, recipe_id: &str) -> DbResult<bool>;

    /// Loads the recipe with its steps in index order
    async fn get_recipe(&self, recipe_id: &str) -> DbResult<Recipe>;

    async fn get_recipes(
        &self,
        user_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<Recipe>>;

    async fn search_for_recipes(&self, user_id: &str, query: &str) -> DbResult<Vec<Recipe>>;

    async fn create_recipe(
        &self,
        conn: &mut PgConnection,
        input: &RecipeDatabaseCreationInput,
    ) -> DbResult<Recipe>;

    async fn update_recipe(&self, conn: &mut PgConnection, updated: &Recipe) -> DbResult<()>;

    async fn archive_recipe(
        &self,
        conn: &mut PgConnection,
        recipe_id: &str,
        user_id: &str,
    ) -> DbResult<()>;
}

#[derive(Clone)]
pub struct PgRecipeRepository {
    db: DbContext,
}

impl PgRecipeRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipeRepository for PgRecipeRepository {
    #[instrument(skip_all, fields(recipe.id = %recipe_id))]
    async fn recipe_exists(&self, recipe_id: &str) -> DbResult<bool> {
        require_id("recipe", recipe_id)?;

        self.db
            .exists(
                sqlx::query(
                    "SELECT EXISTS (SELECT 1 FROM recipes WHERE recipes.archived_at IS NULL AND recipes.id = $1)",
                )
                .bind(recipe_id),
                "checking recipe existence",
            )
            .await
    }

    #[instrument(skip_all, fields(recipe.id = %recipe_id))]
    async fn get_recipe(&self, recipe_id: &str) -> DbResult<Recipe> {
        require_id("recipe", recipe_id)?;

        let sql = format!(
            "SELECT {} FROM recipes WHERE recipes.archived_at IS NULL AND recipes.id = $1",
            RECIPE_COLUMNS.join(", ")
        );
        let mut recipe: Recipe =
            fetch_one_scanned(self.db.pool(), sqlx::query(&sql).bind(recipe_id), "fetching recipe")
                .await?;

        let steps_sql = format!(
            r#"
            SELECT {}
            FROM recipe_steps
            WHERE recipe_steps.archived_at IS NULL AND recipe_steps.belongs_to_recipe = $1
            ORDER BY recipe_steps.step_index, recipe_steps.id
            "#,
            RECIPE_STEP_COLUMNS.join(", ")
        );
        recipe.steps = fetch_all_scanned(
            self.db.pool(),
            sqlx::query(&steps_sql).bind(recipe_id),
            "fetching recipe steps",
        )
        .await?;

        Ok(recipe)
    }

    #[instrument(skip_all, fields(user.id = %user_id, filter = %filter))]
    async fn get_recipes(
        &self,
        user_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<Recipe>> {
        require_id("user", user_id)?;

        self.db
            .fetch_list(
                ListQuery::new(RECIPES_TABLE, RECIPE_COLUMNS, filter)
                    .owned_by("created_by_user", user_id),
                filter,
                "fetching recipes",
            )
            .await
    }

    #[instrument(skip_all, fields(user.id = %user_id, query = %query))]
    async fn search_for_recipes(&self, user_id: &str, query: &str) -> DbResult<Vec<Recipe>> {
        require_id("user", user_id)?;
        if query.trim().is_empty() {
            return Err(DatabaseError::EmptyInput);
        }

        let built = search_query(
            RECIPES_TABLE,
            RECIPE_COLUMNS,
            "name",
            query,
            Some(("created_by_user", user_id)),
        )?;
        fetch_all_scanned(self.db.pool(), built.query(), "searching recipes").await
    }

    #[instrument(skip_all, fields(recipe.id = %input.id, steps = input.steps.len()))]
    async fn create_recipe(
        &self,
        conn: &mut PgConnection,
        input: &RecipeDatabaseCreationInput,
    ) -> DbResult<Recipe> {
        validate_input(input)?;
        for step in &input.steps {
            validate_input(step)?;
        }
        let created_at = self.db.now();
        let input = input.clone();

        let recipe = run_in_transaction(conn, move |tx| {
            Box::pin(async move {
                perform_write(
                    &mut *tx,
                    sqlx::query(
                        r#"
                        INSERT INTO recipes (
                            id, name, source, description, inspired_by_recipe_id,
                            minimum_estimated_portions, maximum_estimated_portions,
                            seal_of_approval, created_by_user, created_at
                        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                        "#,
                    )
                    .bind(&input.id)
                    .bind(&input.name)
                    .bind(&input.source)
                    .bind(&input.description)
                    .bind(&input.inspired_by_recipe_id)
                    .bind(input.minimum_estimated_portions)
                    .bind(input.maximum_estimated_portions)
                    .bind(input.seal_of_approval)
                    .bind(&input.created_by_user)
                    .bind(created_at),
                    "creating recipe",
                )
                .await?;

                let mut steps = Vec::with_capacity(input.steps.len());
                for step in &input.steps {
                    steps.push(insert_recipe_step(&mut *tx, step, created_at).await?);
                }

                Ok(Recipe {
                    id: input.id,
                    name: input.name,
                    source: input.source,
                    description: input.description,
                    inspired_by_recipe_id: input.inspired_by_recipe_id,
                    minimum_estimated_portions: input.minimum_estimated_portions,
                    maximum_estimated_portions: input.maximum_estimated_portions,
                    seal_of_approval: input.seal_of_approval,
                    created_by_user: input.created_by_user,
                    created_at,
                    last_updated_at: None,
                    archived_at: None,
                    steps,
                })
            })
        })
        .await?;

        info!("Recipe created");
        Ok(recipe)
    }

    #[instrument(skip_all, fields(recipe.id = %updated.id))]
    async fn update_recipe(&self, conn: &mut PgConnection, updated: &Recipe) -> DbResult<()> {
        require_id("recipe", &updated.id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE recipes SET
                    name = $1,
                    source = $2,
                    description = $3,
                    inspired_by_recipe_id = $4,
                    minimum_estimated_portions = $5,
                    maximum_estimated_portions = $6,
                    seal_of_approval = $7,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND created_by_user = $8 AND id = $9
                "#,
            )
            .bind(&updated.name)
            .bind(&updated.source)
            .bind(&updated.description)
            .bind(&updated.inspired_by_recipe_id)
            .bind(updated.minimum_estimated_portions)
            .bind(updated.maximum_estimated_portions)
            .bind(updated.seal_of_approval)
            .bind(&updated.created_by_user)
            .bind(&updated.id),
            "updating recipe",
        )
        .await?;

        info!("Recipe updated");
        Ok(())
    }

    #[instrument(skip_all, fields(recipe.id = %recipe_id, user.id = %user_id))]
    async fn archive_recipe(
        &self,
        conn: &mut PgConnection,
        recipe_id: &str,
        user_id: &str,
    ) -> DbResult<()> {
        require_id("recipe", recipe_id)?;
        require_id("user", user_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE recipes SET archived_at = NOW() WHERE archived_at IS NULL AND created_by_user = $1 AND id = $2",
            )
            .bind(user_id)
            .bind(recipe_id),
            "archiving recipe",
        )
        .await?;

        info!("Recipe archived");
        Ok(())
    }
}
