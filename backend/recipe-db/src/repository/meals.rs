use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::{DatabaseError, DbResult};
use crate::models::{
    Meal, MealComponent, MealComponentCreationInput, MealDatabaseCreationInput, QueryFilter,
    QueryFilteredResult,
};
use crate::query::{search_query, ListQuery};
use crate::scan::{fetch_all_scanned, fetch_one_scanned, RowCursor, ScanRow};
use crate::tx::run_in_transaction;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::{info, instrument};

const MEALS_TABLE: &str = "meals";

const MEAL_COLUMNS: &[&str] = &[
    "meals.id",
    "meals.name",
    "meals.description",
    "meals.minimum_estimated_portions",
    "meals.maximum_estimated_portions",
    "meals.eligible_for_meal_plans",
    "meals.created_by_user",
    "meals.created_at",
    "meals.last_updated_at",
    "meals.archived_at",
];

impl ScanRow for Meal {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(Meal {
            id: cursor.next()?,
            name: cursor.next()?,
            description: cursor.next()?,
            minimum_estimated_portions: cursor.next()?,
            maximum_estimated_portions: cursor.next()?,
            eligible_for_meal_plans: cursor.next()?,
            created_by_user: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
            components: Vec::new(),
        })
    }
}

/// `meal_recipes` row keyed by its meal
struct MealComponentRow {
    meal_id: String,
    component: MealComponent,
}

impl ScanRow for MealComponentRow {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(MealComponentRow {
            meal_id: cursor.next()?,
            component: MealComponent {
                recipe_id: cursor.next()?,
                component_type: cursor.next()?,
            },
        })
    }
}

#[async_trait]
pub trait MealRepository: Send + Sync {
    async fn meal_exists(&self, meal_id: &str) -> DbResult<bool>;

    /// Loads the meal with the recipes it is made of
    async fn get_meal(&self, meal_id: &str) -> DbResult<Meal>;

    async fn get_meals(
        &self,
        user_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<Meal>>;

    async fn search_for_meals(&self, user_id: &str, query: &str) -> DbResult<Vec<Meal>>;

    async fn create_meal(
        &self,
        conn: &mut PgConnection,
        input: &MealDatabaseCreationInput,
    ) -> DbResult<Meal>;

    async fn update_meal(&self, conn: &mut PgConnection, updated: &Meal) -> DbResult<()>;

    async fn archive_meal(
        &self,
        conn: &mut PgConnection,
        meal_id: &str,
        user_id: &str,
    ) -> DbResult<()>;
}

#[derive(Clone)]
pub struct PgMealRepository {
    db: DbContext,
}

impl PgMealRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }

    /// Fill `components` for every meal in one sibling read
    async fn hydrate_components(&self, meals: &mut [Meal]) -> DbResult<()> {
        if meals.is_empty() {
            return Ok(());
        }

        let meal_ids: Vec<String> = meals.iter().map(|m| m.id.clone()).collect();
        let rows: Vec<MealComponentRow> = fetch_all_scanned(
            self.db.pool(),
            sqlx::query(
                r#"
                SELECT meal_recipes.meal_id, meal_recipes.recipe_id, meal_recipes.meal_component_type
                FROM meal_recipes
                WHERE meal_recipes.archived_at IS NULL AND meal_recipes.meal_id = ANY($1)
                ORDER BY meal_recipes.created_at, meal_recipes.id
                "#,
            )
            .bind(meal_ids),
            "fetching meal components",
        )
        .await?;

        let mut by_meal: HashMap<String, Vec<MealComponent>> = HashMap::new();
        for row in rows {
            by_meal.entry(row.meal_id).or_default().push(row.component);
        }
        for meal in meals.iter_mut() {
            meal.components = by_meal.remove(&meal.id).unwrap_or_default();
        }

        Ok(())
    }
}

async fn insert_meal_component(
    conn: &mut PgConnection,
    meal_id: &str,
    input: &MealComponentCreationInput,
    created_at: DateTime<Utc>,
) -> DbResult<MealComponent> {
    perform_write(
        conn,
        sqlx::query(
            r#"
            INSERT INTO meal_recipes (id, meal_id, recipe_id, meal_component_type, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&input.id)
        .bind(meal_id)
        .bind(&input.recipe_id)
        .bind(&input.component_type)
        .bind(created_at),
        "creating meal recipe",
    )
    .await?;

    Ok(MealComponent {
        recipe_id: input.recipe_id.clone(),
        component_type: input.component_type.clone(),
    })
}

#[async_trait]
impl MealRepository for PgMealRepository {
    #[instrument(skip_all, fields(meal.id = %meal_id))]
    async fn meal_exists(&self, meal_id: &str) -> DbResult<bool> {
        require_id("meal", meal_id)?;

        self.db
            .exists(
                sqlx::query(
                    "SELECT EXISTS (SELECT 1 FROM meals WHERE meals.archived_at IS NULL AND meals.id = $1)",
                )
                .bind(meal_id),
                "checking meal existence",
            )
            .await
    }

    #[instrument(skip_all, fields(meal.id = %meal_id))]
    async fn get_meal(&self, meal_id: &str) -> DbResult<Meal> {
        require_id("meal", meal_id)?;

        let sql = format!(
            "SELECT {} FROM meals WHERE meals.archived_at IS NULL AND meals.id = $1",
            MEAL_COLUMNS.join(", ")
        );
        let meal: Meal =
            fetch_one_scanned(self.db.pool(), sqlx::query(&sql).bind(meal_id), "fetching meal")
                .await?;

        let mut meals = [meal];
        self.hydrate_components(&mut meals).await?;
        let [meal] = meals;
        Ok(meal)
    }

    #[instrument(skip_all, fields(user.id = %user_id, filter = %filter))]
    async fn get_meals(
        &self,
        user_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<Meal>> {
        require_id("user", user_id)?;

        let mut result: QueryFilteredResult<Meal> = self
            .db
            .fetch_list(
                ListQuery::new(MEALS_TABLE, MEAL_COLUMNS, filter)
                    .owned_by("created_by_user", user_id),
                filter,
                "fetching meals",
            )
            .await?;

        self.hydrate_components(&mut result.data).await?;
        Ok(result)
    }

    #[instrument(skip_all, fields(user.id = %user_id, query = %query))]
    async fn search_for_meals(&self, user_id: &str, query: &str) -> DbResult<Vec<Meal>> {
        require_id("user", user_id)?;
        if query.trim().is_empty() {
            return Err(DatabaseError::EmptyInput);
        }

        let built = search_query(
            MEALS_TABLE,
            MEAL_COLUMNS,
            "name",
            query,
            Some(("created_by_user", user_id)),
        )?;
        let mut meals = fetch_all_scanned(self.db.pool(), built.query(), "searching meals").await?;
        self.hydrate_components(&mut meals).await?;
        Ok(meals)
    }

    #[instrument(skip_all, fields(meal.id = %input.id, components = input.components.len()))]
    async fn create_meal(
        &self,
        conn: &mut PgConnection,
        input: &MealDatabaseCreationInput,
    ) -> DbResult<Meal> {
        validate_input(input)?;
        for component in &input.components {
            validate_input(component)?;
        }
        let created_at = self.db.now();
        let input = input.clone();

        let meal = run_in_transaction(conn, move |tx| {
            Box::pin(async move {
                perform_write(
                    &mut *tx,
                    sqlx::query(
                        r#"
                        INSERT INTO meals (
                            id, name, description, minimum_estimated_portions,
                            maximum_estimated_portions, eligible_for_meal_plans,
                            created_by_user, created_at
                        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                        "#,
                    )
                    .bind(&input.id)
                    .bind(&input.name)
                    .bind(&input.description)
                    .bind(input.minimum_estimated_portions)
                    .bind(input.maximum_estimated_portions)
                    .bind(input.eligible_for_meal_plans)
                    .bind(&input.created_by_user)
                    .bind(created_at),
                    "creating meal",
                )
                .await?;

                let mut components = Vec::with_capacity(input.components.len());
                for component in &input.components {
                    components
                        .push(insert_meal_component(&mut *tx, &input.id, component, created_at).await?);
                }

                Ok(Meal {
                    id: input.id,
                    name: input.name,
                    description: input.description,
                    minimum_estimated_portions: input.minimum_estimated_portions,
                    maximum_estimated_portions: input.maximum_estimated_portions,
                    eligible_for_meal_plans: input.eligible_for_meal_plans,
                    created_by_user: input.created_by_user,
                    created_at,
                    last_updated_at: None,
                    archived_at: None,
                    components,
                })
            })
        })
        .await?;

        info!("Meal created");
        Ok(meal)
    }

    #[instrument(skip_all, fields(meal.id = %updated.id))]
    async fn update_meal(&self, conn: &mut PgConnection, updated: &Meal) -> DbResult<()> {
        require_id("meal", &updated.id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE meals SET
                    name = $1,
                    description = $2,
                    minimum_estimated_portions = $3,
                    maximum_estimated_portions = $4,
                    eligible_for_meal_plans = $5,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND created_by_user = $6 AND id = $7
                "#,
            )
            .bind(&updated.name)
            .bind(&updated.description)
            .bind(updated.minimum_estimated_portions)
            .bind(updated.maximum_estimated_portions)
            .bind(updated.eligible_for_meal_plans)
            .bind(&updated.created_by_user)
            .bind(&updated.id),
            "updating meal",
        )
        .await?;

        info!("Meal updated");
        Ok(())
    }

    #[instrument(skip_all, fields(meal.id = %meal_id, user.id = %user_id))]
    async fn archive_meal(
        &self,
        conn: &mut PgConnection,
        meal_id: &str,
        user_id: &str,
    ) -> DbResult<()> {
        require_id("meal", meal_id)?;
        require_id("user", user_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE meals SET archived_at = NOW() WHERE archived_at IS NULL AND created_by_user = $1 AND id = $2",
            )
            .bind(user_id)
            .bind(meal_id),
            "archiving meal",
        )
        .await?;

        info!("Meal archived");
        Ok(())
    }
}
