use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::{DatabaseError, DbResult};
use crate::models::{
    QueryFilter, QueryFilteredResult, ValidIngredient, ValidIngredientDatabaseCreationInput,
};
use crate::query::{search_query, ListQuery};
use crate::scan::{fetch_all_scanned, fetch_one_scanned, RowCursor, ScanRow};
use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{info, instrument};

const VALID_INGREDIENTS_TABLE: &str = "valid_ingredients";

const VALID_INGREDIENT_COLUMNS: &[&str] = &[
    "valid_ingredients.id",
    "valid_ingredients.name",
    "valid_ingredients.plural_name",
    "valid_ingredients.description",
    "valid_ingredients.warning",
    "valid_ingredients.icon_path",
    "valid_ingredients.upc",
    "valid_ingredients.minimum_ideal_storage_temperature_in_celsius",
    "valid_ingredients.maximum_ideal_storage_temperature_in_celsius",
    "valid_ingredients.is_liquid",
    "valid_ingredients.animal_derived",
    "valid_ingredients.created_at",
    "valid_ingredients.last_updated_at",
    "valid_ingredients.archived_at",
];

impl ScanRow for ValidIngredient {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(ValidIngredient {
            id: cursor.next()?,
            name: cursor.next()?,
            plural_name: cursor.next()?,
            description: cursor.next()?,
            warning: cursor.next()?,
            icon_path: cursor.next()?,
            upc: cursor.next()?,
            minimum_ideal_storage_temperature_in_celsius: cursor.next()?,
            maximum_ideal_storage_temperature_in_celsius: cursor.next()?,
            is_liquid: cursor.next()?,
            animal_derived: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
        })
    }
}

/// Site-wide ingredient catalogue; rows have no owner
#[async_trait]
pub trait ValidIngredientRepository: Send + Sync {
    async fn valid_ingredient_exists(&self, valid_ingredient_id: &str) -> DbResult<bool>;

    async fn get_valid_ingredient(&self, valid_ingredient_id: &str) -> DbResult<ValidIngredient>;

    async fn get_valid_ingredients(
        &self,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<ValidIngredient>>;

    async fn search_for_valid_ingredients(&self, query: &str) -> DbResult<Vec<ValidIngredient>>;

    async fn create_valid_ingredient(
        &self,
        conn: &mut PgConnection,
        input: &ValidIngredientDatabaseCreationInput,
    ) -> DbResult<ValidIngredient>;

    async fn update_valid_ingredient(
        &self,
        conn: &mut PgConnection,
        updated: &ValidIngredient,
    ) -> DbResult<()>;

    async fn archive_valid_ingredient(
        &self,
        conn: &mut PgConnection,
        valid_ingredient_id: &str,
    ) -> DbResult<()>;
}

#[derive(Clone)]
pub struct PgValidIngredientRepository {
    db: DbContext,
}

impl PgValidIngredientRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ValidIngredientRepository for PgValidIngredientRepository {
    #[instrument(skip_all, fields(valid_ingredient.id = %valid_ingredient_id))]
    async fn valid_ingredient_exists(&self, valid_ingredient_id: &str) -> DbResult<bool> {
        require_id("valid ingredient", valid_ingredient_id)?;

        self.db
            .exists(
                sqlx::query(
                    "SELECT EXISTS (SELECT 1 FROM valid_ingredients WHERE valid_ingredients.archived_at IS NULL AND valid_ingredients.id = $1)",
                )
                .bind(valid_ingredient_id),
                "checking valid ingredient existence",
            )
            .await
    }

    #[instrument(skip_all, fields(valid_ingredient.id = %valid_ingredient_id))]
    async fn get_valid_ingredient(&self, valid_ingredient_id: &str) -> DbResult<ValidIngredient> {
        require_id("valid ingredient", valid_ingredient_id)?;

        let sql = format!(
            "SELECT {} FROM valid_ingredients WHERE valid_ingredients.archived_at IS NULL AND valid_ingredients.id = $1",
            VALID_INGREDIENT_COLUMNS.join(", ")
        );
        fetch_one_scanned(
            self.db.pool(),
            sqlx::query(&sql).bind(valid_ingredient_id),
            "fetching valid ingredient",
        )
        .await
    }

    #[instrument(skip_all, fields(filter = %filter))]
    async fn get_valid_ingredients(
        &self,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<ValidIngredient>> {
        self.db
            .fetch_list(
                ListQuery::new(VALID_INGREDIENTS_TABLE, VALID_INGREDIENT_COLUMNS, filter),
                filter,
                "fetching valid ingredients",
            )
            .await
    }

    #[instrument(skip_all, fields(query = %query))]
    async fn search_for_valid_ingredients(&self, query: &str) -> DbResult<Vec<ValidIngredient>> {
        if query.trim().is_empty() {
            return Err(DatabaseError::EmptyInput);
        }

        let built = search_query(
            VALID_INGREDIENTS_TABLE,
            VALID_INGREDIENT_COLUMNS,
            "name",
            query,
            None,
        )?;
        fetch_all_scanned(self.db.pool(), built.query(), "searching valid ingredients").await
    }

    #[instrument(skip_all, fields(valid_ingredient.id = %input.id))]
    async fn create_valid_ingredient(
        &self,
        conn: &mut PgConnection,
        input: &ValidIngredientDatabaseCreationInput,
    ) -> DbResult<ValidIngredient> {
        validate_input(input)?;
        let created_at = self.db.now();

        perform_write(
            conn,
            sqlx::query(
                r#"
                INSERT INTO valid_ingredients (
                    id, name, plural_name, description, warning, icon_path, upc,
                    minimum_ideal_storage_temperature_in_celsius,
                    maximum_ideal_storage_temperature_in_celsius,
                    is_liquid, animal_derived, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(&input.id)
            .bind(&input.name)
            .bind(&input.plural_name)
            .bind(&input.description)
            .bind(&input.warning)
            .bind(&input.icon_path)
            .bind(&input.upc)
            .bind(input.minimum_ideal_storage_temperature_in_celsius)
            .bind(input.maximum_ideal_storage_temperature_in_celsius)
            .bind(input.is_liquid)
            .bind(input.animal_derived)
            .bind(created_at),
            "creating valid ingredient",
        )
        .await?;

        info!("Valid ingredient created");

        Ok(ValidIngredient {
            id: input.id.clone(),
            name: input.name.clone(),
            plural_name: input.plural_name.clone(),
            description: input.description.clone(),
            warning: input.warning.clone(),
            icon_path: input.icon_path.clone(),
            upc: input.upc.clone(),
            minimum_ideal_storage_temperature_in_celsius: input
                .minimum_ideal_storage_temperature_in_celsius,
            maximum_ideal_storage_temperature_in_celsius: input
                .maximum_ideal_storage_temperature_in_celsius,
            is_liquid: input.is_liquid,
            animal_derived: input.animal_derived,
            created_at,
            last_updated_at: None,
            archived_at: None,
        })
    }

    #[instrument(skip_all, fields(valid_ingredient.id = %updated.id))]
    async fn update_valid_ingredient(
        &self,
        conn: &mut PgConnection,
        updated: &ValidIngredient,
    ) -> DbResult<()> {
        require_id("valid ingredient", &updated.id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE valid_ingredients SET
                    name = $1,
                    plural_name = $2,
                    description = $3,
                    warning = $4,
                    icon_path = $5,
                    upc = $6,
                    minimum_ideal_storage_temperature_in_celsius = $7,
                    maximum_ideal_storage_temperature_in_celsius = $8,
                    is_liquid = $9,
                    animal_derived = $10,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND id = $11
                "#,
            )
            .bind(&updated.name)
            .bind(&updated.plural_name)
            .bind(&updated.description)
            .bind(&updated.warning)
            .bind(&updated.icon_path)
            .bind(&updated.upc)
            .bind(updated.minimum_ideal_storage_temperature_in_celsius)
            .bind(updated.maximum_ideal_storage_temperature_in_celsius)
            .bind(updated.is_liquid)
            .bind(updated.animal_derived)
            .bind(&updated.id),
            "updating valid ingredient",
        )
        .await?;

        info!("Valid ingredient updated");
        Ok(())
    }

    #[instrument(skip_all, fields(valid_ingredient.id = %valid_ingredient_id))]
    async fn archive_valid_ingredient(
        &self,
        conn: &mut PgConnection,
        valid_ingredient_id: &str,
    ) -> DbResult<()> {
        require_id("valid ingredient", valid_ingredient_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE valid_ingredients SET archived_at = NOW() WHERE archived_at IS NULL AND id = $1",
            )
            .bind(valid_ingredient_id),
            "archiving valid ingredient",
        )
        .await?;

        info!("Valid ingredient archived");
        Ok(())
    }
}
