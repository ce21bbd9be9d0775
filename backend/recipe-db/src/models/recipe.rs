use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub source: String,
    pub description: String,
    pub inspired_by_recipe_id: Option<String>,
    pub minimum_estimated_portions: f64,
    pub maximum_estimated_portions: Option<f64>,
    pub seal_of_approval: bool,
    pub created_by_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    /// Ordered by `index`; only populated by single-recipe reads
    pub steps: Vec<RecipeStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub id: String,
    pub index: i32,
    pub explicit_instructions: String,
    pub notes: String,
    pub minimum_estimated_time_in_seconds: Option<i64>,
    pub maximum_estimated_time_in_seconds: Option<i64>,
    pub minimum_temperature_in_celsius: Option<f64>,
    pub maximum_temperature_in_celsius: Option<f64>,
    pub optional: bool,
    pub belongs_to_recipe: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecipeDatabaseCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inspired_by_recipe_id: Option<String>,
    #[validate(range(min = 0.0))]
    pub minimum_estimated_portions: f64,
    #[serde(default)]
    pub maximum_estimated_portions: Option<f64>,
    #[serde(default)]
    pub seal_of_approval: bool,
    #[validate(length(min = 1))]
    pub created_by_user: String,
    #[serde(default)]
    pub steps: Vec<RecipeStepDatabaseCreationInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecipeStepDatabaseCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(range(min = 0))]
    pub index: i32,
    #[serde(default)]
    pub explicit_instructions: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub minimum_estimated_time_in_seconds: Option<i64>,
    #[serde(default)]
    pub maximum_estimated_time_in_seconds: Option<i64>,
    #[serde(default)]
    pub minimum_temperature_in_celsius: Option<f64>,
    #[serde(default)]
    pub maximum_temperature_in_celsius: Option<f64>,
    #[serde(default)]
    pub optional: bool,
    #[validate(length(min = 1))]
    pub belongs_to_recipe: String,
}
