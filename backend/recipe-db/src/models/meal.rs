use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: String,
    pub name: String,
    pub description: String,
    pub minimum_estimated_portions: f64,
    pub maximum_estimated_portions: Option<f64>,
    pub eligible_for_meal_plans: bool,
    pub created_by_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub components: Vec<MealComponent>,
}

/// A recipe attached to a meal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealComponent {
    pub recipe_id: String,
    pub component_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MealDatabaseCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub minimum_estimated_portions: f64,
    #[serde(default)]
    pub maximum_estimated_portions: Option<f64>,
    #[serde(default = "default_true")]
    pub eligible_for_meal_plans: bool,
    #[validate(length(min = 1))]
    pub created_by_user: String,
    #[validate(length(min = 1))]
    pub components: Vec<MealComponentCreationInput>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MealComponentCreationInput {
    /// Id of the `meal_recipes` row
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub recipe_id: String,
    #[validate(length(min = 1))]
    pub component_type: String,
}
