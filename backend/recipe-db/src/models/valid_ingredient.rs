use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A site-wide ingredient definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidIngredient {
    pub id: String,
    pub name: String,
    pub plural_name: String,
    pub description: String,
    pub warning: String,
    pub icon_path: String,
    pub upc: Option<String>,
    pub minimum_ideal_storage_temperature_in_celsius: Option<f64>,
    pub maximum_ideal_storage_temperature_in_celsius: Option<f64>,
    pub is_liquid: bool,
    pub animal_derived: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ValidIngredientDatabaseCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[serde(default)]
    pub plural_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub warning: String,
    #[serde(default)]
    pub icon_path: String,
    #[validate(length(min = 1, max = 32))]
    #[serde(default)]
    pub upc: Option<String>,
    #[serde(default)]
    pub minimum_ideal_storage_temperature_in_celsius: Option<f64>,
    #[serde(default)]
    pub maximum_ideal_storage_temperature_in_celsius: Option<f64>,
    #[serde(default)]
    pub is_liquid: bool,
    #[serde(default)]
    pub animal_derived: bool,
}
