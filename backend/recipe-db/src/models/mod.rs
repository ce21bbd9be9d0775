//! Domain aggregates and their creation inputs

pub mod filter;
pub mod household;
pub mod meal;
pub mod meal_plan;
pub mod recipe;
pub mod user;
pub mod valid_ingredient;

pub use filter::{QueryFilter, QueryFilteredResult, SortDirection, DEFAULT_LIMIT, MAX_LIMIT, SEARCH_LIMIT};
pub use household::{
    Household, HouseholdDatabaseCreationInput, HouseholdRole, HouseholdUserMembership,
    HouseholdUserMembershipCreationInput,
};
pub use meal::{Meal, MealComponent, MealComponentCreationInput, MealDatabaseCreationInput};
pub use meal_plan::{
    MealName, MealPlan, MealPlanDatabaseCreationInput, MealPlanEvent,
    MealPlanEventDatabaseCreationInput, MealPlanOption, MealPlanOptionDatabaseCreationInput,
    MealPlanOptionVote, MealPlanOptionVoteCreationInput, MealPlanOptionVotesDatabaseCreationInput,
    MealPlanStatus,
};
pub use recipe::{Recipe, RecipeDatabaseCreationInput, RecipeStep, RecipeStepDatabaseCreationInput};
pub use user::{User, UserDatabaseCreationInput};
pub use valid_ingredient::{ValidIngredient, ValidIngredientDatabaseCreationInput};

use std::fmt;

/// Returned when a stored enum column holds an unknown value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Shared plumbing for text-backed enums
pub(crate) fn parse_variant<T: Copy>(
    kind: &'static str,
    value: &str,
    variants: &[(&'static str, T)],
) -> Result<T, UnknownVariant> {
    variants
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, variant)| *variant)
        .ok_or_else(|| UnknownVariant {
            kind,
            value: value.to_string(),
        })
}

