use super::{parse_variant, UnknownVariant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Lifecycle of a meal plan; `Finalized` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealPlanStatus {
    AwaitingVotes,
    Finalized,
}

impl MealPlanStatus {
    const VARIANTS: [(&'static str, MealPlanStatus); 2] = [
        ("awaiting_votes", MealPlanStatus::AwaitingVotes),
        ("finalized", MealPlanStatus::Finalized),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MealPlanStatus::AwaitingVotes => "awaiting_votes",
            MealPlanStatus::Finalized => "finalized",
        }
    }
}

impl fmt::Display for MealPlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealPlanStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("meal plan status", s, &Self::VARIANTS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealName {
    Breakfast,
    SecondBreakfast,
    Brunch,
    Lunch,
    Supper,
    Dinner,
}

impl MealName {
    const VARIANTS: [(&'static str, MealName); 6] = [
        ("breakfast", MealName::Breakfast),
        ("second_breakfast", MealName::SecondBreakfast),
        ("brunch", MealName::Brunch),
        ("lunch", MealName::Lunch),
        ("supper", MealName::Supper),
        ("dinner", MealName::Dinner),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MealName::Breakfast => "breakfast",
            MealName::SecondBreakfast => "second_breakfast",
            MealName::Brunch => "brunch",
            MealName::Lunch => "lunch",
            MealName::Supper => "supper",
            MealName::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealName {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("meal name", s, &Self::VARIANTS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: String,
    pub notes: String,
    pub status: MealPlanStatus,
    pub voting_deadline: DateTime<Utc>,
    pub grocery_list_initialized: bool,
    pub tasks_created: bool,
    pub created_by_user: String,
    pub belongs_to_household: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    /// Ordered by start time; empty unless hydrated
    pub events: Vec<MealPlanEvent>,
}

impl MealPlan {
    pub fn is_finalized(&self) -> bool {
        self.status == MealPlanStatus::Finalized
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanEvent {
    pub id: String,
    pub notes: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub meal_name: MealName,
    pub belongs_to_meal_plan: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub options: Vec<MealPlanOption>,
}

impl MealPlanEvent {
    pub fn chosen_option(&self) -> Option<&MealPlanOption> {
        self.options.iter().find(|o| o.chosen)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanOption {
    pub id: String,
    pub assigned_cook: Option<String>,
    pub assigned_dishwasher: Option<String>,
    pub chosen: bool,
    pub tiebroken: bool,
    pub meal_scale: f64,
    pub meal_id: String,
    pub notes: String,
    pub belongs_to_meal_plan_event: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub votes: Vec<MealPlanOptionVote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanOptionVote {
    pub id: String,
    /// Lower is preferred
    pub rank: i32,
    pub abstain: bool,
    pub notes: String,
    pub by_user: String,
    pub belongs_to_meal_plan_option: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MealPlanDatabaseCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub notes: String,
    pub voting_deadline: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub created_by_user: String,
    #[validate(length(min = 1))]
    pub belongs_to_household: String,
    #[serde(default)]
    pub events: Vec<MealPlanEventDatabaseCreationInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_event_window"))]
pub struct MealPlanEventDatabaseCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub notes: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub meal_name: MealName,
    #[validate(length(min = 1))]
    pub belongs_to_meal_plan: String,
    #[serde(default)]
    pub options: Vec<MealPlanOptionDatabaseCreationInput>,
}

fn validate_event_window(
    input: &MealPlanEventDatabaseCreationInput,
) -> Result<(), ValidationError> {
    if input.starts_at < input.ends_at {
        Ok(())
    } else {
        Err(ValidationError::new("event_ends_before_it_starts"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MealPlanOptionDatabaseCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub assigned_cook: Option<String>,
    #[serde(default)]
    pub assigned_dishwasher: Option<String>,
    #[validate(range(min = 0.0))]
    pub meal_scale: f64,
    #[validate(length(min = 1))]
    pub meal_id: String,
    #[serde(default)]
    pub notes: String,
    #[validate(length(min = 1))]
    pub belongs_to_meal_plan_event: String,
}

/// One voter's full ballot for an event
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MealPlanOptionVotesDatabaseCreationInput {
    #[validate(length(min = 1))]
    pub by_user: String,
    #[validate(length(min = 1))]
    pub votes: Vec<MealPlanOptionVoteCreationInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MealPlanOptionVoteCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(range(min = 0))]
    pub rank: i32,
    #[serde(default)]
    pub abstain: bool,
    #[serde(default)]
    pub notes: String,
    #[validate(length(min = 1))]
    pub belongs_to_meal_plan_option: String,
}
