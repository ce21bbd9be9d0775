use super::{parse_variant, UnknownVariant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdRole {
    HouseholdAdmin,
    HouseholdMember,
}

impl HouseholdRole {
    const VARIANTS: [(&'static str, HouseholdRole); 2] = [
        ("household_admin", HouseholdRole::HouseholdAdmin),
        ("household_member", HouseholdRole::HouseholdMember),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HouseholdRole::HouseholdAdmin => "household_admin",
            HouseholdRole::HouseholdMember => "household_member",
        }
    }
}

impl fmt::Display for HouseholdRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HouseholdRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("household role", s, &Self::VARIANTS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub id: String,
    pub name: String,
    pub contact_phone: String,
    pub time_zone: String,
    pub belongs_to_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    /// Populated by single-household reads
    pub members: Vec<HouseholdUserMembership>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdUserMembership {
    pub id: String,
    pub belongs_to_household: String,
    pub belongs_to_user: String,
    pub household_role: HouseholdRole,
    pub default_household: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HouseholdDatabaseCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[serde(default)]
    pub contact_phone: String,
    #[validate(length(min = 1))]
    pub time_zone: String,
    #[validate(length(min = 1))]
    pub belongs_to_user: String,
    /// Id for the owner's admin membership row
    #[validate(length(min = 1))]
    pub owner_membership_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HouseholdUserMembershipCreationInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub belongs_to_household: String,
    #[validate(length(min = 1))]
    pub belongs_to_user: String,
    pub household_role: HouseholdRole,
}
