use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::DbResult;
use crate::models::{
    Household, HouseholdDatabaseCreationInput, HouseholdRole, HouseholdUserMembership,
    HouseholdUserMembershipCreationInput, QueryFilter, QueryFilteredResult,
};
use crate::query::{Join, ListQuery};
use crate::scan::{fetch_all_scanned, fetch_one_scanned, RowCursor, ScanRow};
use crate::tx::run_in_transaction;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{info, instrument};

const HOUSEHOLDS_TABLE: &str = "households";

const LIVE_MEMBERSHIPS: Join<'static> = Join {
    table: "household_user_memberships",
    column: "belongs_to_household",
    references: "households.id",
    live_only: true,
};

const HOUSEHOLD_COLUMNS: &[&str] = &[
    "households.id",
    "households.name",
    "households.contact_phone",
    "households.time_zone",
    "households.belongs_to_user",
    "households.created_at",
    "households.last_updated_at",
    "households.archived_at",
];

const MEMBERSHIP_COLUMNS: &str = "household_user_memberships.id, \
    household_user_memberships.belongs_to_household, \
    household_user_memberships.belongs_to_user, \
    household_user_memberships.household_role, \
    household_user_memberships.default_household, \
    household_user_memberships.created_at, \
    household_user_memberships.last_updated_at, \
    household_user_memberships.archived_at";

impl ScanRow for Household {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(Household {
            id: cursor.next()?,
            name: cursor.next()?,
            contact_phone: cursor.next()?,
            time_zone: cursor.next()?,
            belongs_to_user: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
            members: Vec::new(),
        })
    }
}

impl ScanRow for HouseholdUserMembership {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(HouseholdUserMembership {
            id: cursor.next()?,
            belongs_to_household: cursor.next()?,
            belongs_to_user: cursor.next()?,
            household_role: cursor.next_parsed()?,
            default_household: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
        })
    }
}

#[async_trait]
pub trait HouseholdRepository: Send + Sync {
    async fn household_exists(&self, household_id: &str) -> DbResult<bool>;

    /// Loads the household and its live memberships
    async fn get_household(&self, household_id: &str) -> DbResult<Household>;

    /// Households `user_id` belongs to, owned or joined
    async fn get_households(
        &self,
        user_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<Household>>;

    /// Creates the household and the owner's admin membership atomically
    async fn create_household(
        &self,
        conn: &mut PgConnection,
        input: &HouseholdDatabaseCreationInput,
    ) -> DbResult<Household>;

    async fn update_household(&self, conn: &mut PgConnection, updated: &Household)
        -> DbResult<()>;

    async fn archive_household(
        &self,
        conn: &mut PgConnection,
        household_id: &str,
        user_id: &str,
    ) -> DbResult<()>;

    async fn add_user_to_household(
        &self,
        conn: &mut PgConnection,
        input: &HouseholdUserMembershipCreationInput,
    ) -> DbResult<HouseholdUserMembership>;

    async fn remove_user_from_household(
        &self,
        conn: &mut PgConnection,
        household_id: &str,
        user_id: &str,
    ) -> DbResult<()>;

    async fn get_household_members(
        &self,
        household_id: &str,
    ) -> DbResult<Vec<HouseholdUserMembership>>;
}

#[derive(Clone)]
pub struct PgHouseholdRepository {
    db: DbContext,
}

impl PgHouseholdRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }
}

async fn insert_membership(
    conn: &mut PgConnection,
    input: &HouseholdUserMembershipCreationInput,
    default_household: bool,
    created_at: DateTime<Utc>,
) -> DbResult<HouseholdUserMembership> {
    perform_write(
        conn,
        sqlx::query(
            r#"
            INSERT INTO household_user_memberships (
                id, belongs_to_household, belongs_to_user, household_role, default_household, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&input.id)
        .bind(&input.belongs_to_household)
        .bind(&input.belongs_to_user)
        .bind(input.household_role.as_str())
        .bind(default_household)
        .bind(created_at),
        "adding user to household",
    )
    .await?;

    Ok(HouseholdUserMembership {
        id: input.id.clone(),
        belongs_to_household: input.belongs_to_household.clone(),
        belongs_to_user: input.belongs_to_user.clone(),
        household_role: input.household_role,
        default_household,
        created_at,
        last_updated_at: None,
        archived_at: None,
    })
}

#[async_trait]
impl HouseholdRepository for PgHouseholdRepository {
    #[instrument(skip_all, fields(household.id = %household_id))]
    async fn household_exists(&self, household_id: &str) -> DbResult<bool> {
        require_id("household", household_id)?;

        self.db
            .exists(
                sqlx::query(
                    "SELECT EXISTS (SELECT 1 FROM households WHERE households.archived_at IS NULL AND households.id = $1)",
                )
                .bind(household_id),
                "checking household existence",
            )
            .await
    }

    #[instrument(skip_all, fields(household.id = %household_id))]
    async fn get_household(&self, household_id: &str) -> DbResult<Household> {
        require_id("household", household_id)?;

        let sql = format!(
            "SELECT {} FROM households WHERE households.archived_at IS NULL AND households.id = $1",
            HOUSEHOLD_COLUMNS.join(", ")
        );
        let mut household: Household =
            fetch_one_scanned(self.db.pool(), sqlx::query(&sql).bind(household_id), "fetching household")
                .await?;

        household.members = self.get_household_members(household_id).await?;
        Ok(household)
    }

    #[instrument(skip_all, fields(user.id = %user_id, filter = %filter))]
    async fn get_households(
        &self,
        user_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<Household>> {
        require_id("user", user_id)?;

        self.db
            .fetch_list(
                ListQuery::new(HOUSEHOLDS_TABLE, HOUSEHOLD_COLUMNS, filter)
                    .join(LIVE_MEMBERSHIPS)
                    .owned_by("household_user_memberships.belongs_to_user", user_id),
                filter,
                "fetching households",
            )
            .await
    }

    #[instrument(skip_all, fields(household.id = %input.id, user.id = %input.belongs_to_user))]
    async fn create_household(
        &self,
        conn: &mut PgConnection,
        input: &HouseholdDatabaseCreationInput,
    ) -> DbResult<Household> {
        validate_input(input)?;
        let created_at = self.db.now();
        let input = input.clone();

        let household = run_in_transaction(conn, move |tx| {
            Box::pin(async move {
                perform_write(
                    &mut *tx,
                    sqlx::query(
                        r#"
                        INSERT INTO households (
                            id, name, contact_phone, time_zone, belongs_to_user, created_at
                        ) VALUES ($1, $2, $3, $4, $5, $6)
                        "#,
                    )
                    .bind(&input.id)
                    .bind(&input.name)
                    .bind(&input.contact_phone)
                    .bind(&input.time_zone)
                    .bind(&input.belongs_to_user)
                    .bind(created_at),
                    "creating household",
                )
                .await?;

                let owner = insert_membership(
                    &mut *tx,
                    &HouseholdUserMembershipCreationInput {
                        id: input.owner_membership_id.clone(),
                        belongs_to_household: input.id.clone(),
                        belongs_to_user: input.belongs_to_user.clone(),
                        household_role: HouseholdRole::HouseholdAdmin,
                    },
                    true,
                    created_at,
                )
                .await?;

                Ok(Household {
                    id: input.id,
                    name: input.name,
                    contact_phone: input.contact_phone,
                    time_zone: input.time_zone,
                    belongs_to_user: input.belongs_to_user,
                    created_at,
                    last_updated_at: None,
                    archived_at: None,
                    members: vec![owner],
                })
            })
        })
        .await?;

        info!("Household created");
        Ok(household)
    }

    #[instrument(skip_all, fields(household.id = %updated.id))]
    async fn update_household(
        &self,
        conn: &mut PgConnection,
        updated: &Household,
    ) -> DbResult<()> {
        require_id("household", &updated.id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE households SET
                    name = $1,
                    contact_phone = $2,
                    time_zone = $3,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND belongs_to_user = $4 AND id = $5
                "#,
            )
            .bind(&updated.name)
            .bind(&updated.contact_phone)
            .bind(&updated.time_zone)
            .bind(&updated.belongs_to_user)
            .bind(&updated.id),
            "updating household",
        )
        .await?;

        info!("Household updated");
        Ok(())
    }

    #[instrument(skip_all, fields(household.id = %household_id, user.id = %user_id))]
    async fn archive_household(
        &self,
        conn: &mut PgConnection,
        household_id: &str,
        user_id: &str,
    ) -> DbResult<()> {
        require_id("household", household_id)?;
        require_id("user", user_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE households SET archived_at = NOW() WHERE archived_at IS NULL AND belongs_to_user = $1 AND id = $2",
            )
            .bind(user_id)
            .bind(household_id),
            "archiving household",
        )
        .await?;

        info!("Household archived");
        Ok(())
    }

    #[instrument(skip_all, fields(household.id = %input.belongs_to_household, user.id = %input.belongs_to_user))]
    async fn add_user_to_household(
        &self,
        conn: &mut PgConnection,
        input: &HouseholdUserMembershipCreationInput,
    ) -> DbResult<HouseholdUserMembership> {
        validate_input(input)?;

        let membership = insert_membership(conn, input, false, self.db.now()).await?;
        info!("User added to household");
        Ok(membership)
    }

    #[instrument(skip_all, fields(household.id = %household_id, user.id = %user_id))]
    async fn remove_user_from_household(
        &self,
        conn: &mut PgConnection,
        household_id: &str,
        user_id: &str,
    ) -> DbResult<()> {
        require_id("household", household_id)?;
        require_id("user", user_id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE household_user_memberships SET archived_at = NOW()
                WHERE archived_at IS NULL AND belongs_to_household = $1 AND belongs_to_user = $2
                "#,
            )
            .bind(household_id)
            .bind(user_id),
            "removing user from household",
        )
        .await?;

        info!("User removed from household");
        Ok(())
    }

    #[instrument(skip_all, fields(household.id = %household_id))]
    async fn get_household_members(
        &self,
        household_id: &str,
    ) -> DbResult<Vec<HouseholdUserMembership>> {
        require_id("household", household_id)?;

        let sql = format!(
            r#"
            SELECT {MEMBERSHIP_COLUMNS}
            FROM household_user_memberships
            JOIN users ON users.id = household_user_memberships.belongs_to_user
            WHERE household_user_memberships.archived_at IS NULL
                AND users.archived_at IS NULL
                AND household_user_memberships.belongs_to_household = $1
            ORDER BY household_user_memberships.created_at, household_user_memberships.id
            "#
        );
        fetch_all_scanned(
            self.db.pool(),
            sqlx::query(&sql).bind(household_id),
            "fetching household members",
        )
        .await
    }
}
