use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::{DatabaseError, DbResult};
use crate::models::{QueryFilter, QueryFilteredResult, User, UserDatabaseCreationInput};
use crate::query::{search_query, ListQuery};
use crate::scan::{fetch_all_scanned, fetch_one_scanned, RowCursor, ScanRow};
use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{info, instrument};

const USERS_TABLE: &str = "users";

const USER_COLUMNS: &[&str] = &[
    "users.id",
    "users.username",
    "users.email_address",
    "users.hashed_password",
    "users.first_name",
    "users.last_name",
    "users.birthday",
    "users.created_at",
    "users.last_updated_at",
    "users.archived_at",
];

impl ScanRow for User {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(User {
            id: cursor.next()?,
            username: cursor.next()?,
            email_address: cursor.next()?,
            hashed_password: cursor.next()?,
            first_name: cursor.next()?,
            last_name: cursor.next()?,
            birthday: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
        })
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn user_exists(&self, user_id: &str) -> DbResult<bool>;

    async fn get_user(&self, user_id: &str) -> DbResult<User>;

    async fn get_user_by_username(&self, username: &str) -> DbResult<User>;

    async fn get_users(&self, filter: &QueryFilter) -> DbResult<QueryFilteredResult<User>>;

    async fn search_for_users_by_username(&self, query: &str) -> DbResult<Vec<User>>;

    /// Duplicate ids or usernames surface as [`DatabaseError::Conflict`]
    async fn create_user(
        &self,
        conn: &mut PgConnection,
        input: &UserDatabaseCreationInput,
    ) -> DbResult<User>;

    async fn update_user(&self, conn: &mut PgConnection, updated: &User) -> DbResult<()>;

    async fn archive_user(&self, conn: &mut PgConnection, user_id: &str) -> DbResult<()>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: DbContext,
}

impl PgUserRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip_all, fields(user.id = %user_id))]
    async fn user_exists(&self, user_id: &str) -> DbResult<bool> {
        require_id("user", user_id)?;

        self.db
            .exists(
                sqlx::query(
                    "SELECT EXISTS (SELECT 1 FROM users WHERE users.archived_at IS NULL AND users.id = $1)",
                )
                .bind(user_id),
                "checking user existence",
            )
            .await
    }

    #[instrument(skip_all, fields(user.id = %user_id))]
    async fn get_user(&self, user_id: &str) -> DbResult<User> {
        require_id("user", user_id)?;

        let sql = format!(
            "SELECT {} FROM users WHERE users.archived_at IS NULL AND users.id = $1",
            USER_COLUMNS.join(", ")
        );
        fetch_one_scanned(self.db.pool(), sqlx::query(&sql).bind(user_id), "fetching user").await
    }

    #[instrument(skip_all, fields(user.username = %username))]
    async fn get_user_by_username(&self, username: &str) -> DbResult<User> {
        if username.trim().is_empty() {
            return Err(DatabaseError::EmptyInput);
        }

        let sql = format!(
            "SELECT {} FROM users WHERE users.archived_at IS NULL AND users.username = $1",
            USER_COLUMNS.join(", ")
        );
        fetch_one_scanned(
            self.db.pool(),
            sqlx::query(&sql).bind(username),
            "fetching user by username",
        )
        .await
    }

    #[instrument(skip_all, fields(filter = %filter))]
    async fn get_users(&self, filter: &QueryFilter) -> DbResult<QueryFilteredResult<User>> {
        self.db
            .fetch_list(
                ListQuery::new(USERS_TABLE, USER_COLUMNS, filter),
                filter,
                "fetching users",
            )
            .await
    }

    #[instrument(skip_all, fields(query = %query))]
    async fn search_for_users_by_username(&self, query: &str) -> DbResult<Vec<User>> {
        if query.trim().is_empty() {
            return Err(DatabaseError::EmptyInput);
        }

        let built = search_query(USERS_TABLE, USER_COLUMNS, "username", query, None)?;
        fetch_all_scanned(self.db.pool(), built.query(), "searching users").await
    }

    #[instrument(skip_all, fields(user.id = %input.id))]
    async fn create_user(
        &self,
        conn: &mut PgConnection,
        input: &UserDatabaseCreationInput,
    ) -> DbResult<User> {
        validate_input(input)?;
        let created_at = self.db.now();

        perform_write(
            conn,
            sqlx::query(
                r#"
                INSERT INTO users (
                    id, username, email_address, hashed_password,
                    first_name, last_name, birthday, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&input.id)
            .bind(&input.username)
            .bind(&input.email_address)
            .bind(&input.hashed_password)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.birthday)
            .bind(created_at),
            "creating user",
        )
        .await?;

        info!("User created");

        Ok(User {
            id: input.id.clone(),
            username: input.username.clone(),
            email_address: input.email_address.clone(),
            hashed_password: input.hashed_password.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            birthday: input.birthday,
            created_at,
            last_updated_at: None,
            archived_at: None,
        })
    }

    #[instrument(skip_all, fields(user.id = %updated.id))]
    async fn update_user(&self, conn: &mut PgConnection, updated: &User) -> DbResult<()> {
        require_id("user", &updated.id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE users SET
                    username = $1,
                    email_address = $2,
                    hashed_password = $3,
                    first_name = $4,
                    last_name = $5,
                    birthday = $6,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND id = $7
                "#,
            )
            .bind(&updated.username)
            .bind(&updated.email_address)
            .bind(&updated.hashed_password)
            .bind(&updated.first_name)
            .bind(&updated.last_name)
            .bind(updated.birthday)
            .bind(&updated.id),
            "updating user",
        )
        .await?;

        info!("User updated");
        Ok(())
    }

    #[instrument(skip_all, fields(user.id = %user_id))]
    async fn archive_user(&self, conn: &mut PgConnection, user_id: &str) -> DbResult<()> {
        require_id("user", user_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE users SET archived_at = NOW() WHERE archived_at IS NULL AND id = $1",
            )
            .bind(user_id),
            "archiving user",
        )
        .await?;

        info!("User archived");
        Ok(())
    }
}
