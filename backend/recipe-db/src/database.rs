//! Connection lifecycle and the repository set
//!
//! [`Database::connect`] builds the pool, waits for the server to answer
//! and runs the embedded migrations when configured to.

use crate::clock::{Clock, SystemClock};
use crate::config::DatabaseConfig;
use crate::error::{DatabaseError, DbResult};
use crate::finalizer::{MealPlanFinalizer, OptionDecider, SchulzeDecider};
use crate::repository::{
    DbContext, PgHouseholdRepository, PgMealPlanEventRepository, PgMealPlanOptionRepository,
    PgMealPlanOptionVoteRepository, PgMealPlanRepository, PgMealRepository,
    PgRecipeRepository, PgRecipeStepRepository, PgUserRepository, PgValidIngredientRepository,
};
use crate::session_store::PgSessionStore;
use db_pool::{acquire_with_metrics, create_pool, migrate, wait_until_ready};
use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

pub const SERVICE_NAME: &str = "recipe-db";

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// The embedded schema, applied in version order
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Migrations run at most once per process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Entry point for hosts: owns the pool and hands out repositories
#[derive(Clone)]
pub struct Database {
    ctx: DbContext,
    decider: Arc<dyn OptionDecider>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        Self::connect_with_clock(config, Arc::new(SystemClock)).await
    }

    #[instrument(skip_all, fields(run_migrations = config.run_migrations))]
    pub async fn connect_with_clock(
        config: &DatabaseConfig,
        clock: Arc<dyn Clock>,
    ) -> DbResult<Self> {
        config.validate().map_err(DatabaseError::InvalidInput)?;

        let pool_config = config.to_pool_config(SERVICE_NAME);
        pool_config.log_config();
        let pool = create_pool(&pool_config)?;

        wait_until_ready(
            &pool,
            config.max_ping_attempts,
            config.ping_wait_period,
            PING_TIMEOUT,
        )
        .await?;

        let database = Self::from_pool(pool, clock);
        if config.run_migrations {
            database.migrate().await?;
        }

        Ok(database)
    }

    /// Wrap an existing pool; no readiness check or migration
    pub fn from_pool(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            ctx: DbContext::new(pool, clock),
            decider: Arc::new(SchulzeDecider),
        }
    }

    /// Replace the ranked-choice rule used by [`Database::finalizer`]
    pub fn with_decider(mut self, decider: Arc<dyn OptionDecider>) -> Self {
        self.decider = decider;
        self
    }

    /// Apply pending migrations, once per process
    pub async fn migrate(&self) -> DbResult<()> {
        MIGRATED
            .get_or_try_init(|| async {
                migrate(self.pool(), &MIGRATOR).await?;
                Ok::<_, DatabaseError>(())
            })
            .await?;

        info!(
            versions = MIGRATOR.iter().count(),
            "Database schema is current"
        );
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        self.ctx.pool()
    }

    pub fn context(&self) -> &DbContext {
        &self.ctx
    }

    /// Check out a connection for a repository write
    pub async fn acquire(&self) -> DbResult<PoolConnection<Postgres>> {
        acquire_with_metrics(self.pool(), SERVICE_NAME)
            .await
            .map_err(DatabaseError::context("acquiring connection"))
    }

    pub async fn close(&self) {
        self.pool().close().await;
    }

    pub fn users(&self) -> PgUserRepository {
        PgUserRepository::new(self.ctx.clone())
    }

    pub fn households(&self) -> PgHouseholdRepository {
        PgHouseholdRepository::new(self.ctx.clone())
    }

    pub fn valid_ingredients(&self) -> PgValidIngredientRepository {
        PgValidIngredientRepository::new(self.ctx.clone())
    }

    pub fn recipes(&self) -> PgRecipeRepository {
        PgRecipeRepository::new(self.ctx.clone())
    }

    pub fn recipe_steps(&self) -> PgRecipeStepRepository {
        PgRecipeStepRepository::new(self.ctx.clone())
    }

    pub fn meals(&self) -> PgMealRepository {
        PgMealRepository::new(self.ctx.clone())
    }

    pub fn meal_plans(&self) -> PgMealPlanRepository {
        PgMealPlanRepository::new(self.ctx.clone())
    }

    pub fn meal_plan_events(&self) -> PgMealPlanEventRepository {
        PgMealPlanEventRepository::new(self.ctx.clone())
    }

    pub fn meal_plan_options(&self) -> PgMealPlanOptionRepository {
        PgMealPlanOptionRepository::new(self.ctx.clone())
    }

    pub fn meal_plan_option_votes(&self) -> PgMealPlanOptionVoteRepository {
        PgMealPlanOptionVoteRepository::new(self.ctx.clone())
    }

    pub fn finalizer(&self) -> MealPlanFinalizer {
        MealPlanFinalizer::new(
            self.pool().clone(),
            Arc::new(self.households()),
            Arc::new(self.meal_plans()),
            Arc::new(self.meal_plan_options()),
            Arc::clone(&self.decider),
        )
    }

    /// Session storage on the same pool
    pub fn session_store(&self) -> PgSessionStore {
        PgSessionStore::new(self.pool().clone(), self.ctx.clock())
    }
}
