//! Recipe database
//!
//! PostgreSQL data-access layer for the recipe and meal-planning backend.
//!
//! # Layout
//!
//! - [`repository`]: one capability trait per entity with a `Pg*` implementation.
//!   Reads go through the shared pool; writes take a `&mut PgConnection` so
//!   they compose inside [`tx::run_in_transaction`].
//! - [`query`]: list queries with `filtered_count`/`total_count` sub-counts,
//!   case-insensitive search, and `?` to `$N` placeholder rewriting.
//! - [`scan`]: positional row decoding into aggregates.
//! - [`finalizer`]: decides meal plan events from household votes and
//!   finalises plans.
//! - [`database`]: pool setup, readiness wait, embedded migrations.
//!
//! # Example
//!
//! ```ignore
//! use recipe_db::{Database, DatabaseConfig, QueryFilter, UserRepository};
//!
//! let config = DatabaseConfig::from_env()?;
//! let db = Database::connect(&config).await?;
//!
//! let users = db.users().get_users(&QueryFilter::new(1, 20)).await?;
//! println!("{} of {}", users.data.len(), users.total_count);
//! ```

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod finalizer;
pub mod models;
pub mod query;
pub mod repository;
pub mod scan;
pub mod session_store;
pub mod tx;
pub mod workers;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::DatabaseConfig;
pub use database::{Database, MIGRATOR};
pub use error::{DatabaseError, DbResult, ErrorKind};
pub use finalizer::{
    evaluate_meal_plan, FinalizationPlan, MealPlanFinalizer, OptionDecider, OptionWinner,
    SchulzeDecider,
};
pub use models::{QueryFilter, QueryFilteredResult, SortDirection};
pub use repository::{
    DbContext, HouseholdRepository, MealPlanEventRepository, MealPlanOptionRepository,
    MealPlanOptionVoteRepository, MealPlanRepository, MealRepository, RecipeRepository,
    RecipeStepRepository, UserRepository, ValidIngredientRepository,
};
pub use session_store::PgSessionStore;
pub use tx::run_in_transaction;
