use super::{perform_write, require_id, validate_input, DbContext};
use crate::error::DbResult;
use crate::models::{
    MealPlanOptionVote, MealPlanOptionVotesDatabaseCreationInput, QueryFilter,
    QueryFilteredResult,
};
use crate::query::{Join, ListQuery};
use crate::scan::{fetch_all_scanned, fetch_one_scanned, RowCursor, ScanRow};
use crate::tx::run_in_transaction;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

const MEAL_PLAN_OPTION_VOTES_TABLE: &str = "meal_plan_option_votes";

const MEAL_PLAN_OPTION_VOTE_COLUMNS: &[&str] = &[
    "meal_plan_option_votes.id",
    "meal_plan_option_votes.rank",
    "meal_plan_option_votes.abstain",
    "meal_plan_option_votes.notes",
    "meal_plan_option_votes.by_user",
    "meal_plan_option_votes.belongs_to_meal_plan_option",
    "meal_plan_option_votes.created_at",
    "meal_plan_option_votes.last_updated_at",
    "meal_plan_option_votes.archived_at",
];

const PARENT_OPTION: Join<'static> = Join {
    table: "meal_plan_options",
    column: "id",
    references: "meal_plan_option_votes.belongs_to_meal_plan_option",
    live_only: true,
};

const PARENT_EVENT: Join<'static> = Join {
    table: "meal_plan_events",
    column: "id",
    references: "meal_plan_options.belongs_to_meal_plan_event",
    live_only: true,
};

/// Joins a vote up to its plan; every level must be live
const VOTE_ANCESTRY: &str = r#"
    FROM meal_plan_option_votes
    JOIN meal_plan_options ON meal_plan_option_votes.belongs_to_meal_plan_option = meal_plan_options.id
    JOIN meal_plan_events ON meal_plan_options.belongs_to_meal_plan_event = meal_plan_events.id
    JOIN meal_plans ON meal_plan_events.belongs_to_meal_plan = meal_plans.id
    WHERE meal_plan_option_votes.archived_at IS NULL
        AND meal_plan_options.archived_at IS NULL
        AND meal_plan_events.archived_at IS NULL
        AND meal_plans.archived_at IS NULL
        AND meal_plans.id = $1
        AND meal_plan_events.id = $2
        AND meal_plan_options.id = $3
        AND meal_plan_option_votes.id = $4
"#;

impl ScanRow for MealPlanOptionVote {
    fn scan(cursor: &mut RowCursor<'_>) -> Result<Self, sqlx::Error> {
        Ok(MealPlanOptionVote {
            id: cursor.next()?,
            rank: cursor.next()?,
            abstain: cursor.next()?,
            notes: cursor.next()?,
            by_user: cursor.next()?,
            belongs_to_meal_plan_option: cursor.next()?,
            created_at: cursor.next()?,
            last_updated_at: cursor.next()?,
            archived_at: cursor.next()?,
        })
    }
}

/// Live votes on one option, oldest first
pub(super) async fn fetch_votes_for_option(
    pool: &PgPool,
    option_id: &str,
) -> DbResult<Vec<MealPlanOptionVote>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM meal_plan_option_votes
        WHERE meal_plan_option_votes.archived_at IS NULL
            AND meal_plan_option_votes.belongs_to_meal_plan_option = $1
        ORDER BY meal_plan_option_votes.created_at, meal_plan_option_votes.id
        "#,
        MEAL_PLAN_OPTION_VOTE_COLUMNS.join(", ")
    );
    fetch_all_scanned(
        pool,
        sqlx::query(&sql).bind(option_id),
        "fetching meal plan option votes",
    )
    .await
}

#[async_trait]
pub trait MealPlanOptionVoteRepository: Send + Sync {
    async fn meal_plan_option_vote_exists(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
        vote_id: &str,
    ) -> DbResult<bool>;

    async fn get_meal_plan_option_vote(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
        vote_id: &str,
    ) -> DbResult<MealPlanOptionVote>;

    async fn get_meal_plan_option_votes(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<MealPlanOptionVote>>;

    /// Writes one voter's ballot; either every vote lands or none does
    async fn create_meal_plan_option_votes(
        &self,
        conn: &mut PgConnection,
        input: &MealPlanOptionVotesDatabaseCreationInput,
    ) -> DbResult<Vec<MealPlanOptionVote>>;

    async fn update_meal_plan_option_vote(
        &self,
        conn: &mut PgConnection,
        updated: &MealPlanOptionVote,
    ) -> DbResult<()>;

    async fn archive_meal_plan_option_vote(
        &self,
        conn: &mut PgConnection,
        meal_plan_option_id: &str,
        vote_id: &str,
    ) -> DbResult<()>;
}

#[derive(Clone)]
pub struct PgMealPlanOptionVoteRepository {
    db: DbContext,
}

impl PgMealPlanOptionVoteRepository {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealPlanOptionVoteRepository for PgMealPlanOptionVoteRepository {
    #[instrument(skip_all, fields(
        meal_plan.id = %meal_plan_id,
        meal_plan_event.id = %meal_plan_event_id,
        meal_plan_option.id = %meal_plan_option_id,
        meal_plan_option_vote.id = %vote_id
    ))]
    async fn meal_plan_option_vote_exists(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
        vote_id: &str,
    ) -> DbResult<bool> {
        require_id("meal plan", meal_plan_id)?;
        require_id("meal plan event", meal_plan_event_id)?;
        require_id("meal plan option", meal_plan_option_id)?;
        require_id("meal plan option vote", vote_id)?;

        let sql = format!("SELECT EXISTS (SELECT 1 {VOTE_ANCESTRY})");
        self.db
            .exists(
                sqlx::query(&sql)
                    .bind(meal_plan_id)
                    .bind(meal_plan_event_id)
                    .bind(meal_plan_option_id)
                    .bind(vote_id),
                "checking meal plan option vote existence",
            )
            .await
    }

    #[instrument(skip_all, fields(
        meal_plan.id = %meal_plan_id,
        meal_plan_event.id = %meal_plan_event_id,
        meal_plan_option.id = %meal_plan_option_id,
        meal_plan_option_vote.id = %vote_id
    ))]
    async fn get_meal_plan_option_vote(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
        vote_id: &str,
    ) -> DbResult<MealPlanOptionVote> {
        require_id("meal plan", meal_plan_id)?;
        require_id("meal plan event", meal_plan_event_id)?;
        require_id("meal plan option", meal_plan_option_id)?;
        require_id("meal plan option vote", vote_id)?;

        let sql = format!(
            "SELECT {} {VOTE_ANCESTRY}",
            MEAL_PLAN_OPTION_VOTE_COLUMNS.join(", ")
        );
        fetch_one_scanned(
            self.db.pool(),
            sqlx::query(&sql)
                .bind(meal_plan_id)
                .bind(meal_plan_event_id)
                .bind(meal_plan_option_id)
                .bind(vote_id),
            "fetching meal plan option vote",
        )
        .await
    }

    #[instrument(skip_all, fields(
        meal_plan.id = %meal_plan_id,
        meal_plan_event.id = %meal_plan_event_id,
        meal_plan_option.id = %meal_plan_option_id,
        filter = %filter
    ))]
    async fn get_meal_plan_option_votes(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        meal_plan_option_id: &str,
        filter: &QueryFilter,
    ) -> DbResult<QueryFilteredResult<MealPlanOptionVote>> {
        require_id("meal plan", meal_plan_id)?;
        require_id("meal plan event", meal_plan_event_id)?;
        require_id("meal plan option", meal_plan_option_id)?;

        self.db
            .fetch_list(
                ListQuery::new(
                    MEAL_PLAN_OPTION_VOTES_TABLE,
                    MEAL_PLAN_OPTION_VOTE_COLUMNS,
                    filter,
                )
                .join(PARENT_OPTION)
                .join(PARENT_EVENT)
                .owned_by("belongs_to_meal_plan_option", meal_plan_option_id)
                .within("meal_plan_options.belongs_to_meal_plan_event", meal_plan_event_id)
                .within("meal_plan_events.belongs_to_meal_plan", meal_plan_id),
                filter,
                "fetching meal plan option votes",
            )
            .await
    }

    #[instrument(skip_all, fields(user.id = %input.by_user, votes = input.votes.len()))]
    async fn create_meal_plan_option_votes(
        &self,
        conn: &mut PgConnection,
        input: &MealPlanOptionVotesDatabaseCreationInput,
    ) -> DbResult<Vec<MealPlanOptionVote>> {
        validate_input(input)?;
        for vote in &input.votes {
            validate_input(vote)?;
        }
        let created_at = self.db.now();
        let input = input.clone();

        let votes = run_in_transaction(conn, move |tx| {
            Box::pin(async move {
                let mut votes = Vec::with_capacity(input.votes.len());
                for vote in input.votes {
                    perform_write(
                        &mut *tx,
                        sqlx::query(
                            r#"
                            INSERT INTO meal_plan_option_votes (
                                id, rank, abstain, notes, by_user, belongs_to_meal_plan_option, created_at
                            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                            "#,
                        )
                        .bind(&vote.id)
                        .bind(vote.rank)
                        .bind(vote.abstain)
                        .bind(&vote.notes)
                        .bind(&input.by_user)
                        .bind(&vote.belongs_to_meal_plan_option)
                        .bind(created_at),
                        "creating meal plan option vote",
                    )
                    .await?;

                    votes.push(MealPlanOptionVote {
                        id: vote.id,
                        rank: vote.rank,
                        abstain: vote.abstain,
                        notes: vote.notes,
                        by_user: input.by_user.clone(),
                        belongs_to_meal_plan_option: vote.belongs_to_meal_plan_option,
                        created_at,
                        last_updated_at: None,
                        archived_at: None,
                    });
                }
                Ok(votes)
            })
        })
        .await?;

        info!("Meal plan option votes created");
        Ok(votes)
    }

    #[instrument(skip_all, fields(meal_plan_option_vote.id = %updated.id))]
    async fn update_meal_plan_option_vote(
        &self,
        conn: &mut PgConnection,
        updated: &MealPlanOptionVote,
    ) -> DbResult<()> {
        require_id("meal plan option vote", &updated.id)?;

        perform_write(
            conn,
            sqlx::query(
                r#"
                UPDATE meal_plan_option_votes SET
                    rank = $1,
                    abstain = $2,
                    notes = $3,
                    last_updated_at = NOW()
                WHERE archived_at IS NULL AND belongs_to_meal_plan_option = $4 AND id = $5
                "#,
            )
            .bind(updated.rank)
            .bind(updated.abstain)
            .bind(&updated.notes)
            .bind(&updated.belongs_to_meal_plan_option)
            .bind(&updated.id),
            "updating meal plan option vote",
        )
        .await?;

        info!("Meal plan option vote updated");
        Ok(())
    }

    #[instrument(skip_all, fields(meal_plan_option.id = %meal_plan_option_id, meal_plan_option_vote.id = %vote_id))]
    async fn archive_meal_plan_option_vote(
        &self,
        conn: &mut PgConnection,
        meal_plan_option_id: &str,
        vote_id: &str,
    ) -> DbResult<()> {
        require_id("meal plan option", meal_plan_option_id)?;
        require_id("meal plan option vote", vote_id)?;

        perform_write(
            conn,
            sqlx::query(
                "UPDATE meal_plan_option_votes SET archived_at = NOW() WHERE archived_at IS NULL AND belongs_to_meal_plan_option = $1 AND id = $2",
            )
            .bind(meal_plan_option_id)
            .bind(vote_id),
            "archiving meal plan option vote",
        )
        .await?;

        info!("Meal plan option vote archived");
        Ok(())
    }
}
