//! Meal plan finalisation
//!
//! A plan awaits votes until every event that offers options has a chosen
//! option, then flips to `finalized` for good. [`evaluate_meal_plan`]
//! decides what should change; [`MealPlanFinalizer`] loads the plan and
//! applies those writes in one transaction.

mod decider;

pub use decider::{OptionDecider, OptionWinner, SchulzeDecider};

use crate::error::DbResult;
use crate::models::{HouseholdUserMembership, MealPlan};
use crate::repository::{
    require_id, HouseholdRepository, MealPlanOptionRepository, MealPlanRepository,
};
use crate::tx::run_in_transaction;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One event's winning option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSelection {
    pub event_id: String,
    pub option_id: String,
    pub tiebroken: bool,
}

/// The writes a finalisation pass should make
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizationPlan {
    pub option_selections: Vec<OptionSelection>,
    /// Every event with options is resolved after this pass
    pub finalize_plan: bool,
}

impl FinalizationPlan {
    pub fn is_noop(&self) -> bool {
        self.option_selections.is_empty() && !self.finalize_plan
    }
}

/// Who has to have voted before an event may be decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turnout {
    /// Every household member cast a non-abstain vote on the event
    AllMembers,
    /// Voting closed; decide on whatever was cast
    VotesCast,
}

/// Work out which options win and whether the plan is done
///
/// Events without options are skipped. An event that already has a chosen
/// option counts as resolved. An event is decided only once every member
/// has cast at least one non-abstain vote on it.
pub fn evaluate_meal_plan(
    plan: &MealPlan,
    members: &[HouseholdUserMembership],
    decider: &dyn OptionDecider,
) -> FinalizationPlan {
    evaluate(plan, members, decider, Turnout::AllMembers)
}

/// Like [`evaluate_meal_plan`] for a plan whose voting deadline passed
///
/// Absent voters no longer block; events nobody voted on stay unresolved.
pub fn evaluate_expired_meal_plan(plan: &MealPlan, decider: &dyn OptionDecider) -> FinalizationPlan {
    evaluate(plan, &[], decider, Turnout::VotesCast)
}

fn evaluate(
    plan: &MealPlan,
    members: &[HouseholdUserMembership],
    decider: &dyn OptionDecider,
    turnout: Turnout,
) -> FinalizationPlan {
    let mut outcome = FinalizationPlan::default();
    let mut all_resolved = true;

    for event in &plan.events {
        if event.options.is_empty() {
            continue;
        }

        if event.chosen_option().is_some() {
            continue;
        }

        if turnout == Turnout::AllMembers {
            let voted: HashSet<&str> = event
                .options
                .iter()
                .flat_map(|o| o.votes.iter())
                .filter(|v| !v.abstain)
                .map(|v| v.by_user.as_str())
                .collect();

            let missing = members
                .iter()
                .filter(|m| !voted.contains(m.belongs_to_user.as_str()))
                .count();
            if missing > 0 {
                debug!(meal_plan_event.id = %event.id, missing, "Event still awaiting votes");
                all_resolved = false;
                continue;
            }
        }

        match decider.decide(&event.options) {
            Some(winner) => outcome.option_selections.push(OptionSelection {
                event_id: event.id.clone(),
                option_id: winner.option_id,
                tiebroken: winner.tiebroken,
            }),
            None => {
                debug!(meal_plan_event.id = %event.id, "No option could be chosen");
                all_resolved = false;
            }
        }
    }

    outcome.finalize_plan = all_resolved;
    outcome
}

/// Loads plans, evaluates them and applies the result atomically
#[derive(Clone)]
pub struct MealPlanFinalizer {
    pool: PgPool,
    households: Arc<dyn HouseholdRepository>,
    meal_plans: Arc<dyn MealPlanRepository>,
    options: Arc<dyn MealPlanOptionRepository>,
    decider: Arc<dyn OptionDecider>,
}

impl MealPlanFinalizer {
    pub fn new(
        pool: PgPool,
        households: Arc<dyn HouseholdRepository>,
        meal_plans: Arc<dyn MealPlanRepository>,
        options: Arc<dyn MealPlanOptionRepository>,
        decider: Arc<dyn OptionDecider>,
    ) -> Self {
        Self {
            pool,
            households,
            meal_plans,
            options,
            decider,
        }
    }

    /// Try to finalise a plan once every member has voted
    ///
    /// Returns whether the plan is finalised afterwards. Any write error
    /// rolls the whole pass back.
    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, household.id = %household_id))]
    pub async fn attempt_to_finalize(
        &self,
        meal_plan_id: &str,
        household_id: &str,
    ) -> DbResult<bool> {
        require_id("meal plan", meal_plan_id)?;
        require_id("household", household_id)?;

        let members = self.households.get_household_members(household_id).await?;
        let plan = self.meal_plans.get_meal_plan(meal_plan_id, household_id).await?;

        if plan.is_finalized() {
            debug!("Meal plan already finalized");
            return Ok(true);
        }

        let outcome = evaluate_meal_plan(&plan, &members, self.decider.as_ref());
        self.apply(plan, outcome).await
    }

    /// Finalise a plan whose voting deadline passed, counting the votes cast
    #[instrument(skip_all, fields(meal_plan.id = %meal_plan_id, household.id = %household_id))]
    pub async fn finalize_expired(&self, meal_plan_id: &str, household_id: &str) -> DbResult<bool> {
        require_id("meal plan", meal_plan_id)?;
        require_id("household", household_id)?;

        let plan = self.meal_plans.get_meal_plan(meal_plan_id, household_id).await?;
        if plan.is_finalized() {
            return Ok(true);
        }

        let outcome = evaluate_expired_meal_plan(&plan, self.decider.as_ref());
        self.apply(plan, outcome).await
    }

    async fn apply(&self, plan: MealPlan, outcome: FinalizationPlan) -> DbResult<bool> {
        if outcome.is_noop() {
            debug!("Nothing to finalize yet");
            return Ok(false);
        }

        let options = Arc::clone(&self.options);
        let meal_plans = Arc::clone(&self.meal_plans);
        let selections = outcome.option_selections.len();

        let finalized = run_in_transaction(&self.pool, move |conn| {
            Box::pin(async move {
                for selection in &outcome.option_selections {
                    let changed = options
                        .finalize_meal_plan_option(
                            &mut *conn,
                            &selection.event_id,
                            &selection.option_id,
                            selection.tiebroken,
                        )
                        .await?;
                    if !changed {
                        warn!(
                            meal_plan_event.id = %selection.event_id,
                            meal_plan_option.id = %selection.option_id,
                            "Event was resolved concurrently"
                        );
                    }
                }

                if outcome.finalize_plan {
                    meal_plans
                        .finalize_meal_plan(&mut *conn, &plan.id, &plan.belongs_to_household)
                        .await?;
                }

                Ok(outcome.finalize_plan)
            })
        })
        .await?;

        info!(selections, finalized, "Finalization pass applied");
        Ok(finalized)
    }
}
