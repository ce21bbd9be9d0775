//! Create, read, update and archive laws for the entity repositories

mod common;

use chrono::Duration;
use common::{
    epoch, new_id, seed_household, seed_meal, seed_meal_plan, seed_recipe, seed_user, setup,
};
use recipe_db::models::{
    HouseholdRole, HouseholdUserMembershipCreationInput, MealName, MealPlanDatabaseCreationInput,
    MealPlanEventDatabaseCreationInput, MealPlanOptionDatabaseCreationInput,
    MealPlanOptionVoteCreationInput, MealPlanOptionVotesDatabaseCreationInput,
    RecipeDatabaseCreationInput, RecipeStepDatabaseCreationInput, UserDatabaseCreationInput,
    ValidIngredientDatabaseCreationInput,
};
use recipe_db::{
    ErrorKind, HouseholdRepository, MealPlanEventRepository, MealPlanOptionRepository,
    MealPlanOptionVoteRepository, MealPlanRepository, MealRepository, QueryFilter,
    RecipeRepository, RecipeStepRepository, UserRepository, ValidIngredientRepository,
};

fn user_input(username: &str) -> UserDatabaseCreationInput {
    UserDatabaseCreationInput {
        id: new_id(),
        username: username.to_string(),
        email_address: format!("{username}@example.com"),
        hashed_password: "hashed".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        birthday: None,
    }
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn user_lifecycle() {
    let test = setup().await;
    let users = test.db.users();
    let mut conn = test.db.acquire().await.unwrap();

    let created = users
        .create_user(&mut conn, &user_input("carla"))
        .await
        .unwrap();
    assert_eq!(created.created_at, epoch());

    let fetched = users.get_user(&created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(
        users.get_user_by_username("carla").await.unwrap().id,
        created.id
    );

    let mut updated = fetched.clone();
    updated.first_name = "Carla".to_string();
    users.update_user(&mut conn, &updated).await.unwrap();

    let refetched = users.get_user(&created.id).await.unwrap();
    assert_eq!(refetched.first_name, "Carla");
    assert!(refetched.last_updated_at.is_some());

    users.archive_user(&mut conn, &created.id).await.unwrap();
    assert!(!users.user_exists(&created.id).await.unwrap());
    assert!(users.get_user(&created.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn duplicate_ids_are_conflicts() {
    let test = setup().await;
    let users = test.db.users();
    let mut conn = test.db.acquire().await.unwrap();

    let first = user_input("dora");
    users.create_user(&mut conn, &first).await.unwrap();

    let duplicate = UserDatabaseCreationInput {
        username: "dora2".to_string(),
        email_address: "dora2@example.com".to_string(),
        ..first.clone()
    };
    let err = users.create_user(&mut conn, &duplicate).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Only the original row exists
    let page = users.get_users(&QueryFilter::default()).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.data[0].username, "dora");
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn invalid_input_never_reaches_the_database() {
    let test = setup().await;
    let users = test.db.users();
    let mut conn = test.db.acquire().await.unwrap();

    let err = users
        .create_user(
            &mut conn,
            &UserDatabaseCreationInput {
                email_address: "not an email".to_string(),
                ..user_input("erin")
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = users.get_user("").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(
        users
            .get_users(&QueryFilter::default())
            .await
            .unwrap()
            .total_count,
        0
    );
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn household_owner_and_members() {
    let test = setup().await;
    let owner = seed_user(&test.db, "owner").await;
    let guest = seed_user(&test.db, "guest").await;
    let household = seed_household(&test.db, &owner).await;

    let households = test.db.households();
    let members = households.get_household_members(&household.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].belongs_to_user, owner.id);
    assert_eq!(members[0].household_role, HouseholdRole::HouseholdAdmin);
    assert!(members[0].default_household);

    let mut conn = test.db.acquire().await.unwrap();
    let membership = households
        .add_user_to_household(
            &mut conn,
            &HouseholdUserMembershipCreationInput {
                id: new_id(),
                belongs_to_household: household.id.clone(),
                belongs_to_user: guest.id.clone(),
                household_role: HouseholdRole::HouseholdMember,
            },
        )
        .await
        .unwrap();
    assert!(!membership.default_household);

    let fetched = households.get_household(&household.id).await.unwrap();
    assert_eq!(fetched.members.len(), 2);

    households
        .remove_user_from_household(&mut conn, &household.id, &guest.id)
        .await
        .unwrap();
    let members = households.get_household_members(&household.id).await.unwrap();
    assert_eq!(members.len(), 1);

    let mine = households
        .get_households(&owner.id, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(mine.total_count, 1);

    // Only the owner may archive
    households
        .archive_household(&mut conn, &household.id, &guest.id)
        .await
        .unwrap();
    assert!(households.household_exists(&household.id).await.unwrap());

    households
        .archive_household(&mut conn, &household.id, &owner.id)
        .await
        .unwrap();
    assert!(!households.household_exists(&household.id).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn recipes_come_back_with_ordered_steps() {
    let test = setup().await;
    let cook = seed_user(&test.db, "cook").await;
    let recipe_id = new_id();

    let step = |index: i32, text: &str| RecipeStepDatabaseCreationInput {
        id: new_id(),
        index,
        explicit_instructions: text.to_string(),
        notes: String::new(),
        minimum_estimated_time_in_seconds: Some(60),
        maximum_estimated_time_in_seconds: None,
        minimum_temperature_in_celsius: None,
        maximum_temperature_in_celsius: None,
        optional: false,
        belongs_to_recipe: recipe_id.clone(),
    };

    let mut conn = test.db.acquire().await.unwrap();
    let recipes = test.db.recipes();
    recipes
        .create_recipe(
            &mut conn,
            &RecipeDatabaseCreationInput {
                id: recipe_id.clone(),
                name: "Omelette".to_string(),
                source: String::new(),
                description: String::new(),
                inspired_by_recipe_id: None,
                minimum_estimated_portions: 1.0,
                maximum_estimated_portions: Some(2.0),
                seal_of_approval: false,
                created_by_user: cook.id.clone(),
                steps: vec![step(1, "cook"), step(0, "whisk")],
            },
        )
        .await
        .unwrap();

    let recipe = recipes.get_recipe(&recipe_id).await.unwrap();
    let instructions: Vec<&str> = recipe
        .steps
        .iter()
        .map(|s| s.explicit_instructions.as_str())
        .collect();
    assert_eq!(instructions, vec!["whisk", "cook"]);

    let steps = test.db.recipe_steps();
    let first_step = recipe.steps[0].id.clone();
    steps
        .archive_recipe_step(&mut conn, &recipe_id, &first_step)
        .await
        .unwrap();
    assert!(!steps
        .recipe_step_exists(&recipe_id, &first_step)
        .await
        .unwrap());
    assert_eq!(recipes.get_recipe(&recipe_id).await.unwrap().steps.len(), 1);

    let mut renamed = recipe.clone();
    renamed.name = "French Omelette".to_string();
    recipes.update_recipe(&mut conn, &renamed).await.unwrap();
    assert_eq!(
        recipes.get_recipe(&recipe_id).await.unwrap().name,
        "French Omelette"
    );
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn meals_list_with_their_components() {
    let test = setup().await;
    let cook = seed_user(&test.db, "cook").await;
    let soup = seed_meal(&test.db, &cook, "soup").await;
    let salad = seed_meal(&test.db, &cook, "salad").await;

    let meals = test.db.meals();
    let page = meals
        .get_meals(&cook.id, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
    assert!(page.data.iter().all(|m| m.components.len() == 1));

    let fetched = meals.get_meal(&soup.id).await.unwrap();
    assert_eq!(fetched.components, soup.components);

    let found = meals.search_for_meals(&cook.id, "sal").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, salad.id);
    assert_eq!(found[0].components.len(), 1);

    let mut conn = test.db.acquire().await.unwrap();
    meals.archive_meal(&mut conn, &soup.id, &cook.id).await.unwrap();
    assert!(!meals.meal_exists(&soup.id).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn a_failed_meal_plan_insert_leaves_nothing_behind() {
    let test = setup().await;
    let cook = seed_user(&test.db, "cook").await;
    let household = seed_household(&test.db, &cook).await;
    let meal = seed_meal(&test.db, &cook, "chili").await;
    let recipe = seed_recipe(&test.db, &cook, "unused").await;

    let plan_id = new_id();
    let event = |meal_id: &str| {
        let event_id = new_id();
        let starts_at = epoch() + Duration::days(1);
        MealPlanEventDatabaseCreationInput {
            id: event_id.clone(),
            notes: String::new(),
            starts_at,
            ends_at: starts_at + Duration::hours(1),
            meal_name: MealName::Lunch,
            belongs_to_meal_plan: plan_id.clone(),
            options: vec![MealPlanOptionDatabaseCreationInput {
                id: new_id(),
                assigned_cook: None,
                assigned_dishwasher: None,
                meal_scale: 1.0,
                meal_id: meal_id.to_string(),
                notes: String::new(),
                belongs_to_meal_plan_event: event_id,
            }],
        }
    };

    let mut conn = test.db.acquire().await.unwrap();
    let err = test
        .db
        .meal_plans()
        .create_meal_plan(
            &mut conn,
            &MealPlanDatabaseCreationInput {
                id: plan_id.clone(),
                notes: String::new(),
                voting_deadline: epoch() + Duration::hours(12),
                created_by_user: cook.id.clone(),
                belongs_to_household: household.id.clone(),
                // A recipe id is not a meal id, so the second option violates its foreign key
                events: vec![event(&meal.id), event(&recipe.id)],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    assert!(!test
        .db
        .meal_plans()
        .meal_plan_exists(&plan_id, &household.id)
        .await
        .unwrap());
    let plans = test
        .db
        .meal_plans()
        .get_meal_plans(&household.id, &QueryFilter::default().with_archived())
        .await
        .unwrap();
    assert_eq!(plans.total_count, 0);
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn sessions_expire_by_the_clock() {
    let test = setup().await;
    let store = test.db.session_store();

    store
        .commit("token-a", b"alpha", epoch() + Duration::minutes(30))
        .await
        .unwrap();
    store
        .commit("token-b", b"beta", epoch() + Duration::hours(2))
        .await
        .unwrap();

    assert_eq!(store.find("token-a").await.unwrap(), Some(b"alpha".to_vec()));

    // Commit replaces in place
    store
        .commit("token-a", b"alpha-2", epoch() + Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(
        store.find("token-a").await.unwrap(),
        Some(b"alpha-2".to_vec())
    );

    test.clock.advance(Duration::hours(1));
    assert_eq!(store.find("token-a").await.unwrap(), None);
    assert_eq!(store.delete_expired().await.unwrap(), 1);

    store.delete("token-b").await.unwrap();
    assert_eq!(store.find("token-b").await.unwrap(), None);
    assert_eq!(store.find("missing").await.unwrap(), None);
    assert!(store.find("").await.is_err());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn members_see_the_households_they_joined() {
    let test = setup().await;
    let owner = seed_user(&test.db, "owner").await;
    let member = seed_user(&test.db, "member").await;
    let outsider = seed_user(&test.db, "outsider").await;
    let household = seed_household(&test.db, &owner).await;

    let households = test.db.households();
    let mut conn = test.db.acquire().await.unwrap();
    households
        .add_user_to_household(
            &mut conn,
            &HouseholdUserMembershipCreationInput {
                id: new_id(),
                belongs_to_household: household.id.clone(),
                belongs_to_user: member.id.clone(),
                household_role: HouseholdRole::HouseholdMember,
            },
        )
        .await
        .unwrap();

    let joined = households
        .get_households(&member.id, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(joined.data.len(), 1);
    assert_eq!(joined.data[0].id, household.id);
    assert_eq!(joined.filtered_count, 1);
    assert_eq!(joined.total_count, 1);

    let owned = households
        .get_households(&owner.id, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(owned.total_count, 1);

    let none = households
        .get_households(&outsider.id, &QueryFilter::default())
        .await
        .unwrap();
    assert!(none.data.is_empty());
    assert_eq!(none.total_count, 0);

    // Leaving the household hides it again
    households
        .remove_user_from_household(&mut conn, &household.id, &member.id)
        .await
        .unwrap();
    let left = households
        .get_households(&member.id, &QueryFilter::default())
        .await
        .unwrap();
    assert!(left.data.is_empty());
    assert_eq!(left.total_count, 0);
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn household_lifecycle() {
    let test = setup().await;
    let owner = seed_user(&test.db, "owner").await;
    let created = seed_household(&test.db, &owner).await;

    let households = test.db.households();
    let fetched = households.get_household(&created.id).await.unwrap();
    assert_eq!(fetched.name, created.name);
    assert_eq!(fetched.created_at, epoch());

    let mut renamed = fetched.clone();
    renamed.name = "The Big House".to_string();
    renamed.time_zone = "Europe/Berlin".to_string();
    let mut conn = test.db.acquire().await.unwrap();
    households.update_household(&mut conn, &renamed).await.unwrap();

    let refetched = households.get_household(&created.id).await.unwrap();
    assert_eq!(refetched.name, "The Big House");
    assert_eq!(refetched.time_zone, "Europe/Berlin");
    assert!(refetched.last_updated_at.is_some());

    households
        .archive_household(&mut conn, &created.id, &owner.id)
        .await
        .unwrap();
    assert!(!households.household_exists(&created.id).await.unwrap());
    assert!(households
        .get_household(&created.id)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn valid_ingredient_lifecycle() {
    let test = setup().await;
    let ingredients = test.db.valid_ingredients();
    let mut conn = test.db.acquire().await.unwrap();

    let created = ingredients
        .create_valid_ingredient(
            &mut conn,
            &ValidIngredientDatabaseCreationInput {
                id: new_id(),
                name: "shallot".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let fetched = ingredients.get_valid_ingredient(&created.id).await.unwrap();
    assert_eq!(fetched, created);

    let mut updated = fetched.clone();
    updated.plural_name = "shallots".to_string();
    updated.is_liquid = false;
    updated.animal_derived = false;
    updated.description = "a small onion".to_string();
    ingredients
        .update_valid_ingredient(&mut conn, &updated)
        .await
        .unwrap();

    let refetched = ingredients.get_valid_ingredient(&created.id).await.unwrap();
    assert_eq!(refetched.plural_name, "shallots");
    assert_eq!(refetched.description, "a small onion");
    assert!(refetched.last_updated_at.is_some());

    ingredients
        .archive_valid_ingredient(&mut conn, &created.id)
        .await
        .unwrap();
    assert!(!ingredients.valid_ingredient_exists(&created.id).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn meal_lifecycle() {
    let test = setup().await;
    let cook = seed_user(&test.db, "cook").await;
    let created = seed_meal(&test.db, &cook, "stew").await;

    let meals = test.db.meals();
    let fetched = meals.get_meal(&created.id).await.unwrap();
    assert_eq!(fetched.name, "stew");

    let mut updated = fetched.clone();
    updated.name = "beef stew".to_string();
    updated.maximum_estimated_portions = Some(6.0);
    let mut conn = test.db.acquire().await.unwrap();
    meals.update_meal(&mut conn, &updated).await.unwrap();

    let refetched = meals.get_meal(&created.id).await.unwrap();
    assert_eq!(refetched.name, "beef stew");
    assert_eq!(refetched.maximum_estimated_portions, Some(6.0));
    assert_eq!(refetched.components, created.components);

    meals
        .archive_meal(&mut conn, &created.id, &cook.id)
        .await
        .unwrap();
    assert!(!meals.meal_exists(&created.id).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn recipe_step_lifecycle() {
    let test = setup().await;
    let cook = seed_user(&test.db, "cook").await;
    let recipe = seed_recipe(&test.db, &cook, "Toast").await;

    let steps = test.db.recipe_steps();
    let mut conn = test.db.acquire().await.unwrap();
    let created = steps
        .create_recipe_step(
            &mut conn,
            &RecipeStepDatabaseCreationInput {
                id: new_id(),
                index: 0,
                explicit_instructions: "toast the bread".to_string(),
                notes: String::new(),
                minimum_estimated_time_in_seconds: Some(120),
                maximum_estimated_time_in_seconds: None,
                minimum_temperature_in_celsius: None,
                maximum_temperature_in_celsius: None,
                optional: false,
                belongs_to_recipe: recipe.id.clone(),
            },
        )
        .await
        .unwrap();

    let fetched = steps.get_recipe_step(&recipe.id, &created.id).await.unwrap();
    assert_eq!(fetched.explicit_instructions, "toast the bread");

    let mut updated = fetched.clone();
    updated.explicit_instructions = "toast both sides".to_string();
    updated.optional = true;
    steps.update_recipe_step(&mut conn, &updated).await.unwrap();

    let refetched = steps.get_recipe_step(&recipe.id, &created.id).await.unwrap();
    assert_eq!(refetched.explicit_instructions, "toast both sides");
    assert!(refetched.optional);

    let page = steps
        .get_recipe_steps(&recipe.id, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert!(page.total_count >= 1);

    steps
        .archive_recipe_step(&mut conn, &recipe.id, &created.id)
        .await
        .unwrap();
    assert!(!steps.recipe_step_exists(&recipe.id, &created.id).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn meal_plan_lifecycle() {
    let test = setup().await;
    let author = seed_user(&test.db, "author").await;
    let household = seed_household(&test.db, &author).await;
    let meal = seed_meal(&test.db, &author, "curry").await;
    let created = seed_meal_plan(
        &test.db,
        &household,
        &author,
        &[&meal],
        epoch() + Duration::days(1),
    )
    .await;

    let plans = test.db.meal_plans();
    let fetched = plans.get_meal_plan(&created.id, &household.id).await.unwrap();
    assert_eq!(fetched.events.len(), 1);

    let mut updated = fetched.clone();
    updated.notes = "bring dessert".to_string();
    updated.voting_deadline = epoch() + Duration::days(3);
    let mut conn = test.db.acquire().await.unwrap();
    plans.update_meal_plan(&mut conn, &updated).await.unwrap();

    let refetched = plans.get_meal_plan(&created.id, &household.id).await.unwrap();
    assert_eq!(refetched.notes, "bring dessert");
    assert_eq!(refetched.voting_deadline, epoch() + Duration::days(3));

    let page = plans
        .get_meal_plans(&household.id, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert!(page.total_count >= 1);

    plans
        .archive_meal_plan(&mut conn, &created.id, &household.id)
        .await
        .unwrap();
    assert!(!plans.meal_plan_exists(&created.id, &household.id).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn meal_plan_event_lifecycle() {
    let test = setup().await;
    let author = seed_user(&test.db, "author").await;
    let household = seed_household(&test.db, &author).await;
    let meal = seed_meal(&test.db, &author, "pancakes").await;
    let plan = seed_meal_plan(
        &test.db,
        &household,
        &author,
        &[&meal],
        epoch() + Duration::days(1),
    )
    .await;

    let events = test.db.meal_plan_events();
    let mut conn = test.db.acquire().await.unwrap();
    let starts_at = epoch() + Duration::days(3);
    let created = events
        .create_meal_plan_event(
            &mut conn,
            &MealPlanEventDatabaseCreationInput {
                id: new_id(),
                notes: String::new(),
                starts_at,
                ends_at: starts_at + Duration::hours(1),
                meal_name: MealName::Breakfast,
                belongs_to_meal_plan: plan.id.clone(),
                options: vec![],
            },
        )
        .await
        .unwrap();

    let fetched = events.get_meal_plan_event(&plan.id, &created.id).await.unwrap();
    assert_eq!(fetched.meal_name, MealName::Breakfast);

    let mut updated = fetched.clone();
    updated.notes = "early start".to_string();
    updated.meal_name = MealName::Brunch;
    events.update_meal_plan_event(&mut conn, &updated).await.unwrap();

    let refetched = events.get_meal_plan_event(&plan.id, &created.id).await.unwrap();
    assert_eq!(refetched.notes, "early start");
    assert_eq!(refetched.meal_name, MealName::Brunch);

    let page = events
        .get_meal_plan_events(&plan.id, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
    assert!(page.total_count >= 2);

    events
        .archive_meal_plan_event(&mut conn, &plan.id, &created.id)
        .await
        .unwrap();
    assert!(!events.meal_plan_event_exists(&plan.id, &created.id).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn meal_plan_option_lifecycle() {
    let test = setup().await;
    let author = seed_user(&test.db, "author").await;
    let household = seed_household(&test.db, &author).await;
    let soup = seed_meal(&test.db, &author, "soup").await;
    let bread = seed_meal(&test.db, &author, "bread").await;
    let plan = seed_meal_plan(
        &test.db,
        &household,
        &author,
        &[&soup],
        epoch() + Duration::days(1),
    )
    .await;
    let event_id = plan.events[0].id.clone();

    let options = test.db.meal_plan_options();
    let mut conn = test.db.acquire().await.unwrap();
    let created = options
        .create_meal_plan_option(
            &mut conn,
            &MealPlanOptionDatabaseCreationInput {
                id: new_id(),
                assigned_cook: None,
                assigned_dishwasher: None,
                meal_scale: 1.0,
                meal_id: bread.id.clone(),
                notes: String::new(),
                belongs_to_meal_plan_event: event_id.clone(),
            },
        )
        .await
        .unwrap();

    let fetched = options
        .get_meal_plan_option(&plan.id, &event_id, &created.id)
        .await
        .unwrap();
    assert_eq!(fetched.meal_id, bread.id);
    assert!(!fetched.chosen);

    let mut updated = fetched.clone();
    updated.assigned_cook = Some(author.id.clone());
    updated.meal_scale = 2.0;
    options.update_meal_plan_option(&mut conn, &updated).await.unwrap();

    let refetched = options
        .get_meal_plan_option(&plan.id, &event_id, &created.id)
        .await
        .unwrap();
    assert_eq!(refetched.assigned_cook, Some(author.id.clone()));
    assert_eq!(refetched.meal_scale, 2.0);

    let page = options
        .get_meal_plan_options(&plan.id, &event_id, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
    assert!(page.total_count >= 2);

    // The event belongs to a different plan than the one named
    let elsewhere = options
        .get_meal_plan_options(&new_id(), &event_id, &QueryFilter::default())
        .await
        .unwrap();
    assert!(elsewhere.data.is_empty());
    assert_eq!(elsewhere.total_count, 0);

    options
        .archive_meal_plan_option(&mut conn, &event_id, &created.id)
        .await
        .unwrap();
    assert!(!options
        .meal_plan_option_exists(&plan.id, &event_id, &created.id)
        .await
        .unwrap());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn meal_plan_option_vote_lifecycle() {
    let test = setup().await;
    let voter = seed_user(&test.db, "voter").await;
    let household = seed_household(&test.db, &voter).await;
    let meal = seed_meal(&test.db, &voter, "risotto").await;
    let plan = seed_meal_plan(
        &test.db,
        &household,
        &voter,
        &[&meal],
        epoch() + Duration::days(1),
    )
    .await;
    let event_id = plan.events[0].id.clone();
    let option_id = plan.events[0].options[0].id.clone();

    let votes = test.db.meal_plan_option_votes();
    let mut conn = test.db.acquire().await.unwrap();
    let ballot = votes
        .create_meal_plan_option_votes(
            &mut conn,
            &MealPlanOptionVotesDatabaseCreationInput {
                by_user: voter.id.clone(),
                votes: vec![MealPlanOptionVoteCreationInput {
                    id: new_id(),
                    rank: 0,
                    abstain: false,
                    notes: String::new(),
                    belongs_to_meal_plan_option: option_id.clone(),
                }],
            },
        )
        .await
        .unwrap();
    let vote_id = ballot[0].id.clone();

    let fetched = votes
        .get_meal_plan_option_vote(&plan.id, &event_id, &option_id, &vote_id)
        .await
        .unwrap();
    assert_eq!(fetched.by_user, voter.id);

    let mut updated = fetched.clone();
    updated.rank = 1;
    updated.notes = "second choice after all".to_string();
    votes
        .update_meal_plan_option_vote(&mut conn, &updated)
        .await
        .unwrap();

    let refetched = votes
        .get_meal_plan_option_vote(&plan.id, &event_id, &option_id, &vote_id)
        .await
        .unwrap();
    assert_eq!(refetched.rank, 1);
    assert_eq!(refetched.notes, "second choice after all");

    let page = votes
        .get_meal_plan_option_votes(&plan.id, &event_id, &option_id, &QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert!(page.total_count >= 1);

    let elsewhere = votes
        .get_meal_plan_option_votes(&plan.id, &new_id(), &option_id, &QueryFilter::default())
        .await
        .unwrap();
    assert!(elsewhere.data.is_empty());
    assert_eq!(elsewhere.total_count, 0);

    votes
        .archive_meal_plan_option_vote(&mut conn, &option_id, &vote_id)
        .await
        .unwrap();
    assert!(!votes
        .meal_plan_option_vote_exists(&plan.id, &event_id, &option_id, &vote_id)
        .await
        .unwrap());
}
