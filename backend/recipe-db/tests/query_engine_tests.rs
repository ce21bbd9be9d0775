//! List, count and search behaviour against a real PostgreSQL

mod common;

use chrono::Duration;
use common::{epoch, new_id, seed_recipe, seed_user, setup};
use recipe_db::models::ValidIngredientDatabaseCreationInput;
use recipe_db::{Database, QueryFilter, RecipeRepository, SortDirection, ValidIngredientRepository};

async fn seed_ingredient(db: &Database, name: &str) -> String {
    let id = new_id();
    let mut conn = db.acquire().await.unwrap();
    db.valid_ingredients()
        .create_valid_ingredient(
            &mut conn,
            &ValidIngredientDatabaseCreationInput {
                id: id.clone(),
                name: name.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    id
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn pages_carry_filtered_and_total_counts() {
    let test = setup().await;
    for i in 0..25 {
        seed_ingredient(&test.db, &format!("ingredient {i:02}")).await;
    }

    let repo = test.db.valid_ingredients();

    let second = repo
        .get_valid_ingredients(&QueryFilter::new(2, 10))
        .await
        .unwrap();
    assert_eq!(second.data.len(), 10);
    assert_eq!(second.page, 2);
    assert_eq!(second.limit, 10);
    assert_eq!(second.filtered_count, 25);
    assert_eq!(second.total_count, 25);

    let third = repo
        .get_valid_ingredients(&QueryFilter::new(3, 10))
        .await
        .unwrap();
    assert_eq!(third.data.len(), 5);
    assert_eq!(third.total_count, 25);

    // Pages never overlap
    let first = repo
        .get_valid_ingredients(&QueryFilter::new(1, 10))
        .await
        .unwrap();
    let mut ids: Vec<String> = first
        .data
        .iter()
        .chain(&second.data)
        .chain(&third.data)
        .map(|i| i.id.clone())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 25);
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn a_page_past_the_end_is_empty() {
    let test = setup().await;
    for i in 0..3 {
        seed_ingredient(&test.db, &format!("ingredient {i}")).await;
    }

    let page = test
        .db
        .valid_ingredients()
        .get_valid_ingredients(&QueryFilter::new(5, 10))
        .await
        .unwrap();

    assert!(page.data.is_empty());
    assert_eq!(page.filtered_count, 0);
    assert_eq!(page.total_count, 0);
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn archived_rows_are_hidden_unless_requested() {
    let test = setup().await;
    let ids = [
        seed_ingredient(&test.db, "salt").await,
        seed_ingredient(&test.db, "pepper").await,
        seed_ingredient(&test.db, "cumin").await,
    ];

    let repo = test.db.valid_ingredients();
    let mut conn = test.db.acquire().await.unwrap();
    repo.archive_valid_ingredient(&mut conn, &ids[1])
        .await
        .unwrap();

    let live = repo
        .get_valid_ingredients(&QueryFilter::default())
        .await
        .unwrap();
    assert_eq!(live.data.len(), 2);
    assert_eq!(live.total_count, 2);
    assert!(live.data.iter().all(|i| i.archived_at.is_none()));

    let everything = repo
        .get_valid_ingredients(&QueryFilter::default().with_archived())
        .await
        .unwrap();
    assert_eq!(everything.data.len(), 3);
    assert_eq!(everything.total_count, 3);

    assert!(!repo.valid_ingredient_exists(&ids[1]).await.unwrap());
    assert!(repo.valid_ingredient_exists(&ids[0]).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn time_bounds_narrow_only_the_filtered_count() {
    let test = setup().await;
    for i in 0..5 {
        seed_ingredient(&test.db, &format!("ingredient {i}")).await;
        test.clock.advance(Duration::hours(1));
    }

    let filter = QueryFilter {
        created_after: Some(epoch() + Duration::hours(2)),
        ..QueryFilter::default()
    };
    let page = test
        .db
        .valid_ingredients()
        .get_valid_ingredients(&filter)
        .await
        .unwrap();

    assert_eq!(page.data.len(), 3);
    assert_eq!(page.filtered_count, 3);
    assert_eq!(page.total_count, 5);
    assert!(page
        .data
        .iter()
        .all(|i| i.created_at >= epoch() + Duration::hours(2)));
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn sort_by_orders_before_the_id_tie_break() {
    let test = setup().await;
    for name in ["banana", "apple", "cherry"] {
        seed_ingredient(&test.db, name).await;
    }

    let filter = QueryFilter {
        sort_by: Some("name".to_string()),
        sort_direction: SortDirection::Desc,
        ..QueryFilter::default()
    };
    let page = test
        .db
        .valid_ingredients()
        .get_valid_ingredients(&filter)
        .await
        .unwrap();

    let names: Vec<&str> = page.data.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["cherry", "banana", "apple"]);
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn owned_lists_only_see_the_owner_rows() {
    let test = setup().await;
    let alice = seed_user(&test.db, "alice").await;
    let bob = seed_user(&test.db, "bob").await;

    for i in 0..3 {
        seed_recipe(&test.db, &alice, &format!("alice recipe {i}")).await;
        seed_recipe(&test.db, &bob, &format!("bob recipe {i}")).await;
    }

    let page = test
        .db
        .recipes()
        .get_recipes(&alice.id, &QueryFilter::default())
        .await
        .unwrap();

    assert_eq!(page.data.len(), 3);
    assert_eq!(page.total_count, 3);
    assert!(page.data.iter().all(|r| r.created_by_user == alice.id));
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn search_is_case_insensitive_and_treats_wildcards_literally() {
    let test = setup().await;
    for name in ["tomato", "Cherry Tomato", "basil", "50% cream"] {
        seed_ingredient(&test.db, name).await;
    }

    let repo = test.db.valid_ingredients();

    let mut tomatoes: Vec<String> = repo
        .search_for_valid_ingredients("TOMATO")
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    tomatoes.sort();
    assert_eq!(tomatoes, vec!["Cherry Tomato", "tomato"]);

    let percent = repo.search_for_valid_ingredients("%").await.unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].name, "50% cream");
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn owned_search_ignores_other_users() {
    let test = setup().await;
    let alice = seed_user(&test.db, "alice").await;
    let bob = seed_user(&test.db, "bob").await;
    seed_recipe(&test.db, &alice, "Pad Thai").await;
    seed_recipe(&test.db, &bob, "Thai Green Curry").await;

    let found = test
        .db
        .recipes()
        .search_for_recipes(&alice.id, "thai")
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Pad Thai");
}

#[tokio::test]
#[ignore = "Requires Docker for PostgreSQL testcontainer"]
async fn blank_search_is_rejected() {
    let test = setup().await;
    let err = test
        .db
        .valid_ingredients()
        .search_for_valid_ingredients("")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), recipe_db::ErrorKind::Validation);
}
