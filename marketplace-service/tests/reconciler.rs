// Lifecycle reconciliation tests against a real Postgres. Point
// TEST_DATABASE_URL at a scratch database to run them; without it every
// test is a no-op skip.

use std::sync::Once;

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::json;
use uuid::Uuid;

use marketplace_service::handlers::LifecycleHandler;
use marketplace_service::models::{NewListing, User};
use marketplace_service::schema::{listings, users};
use marketplace_service::{build_pool, run_migrations, DbPool};
use shared::{EmailAddress, IdentityEvent, UserDeletedPayload, UserSyncPayload};

static MIGRATIONS: Once = Once::new();

async fn test_pool() -> Option<DbPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            return None;
        }
    };
    MIGRATIONS.call_once(|| run_migrations(&url).expect("Failed to run migrations"));
    Some(build_pool(&url).await.expect("Failed to build pool"))
}

fn unique_user_id() -> String {
    format!("user_{}", Uuid::new_v4().simple())
}

fn sync_payload(id: &str, first: &str, last: &str, email: &str) -> UserSyncPayload {
    UserSyncPayload {
        id: id.to_string(),
        email_addresses: vec![EmailAddress {
            email_address: email.to_string(),
        }],
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        image_url: Some(format!("https://img.example.com/{}.png", id)),
    }
}

fn listing_for(owner_id: &str) -> NewListing {
    NewListing {
        id: Uuid::new_v4(),
        owner_id: owner_id.to_string(),
        title: "Cooking channel".to_string(),
        platform: "youtube".to_string(),
        username: "dailydishes".to_string(),
        price: BigDecimal::from(1200),
        description: "Established cooking channel with steady views".to_string(),
        images: json!([]),
        followers_count: 52_000,
        engagement_rate: 4.2,
        monthly_views: 180_000,
        niche: "cooking".to_string(),
        country: "US".to_string(),
        age_range: "18-34".to_string(),
        platform_assured: false,
        monetized: true,
        verified: false,
        status: "active".to_string(),
        is_credential_changed: false,
    }
}

async fn fetch_user(pool: &DbPool, id: &str) -> Option<User> {
    let mut conn = pool.get().await.expect("Failed to get connection");
    users::table
        .filter(users::id.eq(id))
        .first::<User>(&mut conn)
        .await
        .optional()
        .expect("Failed to query user")
}

#[tokio::test]
async fn created_event_inserts_exactly_one_user() {
    let Some(pool) = test_pool().await else { return };
    let handler = LifecycleHandler::new(pool.clone());
    let user_id = unique_user_id();

    let payload = sync_payload(&user_id, " Ada", "Lovelace ", "ada@example.com");
    handler
        .handle(IdentityEvent::Created(payload.clone()))
        .await
        .expect("Created event failed");
    // Redelivery must not duplicate the row.
    handler
        .handle(IdentityEvent::Created(payload))
        .await
        .expect("Redelivered created event failed");

    let mut conn = pool.get().await.expect("Failed to get connection");
    let count: i64 = users::table
        .filter(users::id.eq(&user_id))
        .count()
        .get_result(&mut conn)
        .await
        .expect("Failed to count users");
    assert_eq!(count, 1);

    let user = fetch_user(&pool, &user_id).await.expect("User missing");
    assert_eq!(user.name, "Ada Lovelace");
    assert_eq!(user.email, Some("ada@example.com".to_string()));
}

#[tokio::test]
async fn updated_event_overwrites_profile_fields() {
    let Some(pool) = test_pool().await else { return };
    let handler = LifecycleHandler::new(pool.clone());
    let user_id = unique_user_id();

    handler
        .handle(IdentityEvent::Created(sync_payload(
            &user_id,
            "Ada",
            "Lovelace",
            "ada@example.com",
        )))
        .await
        .expect("Created event failed");

    handler
        .handle(IdentityEvent::Updated(sync_payload(
            &user_id,
            "Augusta",
            "King",
            "augusta@example.com",
        )))
        .await
        .expect("Updated event failed");

    let user = fetch_user(&pool, &user_id).await.expect("User missing");
    assert_eq!(user.name, "Augusta King");
    assert_eq!(user.email, Some("augusta@example.com".to_string()));
}

#[tokio::test]
async fn updated_event_fails_for_a_missing_user() {
    let Some(pool) = test_pool().await else { return };
    let handler = LifecycleHandler::new(pool.clone());

    let result = handler
        .handle(IdentityEvent::Updated(sync_payload(
            &unique_user_id(),
            "Nobody",
            "Here",
            "nobody@example.com",
        )))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn deleted_event_removes_an_unreferenced_user() {
    let Some(pool) = test_pool().await else { return };
    let handler = LifecycleHandler::new(pool.clone());
    let user_id = unique_user_id();

    handler
        .handle(IdentityEvent::Created(sync_payload(
            &user_id,
            "Ada",
            "Lovelace",
            "ada@example.com",
        )))
        .await
        .expect("Created event failed");

    handler
        .handle(IdentityEvent::Deleted(UserDeletedPayload {
            id: user_id.clone(),
            deleted: true,
        }))
        .await
        .expect("Deleted event failed");

    assert!(fetch_user(&pool, &user_id).await.is_none());
}

#[tokio::test]
async fn deleted_event_deactivates_listings_of_a_referenced_user() {
    let Some(pool) = test_pool().await else { return };
    let handler = LifecycleHandler::new(pool.clone());
    let user_id = unique_user_id();

    handler
        .handle(IdentityEvent::Created(sync_payload(
            &user_id,
            "Ada",
            "Lovelace",
            "ada@example.com",
        )))
        .await
        .expect("Created event failed");

    let new_listing = listing_for(&user_id);
    let listing_id = new_listing.id;
    {
        let mut conn = pool.get().await.expect("Failed to get connection");
        diesel::insert_into(listings::table)
            .values(&new_listing)
            .execute(&mut conn)
            .await
            .expect("Failed to insert listing");
    }

    handler
        .handle(IdentityEvent::Deleted(UserDeletedPayload {
            id: user_id.clone(),
            deleted: true,
        }))
        .await
        .expect("Deleted event failed");

    assert!(fetch_user(&pool, &user_id).await.is_some());

    let mut conn = pool.get().await.expect("Failed to get connection");
    let status: String = listings::table
        .filter(listings::id.eq(listing_id))
        .select(listings::status)
        .first(&mut conn)
        .await
        .expect("Failed to query listing");
    assert_eq!(status, "inactive");
}
