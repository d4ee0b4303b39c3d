use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub image: Option<String>,
}

// None fields are left untouched on update, mirroring fields the
// provider omitted from the payload.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::users)]
pub struct UserSyncChanges {
    pub email: Option<String>,
    pub name: String,
    pub image: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::listings)]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub platform: String,
    pub username: String,
    pub price: bigdecimal::BigDecimal,
    pub description: String,
    pub images: serde_json::Value,
    pub followers_count: i64,
    pub engagement_rate: f64,
    pub monthly_views: i64,
    pub niche: String,
    pub country: String,
    pub age_range: String,
    pub platform_assured: bool,
    pub monetized: bool,
    pub verified: bool,
    pub status: String,
    pub is_credential_changed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::listings)]
pub struct NewListing {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub platform: String,
    pub username: String,
    pub price: bigdecimal::BigDecimal,
    pub description: String,
    pub images: serde_json::Value,
    pub followers_count: i64,
    pub engagement_rate: f64,
    pub monthly_views: i64,
    pub niche: String,
    pub country: String,
    pub age_range: String,
    pub platform_assured: bool,
    pub monetized: bool,
    pub verified: bool,
    pub status: String,
    pub is_credential_changed: bool,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = crate::schema::listings)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub price: Option<bigdecimal::BigDecimal>,
    pub description: Option<String>,
    pub images: Option<serde_json::Value>,
    pub followers_count: Option<i64>,
    pub engagement_rate: Option<f64>,
    pub monthly_views: Option<i64>,
    pub niche: Option<String>,
    pub country: Option<String>,
    pub age_range: Option<String>,
    pub platform_assured: Option<bool>,
    pub monetized: Option<bool>,
    pub verified: Option<bool>,
    pub status: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::chats)]
pub struct Chat {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub owner_user_id: String,
    pub chat_user_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::chats)]
pub struct NewChat {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub owner_user_id: String,
    pub chat_user_id: String,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::chat_messages)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: String,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::chat_messages)]
pub struct NewChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::transactions)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub listing_id: Uuid,
    pub amount: bigdecimal::BigDecimal,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::transactions)]
pub struct NewTransaction {
    pub id: Uuid,
    pub user_id: String,
    pub listing_id: Uuid,
    pub amount: bigdecimal::BigDecimal,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::credentials)]
pub struct Credential {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub fields: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::credentials)]
pub struct NewCredential {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub fields: serde_json::Value,
}
