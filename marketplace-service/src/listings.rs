use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::AppEvent;
use tracing::warn;
use uuid::Uuid;

use crate::api::{api_error, db_error, ApiError, AppState};
use crate::auth::AuthUser;
use crate::models::{
    Credential, Listing, ListingChanges, NewCredential, NewListing, NewTransaction, Transaction,
    User,
};
use crate::schema::{credentials, listings, transactions, users};

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub platform: String,
    pub username: String,
    pub price: f64,
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub engagement_rate: f64,
    #[serde(default)]
    pub monthly_views: i64,
    #[serde(default)]
    pub niche: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub age_range: String,
    #[serde(default)]
    pub platform_assured: bool,
    #[serde(default)]
    pub monetized: bool,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
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
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct OwnerResponse {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub owner: OwnerResponse,
    pub title: String,
    pub platform: String,
    pub username: String,
    pub price: f64,
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

impl From<(Listing, User)> for ListingResponse {
    fn from((listing, owner): (Listing, User)) -> Self {
        Self {
            id: listing.id,
            owner: OwnerResponse {
                id: owner.id,
                name: owner.name,
                email: owner.email,
                image: owner.image,
                created_at: owner.created_at,
            },
            title: listing.title,
            platform: listing.platform,
            username: listing.username,
            price: listing.price.to_f64().unwrap_or_default(),
            description: listing.description,
            images: listing.images,
            followers_count: listing.followers_count,
            engagement_rate: listing.engagement_rate,
            monthly_views: listing.monthly_views,
            niche: listing.niche,
            country: listing.country,
            age_range: listing.age_range,
            platform_assured: listing.platform_assured,
            monetized: listing.monetized,
            verified: listing.verified,
            status: listing.status,
            is_credential_changed: listing.is_credential_changed,
            created_at: listing.created_at,
            updated_at: listing.updated_at,
        }
    }
}

fn price_to_decimal(price: f64) -> Result<BigDecimal, ApiError> {
    price
        .to_i64()
        .filter(|price| *price > 0)
        .map(BigDecimal::from)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Price must be a positive amount"))
}

pub fn validate_credential_fields(fields: &[CredentialField]) -> Result<(), String> {
    if fields.is_empty() {
        return Err("At least one credential field is required".to_string());
    }

    let mut seen = Vec::new();
    for field in fields {
        let name = field.name.trim();
        if name.is_empty() {
            return Err("Credential field names cannot be blank".to_string());
        }
        if field.value.trim().is_empty() {
            return Err(format!("Please fill in the {} field", name));
        }
        let lowered = name.to_lowercase();
        if seen.contains(&lowered) {
            return Err(format!("Duplicate credential field: {}", name));
        }
        seen.push(lowered);
    }
    Ok(())
}

pub async fn list_listings(
    State(state): State<AppState>,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let mut conn = state.pool.get().await.map_err(db_error)?;

    let rows = listings::table
        .inner_join(users::table)
        .filter(listings::status.eq("active"))
        .order(listings::created_at.desc())
        .load::<(Listing, User)>(&mut conn)
        .await
        .map_err(db_error)?;

    Ok(Json(rows.into_iter().map(ListingResponse::from).collect()))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingResponse>, ApiError> {
    let mut conn = state.pool.get().await.map_err(db_error)?;

    let row = listings::table
        .inner_join(users::table)
        .filter(listings::id.eq(id))
        .first::<(Listing, User)>(&mut conn)
        .await
        .optional()
        .map_err(db_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Listing not found"))?;

    Ok(Json(ListingResponse::from(row)))
}

pub async fn create_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    if request.title.trim().is_empty()
        || request.platform.trim().is_empty()
        || request.username.trim().is_empty()
    {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Title, platform and username are required",
        ));
    }
    let price = price_to_decimal(request.price)?;

    let mut conn = state.pool.get().await.map_err(db_error)?;

    let new_listing = NewListing {
        id: Uuid::new_v4(),
        owner_id: user.0.clone(),
        title: request.title,
        platform: request.platform,
        username: request.username,
        price,
        description: request.description,
        images: json!(request.images),
        followers_count: request.followers_count,
        engagement_rate: request.engagement_rate,
        monthly_views: request.monthly_views,
        niche: request.niche,
        country: request.country,
        age_range: request.age_range,
        platform_assured: request.platform_assured,
        monetized: request.monetized,
        verified: request.verified,
        status: "active".to_string(),
        is_credential_changed: false,
    };

    let listing = diesel::insert_into(listings::table)
        .values(&new_listing)
        .get_result::<Listing>(&mut conn)
        .await
        .map_err(db_error)?;
    let owner = users::table
        .filter(users::id.eq(&user.0))
        .first::<User>(&mut conn)
        .await
        .map_err(db_error)?;

    Ok(Json(ListingResponse::from((listing, owner))))
}

pub async fn update_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    if let Some(status) = &request.status {
        if status != "active" && status != "inactive" {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Status must be active or inactive",
            ));
        }
    }
    let price = request.price.map(price_to_decimal).transpose()?;

    let mut conn = state.pool.get().await.map_err(db_error)?;

    let listing = listings::table
        .filter(listings::id.eq(id))
        .first::<Listing>(&mut conn)
        .await
        .optional()
        .map_err(db_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Listing not found"))?;
    if listing.owner_id != user.0 {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Only the listing owner can update it",
        ));
    }

    let changes = ListingChanges {
        title: request.title,
        price,
        description: request.description,
        images: request.images.map(|images| json!(images)),
        followers_count: request.followers_count,
        engagement_rate: request.engagement_rate,
        monthly_views: request.monthly_views,
        niche: request.niche,
        country: request.country,
        age_range: request.age_range,
        platform_assured: request.platform_assured,
        monetized: request.monetized,
        verified: request.verified,
        status: request.status,
        updated_at: Some(Utc::now()),
    };

    let listing = diesel::update(listings::table.filter(listings::id.eq(id)))
        .set(&changes)
        .get_result::<Listing>(&mut conn)
        .await
        .map_err(db_error)?;
    let owner = users::table
        .filter(users::id.eq(&listing.owner_id))
        .first::<User>(&mut conn)
        .await
        .map_err(db_error)?;

    Ok(Json(ListingResponse::from((listing, owner))))
}

pub async fn delete_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.pool.get().await.map_err(db_error)?;

    let listing = listings::table
        .filter(listings::id.eq(id))
        .first::<Listing>(&mut conn)
        .await
        .optional()
        .map_err(db_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Listing not found"))?;
    if listing.owner_id != user.0 {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Only the listing owner can delete it",
        ));
    }

    diesel::delete(listings::table.filter(listings::id.eq(id)))
        .execute(&mut conn)
        .await
        .map_err(db_error)?;

    if let Err(e) = state
        .events
        .send(AppEvent::ListingDeleted { listing_id: id })
        .await
    {
        warn!("Failed to queue listing-deleted event: {}", e);
    }

    Ok(Json(json!({"status": "deleted"})))
}

pub async fn submit_credentials(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(fields): Json<Vec<CredentialField>>,
) -> Result<Json<Credential>, ApiError> {
    validate_credential_fields(&fields)
        .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;

    let mut conn = state.pool.get().await.map_err(db_error)?;

    let listing = listings::table
        .filter(listings::id.eq(id))
        .first::<Listing>(&mut conn)
        .await
        .optional()
        .map_err(db_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Listing not found"))?;
    if listing.owner_id != user.0 {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Only the listing owner can submit credentials",
        ));
    }

    // The latest submission replaces any earlier one for this listing.
    diesel::delete(credentials::table.filter(credentials::listing_id.eq(id)))
        .execute(&mut conn)
        .await
        .map_err(db_error)?;

    let new_credential = NewCredential {
        id: Uuid::new_v4(),
        listing_id: id,
        fields: json!(fields),
    };
    let credential = diesel::insert_into(credentials::table)
        .values(&new_credential)
        .get_result::<Credential>(&mut conn)
        .await
        .map_err(db_error)?;

    diesel::update(listings::table.filter(listings::id.eq(id)))
        .set((
            listings::is_credential_changed.eq(true),
            listings::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await
        .map_err(db_error)?;

    Ok(Json(credential))
}

pub async fn purchase_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.pool.get().await.map_err(db_error)?;

    let listing = listings::table
        .filter(listings::id.eq(id))
        .first::<Listing>(&mut conn)
        .await
        .optional()
        .map_err(db_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Listing not found"))?;
    if listing.owner_id == user.0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "You cannot purchase your own listing",
        ));
    }
    if listing.status != "active" {
        return Err(api_error(
            StatusCode::CONFLICT,
            "Listing is not available for purchase",
        ));
    }
    if !listing.is_credential_changed {
        return Err(api_error(
            StatusCode::CONFLICT,
            "Listing credentials have not been submitted yet",
        ));
    }

    let new_transaction = NewTransaction {
        id: Uuid::new_v4(),
        user_id: user.0.clone(),
        listing_id: id,
        amount: listing.price.clone(),
        status: "pending".to_string(),
    };
    let transaction = diesel::insert_into(transactions::table)
        .values(&new_transaction)
        .get_result::<Transaction>(&mut conn)
        .await
        .map_err(db_error)?;

    if let Err(e) = state
        .events
        .send(AppEvent::Purchase {
            transaction_id: transaction.id,
            user_id: user.0,
            listing_id: id,
        })
        .await
    {
        warn!("Failed to queue purchase event: {}", e);
    }

    Ok(Json(json!({
        "transaction_id": transaction.id,
        "status": transaction.status,
    })))
}
