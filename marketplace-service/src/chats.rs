use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{api_error, db_error, ApiError, AppState};
use crate::auth::AuthUser;
use crate::models::{Chat, ChatMessage, Listing, NewChat, NewChatMessage};
use crate::schema::{chat_messages, chats, listings};

#[derive(Debug, Deserialize)]
pub struct OpenChatRequest {
    pub listing_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

pub async fn open_chat(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<OpenChatRequest>,
) -> Result<Json<Chat>, ApiError> {
    let mut conn = state.pool.get().await.map_err(db_error)?;

    let listing = listings::table
        .filter(listings::id.eq(request.listing_id))
        .first::<Listing>(&mut conn)
        .await
        .optional()
        .map_err(db_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Listing not found"))?;
    if listing.owner_id == user.0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "You cannot open a chat on your own listing",
        ));
    }

    let existing = chats::table
        .filter(chats::listing_id.eq(request.listing_id))
        .filter(chats::chat_user_id.eq(&user.0))
        .first::<Chat>(&mut conn)
        .await
        .optional()
        .map_err(db_error)?;
    if let Some(chat) = existing {
        return Ok(Json(chat));
    }

    let new_chat = NewChat {
        id: Uuid::new_v4(),
        listing_id: request.listing_id,
        owner_user_id: listing.owner_id,
        chat_user_id: user.0,
    };
    let chat = diesel::insert_into(chats::table)
        .values(&new_chat)
        .get_result::<Chat>(&mut conn)
        .await
        .map_err(db_error)?;

    Ok(Json(chat))
}

pub async fn list_chats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Chat>>, ApiError> {
    let mut conn = state.pool.get().await.map_err(db_error)?;

    let rows = chats::table
        .filter(
            chats::owner_user_id
                .eq(&user.0)
                .or(chats::chat_user_id.eq(&user.0)),
        )
        .order(chats::created_at.desc())
        .load::<Chat>(&mut conn)
        .await
        .map_err(db_error)?;

    Ok(Json(rows))
}

pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let mut conn = state.pool.get().await.map_err(db_error)?;

    let chat = participant_chat(&mut conn, id, &user.0).await?;
    let rows = chat_messages::table
        .filter(chat_messages::chat_id.eq(chat.id))
        .order(chat_messages::created_at.asc())
        .load::<ChatMessage>(&mut conn)
        .await
        .map_err(db_error)?;

    Ok(Json(rows))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message cannot be empty"));
    }

    let mut conn = state.pool.get().await.map_err(db_error)?;

    let chat = participant_chat(&mut conn, id, &user.0).await?;
    let new_message = NewChatMessage {
        id: Uuid::new_v4(),
        chat_id: chat.id,
        sender_id: user.0.clone(),
        message: message.to_string(),
    };
    let message = diesel::insert_into(chat_messages::table)
        .values(&new_message)
        .get_result::<ChatMessage>(&mut conn)
        .await
        .map_err(db_error)?;

    Ok(Json(message))
}

async fn participant_chat(
    conn: &mut AsyncPgConnection,
    chat_id: Uuid,
    user_id: &str,
) -> Result<Chat, ApiError> {
    let chat = chats::table
        .filter(chats::id.eq(chat_id))
        .first::<Chat>(conn)
        .await
        .optional()
        .map_err(db_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Chat not found"))?;

    if chat.owner_user_id != user_id && chat.chat_user_id != user_id {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "You are not part of this chat",
        ));
    }
    Ok(chat)
}
