use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::json;
use shared::{AppEvent, WebhookEvent};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::auth;
use crate::chats;
use crate::handlers::LifecycleHandler;
use crate::listings;
use crate::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub events: mpsc::Sender<AppEvent>,
    pub jwt_secret: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

pub fn db_error(err: impl std::fmt::Display) -> ApiError {
    error!("Database error: {}", err);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Database error: {}", err),
    )
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/inngest", get(introspect))
        .route("/api/inngest", post(receive_event))
        .route(
            "/api/listing",
            get(listings::list_listings).post(listings::create_listing),
        )
        .route(
            "/api/listing/:id",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route(
            "/api/listing/:id/credentials",
            post(listings::submit_credentials),
        )
        .route("/api/listing/:id/purchase", post(listings::purchase_listing))
        .route("/api/chat", get(chats::list_chats).post(chats::open_chat))
        .route(
            "/api/chat/:id/messages",
            get(chats::list_messages).post(chats::send_message),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::identity_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn root() -> &'static str {
    "Hello World!"
}

async fn introspect() -> Json<serde_json::Value> {
    Json(json!({
        "app": "profile-exchange",
        "functions": [
            "sync-user-creation",
            "sync-user-update",
            "sync-user-deletion",
            "process-purchase",
            "handle-listing-deletion",
        ],
    }))
}

async fn receive_event(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match event.identity_event() {
        Ok(Some(identity_event)) => {
            let handler = LifecycleHandler::new(state.pool.clone());
            handler.handle(identity_event).await.map_err(|e| {
                error!("Error handling {}: {}", event.name, e);
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to process {}: {}", event.name, e),
                )
            })?;
            Ok(Json(json!({"status": "processed", "event": event.name})))
        }
        Ok(None) => {
            warn!("Ignoring unrecognized event: {}", event.name);
            Ok(Json(json!({"status": "ignored", "event": event.name})))
        }
        Err(e) => Err(api_error(StatusCode::BAD_REQUEST, format!("{:#}", e))),
    }
}
