use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::{api_error, AppState, ErrorResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// Provider user id attached to the request once the bearer token checks out.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user_id) = bearer_subject(request.headers(), &state.jwt_secret) {
        request.extensions_mut().insert(AuthUser(user_id));
    }
    next.run(request).await
}

fn bearer_subject(headers: &HeaderMap, secret: &str) -> Option<String> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    Some(token_data.claims.sub)
}

pub fn create_token(user_id: &str, secret: &str) -> anyhow::Result<String> {
    let expiration = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize + 24 * 60 * 60;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_token(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn round_trips_the_subject() {
        let token = create_token("user_123", "secret").unwrap();
        let subject = bearer_subject(&headers_with_token(&token), "secret");
        assert_eq!(subject, Some("user_123".to_string()));
    }

    #[test]
    fn rejects_a_token_signed_with_another_secret() {
        let token = create_token("user_123", "secret").unwrap();
        assert_eq!(bearer_subject(&headers_with_token(&token), "other"), None);
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert_eq!(bearer_subject(&HeaderMap::new(), "secret"), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_subject(&headers, "secret"), None);
    }
}
