use axum::{
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{errors::ApiError, models::CurrentUser, AppState};

/// Token payload. Tokens are issued by the account service; this crate only
/// verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // user id as hex string
    pub sub: String,
    #[serde(default)]
    pub role: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn current_user(state: &AppState, token: &str) -> Option<CurrentUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
        &validation,
    )
    .ok()?;

    let id = ObjectId::parse_str(&data.claims.sub).ok()?;
    Some(CurrentUser {
        id,
        role: data.claims.role,
    })
}

/// Puts `CurrentUser` into request extensions when a valid token is present
/// in the `Authorization` header or the auth cookie.
pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = bearer_token(req.headers()).or_else(|| {
        CookieJar::from_headers(req.headers())
            .get(&state.settings.jwt_cookie_name)
            .map(|c| c.value().to_string())
    });

    if let Some(user) = token.and_then(|t| current_user(&state, &t)) {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}

fn is_public_path(path: &str) -> bool {
    path == "/health" || path == "/health/db"
}

pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    // inject_current_user already ran
    if req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    ApiError::Unauthorized.into_response()
}
