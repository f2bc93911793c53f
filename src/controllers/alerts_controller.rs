use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{json, Value};

use crate::{
    errors::ApiError,
    models::{Alert, CurrentUser},
    services::alerts_service::{self, AlertInput},
    AppState,
};

use super::{parse_id, require_user};

fn alert_json(a: &Alert) -> Value {
    json!({
        "id": a.id.to_hex(),
        "userId": a.user_id.to_hex(),
        "stockSymbol": a.symbol,
        "targetPrice": a.target_price,
        "condition": a.condition.as_str(),
        "isActive": a.is_active,
        "createdAt": a.created_at,
        "triggeredAt": a.triggered_at,
    })
}

// POST /api/alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<AlertInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let u = require_user(user)?;
    let Json(input) = body?;
    let alert = alerts_service::create_alert(&state, u.id, &input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": alert_json(&alert) })),
    ))
}

// GET /api/alerts
pub async fn get_alerts(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let u = require_user(user)?;
    let alerts = alerts_service::list_user_alerts(&state, u.id).await?;
    let items: Vec<Value> = alerts.iter().map(alert_json).collect();

    Ok(Json(json!({ "success": true, "data": items })))
}

// PUT /api/alerts/:id
pub async fn put_update_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<AlertInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let u = require_user(user)?;
    let Json(input) = body?;
    let oid = parse_id(&id)?;
    let alert = alerts_service::update_alert(&state, u.id, oid, &input).await?;

    Ok(Json(json!({ "success": true, "data": alert_json(&alert) })))
}

// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let u = require_user(user)?;
    let oid = parse_id(&id)?;
    alerts_service::delete_alert(&state, u.id, oid).await?;

    Ok(Json(json!({ "success": true, "message": "Alert deleted" })))
}

// GET /api/alerts/check (admin)
pub async fn get_check_alerts(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let u = require_user(user)?;
    if !u.is_admin() {
        return Err(ApiError::Forbidden);
    }

    tracing::info!(user_id = %u.id, "manual alert check requested");
    let report = state.monitor.run_once().await?;

    Ok(Json(json!({
        "success": true,
        "message": "Alert checked manually",
        "data": report.summary(),
    })))
}
