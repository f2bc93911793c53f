use axum::{
    extract::{Extension, Json, Path, State},
    response::IntoResponse,
};
use serde_json::{json, Value};

use crate::{
    errors::ApiError,
    models::{CurrentUser, Notification},
    services::notifications_service,
    AppState,
};

use super::{parse_id, require_user};

fn notification_json(n: &Notification) -> Value {
    json!({
        "id": n.id.to_hex(),
        "message": n.message,
        "isRead": n.is_read,
        "createdAt": n.created_at,
    })
}

// GET /api/notifications
pub async fn get_notifications(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let u = require_user(user)?;
    let items = notifications_service::list_user_notifications(&state, u.id).await?;
    let data: Vec<Value> = items.iter().map(notification_json).collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

// PUT /api/notifications/:id/read
pub async fn put_mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let u = require_user(user)?;
    let oid = parse_id(&id)?;
    notifications_service::mark_as_read(&state, u.id, oid).await?;

    Ok(Json(json!({ "success": true, "message": "Notification marked as read" })))
}
