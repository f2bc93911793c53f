use mongodb::bson::oid::ObjectId;

use crate::{errors::ApiError, models::Notification, AppState};

pub async fn list_user_notifications(
    state: &AppState,
    user_id: ObjectId,
) -> Result<Vec<Notification>, ApiError> {
    Ok(state.notifications.list_for_user(user_id).await?)
}

pub async fn mark_as_read(
    state: &AppState,
    user_id: ObjectId,
    notification_id: ObjectId,
) -> Result<(), ApiError> {
    if !state.notifications.mark_read(user_id, notification_id).await? {
        return Err(ApiError::NotFound("Notification"));
    }
    Ok(())
}
