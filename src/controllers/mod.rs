use axum::extract::Extension;
use mongodb::bson::oid::ObjectId;

use crate::{errors::ApiError, models::CurrentUser};

pub mod health_controller;
pub mod alerts_controller;
pub mod notifications_controller;
pub mod stocks_controller;

fn require_user(user: Option<Extension<CurrentUser>>) -> Result<CurrentUser, ApiError> {
    user.map(|Extension(u)| u).ok_or(ApiError::Unauthorized)
}

fn parse_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::Validation("bad id".into()))
}
