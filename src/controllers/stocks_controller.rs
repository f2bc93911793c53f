use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{errors::ApiError, AppState};

// GET /api/stocks/:symbol/price
pub async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let sym = symbol.trim().to_uppercase();
    if sym.is_empty() {
        return Err(ApiError::Validation("Missing symbol.".into()));
    }

    let quote = state.quotes.price(&sym).await?;
    Ok(Json(json!({ "success": true, "data": quote })))
}
