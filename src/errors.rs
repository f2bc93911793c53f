//! Error types for each layer of the service.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure to obtain a usable price from a quote provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    #[error("quote provider API key is not configured")]
    MissingApiKey,

    #[error("quote request failed: {0}")]
    Http(String),

    #[error("quote provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("quote provider error: {0}")]
    Provider(String),

    #[error("malformed quote response: {0}")]
    Malformed(String),

    #[error("no price in quote response for {0}")]
    MissingPrice(String),

    #[error("invalid price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },

    #[error("quote request for {0} timed out")]
    Timeout(String),
}

impl From<reqwest::Error> for QuoteError {
    fn from(e: reqwest::Error) -> Self {
        // the request url carries the api key
        QuoteError::Http(e.without_url().to_string())
    }
}

/// Persistence failure in an alert or notification store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("failed to decode {collection} document: {reason}")]
    Decode { collection: &'static str, reason: String },
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Failure of a whole evaluation pass (per-alert failures are not pass failures).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PassError {
    #[error("failed to load active alerts: {0}")]
    LoadActive(#[source] StoreError),
}

/// Errors surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Pass(#[from] PassError),
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Validation(e.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Quote(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) | ApiError::Pass(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (
            status,
            Json(json!({ "success": false, "message": self.to_string() })),
        )
            .into_response()
    }
}
