use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::errors::QuoteError;

use super::quote_source::{checked_quote, Quote, QuoteSource};

const BASE_URL: &str = "https://api.twelvedata.com";

#[derive(Clone)]
pub struct TwelveDataClient {
    http: Client,
    api_key: String,
}

impl TwelveDataClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, QuoteError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self { http, api_key })
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[async_trait]
impl QuoteSource for TwelveDataClient {
    async fn price(&self, symbol: &str) -> Result<Quote, QuoteError> {
        if !self.has_key() {
            return Err(QuoteError::MissingApiKey);
        }

        let url = format!("{BASE_URL}/price");
        let res = self
            .http
            .get(url)
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(QuoteError::Status { status, body });
        }

        let body = res.text().await?;
        parse_price_body(symbol, &body)
    }
}

/// Twelve Data answers `{"price":"187.12"}` on success and
/// `{"code":400,"message":"...","status":"error"}` (still HTTP 200) on failure.
pub fn parse_price_body(symbol: &str, body: &str) -> Result<Quote, QuoteError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| QuoteError::Malformed(e.to_string()))?;

    if value.get("status").and_then(Value::as_str) == Some("error") {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(QuoteError::Provider(message.to_string()));
    }

    let price = match value.get("price") {
        None | Some(Value::Null) => return Err(QuoteError::MissingPrice(symbol.to_string())),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| QuoteError::Malformed(format!("price '{s}' is not a number")))?,
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| QuoteError::Malformed(format!("price {n} is not a float")))?,
        Some(other) => {
            return Err(QuoteError::Malformed(format!("unexpected price value {other}")));
        }
    };

    checked_quote(symbol, price)
}
