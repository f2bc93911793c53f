use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::QuoteError;

use super::quote_source::{checked_quote, Quote, QuoteSource};

#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, QuoteError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, api_key })
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub async fn quote(&self, symbol: &str) -> Result<QuoteResponse, QuoteError> {
        if !self.has_key() {
            return Err(QuoteError::MissingApiKey);
        }

        let url = "https://finnhub.io/api/v1/quote";
        let res = self
            .http
            .get(url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(QuoteError::Status { status, body });
        }

        res.json::<QuoteResponse>()
            .await
            .map_err(|e| QuoteError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl QuoteSource for FinnhubClient {
    async fn price(&self, symbol: &str) -> Result<Quote, QuoteError> {
        self.quote(symbol).await?.into_quote(symbol)
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteResponse {
    // current
    #[serde(default)]
    pub c: Option<f64>,
    // change
    #[serde(default)]
    pub d: Option<f64>,
    // percent change
    #[serde(default)]
    pub dp: Option<f64>,
    // previous close
    #[serde(default)]
    pub pc: Option<f64>,
    // timestamp
    #[serde(default)]
    pub t: Option<i64>,
}

impl QuoteResponse {
    /// Finnhub reports unknown symbols as an all-zero quote.
    pub fn into_quote(self, symbol: &str) -> Result<Quote, QuoteError> {
        let price = self
            .c
            .ok_or_else(|| QuoteError::MissingPrice(symbol.to_string()))?;
        checked_quote(symbol, price)
    }
}
