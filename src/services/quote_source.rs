use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    config::{QuoteProvider, Settings},
    errors::QuoteError,
};

use super::{finnhub::FinnhubClient, twelvedata::TwelveDataClient};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
}

/// Current-price lookup for a ticker symbol.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn price(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

/// Accepts only finite, positive prices; anything else is a failed fetch.
pub fn checked_quote(symbol: &str, price: f64) -> Result<Quote, QuoteError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(QuoteError::InvalidPrice {
            symbol: symbol.to_string(),
            price,
        });
    }

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
    })
}

pub fn from_settings(settings: &Settings) -> Result<Arc<dyn QuoteSource>, QuoteError> {
    let source: Arc<dyn QuoteSource> = match settings.quote_provider {
        QuoteProvider::TwelveData => Arc::new(TwelveDataClient::new(
            settings.twelve_data_api_key.clone(),
            settings.quote_timeout,
        )?),
        QuoteProvider::Finnhub => Arc::new(FinnhubClient::new(
            settings.finnhub_api_key.clone(),
            settings.quote_timeout,
        )?),
    };

    Ok(source)
}
