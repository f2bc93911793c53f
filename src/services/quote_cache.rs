use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::errors::QuoteError;

use super::quote_source::{Quote, QuoteSource};

struct CachedQuote {
    quote: Quote,
    fetched_at: Instant,
}

/// Bounded, TTL-limited quote cache for interactive price lookups.
/// The alert evaluator always talks to the uncached source.
pub struct CachedQuoteSource {
    inner: Arc<dyn QuoteSource>,
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, CachedQuote>>,
}

impl CachedQuoteSource {
    pub fn new(inner: Arc<dyn QuoteSource>, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedQuote>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fresh(&self, symbol: &str) -> Option<Quote> {
        let entries = self.lock();
        let hit = entries.get(symbol)?;
        (hit.fetched_at.elapsed() < self.ttl).then(|| hit.quote.clone())
    }

    fn store(&self, symbol: String, quote: Quote) {
        let mut entries = self.lock();
        let ttl = self.ttl;

        if !entries.contains_key(&symbol) && entries.len() >= self.capacity {
            entries.retain(|_, e| e.fetched_at.elapsed() < ttl);
        }

        if !entries.contains_key(&symbol) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.fetched_at)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                entries.remove(&k);
            }
        }

        entries.insert(
            symbol,
            CachedQuote {
                quote,
                fetched_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl QuoteSource for CachedQuoteSource {
    async fn price(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let sym = symbol.trim().to_uppercase();

        if let Some(q) = self.fresh(&sym) {
            return Ok(q);
        }

        let quote = self.inner.price(&sym).await?;
        self.store(sym, quote.clone());
        Ok(quote)
    }
}
