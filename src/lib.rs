//! Library entrypoint for StockAlerts.
//!
//! Integration tests under `tests/` import the app state, routers and the
//! alert services from here.

use std::sync::Arc;

pub mod clock;
pub mod config;
pub mod errors;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

use clock::Clock;
use services::{
    alert_evaluator::{AlertEvaluator, EvaluatorOptions},
    alert_monitor::AlertMonitor,
    alert_store::AlertStore,
    notification_store::NotificationStore,
    quote_cache::CachedQuoteSource,
    quote_source::QuoteSource,
};

#[derive(Clone)]
pub struct AppState {
    // None with the in-memory backend
    pub db: Option<mongodb::Database>,
    pub settings: config::Settings,
    pub alerts: Arc<dyn AlertStore>,
    pub notifications: Arc<dyn NotificationStore>,
    /// Cached lookups for the price endpoint.
    pub quotes: Arc<dyn QuoteSource>,
    pub clock: Arc<dyn Clock>,
    pub monitor: AlertMonitor,
}

impl AppState {
    /// Wires the evaluator and monitor around the given stores. `quotes` is
    /// the raw provider; the monitor uses it directly and the price endpoint
    /// goes through a bounded cache.
    pub fn new(
        settings: config::Settings,
        db: Option<mongodb::Database>,
        alerts: Arc<dyn AlertStore>,
        notifications: Arc<dyn NotificationStore>,
        quotes: Arc<dyn QuoteSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let evaluator = AlertEvaluator::new(
            alerts.clone(),
            notifications.clone(),
            quotes.clone(),
            clock.clone(),
            EvaluatorOptions {
                quote_timeout: settings.quote_timeout,
                quote_concurrency: settings.quote_concurrency,
            },
        );
        let monitor = AlertMonitor::new(evaluator, settings.alert_check_interval);

        let cached: Arc<dyn QuoteSource> = Arc::new(CachedQuoteSource::new(
            quotes,
            settings.quote_cache_ttl,
            settings.quote_cache_capacity,
        ));

        Self {
            db,
            settings,
            alerts,
            notifications,
            quotes: cached,
            clock,
            monitor,
        }
    }
}
