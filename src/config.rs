use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteProvider {
    TwelveData,
    Finnhub,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub store_backend: StoreBackend,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,

    pub quote_provider: QuoteProvider,
    pub twelve_data_api_key: String,
    pub finnhub_api_key: String,
    pub quote_timeout: Duration,
    pub quote_concurrency: usize,
    pub quote_cache_ttl: Duration,
    pub quote_cache_capacity: usize,

    pub alert_check_interval: Duration,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let store_backend = match var_or("STORE_BACKEND", "mongo").to_lowercase().as_str() {
        "memory" => StoreBackend::Memory,
        _ => StoreBackend::Mongo,
    };

    let quote_provider = match var_or("QUOTE_PROVIDER", "twelvedata").to_lowercase().as_str() {
        "finnhub" => QuoteProvider::Finnhub,
        _ => QuoteProvider::TwelveData,
    };

    // zero would make the monitor spin
    let interval_secs = parsed_or::<u64>("ALERT_CHECK_INTERVAL_SECS", 60).max(1);

    Settings {
        mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
        mongodb_db: var_or("MONGODB_DB", "stockalerts"),
        store_backend,
        host: var_or("HOST", "127.0.0.1"),
        port: parsed_or("PORT", 5555),

        jwt_secret: var_or("JWT_SECRET", "change-me-dev-secret"),
        jwt_cookie_name: var_or("JWT_COOKIE_NAME", "auth"),

        quote_provider,
        twelve_data_api_key: var_or("TWELVE_DATA_API_KEY", ""),
        finnhub_api_key: var_or("FINNHUB_API_KEY", ""),
        quote_timeout: Duration::from_secs(parsed_or("QUOTE_TIMEOUT_SECS", 10)),
        quote_concurrency: parsed_or::<usize>("QUOTE_CONCURRENCY", 4).max(1),
        quote_cache_ttl: Duration::from_secs(parsed_or("QUOTE_CACHE_TTL_SECS", 30)),
        quote_cache_capacity: parsed_or::<usize>("QUOTE_CACHE_CAPACITY", 256).max(1),

        alert_check_interval: Duration::from_secs(interval_secs),
    }
}
