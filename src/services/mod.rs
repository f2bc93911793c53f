pub mod quote_source;
pub mod twelvedata;
pub mod finnhub;
pub mod quote_cache;

pub mod alert_store;
pub mod notification_store;
pub mod memory_store;
pub mod db_init;

pub mod alert_evaluator;
pub mod alert_monitor;

pub mod alerts_service;
pub mod notifications_service;
