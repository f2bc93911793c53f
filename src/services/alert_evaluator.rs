//! One evaluation pass over every active alert.
//!
//! Quotes are fetched once per symbol with a bounded fan-out and a per-fetch
//! timeout; each alert then gets its own [`AlertOutcome`]. A triggered alert
//! is recorded as a notification first and deactivated second. The
//! notification is keyed by `(alert_id, generation)`, so if deactivation
//! fails the next pass finds the notification already recorded and only
//! retries the deactivation.

use std::{collections::HashMap, sync::Arc, time::Duration};

use futures_util::{stream, StreamExt};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    errors::{PassError, QuoteError, StoreError},
    models::{Alert, NewNotification},
};

use super::{
    alert_store::AlertStore,
    notification_store::{NotificationStore, NotifyOutcome},
    quote_source::{Quote, QuoteSource},
};

#[derive(Debug, Clone, Copy)]
pub struct EvaluatorOptions {
    pub quote_timeout: Duration,
    pub quote_concurrency: usize,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            quote_timeout: Duration::from_secs(10),
            quote_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertOutcome {
    NotMet { price: f64 },
    Triggered { price: f64 },
    /// Notification was already on record; the pending deactivation was applied.
    Reconciled { price: f64 },
    QuoteFailed(QuoteError),
    Invalid(String),
    NotifyFailed { price: f64, error: StoreError },
    DeactivateFailed { price: f64, error: StoreError },
}

impl AlertOutcome {
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            AlertOutcome::NotifyFailed { .. } | AlertOutcome::DeactivateFailed { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct AlertEvaluation {
    pub alert_id: ObjectId,
    pub user_id: ObjectId,
    pub symbol: String,
    pub outcome: AlertOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub evaluations: Vec<AlertEvaluation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub checked: usize,
    pub triggered: usize,
    pub not_met: usize,
    pub quote_failures: usize,
    pub invalid: usize,
    pub store_failures: usize,
}

impl PassReport {
    pub fn outcome_for(&self, alert_id: ObjectId) -> Option<&AlertOutcome> {
        self.evaluations
            .iter()
            .find(|e| e.alert_id == alert_id)
            .map(|e| &e.outcome)
    }

    pub fn summary(&self) -> PassSummary {
        let mut s = PassSummary {
            checked: self.evaluations.len(),
            ..PassSummary::default()
        };

        for e in &self.evaluations {
            match &e.outcome {
                AlertOutcome::NotMet { .. } => s.not_met += 1,
                AlertOutcome::Triggered { .. } | AlertOutcome::Reconciled { .. } => {
                    s.triggered += 1
                }
                AlertOutcome::QuoteFailed(_) => s.quote_failures += 1,
                AlertOutcome::Invalid(_) => s.invalid += 1,
                AlertOutcome::NotifyFailed { .. } | AlertOutcome::DeactivateFailed { .. } => {
                    s.store_failures += 1
                }
            }
        }

        s
    }
}

pub fn trigger_message(alert: &Alert, price: f64) -> String {
    format!(
        "{} is {} ${}. Current price: ${}",
        alert.symbol, alert.condition, alert.target_price, price
    )
}

#[derive(Clone)]
pub struct AlertEvaluator {
    alerts: Arc<dyn AlertStore>,
    notifications: Arc<dyn NotificationStore>,
    quotes: Arc<dyn QuoteSource>,
    clock: Arc<dyn Clock>,
    options: EvaluatorOptions,
}

impl AlertEvaluator {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        notifications: Arc<dyn NotificationStore>,
        quotes: Arc<dyn QuoteSource>,
        clock: Arc<dyn Clock>,
        options: EvaluatorOptions,
    ) -> Self {
        Self {
            alerts,
            notifications,
            quotes,
            clock,
            options,
        }
    }

    pub async fn run_pass(&self) -> Result<PassReport, PassError> {
        let active = self
            .alerts
            .list_active()
            .await
            .map_err(PassError::LoadActive)?;

        let mut report = PassReport::default();
        if active.is_empty() {
            debug!("no active alerts");
            return Ok(report);
        }

        // One quote request per symbol per pass.
        let mut by_symbol: HashMap<String, Vec<Alert>> = HashMap::new();
        for alert in active {
            if let Err(reason) = alert.validate() {
                warn!(alert_id = %alert.id, reason = %reason, "skipping invalid alert");
                report.push(&alert, AlertOutcome::Invalid(reason));
                continue;
            }
            let sym = alert.symbol.trim().to_uppercase();
            by_symbol.entry(sym).or_default().push(alert);
        }

        let quotes: HashMap<String, Result<Quote, QuoteError>> =
            stream::iter(by_symbol.keys().cloned())
                .map(|sym| async move {
                    let res = self.fetch_quote(&sym).await;
                    (sym, res)
                })
                .buffer_unordered(self.options.quote_concurrency.max(1))
                .collect()
                .await;

        for (sym, group) in by_symbol {
            let quote = match quotes.get(&sym) {
                Some(q) => q,
                None => continue,
            };

            for alert in group {
                let outcome = match quote {
                    Ok(q) => self.evaluate_alert(&alert, q.price).await,
                    Err(e) => {
                        warn!(alert_id = %alert.id, symbol = %sym, error = %e, "quote fetch failed; alert stays active");
                        AlertOutcome::QuoteFailed(e.clone())
                    }
                };
                report.push(&alert, outcome);
            }
        }

        let summary = report.summary();
        info!(
            checked = summary.checked,
            triggered = summary.triggered,
            quote_failures = summary.quote_failures,
            store_failures = summary.store_failures,
            invalid = summary.invalid,
            "alert pass finished"
        );

        Ok(report)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        match time::timeout(self.options.quote_timeout, self.quotes.price(symbol)).await {
            Ok(res) => res,
            Err(_) => Err(QuoteError::Timeout(symbol.to_string())),
        }
    }

    /// Evaluates one alert against an observed price and performs the
    /// notify-then-deactivate writes when the condition holds.
    pub async fn evaluate_alert(&self, alert: &Alert, price: f64) -> AlertOutcome {
        if !alert.condition.is_met(price, alert.target_price) {
            debug!(
                alert_id = %alert.id,
                symbol = %alert.symbol,
                price,
                target = alert.target_price,
                "condition not met"
            );
            return AlertOutcome::NotMet { price };
        }

        let now = self.clock.now();
        let new = NewNotification {
            user_id: alert.user_id,
            message: trigger_message(alert, price),
            created_at: now,
            alert_id: Some(alert.id),
            alert_generation: Some(alert.generation),
        };

        let fresh = match self.notifications.create(new).await {
            Ok(NotifyOutcome::Created(_)) => true,
            Ok(NotifyOutcome::AlreadyRecorded) => false,
            Err(error) => {
                error!(
                    alert_id = %alert.id,
                    symbol = %alert.symbol,
                    price,
                    error = %error,
                    "failed to record alert notification"
                );
                return AlertOutcome::NotifyFailed { price, error };
            }
        };

        match self.alerts.deactivate(alert.id, now).await {
            Ok(changed) => {
                if !changed {
                    debug!(alert_id = %alert.id, "alert was no longer active when deactivating");
                }
                if fresh {
                    info!(
                        alert_id = %alert.id,
                        symbol = %alert.symbol,
                        condition = %alert.condition,
                        target = alert.target_price,
                        price,
                        "alert triggered"
                    );
                    AlertOutcome::Triggered { price }
                } else {
                    info!(alert_id = %alert.id, symbol = %alert.symbol, "deactivated previously notified alert");
                    AlertOutcome::Reconciled { price }
                }
            }
            Err(error) => {
                error!(
                    alert_id = %alert.id,
                    symbol = %alert.symbol,
                    price,
                    error = %error,
                    "notification recorded but deactivation failed; retrying next pass"
                );
                AlertOutcome::DeactivateFailed { price, error }
            }
        }
    }
}

impl PassReport {
    fn push(&mut self, alert: &Alert, outcome: AlertOutcome) {
        self.evaluations.push(AlertEvaluation {
            alert_id: alert.id,
            user_id: alert.user_id,
            symbol: alert.symbol.clone(),
            outcome,
        });
    }
}
