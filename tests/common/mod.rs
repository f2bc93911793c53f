#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use mongodb::bson::oid::ObjectId;
use stockalerts::{
    auth::Claims,
    clock::Clock,
    errors::{QuoteError, StoreError},
    models::{Alert, AlertCondition, NewNotification, Notification},
    services::{
        alert_evaluator::{AlertEvaluator, EvaluatorOptions},
        alert_store::AlertStore,
        memory_store::{MemoryAlertStore, MemoryNotificationStore},
        notification_store::{NotificationStore, NotifyOutcome},
        quote_source::{Quote, QuoteSource},
    },
};

pub const NOW: i64 = 1_700_000_000;

/// Signs an HS256 token the way the account service does.
pub fn make_jwt(secret: &str, user_id: &ObjectId, role: &str, days: i64) -> String {
    let exp = (Utc::now() + ChronoDuration::days(days)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_hex(),
        role: role.to_string(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// Quote source answering from a fixed table, optionally after a delay.
#[derive(Default)]
pub struct ScriptedQuotes {
    prices: Mutex<HashMap<String, Result<f64, QuoteError>>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl ScriptedQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), Ok(price));
    }

    pub fn fail(&self, symbol: &str, err: QuoteError) {
        self.prices.lock().unwrap().insert(symbol.to_string(), Err(err));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for ScriptedQuotes {
    async fn price(&self, symbol: &str) -> Result<Quote, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let entry = self.prices.lock().unwrap().get(symbol).cloned();
        match entry {
            Some(Ok(price)) => Ok(Quote {
                symbol: symbol.to_string(),
                price,
            }),
            Some(Err(e)) => Err(e),
            None => Err(QuoteError::Provider(format!("unknown symbol {symbol}"))),
        }
    }
}

/// Memory alert store with injectable failures.
#[derive(Default)]
pub struct FlakyAlertStore {
    pub inner: MemoryAlertStore,
    list_failures: AtomicUsize,
    deactivate_failures: Mutex<HashMap<ObjectId, usize>>,
}

impl FlakyAlertStore {
    pub fn fail_next_lists(&self, n: usize) {
        self.list_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_deactivations(&self, id: ObjectId, n: usize) {
        self.deactivate_failures.lock().unwrap().insert(id, n);
    }

    pub fn get(&self, id: ObjectId) -> Alert {
        self.inner.get(id).expect("alert exists")
    }
}

#[async_trait]
impl AlertStore for FlakyAlertStore {
    async fn list_active(&self) -> Result<Vec<Alert>, StoreError> {
        let remaining = self.list_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.list_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Database("connection reset".into()));
        }
        self.inner.list_active().await
    }

    async fn deactivate(&self, id: ObjectId, triggered_at: i64) -> Result<bool, StoreError> {
        {
            let mut failures = self.deactivate_failures.lock().unwrap();
            if let Some(n) = failures.get_mut(&id) {
                if *n > 0 {
                    *n -= 1;
                    return Err(StoreError::Database("write conflict".into()));
                }
            }
        }
        self.inner.deactivate(id, triggered_at).await
    }

    async fn insert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.inner.insert(alert).await
    }

    async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Alert>, StoreError> {
        self.inner.list_for_user(user_id).await
    }

    async fn find_for_user(
        &self,
        user_id: ObjectId,
        id: ObjectId,
    ) -> Result<Option<Alert>, StoreError> {
        self.inner.find_for_user(user_id, id).await
    }

    async fn replace(&self, alert: &Alert) -> Result<bool, StoreError> {
        self.inner.replace(alert).await
    }

    async fn delete_for_user(&self, user_id: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        self.inner.delete_for_user(user_id, id).await
    }
}

/// Memory notification store that refuses writes for selected users.
#[derive(Default)]
pub struct FlakyNotificationStore {
    pub inner: MemoryNotificationStore,
    failing_users: Mutex<HashSet<ObjectId>>,
}

impl FlakyNotificationStore {
    pub fn fail_for_user(&self, user_id: ObjectId) {
        self.failing_users.lock().unwrap().insert(user_id);
    }

    pub fn all(&self) -> Vec<Notification> {
        self.inner.all()
    }

    pub fn for_user(&self, user_id: ObjectId) -> Vec<Notification> {
        self.inner
            .all()
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .collect()
    }
}

#[async_trait]
impl NotificationStore for FlakyNotificationStore {
    async fn create(&self, new: NewNotification) -> Result<NotifyOutcome, StoreError> {
        if self.failing_users.lock().unwrap().contains(&new.user_id) {
            return Err(StoreError::Database("disk full".into()));
        }
        self.inner.create(new).await
    }

    async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Notification>, StoreError> {
        self.inner.list_for_user(user_id).await
    }

    async fn mark_read(&self, user_id: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        self.inner.mark_read(user_id, id).await
    }
}

pub fn new_alert(symbol: &str, target_price: f64, condition: AlertCondition) -> Alert {
    Alert {
        id: ObjectId::new(),
        user_id: ObjectId::new(),
        symbol: symbol.to_string(),
        condition,
        target_price,
        is_active: true,
        generation: 0,
        created_at: NOW - 3600,
        triggered_at: None,
    }
}

pub struct Harness {
    pub alerts: Arc<FlakyAlertStore>,
    pub notifications: Arc<FlakyNotificationStore>,
    pub quotes: Arc<ScriptedQuotes>,
    pub evaluator: AlertEvaluator,
}

impl Harness {
    pub fn new(options: EvaluatorOptions) -> Self {
        let alerts = Arc::new(FlakyAlertStore::default());
        let notifications = Arc::new(FlakyNotificationStore::default());
        let quotes = Arc::new(ScriptedQuotes::new());

        let evaluator = AlertEvaluator::new(
            alerts.clone(),
            notifications.clone(),
            quotes.clone(),
            Arc::new(FixedClock(NOW)),
            options,
        );

        Self {
            alerts,
            notifications,
            quotes,
            evaluator,
        }
    }

    pub async fn add(&self, alert: &Alert) {
        self.alerts.insert(alert).await.unwrap();
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(EvaluatorOptions {
            quote_timeout: Duration::from_secs(10),
            quote_concurrency: 4,
        })
    }
}
