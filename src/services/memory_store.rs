//! In-process stores, selected with `STORE_BACKEND=memory`.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::{
    errors::StoreError,
    models::{Alert, NewNotification, Notification},
};

use super::{
    alert_store::AlertStore,
    notification_store::{NotificationStore, NotifyOutcome},
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
pub struct MemoryAlertStore {
    rows: Mutex<Vec<Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ObjectId) -> Option<Alert> {
        lock(&self.rows).iter().find(|a| a.id == id).cloned()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn list_active(&self) -> Result<Vec<Alert>, StoreError> {
        Ok(lock(&self.rows)
            .iter()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate(&self, id: ObjectId, triggered_at: i64) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows);
        match rows.iter_mut().find(|a| a.id == id && a.is_active) {
            Some(a) => {
                a.is_active = false;
                a.triggered_at = Some(triggered_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert(&self, alert: &Alert) -> Result<(), StoreError> {
        lock(&self.rows).push(alert.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Alert>, StoreError> {
        let mut items: Vec<Alert> = lock(&self.rows)
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        // sort is stable: ties stay newest-insert first
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn find_for_user(
        &self,
        user_id: ObjectId,
        id: ObjectId,
    ) -> Result<Option<Alert>, StoreError> {
        Ok(lock(&self.rows)
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }

    async fn replace(&self, alert: &Alert) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows);
        match rows
            .iter_mut()
            .find(|a| a.id == alert.id && a.user_id == alert.user_id)
        {
            Some(slot) => {
                *slot = alert.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_for_user(&self, user_id: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|a| !(a.id == id && a.user_id == user_id));
        Ok(rows.len() < before)
    }
}

#[derive(Default)]
pub struct MemoryNotificationStore {
    rows: Mutex<Vec<Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        lock(&self.rows).clone()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, new: NewNotification) -> Result<NotifyOutcome, StoreError> {
        let mut rows = lock(&self.rows);

        if new.alert_id.is_some()
            && rows
                .iter()
                .any(|n| n.alert_id == new.alert_id && n.alert_generation == new.alert_generation)
        {
            return Ok(NotifyOutcome::AlreadyRecorded);
        }

        let n = new.into_notification();
        let id = n.id;
        rows.push(n);
        Ok(NotifyOutcome::Created(id))
    }

    async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Notification>, StoreError> {
        let mut items: Vec<Notification> = lock(&self.rows)
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn mark_read(&self, user_id: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows);
        match rows.iter_mut().find(|n| n.id == id && n.user_id == user_id) {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
