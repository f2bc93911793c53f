use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::FindOptions,
    Collection, Database,
};

use crate::{errors::StoreError, models::Alert};

pub const ALERTS: &str = "alerts";

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Every alert with `is_active = true`, in no particular order.
    async fn list_active(&self) -> Result<Vec<Alert>, StoreError>;

    /// Conditionally flips an active alert to inactive.
    /// Returns false when the alert was already inactive or is gone.
    async fn deactivate(&self, id: ObjectId, triggered_at: i64) -> Result<bool, StoreError>;

    async fn insert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Alert>, StoreError>;

    async fn find_for_user(
        &self,
        user_id: ObjectId,
        id: ObjectId,
    ) -> Result<Option<Alert>, StoreError>;

    /// Overwrites the stored alert if it still belongs to its owner.
    async fn replace(&self, alert: &Alert) -> Result<bool, StoreError>;

    async fn delete_for_user(&self, user_id: ObjectId, id: ObjectId) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct MongoAlertStore {
    alerts: Collection<Alert>,
    raw: Collection<Document>,
}

impl MongoAlertStore {
    pub fn new(db: &Database) -> Self {
        Self {
            alerts: db.collection::<Alert>(ALERTS),
            raw: db.collection::<Document>(ALERTS),
        }
    }

    async fn collect(&self, filter: Document, opts: Option<FindOptions>) -> Result<Vec<Alert>, StoreError> {
        let mut cursor = self.alerts.find(filter, opts).await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }
        Ok(items)
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn list_active(&self) -> Result<Vec<Alert>, StoreError> {
        // Decode row by row so one malformed document cannot hide the rest.
        let mut cursor = self.raw.find(doc! { "is_active": true }, None).await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            let raw = res?;
            match bson::from_document::<Alert>(raw.clone()) {
                Ok(a) => items.push(a),
                Err(e) => {
                    let err = StoreError::Decode {
                        collection: ALERTS,
                        reason: e.to_string(),
                    };
                    tracing::warn!(id = ?raw.get("_id"), error = %err, "skipping malformed alert row");
                }
            }
        }

        Ok(items)
    }

    async fn deactivate(&self, id: ObjectId, triggered_at: i64) -> Result<bool, StoreError> {
        let res = self
            .alerts
            .update_one(
                doc! { "_id": id, "is_active": true },
                doc! { "$set": { "is_active": false, "triggered_at": triggered_at } },
                None,
            )
            .await?;

        Ok(res.matched_count > 0)
    }

    async fn insert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts.insert_one(alert, None).await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Alert>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        self.collect(doc! { "user_id": user_id }, Some(opts)).await
    }

    async fn find_for_user(
        &self,
        user_id: ObjectId,
        id: ObjectId,
    ) -> Result<Option<Alert>, StoreError> {
        Ok(self
            .alerts
            .find_one(doc! { "_id": id, "user_id": user_id }, None)
            .await?)
    }

    async fn replace(&self, alert: &Alert) -> Result<bool, StoreError> {
        let res = self
            .alerts
            .replace_one(doc! { "_id": alert.id, "user_id": alert.user_id }, alert, None)
            .await?;

        Ok(res.matched_count > 0)
    }

    async fn delete_for_user(&self, user_id: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let res = self
            .alerts
            .delete_one(doc! { "_id": id, "user_id": user_id }, None)
            .await?;

        Ok(res.deleted_count > 0)
    }
}
