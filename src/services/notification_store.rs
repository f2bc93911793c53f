use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    error::{ErrorKind, WriteFailure},
    options::FindOptions,
    Collection, Database,
};

use crate::{
    errors::StoreError,
    models::{NewNotification, Notification},
};

pub const NOTIFICATIONS: &str = "notifications";

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Created(ObjectId),
    /// A notification for the same alert generation already exists.
    AlreadyRecorded,
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, new: NewNotification) -> Result<NotifyOutcome, StoreError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Notification>, StoreError>;

    /// Returns false when the notification does not exist or is not the user's.
    async fn mark_read(&self, user_id: ObjectId, id: ObjectId) -> Result<bool, StoreError>;
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(w)) if w.code == DUPLICATE_KEY
    )
}

#[derive(Clone)]
pub struct MongoNotificationStore {
    notifications: Collection<Notification>,
}

impl MongoNotificationStore {
    pub fn new(db: &Database) -> Self {
        Self {
            notifications: db.collection::<Notification>(NOTIFICATIONS),
        }
    }
}

#[async_trait]
impl NotificationStore for MongoNotificationStore {
    async fn create(&self, new: NewNotification) -> Result<NotifyOutcome, StoreError> {
        let n = new.into_notification();

        match self.notifications.insert_one(&n, None).await {
            Ok(_) => Ok(NotifyOutcome::Created(n.id)),
            Err(e) if is_duplicate_key(&e) => Ok(NotifyOutcome::AlreadyRecorded),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Notification>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let mut cursor = self
            .notifications
            .find(doc! { "user_id": user_id }, opts)
            .await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }
        Ok(items)
    }

    async fn mark_read(&self, user_id: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let res = self
            .notifications
            .update_one(
                doc! { "_id": id, "user_id": user_id },
                doc! { "$set": { "is_read": true } },
                None,
            )
            .await?;

        Ok(res.matched_count > 0)
    }
}
