use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub message: String,

    #[serde(default)]
    pub is_read: bool,

    pub created_at: i64,

    // (alert_id, alert_generation) is unique when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_generation: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: ObjectId,
    pub message: String,
    pub created_at: i64,
    pub alert_id: Option<ObjectId>,
    pub alert_generation: Option<i64>,
}

impl NewNotification {
    pub fn into_notification(self) -> Notification {
        Notification {
            id: ObjectId::new(),
            user_id: self.user_id,
            message: self.message,
            is_read: false,
            created_at: self.created_at,
            alert_id: self.alert_id,
            alert_generation: self.alert_generation,
        }
    }
}
