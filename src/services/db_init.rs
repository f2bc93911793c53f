use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Database, IndexModel,
};

use crate::errors::StoreError;

use super::{alert_store::ALERTS, notification_store::NOTIFICATIONS};

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    // alerts: monitor scan
    {
        let col = db.collection::<Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "is_active": 1, "symbol": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: per-user listing, newest first
    {
        let col = db.collection::<Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    // notifications: per-user listing, newest first
    {
        let col = db.collection::<Document>(NOTIFICATIONS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    // notifications: at most one per alert generation
    {
        let col = db.collection::<Document>(NOTIFICATIONS);
        let model = IndexModel::builder()
            .keys(doc! { "alert_id": 1, "alert_generation": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "alert_id": { "$exists": true } })
                    .build(),
            )
            .build();

        col.create_index(model, None).await?;
    }

    Ok(())
}
