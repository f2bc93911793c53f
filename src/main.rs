use std::{net::SocketAddr, sync::Arc};

use mongodb::Client;
use tracing_subscriber::EnvFilter;

use stockalerts::{
    clock::{Clock, SystemClock},
    config::{self, StoreBackend},
    routes,
    services::{
        alert_store::{AlertStore, MongoAlertStore},
        db_init,
        memory_store::{MemoryAlertStore, MemoryNotificationStore},
        notification_store::{MongoNotificationStore, NotificationStore},
        quote_source,
    },
    AppState,
};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    let (db, alerts, notifications): (
        Option<mongodb::Database>,
        Arc<dyn AlertStore>,
        Arc<dyn NotificationStore>,
    ) = match settings.store_backend {
        StoreBackend::Mongo => {
            let client = Client::with_uri_str(&settings.mongodb_uri)
                .await
                .expect("Failed to connect to MongoDB");
            let db = client.database(&settings.mongodb_db);

            if let Err(e) = db_init::ensure_indexes(&db).await {
                tracing::warn!(error = %e, "failed to ensure indexes");
            }

            let alerts: Arc<dyn AlertStore> = Arc::new(MongoAlertStore::new(&db));
            let notifications: Arc<dyn NotificationStore> =
                Arc::new(MongoNotificationStore::new(&db));
            (Some(db), alerts, notifications)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory stores; data is lost on restart");
            let alerts: Arc<dyn AlertStore> = Arc::new(MemoryAlertStore::new());
            let notifications: Arc<dyn NotificationStore> =
                Arc::new(MemoryNotificationStore::new());
            (None, alerts, notifications)
        }
    };

    let quotes = quote_source::from_settings(&settings).expect("Failed to build quote client");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = AppState::new(settings.clone(), db, alerts, notifications, quotes, clock);
    state.monitor.start();

    let app = routes::app(state.clone());

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // let an in-flight alert pass finish before exiting
    state.monitor.stop().await;
}
