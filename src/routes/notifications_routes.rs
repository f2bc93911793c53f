use axum::{Router, routing::{get, put}};
use crate::{AppState, controllers::notifications_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/notifications", get(notifications_controller::get_notifications))
        .route("/api/notifications/:id/read", put(notifications_controller::put_mark_read))
}
