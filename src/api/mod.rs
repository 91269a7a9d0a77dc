pub mod handlers;

use axum::{routing::post, Router};
use std::sync::Arc;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/openrtb2/auction", post(handlers::handle_openrtb_auction))
        .route("/auction", post(handlers::handle_auction))
        .with_state(state)
}
