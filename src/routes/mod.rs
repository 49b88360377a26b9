pub mod health;
pub mod webhook;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Health check plus the webhook ingress route mounted at `webhook_path`.
pub fn router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(webhook_path, post(webhook::handle_webhook))
        .with_state(state)
}
