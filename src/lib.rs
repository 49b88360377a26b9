pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::webhook_processor::WebhookProcessor;

#[derive(Clone)]
pub struct AppState {
    pub processor: WebhookProcessor,
}

impl AppState {
    pub fn new(processor: WebhookProcessor) -> Self {
        Self { processor }
    }
}
