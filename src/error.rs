use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::error::Error as StdError;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while processing a stored webhook call.
#[derive(Debug, thiserror::Error)]
pub enum WebhookFailed {
    #[error("Webhook call id `{id}` did not contain a description. Valid Easypost webhook calls should always contain a description.")]
    MissingDescription { id: Uuid },

    #[error("Could not process webhook id `{id}` of description `{description}` because the configured job `{handler}` does not exist.")]
    UnknownHandler {
        handler: String,
        id: Uuid,
        description: String,
    },

    #[error("Could not submit job `{handler}` for webhook id `{id}` because the job queue is closed.")]
    JobQueueClosed { handler: String, id: Uuid },
}

impl WebhookFailed {
    pub fn code(&self) -> &'static str {
        match self {
            WebhookFailed::MissingDescription { .. } => "missing_description",
            WebhookFailed::UnknownHandler { .. } => "unknown_handler",
            WebhookFailed::JobQueueClosed { .. } => "job_queue_closed",
        }
    }

    /// Classification and routing failures are the sender's fault; a closed
    /// queue is ours.
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookFailed::MissingDescription { .. } | WebhookFailed::UnknownHandler { .. } => {
                StatusCode::BAD_REQUEST
            }
            WebhookFailed::JobQueueClosed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Webhook(#[from] WebhookFailed),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code, stored as `exception.code`.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::BadRequest(_) => "bad_request",
            Error::NotFound(_) => "not_found",
            Error::Database(_) => "database",
            Error::Migrate(_) => "migration",
            Error::Webhook(failed) => failed.code(),
            Error::Json(_) => "json",
            Error::Anyhow(_) => "internal",
            Error::Internal(_) => "internal",
            Error::Io(_) => "io",
        }
    }

    /// Debug form of the error followed by its source chain.
    pub fn trace(&self) -> String {
        let mut trace = format!("{:?}\n", self);
        let mut source = self.source();
        let mut depth = 0;
        while let Some(cause) = source {
            trace.push_str(&format!("#{} caused by: {}\n", depth, cause));
            source = cause.source();
            depth += 1;
        }
        trace
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::Webhook(err) => (err.status(), err.to_string()),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
