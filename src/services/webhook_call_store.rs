use crate::error::{Error, Result};
use crate::models::webhook_call::{WebhookCall, WebhookCallRow};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Persistence for inbound webhook calls. Calls are never deleted here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookCallStore: Send + Sync {
    /// Stores a new call with a fresh id and no exception.
    async fn create(&self, description: &str, payload: JsonValue) -> Result<WebhookCall>;

    /// Writes the call's mutable fields. `updated_at` on the passed model is
    /// only refreshed once the write has completed.
    async fn save(&self, call: &mut WebhookCall) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<WebhookCall>;

    /// All stored calls, newest first.
    async fn list(&self) -> Result<Vec<WebhookCall>>;
}

#[derive(Clone)]
pub struct PgWebhookCallStore {
    pool: PgPool,
}

impl PgWebhookCallStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookCallStore for PgWebhookCallStore {
    async fn create(&self, description: &str, payload: JsonValue) -> Result<WebhookCall> {
        let row = sqlx::query_as::<_, WebhookCallRow>(
            r#"
            INSERT INTO easypost_webhook_calls (id, description, payload)
            VALUES ($1, $2, $3)
            RETURNING id, description, payload, exception, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(description)
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn save(&self, call: &mut WebhookCall) -> Result<()> {
        let exception = call
            .exception
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let row = sqlx::query(
            r#"
            UPDATE easypost_webhook_calls
            SET description = $1, exception = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING updated_at
            "#,
        )
        .bind(&call.description)
        .bind(exception)
        .bind(call.id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(Error::NotFound(format!("Webhook call {} not found", call.id)));
        };
        call.updated_at = row.try_get("updated_at")?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<WebhookCall> {
        let row = sqlx::query_as::<_, WebhookCallRow>(
            r#"SELECT id, description, payload, exception, created_at, updated_at FROM easypost_webhook_calls WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(WebhookCall::from)
            .ok_or_else(|| Error::NotFound(format!("Webhook call {} not found", id)))
    }

    async fn list(&self) -> Result<Vec<WebhookCall>> {
        let rows = sqlx::query_as::<_, WebhookCallRow>(
            r#"SELECT id, description, payload, exception, created_at, updated_at FROM easypost_webhook_calls ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(WebhookCall::from).collect())
    }
}

/// Process-local store, used for `WEBHOOK_MODEL=memory` and in tests.
#[derive(Default)]
pub struct InMemoryWebhookCallStore {
    calls: RwLock<HashMap<Uuid, WebhookCall>>,
}

impl InMemoryWebhookCallStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookCallStore for InMemoryWebhookCallStore {
    async fn create(&self, description: &str, payload: JsonValue) -> Result<WebhookCall> {
        let now = Utc::now();
        let call = WebhookCall {
            id: Uuid::new_v4(),
            description: description.to_string(),
            payload,
            exception: None,
            created_at: now,
            updated_at: now,
        };
        self.calls.write().await.insert(call.id, call.clone());
        Ok(call)
    }

    async fn save(&self, call: &mut WebhookCall) -> Result<()> {
        let mut calls = self.calls.write().await;
        let stored = calls
            .get_mut(&call.id)
            .ok_or_else(|| Error::NotFound(format!("Webhook call {} not found", call.id)))?;
        let updated_at = Utc::now();
        stored.description = call.description.clone();
        stored.exception = call.exception.clone();
        stored.updated_at = updated_at;
        call.updated_at = updated_at;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<WebhookCall> {
        self.calls
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Webhook call {} not found", id)))
    }

    async fn list(&self) -> Result<Vec<WebhookCall>> {
        let mut items: Vec<WebhookCall> = self.calls.read().await.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}
