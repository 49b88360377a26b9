use crate::error::{Error, Result, WebhookFailed};
use crate::models::webhook_call::{WebhookCall, WebhookException};
use crate::services::events::{event_topic, EventSink};
use crate::services::job_queue::TaskSubmitter;
use crate::services::job_resolver::JobResolver;
use crate::services::jobs::JobRegistry;
use crate::services::webhook_call_store::WebhookCallStore;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Runs stored calls through exception clearing, event broadcast and
/// handler dispatch.
#[derive(Clone)]
pub struct WebhookProcessor {
    store: Arc<dyn WebhookCallStore>,
    resolver: JobResolver,
    registry: Arc<JobRegistry>,
    events: Arc<dyn EventSink>,
    submitter: Arc<dyn TaskSubmitter>,
}

impl WebhookProcessor {
    pub fn new(
        store: Arc<dyn WebhookCallStore>,
        resolver: JobResolver,
        registry: JobRegistry,
        events: Arc<dyn EventSink>,
        submitter: Arc<dyn TaskSubmitter>,
    ) -> Self {
        Self {
            store,
            resolver,
            registry: Arc::new(registry),
            events,
            submitter,
        }
    }

    /// Stores an inbound body as a new call and processes it. A failure is
    /// recorded on the stored call before being returned.
    pub async fn receive(&self, payload: JsonValue) -> Result<WebhookCall> {
        let description = WebhookCall::description_of(&payload);
        let mut call = self.store.create(&description, payload).await?;

        if let Err(err) = self.process(&mut call).await {
            if let Err(save_err) = self.save_exception(&mut call, &err).await {
                tracing::error!(
                    webhook_call_id = %call.id,
                    error = %save_err,
                    "Failed to record webhook exception"
                );
            }
            return Err(err);
        }

        Ok(call)
    }

    /// One processing attempt. Errors are returned untouched; recording them
    /// is up to the caller.
    pub async fn process(&self, call: &mut WebhookCall) -> Result<()> {
        self.clear_exception(call).await?;

        if call.description.is_empty() {
            return Err(WebhookFailed::MissingDescription { id: call.id }.into());
        }

        self.events.broadcast(&event_topic(&call.description), call);

        let Some(handler) = self.resolver.resolve(&call.description) else {
            tracing::debug!(
                webhook_call_id = %call.id,
                description = %call.description,
                "No job configured for webhook description"
            );
            return Ok(());
        };

        let job = self
            .registry
            .build(handler, call.clone())
            .ok_or_else(|| WebhookFailed::UnknownHandler {
                handler: handler.to_string(),
                id: call.id,
                description: call.description.clone(),
            })?;

        self.submitter.submit(job).await?;
        tracing::info!(
            webhook_call_id = %call.id,
            description = %call.description,
            handler,
            "Submitted webhook job"
        );
        Ok(())
    }

    /// Records `err` as the call's exception and persists it.
    pub async fn save_exception(&self, call: &mut WebhookCall, err: &Error) -> Result<WebhookCall> {
        let mut updated = call.clone();
        updated.exception = Some(WebhookException::from(err));
        self.store.save(&mut updated).await?;
        tracing::warn!(
            webhook_call_id = %updated.id,
            code = err.code(),
            error = %err,
            "Webhook call failed"
        );
        *call = updated;
        Ok(call.clone())
    }

    async fn clear_exception(&self, call: &mut WebhookCall) -> Result<()> {
        if call.exception.is_some() {
            tracing::debug!(webhook_call_id = %call.id, "Clearing previous webhook exception");
        }
        let mut cleared = call.clone();
        cleared.exception = None;
        self.store.save(&mut cleared).await?;
        *call = cleared;
        Ok(())
    }
}
