use crate::models::webhook_call::WebhookCall;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A unit of work built from one webhook call and run off the request path.
#[async_trait]
pub trait WebhookJob: Send + Sync {
    /// Handler identifier the job was built for.
    fn name(&self) -> &str;

    fn webhook_call(&self) -> &WebhookCall;

    async fn handle(&self) -> anyhow::Result<()>;
}

pub type JobFactory = Arc<dyn Fn(WebhookCall) -> Box<dyn WebhookJob> + Send + Sync>;

/// Handler identifiers known to this process, populated at startup.
#[derive(Clone, Default)]
pub struct JobRegistry {
    factories: HashMap<String, JobFactory>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `log` handler.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(LogWebhookJob::NAME, |call| Box::new(LogWebhookJob::new(call)));
        registry
    }

    pub fn register<F>(&mut self, handler: &str, factory: F) -> &mut Self
    where
        F: Fn(WebhookCall) -> Box<dyn WebhookJob> + Send + Sync + 'static,
    {
        self.factories.insert(handler.to_string(), Arc::new(factory));
        self
    }

    pub fn contains(&self, handler: &str) -> bool {
        self.factories.contains_key(handler)
    }

    pub fn build(&self, handler: &str, call: WebhookCall) -> Option<Box<dyn WebhookJob>> {
        self.factories.get(handler).map(|factory| factory(call))
    }
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<&String> = self.factories.keys().collect();
        handlers.sort();
        f.debug_struct("JobRegistry")
            .field("handlers", &handlers)
            .finish()
    }
}

/// Writes the received call to the log.
pub struct LogWebhookJob {
    call: WebhookCall,
}

impl LogWebhookJob {
    pub const NAME: &'static str = "log";

    pub fn new(call: WebhookCall) -> Self {
        Self { call }
    }
}

#[async_trait]
impl WebhookJob for LogWebhookJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn webhook_call(&self) -> &WebhookCall {
        &self.call
    }

    async fn handle(&self) -> anyhow::Result<()> {
        tracing::info!(
            webhook_call_id = %self.call.id,
            description = %self.call.description,
            payload = %self.call.payload,
            "Received Easypost webhook"
        );
        Ok(())
    }
}
