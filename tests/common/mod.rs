use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use easypost_webhooks::{
    error::WebhookFailed,
    models::webhook_call::WebhookCall,
    routes,
    services::{
        events::EventSink,
        job_queue::TaskSubmitter,
        job_resolver::JobResolver,
        jobs::{JobRegistry, WebhookJob},
        webhook_call_store::{InMemoryWebhookCallStore, WebhookCallStore},
        webhook_processor::WebhookProcessor,
    },
    AppState,
};

pub const WEBHOOK_PATH: &str = "/easypost-webhooks";

#[derive(Default)]
pub struct RecordingEvents {
    pub events: Mutex<Vec<(String, WebhookCall)>>,
}

impl RecordingEvents {
    pub fn topics(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}

impl EventSink for RecordingEvents {
    fn broadcast(&self, topic: &str, call: &WebhookCall) {
        self.events
            .lock()
            .unwrap()
            .push((topic.to_string(), call.clone()));
    }
}

/// Keeps submitted jobs instead of running them.
#[derive(Default)]
pub struct RecordingSubmitter {
    pub jobs: Mutex<Vec<(String, WebhookCall)>>,
}

#[async_trait]
impl TaskSubmitter for RecordingSubmitter {
    async fn submit(&self, job: Box<dyn WebhookJob>) -> Result<(), WebhookFailed> {
        self.jobs
            .lock()
            .unwrap()
            .push((job.name().to_string(), job.webhook_call().clone()));
        Ok(())
    }
}

pub struct DummyJob {
    call: WebhookCall,
}

impl DummyJob {
    pub const NAME: &'static str = "dummy";
}

#[async_trait]
impl WebhookJob for DummyJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn webhook_call(&self) -> &WebhookCall {
        &self.call
    }

    async fn handle(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryWebhookCallStore>,
    pub events: Arc<RecordingEvents>,
    pub submitter: Arc<RecordingSubmitter>,
}

pub fn setup_app(jobs: &[(&str, &str)]) -> TestApp {
    let store = Arc::new(InMemoryWebhookCallStore::new());
    let events = Arc::new(RecordingEvents::default());
    let submitter = Arc::new(RecordingSubmitter::default());

    let jobs: HashMap<String, String> = jobs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut registry = JobRegistry::with_defaults();
    registry.register(DummyJob::NAME, |call| Box::new(DummyJob { call }));

    let processor = WebhookProcessor::new(
        store.clone() as Arc<dyn WebhookCallStore>,
        JobResolver::new(jobs),
        registry,
        events.clone() as Arc<dyn EventSink>,
        submitter.clone() as Arc<dyn TaskSubmitter>,
    );

    TestApp {
        router: routes::router(AppState::new(processor), WEBHOOK_PATH),
        store,
        events,
        submitter,
    }
}
