use crate::models::webhook_call::WebhookCall;
use tokio::sync::broadcast;

pub const EVENT_TOPIC_PREFIX: &str = "webhooks";

pub fn event_topic(description: &str) -> String {
    format!("{}::{}", EVENT_TOPIC_PREFIX, description)
}

#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub topic: String,
    pub call: WebhookCall,
}

/// Notifies subscribers of a processed call. Returns once every current
/// subscriber has been handed the event.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn broadcast(&self, topic: &str, call: &WebhookCall);
}

/// Fans events out over a `tokio::sync::broadcast` channel.
///
/// The channel keeps the last `capacity` events. A subscriber that falls
/// further behind loses the oldest ones and gets `RecvError::Lagged(n)` on its
/// next `recv`; it should log `n` and keep receiving.
#[derive(Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<WebhookEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WebhookEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn broadcast(&self, topic: &str, call: &WebhookCall) {
        let event = WebhookEvent {
            topic: topic.to_string(),
            call: call.clone(),
        };
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(topic, webhook_call_id = %call.id, receivers, "Broadcast webhook event")
            }
            Err(_) => {
                tracing::debug!(topic, webhook_call_id = %call.id, "No subscribers for webhook event")
            }
        }
    }
}
