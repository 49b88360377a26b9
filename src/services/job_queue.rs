use crate::error::WebhookFailed;
use crate::services::jobs::WebhookJob;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

/// Hands a job off to run independently of the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskSubmitter: Send + Sync {
    /// Resolves once the job is scheduled, not once it has run.
    async fn submit(&self, job: Box<dyn WebhookJob>) -> Result<(), WebhookFailed>;
}

pub type JobReceiver = mpsc::Receiver<Box<dyn WebhookJob>>;

/// Bounded in-process job queue drained by [`run_job_worker`].
#[derive(Clone)]
pub struct QueueTaskSubmitter {
    tx: mpsc::Sender<Box<dyn WebhookJob>>,
}

pub fn job_queue(capacity: usize) -> (QueueTaskSubmitter, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueTaskSubmitter { tx }, rx)
}

#[async_trait]
impl TaskSubmitter for QueueTaskSubmitter {
    async fn submit(&self, job: Box<dyn WebhookJob>) -> Result<(), WebhookFailed> {
        self.tx.send(job).await.map_err(|mpsc::error::SendError(job)| {
            WebhookFailed::JobQueueClosed {
                handler: job.name().to_string(),
                id: job.webhook_call().id,
            }
        })
    }
}

/// Drains the queue, running each job on its own task so a slow handler does
/// not hold up the ones behind it. At most `max_concurrency` jobs run at once;
/// past that the worker stops pulling and the queue fills up, which makes
/// `submit` wait. Returns when every submitter is dropped.
pub async fn run_job_worker(mut rx: JobReceiver, max_concurrency: usize) {
    let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
    while let Some(job) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        tokio::spawn(async move {
            let _permit = permit;
            let handler = job.name().to_string();
            let webhook_call_id = job.webhook_call().id;
            match job.handle().await {
                Ok(()) => tracing::debug!(%handler, %webhook_call_id, "Webhook job finished"),
                Err(e) => {
                    tracing::error!(%handler, %webhook_call_id, error = ?e, "Webhook job failed")
                }
            }
        });
    }
    tracing::info!("Webhook job queue closed");
}
