pub mod events;
pub mod job_queue;
pub mod job_resolver;
pub mod jobs;
pub mod webhook_call_store;
pub mod webhook_processor;
