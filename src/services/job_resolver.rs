use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_STRUCTURAL_SEPARATOR: &str = ".";

/// Maps a call description to the handler identifier configured for it.
///
/// `tracker.updated` is looked up as `tracker_updated`. The mapping is
/// fixed for the lifetime of the resolver; a config refresh builds a new one.
#[derive(Debug, Clone)]
pub struct JobResolver {
    jobs: Arc<HashMap<String, String>>,
    structural_separator: String,
    key_separator: String,
}

impl JobResolver {
    pub fn new(jobs: HashMap<String, String>) -> Self {
        Self {
            jobs: Arc::new(jobs),
            structural_separator: DEFAULT_STRUCTURAL_SEPARATOR.to_string(),
            key_separator: crate::config::DEFAULT_JOB_KEY_SEPARATOR.to_string(),
        }
    }

    pub fn with_separators(mut self, structural: &str, key: &str) -> Self {
        self.structural_separator = structural.to_string();
        self.key_separator = key.to_string();
        self
    }

    pub fn job_key(&self, description: &str) -> String {
        if self.structural_separator.is_empty() {
            return description.to_string();
        }
        description.replace(&self.structural_separator, &self.key_separator)
    }

    /// `None` when nothing (or an empty identifier) is configured for the key.
    pub fn resolve(&self, description: &str) -> Option<&str> {
        self.jobs
            .get(&self.job_key(description))
            .map(String::as_str)
            .filter(|handler| !handler.is_empty())
    }
}
