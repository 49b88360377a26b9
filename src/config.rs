use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

pub const DEFAULT_WEBHOOK_PATH: &str = "/easypost-webhooks";
pub const DEFAULT_JOB_KEY_SEPARATOR: &str = "_";
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_JOB_CONCURRENCY: usize = 16;

/// Which persistence implementation backs `WebhookCall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreModel {
    Postgres,
    Memory,
}

impl FromStr for StoreModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "in_memory" => Ok(Self::Memory),
            other => Err(format!("unknown webhook model `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub webhook_path: String,
    pub model: StoreModel,
    pub database_url: Option<String>,
    pub jobs: HashMap<String, String>,
    pub job_key_separator: String,
    pub queue_capacity: usize,
    pub job_concurrency: usize,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let model = match env::var("WEBHOOK_MODEL") {
            Ok(raw) => raw.parse().map_err(Error::Config)?,
            Err(_) => StoreModel::Postgres,
        };
        let database_url = env::var("DATABASE_URL").ok();
        if model == StoreModel::Postgres && database_url.is_none() {
            return Err(Error::Config(
                "Missing environment variable: DATABASE_URL".to_string(),
            ));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            webhook_path: env::var("WEBHOOK_PATH")
                .unwrap_or_else(|_| DEFAULT_WEBHOOK_PATH.to_string()),
            model,
            database_url,
            jobs: match env::var("WEBHOOK_JOBS") {
                Ok(raw) => parse_jobs(&raw)?,
                Err(_) => HashMap::new(),
            },
            job_key_separator: env::var("WEBHOOK_JOB_KEY_SEPARATOR")
                .unwrap_or_else(|_| DEFAULT_JOB_KEY_SEPARATOR.to_string()),
            queue_capacity: get_env_parse_or("WEBHOOK_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?,
            job_concurrency: get_env_parse_or("WEBHOOK_JOB_CONCURRENCY", DEFAULT_JOB_CONCURRENCY)?,
        })
    }
}

/// Parses the `jobs` mapping, a JSON object of lookup key to handler identifier.
pub fn parse_jobs(raw: &str) -> Result<HashMap<String, String>> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| Error::Config(format!("Invalid value for WEBHOOK_JOBS: {}", e)))
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
