use std::time::Duration;

use config::{Config, ConfigError, Environment as EnvironmentSource, File};
use serde::Deserialize;

use crate::application::services::{RetryPolicy, UploadLimits, WorkerOptions};
use crate::infrastructure::observability::DEFAULT_FILTER;

use super::environment::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    pub api: ApiSettings,
    #[serde(default)]
    pub upload: UploadSettings,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

fn default_connect_attempts() -> u32 {
    6
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_seconds() -> u64 {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderSetting {
    Local,
    Azure,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub provider: StorageProviderSetting,
    pub local_path: String,
    pub azure_account: Option<String>,
    pub azure_access_key: Option<String>,
    pub azure_container: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProviderSetting::Local,
            local_path: "./data/blobs".to_string(),
            azure_account: None,
            azure_access_key: None,
            azure_container: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    pub subscription_key: String,
    #[serde(default = "default_api_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_api_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub max_chunk_size: usize,
    pub max_retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub max_retry_delay_seconds: u64,
    pub max_input_bytes: u64,
    pub single_submit_concurrency: usize,
    pub duplicate_event_ttl_seconds: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_chunk_size: 20,
            max_retry_attempts: 3,
            retry_delay_seconds: 10,
            max_retry_delay_seconds: 300,
            max_input_bytes: 10 * 1024 * 1024,
            single_submit_concurrency: 4,
            duplicate_event_ttl_seconds: 300,
        }
    }
}

impl UploadSettings {
    pub fn limits(&self) -> UploadLimits {
        UploadLimits {
            max_chunk_size: self.max_chunk_size,
            max_input_bytes: self.max_input_bytes,
            duplicate_event_ttl: Duration::from_secs(self.duplicate_event_ttl_seconds),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            base_delay: Duration::from_secs(self.retry_delay_seconds),
            max_delay: Duration::from_secs(self.max_retry_delay_seconds),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub workers: usize,
    pub poll_interval_ms: u64,
    pub visibility_timeout_seconds: u64,
    pub processing_timeout_seconds: u64,
    pub max_deliveries: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval_ms: 500,
            visibility_timeout_seconds: 180,
            processing_timeout_seconds: 120,
            max_deliveries: 10,
        }
    }
}

impl QueueSettings {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            processing_timeout: Duration::from_secs(self.processing_timeout_seconds),
            max_deliveries: self.max_deliveries,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_FILTER.to_string(),
            enable_json: false,
        }
    }
}

impl Settings {
    /// `appsettings.{env}` if present, overridden by `APP_SECTION__KEY` variables.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(
                EnvironmentSource::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Message(message.to_string()));

        if self.upload.max_chunk_size == 0 {
            return invalid("upload.max_chunk_size must be at least 1");
        }
        if self.upload.max_input_bytes == 0 {
            return invalid("upload.max_input_bytes must be at least 1");
        }
        if self.upload.single_submit_concurrency == 0 {
            return invalid("upload.single_submit_concurrency must be at least 1");
        }
        if self.upload.retry_delay_seconds > self.upload.max_retry_delay_seconds {
            return invalid("upload.retry_delay_seconds must not exceed max_retry_delay_seconds");
        }
        if self.database.connect_attempts == 0 {
            return invalid("database.connect_attempts must be at least 1");
        }
        if self.queue.workers == 0 {
            return invalid("queue.workers must be at least 1");
        }
        if self.queue.processing_timeout_seconds > self.queue.visibility_timeout_seconds {
            return invalid("queue.processing_timeout_seconds must not exceed visibility_timeout_seconds");
        }
        if self.storage.provider == StorageProviderSetting::Azure
            && (self.storage.azure_account.is_none()
                || self.storage.azure_access_key.is_none()
                || self.storage.azure_container.is_none())
        {
            return invalid("storage.provider azure needs account, access key and container");
        }
        Ok(())
    }
}
