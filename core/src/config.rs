/// Configuration for a sync run
use crate::ai::gemini::DEFAULT_MODEL_ID;
use crate::ai::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the Gemini API key. An unset variable is
/// tolerated at startup and surfaces as a per-call auth failure instead.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOptions {
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    pub max_retries: u32,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            base_delay_secs: 5,
            max_delay_secs: 60,
            max_retries: 5,
        }
    }
}

impl RetryOptions {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(self.base_delay_secs),
            Duration::from_secs(self.max_delay_secs),
            self.max_retries,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Delay after every successful translation call, in milliseconds.
    #[serde(default = "default_pacing_millis")]
    pub pacing_millis: u64,

    #[serde(default)]
    pub retry: RetryOptions,
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_pacing_millis() -> u64 {
    1_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            pacing_millis: default_pacing_millis(),
            retry: RetryOptions::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_millis)
    }
}

/// Reads the API key from the environment, defaulting to an empty credential.
pub fn env_api_key() -> String {
    std::env::var(API_KEY_ENV).unwrap_or_default()
}
