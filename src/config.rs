//! Configuration management for the Octro client

use std::env;

/// Top-level client configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub workflow: WorkflowConfig,
    pub session: SessionConfig,
}

/// Backend API settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Origin of the backend service
    pub base_url: String,
    /// Uniform timeout applied to every short call, in seconds
    pub timeout_secs: u64,
    /// Timeout for the long-running extraction call, in seconds
    pub process_timeout_secs: u64,
    /// Dedicated timeout for promo code validation, in seconds
    pub promo_timeout_secs: u64,
}

/// Processing workflow settings
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Interval between status polls while processing, in milliseconds
    pub poll_interval_ms: u64,
    /// Page limit used when the upload descriptor carries no quota figures
    pub default_pages_limit: u32,
}

/// Session probe settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between background identity checks, in seconds
    pub refresh_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 30,
                process_timeout_secs: 600,
                promo_timeout_secs: 10,
            },
            workflow: WorkflowConfig {
                poll_interval_ms: 1_000,
                default_pages_limit: 30,
            },
            session: SessionConfig {
                refresh_interval_secs: 5 * 60,
            },
        }
    }
}

impl Config {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            api: ApiConfig {
                base_url: env::var("OCTRO_API_URL").unwrap_or(defaults.api.base_url),
                timeout_secs: env_u64("OCTRO_TIMEOUT_SECS", defaults.api.timeout_secs),
                process_timeout_secs: env_u64(
                    "OCTRO_PROCESS_TIMEOUT_SECS",
                    defaults.api.process_timeout_secs,
                ),
                promo_timeout_secs: env_u64(
                    "OCTRO_PROMO_TIMEOUT_SECS",
                    defaults.api.promo_timeout_secs,
                ),
            },
            workflow: WorkflowConfig {
                poll_interval_ms: env_u64(
                    "OCTRO_POLL_INTERVAL_MS",
                    defaults.workflow.poll_interval_ms,
                ),
                default_pages_limit: env_u64(
                    "OCTRO_DEFAULT_PAGES_LIMIT",
                    u64::from(defaults.workflow.default_pages_limit),
                ) as u32,
            },
            session: SessionConfig {
                refresh_interval_secs: env_u64(
                    "OCTRO_SESSION_REFRESH_SECS",
                    defaults.session.refresh_interval_secs,
                ),
            },
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
