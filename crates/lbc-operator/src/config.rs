use std::path::PathBuf;

use clap::Args;

use lbc_common::kube_utils::DEFAULT_READ_TIMEOUT;
use lbc_common::telemetry::{log_filter, LogFormat};
use lbc_common::Error;

/// Settings for the Endpoints watch and the trigger channel
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Path to a kubeconfig file (in-cluster config is inferred when unset)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Only watch Endpoints and Services in this namespace
    #[arg(long, env = "LBC_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Capacity of the Service trigger channel; producers wait while it is full
    #[arg(long, env = "LBC_TRIGGER_BUFFER", default_value_t = 1)]
    pub trigger_buffer: usize,

    /// Maximum Endpoints notifications handled at once
    #[arg(long, env = "LBC_MAX_CONCURRENT_NOTIFICATIONS", default_value_t = 8)]
    pub max_concurrent_notifications: usize,

    /// Server-side watch timeout in seconds
    #[arg(long, env = "LBC_WATCH_TIMEOUT_SECS", default_value_t = 25)]
    pub watch_timeout_secs: u32,

    /// Log line encoding: json or text
    #[arg(long, env = "LBC_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Log filter directive, overrides RUST_LOG
    #[arg(long, env = "LBC_LOG_FILTER")]
    pub log_filter: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            watch_namespace: None,
            trigger_buffer: 1,
            max_concurrent_notifications: 8,
            watch_timeout_secs: 25,
            log_format: LogFormat::Json,
            log_filter: None,
        }
    }
}

impl OperatorConfig {
    /// Reject settings the runtime cannot honor
    pub fn validate(&self) -> Result<(), Error> {
        if self.trigger_buffer == 0 {
            return Err(Error::config_field(
                "trigger_buffer",
                "trigger buffer must be at least 1",
            ));
        }
        if self.max_concurrent_notifications == 0 {
            return Err(Error::config_field(
                "max_concurrent_notifications",
                "max concurrent notifications must be at least 1",
            ));
        }
        // The API server must close idle watches before the client read times out
        if u64::from(self.watch_timeout_secs) >= DEFAULT_READ_TIMEOUT.as_secs() {
            return Err(Error::config_field(
                "watch_timeout_secs",
                format!(
                    "watch timeout must be below the client read timeout ({}s)",
                    DEFAULT_READ_TIMEOUT.as_secs()
                ),
            ));
        }
        if let Some(ns) = &self.watch_namespace {
            if ns.is_empty() {
                return Err(Error::config_field(
                    "watch_namespace",
                    "watch namespace must not be empty",
                ));
            }
        }
        if let Some(filter) = &self.log_filter {
            log_filter(Some(filter.as_str()))
                .map_err(|e| Error::config_field("log_filter", e.to_string()))?;
        }
        Ok(())
    }
}
