//! Configuration for vigil-daemon

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigil_health::{GatewayConfig as GatewayClientConfig, GatewayCredentials};

use crate::error::{DaemonError, DaemonResult};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Health gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Report configuration
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Services registered at startup when not yet known
    #[serde(default)]
    pub services: Vec<ServiceSeed>,
}

/// A service to register at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSeed {
    /// Report label
    pub application_type: String,

    /// Gateway resource name; seeds are matched on this
    pub source_id: String,
}

/// Health gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// OAuth-style client id; authentication is skipped when unset
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret paired with `client_id`
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            client_id: None,
            client_secret: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Build the client-side configuration for [`vigil_health::GatewayClient`].
    pub fn client_config(&self) -> GatewayClientConfig {
        let credentials = match (&self.client_id, &self.client_secret) {
            (Some(client_id), Some(client_secret)) => Some(GatewayCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            _ => None,
        };

        GatewayClientConfig {
            base_url: self.base_url.clone(),
            credentials,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Change-driven check interval in seconds
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Times of day (UTC, `HH:MM`) for periodic full reports
    #[serde(default = "default_periodic_times")]
    pub periodic_times: Vec<String>,

    /// Weekdays on which periodic reports fire
    #[serde(default = "default_periodic_weekdays")]
    pub periodic_weekdays: Vec<Weekday>,

    /// Run at most one cycle at a time
    #[serde(default)]
    pub serialize_cycles: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            periodic_times: default_periodic_times(),
            periodic_weekdays: default_periodic_weekdays(),
            serialize_cycles: false,
        }
    }
}

impl SchedulerConfig {
    /// Parsed periodic trigger times, sorted.
    pub fn parsed_periodic_times(&self) -> DaemonResult<Vec<NaiveTime>> {
        let mut times = self
            .periodic_times
            .iter()
            .map(|raw| {
                NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
                    DaemonError::Config(format!("Invalid periodic time '{}': {}", raw, e))
                })
            })
            .collect::<DaemonResult<Vec<_>>>()?;
        times.sort();
        times.dedup();
        Ok(times)
    }
}

/// Notification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotifyConfig {
    /// Write reports to the log
    #[default]
    Log,

    /// Post reports to a chat webhook
    Webhook {
        /// Webhook URL
        url: String,

        /// Delivery timeout in seconds
        #[serde(default = "default_webhook_timeout")]
        timeout_secs: u64,
    },
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Host name printed in the report footer
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_gateway_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_check_interval() -> u64 {
    60
}

fn default_periodic_times() -> Vec<String> {
    vec!["09:00".to_string()]
}

fn default_periodic_weekdays() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

fn default_webhook_timeout() -> u64 {
    10
}

fn default_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file and `VIGIL_*` variables
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        Self::layered(path, Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("VIGIL")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("scheduler.periodic_times")
            .with_list_parse_key("scheduler.periodic_weekdays")
            .try_parsing(true)
    }

    fn layered(
        path: Option<&str>,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(environment);

        builder.build()?.try_deserialize()
    }

    /// Reject configurations the daemon cannot start with
    pub fn validate(&self) -> DaemonResult<()> {
        if self.scheduler.check_interval_secs == 0 {
            return Err(DaemonError::Config(
                "scheduler.check_interval_secs must be greater than zero".to_string(),
            ));
        }

        self.scheduler.parsed_periodic_times()?;

        reqwest::Url::parse(&self.gateway.base_url).map_err(|e| {
            DaemonError::Config(format!(
                "Invalid gateway base_url '{}': {}",
                self.gateway.base_url, e
            ))
        })?;

        if self.gateway.client_id.is_some() != self.gateway.client_secret.is_some() {
            return Err(DaemonError::Config(
                "gateway.client_id and gateway.client_secret must be set together".to_string(),
            ));
        }

        if let Some(seed) = self
            .services
            .iter()
            .find(|seed| seed.source_id.trim().is_empty())
        {
            return Err(DaemonError::Config(format!(
                "Service '{}' has an empty source_id",
                seed.application_type
            )));
        }

        if let NotifyConfig::Webhook { url, .. } = &self.notify {
            reqwest::Url::parse(url).map_err(|e| {
                DaemonError::Config(format!("Invalid webhook url '{}': {}", url, e))
            })?;
        }

        Ok(())
    }
}
