//! Typed server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stratus_function::RetentionDays;

use crate::error::{ConfigError, ConfigResult};

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP listener.
    pub server: ServerSection,
    /// Execution engine.
    pub engine: EngineSection,
    /// Cron scheduler.
    pub scheduler: SchedulerSection,
    /// Execution retention.
    pub retention: RetentionSection,
    /// Persistence backend.
    pub store: StoreSection,
    /// Logging.
    pub log: stratus_log::Config,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Listen address.
    pub bind: String,
    /// Public base URL; cron self-triggers are sent here.
    pub base_url: String,
    /// Whole-request timeout for management routes.
    pub request_timeout_secs: u64,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_owned(),
            base_url: "http://127.0.0.1:8080".to_owned(),
            request_timeout_secs: 60,
            max_body_bytes: 6 * 1024 * 1024,
        }
    }
}

/// `[engine]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    /// Budget for one runtime dispatch.
    pub execution_timeout_secs: u64,
    /// Cap on stored response snapshot bodies.
    pub max_response_bytes: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            execution_timeout_secs: 30,
            max_response_bytes: 1024 * 1024,
        }
    }
}

/// `[scheduler]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSection {
    /// Start the cron scheduler with the server.
    pub enabled: bool,
    /// Timeout of one self-trigger request.
    pub trigger_timeout_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_timeout_secs: 60,
        }
    }
}

/// `[retention]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionSection {
    /// Retention for functions that set none; unset keeps forever.
    pub default_days: Option<u16>,
    /// Time between sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for RetentionSection {
    fn default() -> Self {
        Self {
            default_days: None,
            sweep_interval_secs: 3600,
        }
    }
}

/// Which store driver backs the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process memory; everything is lost on restart.
    Memory,
    /// A SQLite database file.
    #[default]
    Sqlite,
}

/// `[store]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Driver to use.
    pub backend: StoreBackend,
    /// Database file for the `sqlite` backend.
    pub path: PathBuf,
    /// Connection pool size.
    pub max_connections: u32,
    /// Wait on a locked database or an exhausted pool.
    pub busy_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("stratus.db"),
            max_connections: 4,
            busy_timeout_ms: 5_000,
        }
    }
}

impl AppConfig {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("server.bind", e.to_string()))?;

        let base = url::Url::parse(&self.server.base_url)
            .map_err(|e| ConfigError::invalid("server.base_url", e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "server.base_url",
                format!("scheme must be http or https, got {}", base.scheme()),
            ));
        }

        non_zero("server.request_timeout_secs", self.server.request_timeout_secs)?;
        non_zero("server.max_body_bytes", self.server.max_body_bytes as u64)?;
        non_zero("engine.execution_timeout_secs", self.engine.execution_timeout_secs)?;
        non_zero("engine.max_response_bytes", self.engine.max_response_bytes as u64)?;
        non_zero("scheduler.trigger_timeout_secs", self.scheduler.trigger_timeout_secs)?;
        non_zero("retention.sweep_interval_secs", self.retention.sweep_interval_secs)?;
        if self.store.backend == StoreBackend::Sqlite {
            if self.store.path.as_os_str().is_empty() {
                return Err(ConfigError::invalid("store.path", "must not be empty"));
            }
            non_zero("store.max_connections", u64::from(self.store.max_connections))?;
            non_zero("store.busy_timeout_ms", self.store.busy_timeout_ms)?;
        }
        self.default_retention()?;
        Ok(())
    }

    /// Parsed listen address.
    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::invalid("server.bind", e.to_string()))
    }

    /// Default retention as a validated value.
    pub fn default_retention(&self) -> ConfigResult<Option<RetentionDays>> {
        self.retention
            .default_days
            .map(RetentionDays::new)
            .transpose()
            .map_err(|e| ConfigError::invalid("retention.default_days", e.to_string()))
    }

    /// Execution budget.
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.execution_timeout_secs)
    }

    /// Management request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Self-trigger request timeout.
    pub fn trigger_timeout(&self) -> Duration {
        Duration::from_secs(self.scheduler.trigger_timeout_secs)
    }

    /// Store lock and pool wait.
    pub fn store_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.store.busy_timeout_ms)
    }

    /// Retention sweep period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention.sweep_interval_secs)
    }
}

fn non_zero(field: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}
