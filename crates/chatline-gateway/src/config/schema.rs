use std::time::Duration;

use serde::Deserialize;
use chatline_core::error::{ChatError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    #[serde(default)]
    pub reporter: ReporterSection,

    #[serde(default)]
    pub log: LogSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ChatError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.dispatch.validate()?;
        self.reporter.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ChatError::BadRequest(
                "gateway.listen must be a valid SocketAddr".into(),
            ));
        }
        if !(1000..=120000).contains(&self.ping_interval_ms) {
            return Err(ChatError::BadRequest(
                "gateway.ping_interval_ms must be between 1000 and 120000".into(),
            ));
        }
        if !(2000..=600000).contains(&self.idle_timeout_ms) {
            return Err(ChatError::BadRequest(
                "gateway.idle_timeout_ms must be between 2000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(ChatError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}

/// Per-connection outbound queue and write deadlines.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchSection {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// How long a broadcast waits on one full queue before dropping for it.
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            write_timeout_ms: default_write_timeout_ms(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
        }
    }
}

impl DispatchSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=65536).contains(&self.queue_capacity) {
            return Err(ChatError::BadRequest(
                "dispatch.queue_capacity must be between 1 and 65536".into(),
            ));
        }
        if !(10..=60000).contains(&self.write_timeout_ms) {
            return Err(ChatError::BadRequest(
                "dispatch.write_timeout_ms must be between 10 and 60000".into(),
            ));
        }
        if !(1..=60000).contains(&self.enqueue_timeout_ms) {
            return Err(ChatError::BadRequest(
                "dispatch.enqueue_timeout_ms must be between 1 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }
}

fn default_queue_capacity() -> usize {
    256
}
fn default_write_timeout_ms() -> u64 {
    1000
}
fn default_enqueue_timeout_ms() -> u64 {
    1500
}

/// Periodic "number of connections" log line.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReporterSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_reporter_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ReporterSection {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_reporter_interval_ms(),
        }
    }
}

impl ReporterSection {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.interval_ms < 100 {
            return Err(ChatError::BadRequest(
                "reporter.interval_ms must be at least 100".into(),
            ));
        }
        Ok(())
    }
}

fn default_reporter_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}
