//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use chatline_core::error::{ChatError, Result};

pub use schema::{DispatchSection, GatewayConfig, GatewaySection, LogSection, ReporterSection};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CHATLINE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "chatline.yaml";

pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ChatError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| ChatError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
