//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use ssecast_core::error::{Result, SseCastError};

pub use schema::{BrokerSection, DuplicateIdPolicy, GatewayConfig, GatewaySection, TickerSection};

/// Env var overriding the config file path.
pub const CONFIG_ENV: &str = "SSECAST_CONFIG";
/// Config file used when `SSECAST_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "ssecast.yaml";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SseCastError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| SseCastError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the config path from the environment and load it.
/// A missing file falls back to the built-in defaults.
pub fn load_or_default() -> Result<GatewayConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        tracing::warn!(%path, "config file not found, using defaults");
        let cfg = GatewayConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    tracing::info!(%path, "loading config");
    load_from_file(&path)
}
