use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use ssecast_core::error::{Result, SseCastError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub broker: BrokerSection,

    #[serde(default)]
    pub ticker: TickerSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            broker: BrokerSection::default(),
            ticker: TickerSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SseCastError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.broker.validate()?;
        self.ticker.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_events_path")]
    pub events_path: String,

    #[serde(default = "default_static_file")]
    pub static_file: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            events_path: default_events_path(),
            static_file: default_static_file(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !self.events_path.starts_with('/') || self.events_path.len() < 2 {
            return Err(SseCastError::BadRequest(
                "gateway.events_path must start with '/' and name a route".into(),
            ));
        }
        if self.events_path == "/healthz" {
            return Err(SseCastError::BadRequest(
                "gateway.events_path must not shadow /healthz".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            SseCastError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}"))
        })
    }
}

/// What the broker does when a client registers with an id that is already
/// registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateIdPolicy {
    /// Refuse the newcomer; the registered client keeps the id.
    #[default]
    Reject,
    /// Evict the registered client; its stream ends.
    Replace,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerSection {
    /// Pending message queue capacity. Publishers wait when it is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-client delivery channel slots. A full channel stalls fan-out.
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,

    #[serde(default)]
    pub duplicate_ids: DuplicateIdPolicy,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            client_buffer: default_client_buffer(),
            duplicate_ids: DuplicateIdPolicy::default(),
        }
    }
}

impl BrokerSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1_000_000).contains(&self.queue_capacity) {
            return Err(SseCastError::BadRequest(
                "broker.queue_capacity must be between 1 and 1000000".into(),
            ));
        }
        if !(1..=1024).contains(&self.client_buffer) {
            return Err(SseCastError::BadRequest(
                "broker.client_buffer must be between 1 and 1024".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickerSection {
    #[serde(default = "default_ticker_enabled")]
    pub enabled: bool,

    #[serde(default = "default_ticker_interval_ms")]
    pub interval_ms: u64,
}

impl Default for TickerSection {
    fn default() -> Self {
        Self {
            enabled: default_ticker_enabled(),
            interval_ms: default_ticker_interval_ms(),
        }
    }
}

impl TickerSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=3_600_000).contains(&self.interval_ms) {
            return Err(SseCastError::BadRequest(
                "ticker.interval_ms must be between 100 and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:9000".into()
}
fn default_events_path() -> String {
    "/events".into()
}
fn default_static_file() -> String {
    "index.html".into()
}
fn default_queue_capacity() -> usize {
    1000
}
fn default_client_buffer() -> usize {
    1
}
fn default_ticker_enabled() -> bool {
    true
}
fn default_ticker_interval_ms() -> u64 {
    2000
}
