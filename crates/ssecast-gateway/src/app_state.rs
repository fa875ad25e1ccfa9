//! Shared application state for the ssecast gateway.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use ssecast_core::error::Result;

use crate::broker::Broker;
use crate::config::GatewayConfig;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    broker: Broker,
}

struct AppStateInner {
    cfg: GatewayConfig,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Validate the config and start the broker loop.
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        cfg.validate()?;
        let broker = Broker::spawn(&cfg.broker);
        Ok(Self::with_broker(cfg, broker))
    }

    /// Build state around an already running broker.
    pub fn with_broker(cfg: GatewayConfig, broker: Broker) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(AppStateInner { cfg, shutdown }),
            broker,
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn broker(&self) -> Broker {
        self.broker.clone()
    }

    /// Cancel every open session. Idempotent.
    pub fn begin_shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Resolves once `begin_shutdown` has been called.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.inner.shutdown.subscribe();
        async move {
            let _ = rx.wait_for(|down| *down).await;
        }
    }
}
