//! Demo producer: publishes the current time on a fixed interval.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::broker::Broker;

/// RFC 1123 style timestamp, e.g. `Mon, 02 Jan 2006 15:04:05 UTC`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S UTC").to_string()
}

/// Publish `timestamp(now)` every `every`, starting one interval from now.
/// Stops once the broker is closed.
pub fn spawn_ticker(broker: Broker, every: Duration) -> JoinHandle<()> {
    let task = async move {
        let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            if broker.publish(timestamp(Utc::now())).await.is_err() {
                tracing::info!("broker closed, ticker stopping");
                break;
            }
        }
    };
    tokio::spawn(task.instrument(tracing::info_span!("ticker")))
}
