#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::time::timeout;

use ssecast_gateway::broker::Broker;
use ssecast_gateway::config::BrokerSection;
use ssecast_gateway::producer::{spawn_ticker, timestamp};

#[test]
fn timestamp_is_rfc1123_style() {
    let t = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
    assert_eq!(timestamp(t), "Mon, 02 Jan 2006 15:04:05 UTC");
}

#[tokio::test]
async fn ticker_publishes_to_registered_clients() {
    let broker = Broker::spawn(&BrokerSection::default());
    let mut sub = broker.register("watcher").await.unwrap();

    let ticker = spawn_ticker(broker.clone(), Duration::from_millis(20));
    for _ in 0..2 {
        let m = timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("ticker must publish")
            .unwrap();
        assert!(m.ends_with(" UTC"), "{m}");
    }
    ticker.abort();
}

#[tokio::test]
async fn ticker_stops_when_broker_is_gone() {
    let (broker, event_loop) = Broker::new(&BrokerSection::default());
    let ticker = spawn_ticker(broker, Duration::from_millis(20));
    // the loop is never run; dropping it closes every conduit
    drop(event_loop);

    timeout(Duration::from_secs(2), ticker)
        .await
        .expect("ticker must stop")
        .unwrap();
}
