//! Registry and fan-out behaviour of the broker loop.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use ssecast_gateway::broker::{Broker, Message, Subscription};
use ssecast_gateway::config::{BrokerSection, DuplicateIdPolicy};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

fn broker_with(queue_capacity: usize, client_buffer: usize, duplicate_ids: DuplicateIdPolicy) -> Broker {
    Broker::spawn(&BrokerSection {
        queue_capacity,
        client_buffer,
        duplicate_ids,
    })
}

fn broker() -> Broker {
    Broker::spawn(&BrokerSection::default())
}

async fn next(sub: &mut Subscription) -> Option<Message> {
    timeout(WAIT, sub.recv()).await.expect("timed out waiting for message")
}

async fn nothing_pending(sub: &mut Subscription) -> bool {
    timeout(QUIET, sub.recv()).await.is_err()
}

#[tokio::test]
async fn end_to_end_register_publish_unregister() {
    let broker = broker();

    let mut a = broker.register("a").await.unwrap();
    broker.publish("hello").await.unwrap();
    assert_eq!(next(&mut a).await.as_deref(), Some("hello"));

    let mut b = broker.register("b").await.unwrap();
    broker.publish("world").await.unwrap();
    assert_eq!(next(&mut a).await.as_deref(), Some("world"));
    assert_eq!(next(&mut b).await.as_deref(), Some("world"));
    assert!(nothing_pending(&mut a).await, "no duplicate of hello");

    a.close().await;
    assert!(!broker.contains("a"));
    broker.publish("only-b").await.unwrap();
    assert_eq!(next(&mut b).await.as_deref(), Some("only-b"));
    assert_eq!(broker.client_ids(), vec!["b".to_string()]);
}

#[tokio::test]
async fn messages_arrive_in_publish_order() {
    let broker = broker();
    let mut a = broker.register("a").await.unwrap();
    let mut b = broker.register("b").await.unwrap();

    let publisher = {
        let broker = broker.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                broker.publish(format!("m{i}")).await.unwrap();
            }
        })
    };

    for i in 0..50 {
        let expected = format!("m{i}");
        assert_eq!(next(&mut a).await.as_deref(), Some(expected.as_str()));
        assert_eq!(next(&mut b).await.as_deref(), Some(expected.as_str()));
    }
    publisher.await.unwrap();
    assert!(nothing_pending(&mut a).await);
}

#[tokio::test]
async fn empty_id_is_rejected_without_registration() {
    let broker = broker();
    let err = broker.register("").await.err().expect("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    assert_eq!(broker.client_count(), 0);
}

#[tokio::test]
async fn unregistering_unknown_id_is_a_noop() {
    let broker = broker();
    let mut a = broker.register("a").await.unwrap();

    assert!(!broker.unregister("ghost").await.unwrap());
    assert!(broker.contains("a"));

    broker.publish("still-here").await.unwrap();
    assert_eq!(next(&mut a).await.as_deref(), Some("still-here"));
}

#[tokio::test]
async fn unregister_by_id_ends_the_subscription() {
    let broker = broker();
    let mut a = broker.register("a").await.unwrap();

    assert!(broker.unregister("a").await.unwrap());
    assert!(!broker.contains("a"));
    assert_eq!(next(&mut a).await, None);

    // the subscription's own removal is now a no-op
    a.close().await;
    assert_eq!(broker.client_count(), 0);
}

#[tokio::test]
async fn registry_matches_registered_minus_unregistered_under_concurrency() {
    let broker = broker();

    let mut tasks = Vec::new();
    for i in 0..40 {
        let broker = broker.clone();
        tasks.push(tokio::spawn(async move {
            let sub = broker.register(format!("c{i}")).await.unwrap();
            if i % 2 == 0 {
                sub.close().await;
                None
            } else {
                Some(sub)
            }
        }));
    }

    let mut kept = Vec::new();
    for t in tasks {
        if let Some(sub) = t.await.unwrap() {
            kept.push(sub);
        }
    }

    let expected: BTreeSet<String> = (0..40).filter(|i| i % 2 == 1).map(|i| format!("c{i}")).collect();
    let actual: BTreeSet<String> = broker.client_ids().into_iter().collect();
    assert_eq!(actual, expected);
    assert_eq!(kept.len(), 20);
}

#[tokio::test]
async fn dropped_subscription_is_unregistered() {
    let broker = broker();
    let a = broker.register("a").await.unwrap();
    assert!(broker.contains("a"));
    drop(a);

    timeout(WAIT, async {
        while broker.contains("a") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("drop must unregister");
}

#[tokio::test]
async fn duplicate_id_rejected_by_default() {
    let broker = broker();
    let mut first = broker.register("dup").await.unwrap();

    let err = broker.register("dup").await.err().expect("must fail");
    assert_eq!(err.client_code().as_str(), "CONFLICT");
    assert_eq!(broker.client_count(), 1);

    broker.publish("to-first").await.unwrap();
    assert_eq!(next(&mut first).await.as_deref(), Some("to-first"));
}

#[tokio::test]
async fn duplicate_id_replace_evicts_previous_session() {
    let broker = broker_with(16, 1, DuplicateIdPolicy::Replace);
    let mut first = broker.register("dup").await.unwrap();
    let mut second = broker.register("dup").await.unwrap();
    assert_ne!(first.session(), second.session());

    // the evicted subscription sees end-of-stream
    assert_eq!(next(&mut first).await, None);

    // and its removal cannot delete the replacement
    first.close().await;
    assert!(broker.contains("dup"));

    broker.publish("to-second").await.unwrap();
    assert_eq!(next(&mut second).await.as_deref(), Some("to-second"));
}

#[tokio::test]
async fn stalled_client_blocks_everyone_until_it_leaves() {
    let broker = broker_with(1, 1, DuplicateIdPolicy::Reject);
    let mut a = broker.register("a").await.unwrap();
    let stuck = broker.register("stuck").await.unwrap();

    broker.publish("m1").await.unwrap();
    assert_eq!(next(&mut a).await.as_deref(), Some("m1"));
    // "stuck" holds m1 in its only slot and never reads again

    let (seen_tx, mut seen) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(m) = a.recv().await {
            if seen_tx.send(m).is_err() {
                break;
            }
        }
    });

    // m2 is taken by the loop, which then blocks on "stuck"; m3 fills the queue
    broker.publish("m2").await.unwrap();
    timeout(WAIT, broker.publish("m3"))
        .await
        .expect("queue has room for m3")
        .unwrap();

    // publishers now wait as well
    assert!(timeout(QUIET, broker.publish("m4")).await.is_err());

    // "a" gets at most m2 while the broadcast is stalled
    tokio::time::sleep(QUIET).await;
    while let Ok(m) = seen.try_recv() {
        assert_eq!(&*m, "m2");
    }

    stuck.close().await;
    assert!(!broker.contains("stuck"));

    let mut rest = Vec::new();
    while rest.last().map(|m: &Message| &**m) != Some("m3") {
        let m = timeout(WAIT, seen.recv()).await.expect("progress must resume").unwrap();
        rest.push(m);
    }
    assert!(rest.iter().all(|m| &**m == "m2" || &**m == "m3"));
}

#[tokio::test]
async fn loop_stops_when_all_handles_are_gone() {
    let cfg = BrokerSection::default();
    let (broker, event_loop) = Broker::new(&cfg);
    let handle = tokio::spawn(event_loop.run());

    let sub = broker.register("a").await.unwrap();
    sub.close().await;
    drop(broker);

    timeout(WAIT, handle).await.expect("loop must exit").unwrap();
}

#[tokio::test]
async fn stalled_client_can_be_unregistered_by_id() {
    let broker = broker_with(1, 1, DuplicateIdPolicy::Reject);
    let mut a = broker.register("a").await.unwrap();
    let mut stuck = broker.register("stuck").await.unwrap();

    broker.publish("m1").await.unwrap();
    assert_eq!(next(&mut a).await.as_deref(), Some("m1"));

    // the loop takes m2 and waits on the full "stuck" channel
    broker.publish("m2").await.unwrap();
    broker.publish("m3").await.unwrap();

    // removals of other ids are still applied while stalled
    assert!(!timeout(WAIT, broker.unregister("ghost")).await.expect("removal must be accepted").unwrap());

    assert!(timeout(WAIT, broker.unregister("stuck"))
        .await
        .expect("unregister must not wait for the stall")
        .unwrap());
    assert!(!broker.contains("stuck"));

    assert_eq!(next(&mut a).await.as_deref(), Some("m2"));
    assert_eq!(next(&mut a).await.as_deref(), Some("m3"));

    // the removed client keeps what was already buffered, then sees end-of-stream
    assert_eq!(next(&mut stuck).await.as_deref(), Some("m1"));
    assert_eq!(next(&mut stuck).await, None);
}
