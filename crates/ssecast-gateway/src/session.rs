//! Streaming session adapter.
//!
//! One `Session` per inbound connection: registers the client, writes the
//! welcome frame, then relays every message from the client's delivery channel
//! to the connection as its own flushed frame until the connection goes away.
//! The client is unregistered on every exit path.

use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;

use ssecast_core::error::{Result, SseCastError};
use ssecast_core::protocol::frame;

use crate::broker::{Broker, Subscription};

/// Outbound side of one connection.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Whether a written frame reaches the peer without waiting for more output.
    fn supports_flush(&self) -> bool;

    /// Write one complete frame and flush it. Fails once the peer is gone.
    async fn send_frame(&self, frame: Bytes) -> Result<()>;

    /// Resolves when the peer is gone.
    async fn closed(&self);
}

pub struct Session<S: FrameSink> {
    sink: S,
    subscription: Subscription,
}

impl<S: FrameSink> Session<S> {
    /// Validate, register `client_id` with the broker and send the welcome frame.
    ///
    /// Nothing is registered when the id is empty or the sink cannot flush.
    pub async fn open(broker: &Broker, sink: S, client_id: &str) -> Result<Self> {
        if client_id.is_empty() {
            return Err(SseCastError::BadRequest(
                "client_id is missing from the query params".into(),
            ));
        }
        if !sink.supports_flush() {
            return Err(SseCastError::StreamingUnsupported);
        }

        let subscription = broker.register(client_id).await?;
        tracing::info!(client_id, session = subscription.session(), "client connected");

        if let Err(e) = sink.send_frame(frame::encode_welcome(client_id)).await {
            tracing::info!(client_id, "client disconnected before welcome");
            subscription.close().await;
            return Err(e);
        }

        Ok(Self { sink, subscription })
    }

    pub fn client_id(&self) -> &str {
        self.subscription.client_id()
    }

    /// Relay messages until the sink closes, `cancel` resolves, or the broker
    /// drops this client. Always unregisters before returning.
    pub async fn run<F>(self, cancel: F)
    where
        F: Future<Output = ()> + Send,
    {
        let Session {
            sink,
            mut subscription,
        } = self;
        tokio::pin!(cancel);

        let reason = loop {
            tokio::select! {
                _ = &mut cancel => break "cancelled",
                _ = sink.closed() => break "disconnected",
                next = subscription.recv() => {
                    let Some(message) = next else { break "evicted"; };
                    tokio::select! {
                        res = sink.send_frame(frame::encode_data(&message)) => {
                            if res.is_err() {
                                break "disconnected";
                            }
                        }
                        _ = &mut cancel => break "cancelled",
                    }
                }
            }
        };

        tracing::info!(
            client_id = subscription.client_id(),
            session = subscription.session(),
            reason,
            "client disconnected"
        );
        subscription.close().await;
    }

    /// `open` followed by `run`.
    pub async fn serve<F>(broker: &Broker, sink: S, client_id: &str, cancel: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        Self::open(broker, sink, client_id).await?.run(cancel).await;
        Ok(())
    }
}
