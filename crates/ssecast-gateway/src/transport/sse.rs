//! Event-stream handler.
//!
//! Responsibilities:
//! - Extract `client_id` from the query string (400 when missing or empty)
//! - Open a `Session` on a response-body sink (registers the client, queues
//!   the welcome frame)
//! - Run the session on its own task; it ends when the client disconnects or
//!   the server shuts down

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use tokio::sync::mpsc;
use tracing::Instrument;

use ssecast_core::error::{Result, SseCastError};

use crate::app_state::AppState;
use crate::session::{FrameSink, Session};
use crate::transport::error::ApiError;

/// Frames queued between a session and hyper. Each frame is handed to the
/// connection as soon as hyper polls the body.
const BODY_FRAME_BUFFER: usize = 1;

/// Query pairs in request order. A repeated `client_id` is not an error; the
/// first value wins.
pub type EventsQuery = Vec<(String, String)>;

fn first_client_id(q: EventsQuery) -> Option<String> {
    q.into_iter()
        .find(|(k, _)| k == "client_id")
        .map(|(_, v)| v)
}

/// Sink that feeds a streaming response body. Every frame becomes one body
/// chunk, written out on its own.
pub struct BodySink {
    tx: mpsc::Sender<Bytes>,
}

impl BodySink {
    /// Sink plus the body it feeds.
    pub fn channel() -> (Self, Body) {
        let (tx, rx) = mpsc::channel::<Bytes>(BODY_FRAME_BUFFER);
        let frames = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (Ok::<_, Infallible>(frame), rx))
        });
        (Self { tx }, Body::from_stream(frames))
    }
}

#[async_trait]
impl FrameSink for BodySink {
    fn supports_flush(&self) -> bool {
        true
    }

    async fn send_frame(&self, frame: Bytes) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| SseCastError::Internal("response body closed".into()))
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

pub async fn events(
    State(app): State<AppState>,
    Query(q): Query<EventsQuery>,
) -> std::result::Result<Response, ApiError> {
    let client_id = first_client_id(q).unwrap_or_default();
    if client_id.is_empty() {
        return Err(SseCastError::BadRequest(
            "client_id is missing from the query params".into(),
        )
        .into());
    }

    let (sink, body) = BodySink::channel();
    let session = Session::open(&app.broker(), sink, &client_id).await?;

    let cancel = app.shutdown_signal();
    let span = tracing::info_span!("session", client_id = %client_id);
    tokio::spawn(session.run(cancel).instrument(span));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response())
}
