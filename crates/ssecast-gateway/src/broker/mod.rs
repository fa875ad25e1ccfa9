//! Broker: the client registry and the single serialized control loop.
//!
//! Every registry mutation and every broadcast goes through one task
//! (`BrokerLoop::run`). Callers talk to it through three conduits carried by
//! the cloneable `Broker` handle:
//! - admissions: register a client (waits for the loop to accept it)
//! - removals: unregister a client (waits for the loop to accept it)
//! - messages: the bounded pending message queue fed by `publish`
//!
//! Fan-out hands each message to every registered client's delivery channel in
//! turn and waits for room in each one. A client that stops reading therefore
//! stalls the whole broadcast (and, once the queue is full, every publisher)
//! until it reads again or its subscription is closed.

mod registry;
mod subscription;

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use ssecast_core::error::{Result, SseCastError};

use crate::config::{BrokerSection, DuplicateIdPolicy};

pub use registry::ClientRegistry;
pub use subscription::Subscription;

use registry::ClientEntry;

/// A broadcast payload. Shared across recipients, never copied per client.
pub type Message = Arc<str>;

/// Slots in the admission and removal conduits. Requesters wait on the reply
/// anyway, so this only bounds how many requests sit ahead of the loop.
const REQUEST_CONDUIT_CAPACITY: usize = 1;

pub(crate) struct Admission {
    id: String,
    session: u64,
    tx: mpsc::Sender<Message>,
    reply: oneshot::Sender<Result<()>>,
}

pub(crate) struct Removal {
    pub(crate) id: String,
    /// `None` removes whatever entry holds `id`.
    pub(crate) session: Option<u64>,
    pub(crate) ack: Option<oneshot::Sender<bool>>,
}

/// Handle to a running broker. Cheap to clone.
#[derive(Clone)]
pub struct Broker {
    admissions: mpsc::Sender<Admission>,
    removals: mpsc::Sender<Removal>,
    messages: mpsc::Sender<Message>,
    registry: Arc<ClientRegistry>,
    client_buffer: usize,
}

/// The serialized control loop. Sole writer of the registry.
pub struct BrokerLoop {
    admissions: mpsc::Receiver<Admission>,
    removals: mpsc::Receiver<Removal>,
    messages: mpsc::Receiver<Message>,
    registry: Arc<ClientRegistry>,
    duplicate_ids: DuplicateIdPolicy,
}

impl Broker {
    /// Build a handle and its loop. The loop does nothing until `run` is
    /// polled; see [`Broker::spawn`].
    pub fn new(cfg: &BrokerSection) -> (Broker, BrokerLoop) {
        let (adm_tx, adm_rx) = mpsc::channel(REQUEST_CONDUIT_CAPACITY);
        let (rem_tx, rem_rx) = mpsc::channel(REQUEST_CONDUIT_CAPACITY);
        let (msg_tx, msg_rx) = mpsc::channel(cfg.queue_capacity.max(1));
        let registry = Arc::new(ClientRegistry::new());

        let broker = Broker {
            admissions: adm_tx,
            removals: rem_tx,
            messages: msg_tx,
            registry: Arc::clone(&registry),
            client_buffer: cfg.client_buffer.max(1),
        };
        let event_loop = BrokerLoop {
            admissions: adm_rx,
            removals: rem_rx,
            messages: msg_rx,
            registry,
            duplicate_ids: cfg.duplicate_ids,
        };
        (broker, event_loop)
    }

    /// Build a broker and run its loop on a dedicated task.
    pub fn spawn(cfg: &BrokerSection) -> Broker {
        let (broker, event_loop) = Broker::new(cfg);
        tokio::spawn(event_loop.run().instrument(tracing::info_span!("broker")));
        broker
    }

    /// Register `id` and return its subscription once the loop has admitted it.
    ///
    /// An empty id is rejected before anything reaches the loop.
    pub async fn register(&self, id: impl Into<String>) -> Result<Subscription> {
        let id = id.into();
        if id.is_empty() {
            return Err(SseCastError::BadRequest("client id must not be empty".into()));
        }

        // The subscription exists before the request is sent so that a caller
        // cancelled mid-registration still unregisters on drop.
        let session = self.registry.next_session();
        let (tx, rx) = mpsc::channel(self.client_buffer);
        let mut sub = Subscription::new(id.clone(), session, rx, self.removals.clone());

        let (reply_tx, reply_rx) = oneshot::channel();
        let admission = Admission {
            id,
            session,
            tx,
            reply: reply_tx,
        };
        if self.admissions.send(admission).await.is_err() {
            sub.disarm();
            return Err(SseCastError::BrokerClosed);
        }

        match reply_rx.await {
            Ok(Ok(())) => Ok(sub),
            Ok(Err(e)) => {
                sub.disarm();
                Err(e)
            }
            Err(_) => {
                sub.disarm();
                Err(SseCastError::BrokerClosed)
            }
        }
    }

    /// Remove `id` from the registry, whichever session holds it.
    /// Returns `false` if it was not registered.
    ///
    /// Also accepted while a broadcast is waiting on a stalled client; removing
    /// that client abandons its delivery and lets the broadcast continue.
    pub async fn unregister(&self, id: &str) -> Result<bool> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let removal = Removal {
            id: id.to_string(),
            session: None,
            ack: Some(ack_tx),
        };
        self.removals
            .send(removal)
            .await
            .map_err(|_| SseCastError::BrokerClosed)?;
        ack_rx.await.map_err(|_| SseCastError::BrokerClosed)
    }

    /// Enqueue a message for every client registered when the loop reaches it.
    /// Waits while the pending queue is full; never drops.
    pub async fn publish(&self, message: impl Into<Message>) -> Result<()> {
        self.messages
            .send(message.into())
            .await
            .map_err(|_| SseCastError::BrokerClosed)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    pub fn client_ids(&self) -> Vec<String> {
        self.registry.ids()
    }
}

impl BrokerLoop {
    /// Run until every `Broker` handle and subscription is gone.
    pub async fn run(mut self) {
        tracing::info!(duplicate_ids = ?self.duplicate_ids, "broker loop started");
        loop {
            tokio::select! {
                Some(admission) = self.admissions.recv() => self.admit(admission),
                Some(removal) = self.removals.recv() => self.remove(removal),
                Some(message) = self.messages.recv() => self.broadcast(message).await,
                else => break,
            }
        }
        tracing::info!("broker loop stopped");
    }

    fn admit(&self, admission: Admission) {
        let Admission {
            id,
            session,
            tx,
            reply,
        } = admission;

        if self.duplicate_ids == DuplicateIdPolicy::Reject && self.registry.contains(&id) {
            tracing::warn!(client_id = %id, session, "duplicate client id rejected");
            let _ = reply.send(Err(SseCastError::Conflict(id)));
            return;
        }

        if let Some(prev) = self.registry.insert(id.clone(), ClientEntry { session, tx }) {
            tracing::warn!(
                client_id = %id,
                session,
                evicted = prev.session,
                "duplicate client id replaced registered client"
            );
        }

        if reply.send(Ok(())).is_err() {
            // Registrant went away before acceptance.
            self.registry.remove(&id, Some(session));
            tracing::debug!(client_id = %id, session, "registration abandoned");
            return;
        }
        tracing::debug!(client_id = %id, session, clients = self.registry.len(), "client admitted");
    }

    fn remove(&self, removal: Removal) {
        let removed = self.registry.remove(&removal.id, removal.session);
        tracing::debug!(
            client_id = %removal.id,
            session = ?removal.session,
            removed,
            clients = self.registry.len(),
            "client removal processed"
        );
        if let Some(ack) = removal.ack {
            let _ = ack.send(removed);
        }
    }

    async fn broadcast(&mut self, message: Message) {
        let recipients = self.registry.snapshot();
        for (id, tx) in recipients {
            let permit = match tx.try_reserve() {
                Ok(permit) => permit,
                Err(TrySendError::Closed(())) => {
                    tracing::debug!(client_id = %id, "delivery channel closed, skipping");
                    continue;
                }
                Err(TrySendError::Full(())) => {
                    tracing::debug!(client_id = %id, "delivery channel full, broadcast waiting");
                    match self.wait_for_room(&id, &tx).await {
                        Some(permit) => permit,
                        None => continue,
                    }
                }
            };
            permit.send(Arc::clone(&message));
        }
    }

    /// Wait for a slot in `tx` while still applying removals, so a stalled
    /// client can be unregistered by id. `None` means the client is gone.
    async fn wait_for_room<'t>(
        &mut self,
        id: &str,
        tx: &'t mpsc::Sender<Message>,
    ) -> Option<mpsc::Permit<'t, Message>> {
        loop {
            tokio::select! {
                reserved = tx.reserve() => {
                    if reserved.is_err() {
                        tracing::debug!(client_id = %id, "delivery channel closed while stalled");
                    }
                    return reserved.ok();
                }
                Some(removal) = self.removals.recv() => {
                    let stalled = removal.id == id;
                    self.remove(removal);
                    if stalled && !self.registry.contains(id) {
                        tracing::debug!(client_id = %id, "stalled client removed, delivery abandoned");
                        return None;
                    }
                }
            }
        }
    }
}
