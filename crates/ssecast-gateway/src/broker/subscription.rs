use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use super::{Message, Removal};

/// A registered client's side of the broker: the receiving half of its
/// delivery channel plus the obligation to unregister.
///
/// `close` unregisters and waits for the broker loop to accept the removal.
/// If a subscription is dropped without `close` (task aborted, panic, early
/// return) the removal is still submitted from `Drop`.
pub struct Subscription {
    id: String,
    session: u64,
    rx: Option<mpsc::Receiver<Message>>,
    removals: mpsc::Sender<Removal>,
    closed: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: String,
        session: u64,
        rx: mpsc::Receiver<Message>,
        removals: mpsc::Sender<Removal>,
    ) -> Self {
        Self {
            id,
            session,
            rx: Some(rx),
            removals,
            closed: false,
        }
    }

    /// Forget the removal obligation: the broker never admitted this client.
    pub(crate) fn disarm(&mut self) {
        self.closed = true;
    }

    pub fn client_id(&self) -> &str {
        &self.id
    }

    /// Session number this registration was made under.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Next message for this client. `None` once the broker has dropped the
    /// client (replaced by a duplicate id, or the broker stopped).
    pub async fn recv(&mut self) -> Option<Message> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Unregister and wait until the broker loop has processed the removal.
    ///
    /// The delivery channel is closed first: if the loop is blocked handing a
    /// message to this client, that send fails and the loop moves on.
    pub async fn close(mut self) {
        self.closed = true;
        self.rx.take();

        let (ack_tx, ack_rx) = oneshot::channel();
        let removal = Removal {
            id: std::mem::take(&mut self.id),
            session: Some(self.session),
            ack: Some(ack_tx),
        };
        if self.removals.send(removal).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.rx.take();

        let removal = Removal {
            id: std::mem::take(&mut self.id),
            session: Some(self.session),
            ack: None,
        };
        match self.removals.try_send(removal) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(removal)) => match Handle::try_current() {
                Ok(handle) => {
                    let removals = self.removals.clone();
                    handle.spawn(async move {
                        let _ = removals.send(removal).await;
                    });
                }
                Err(_) => {
                    tracing::warn!(client_id = %removal.id, "no runtime to submit removal; client stays registered");
                }
            },
        }
    }
}
