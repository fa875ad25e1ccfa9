use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::Message;

/// One registered client: its session sequence number and the sending half of
/// its delivery channel.
#[derive(Clone)]
pub(crate) struct ClientEntry {
    pub session: u64,
    pub tx: mpsc::Sender<Message>,
}

/// Client registry: `client_id -> ClientEntry`.
///
/// Written only by the broker loop. The map's shard locks are held for the
/// insert/remove itself and while taking a fan-out snapshot, never across a
/// delivery send, so readers outside the loop never wait on a stalled client.
pub struct ClientRegistry {
    clients: DashMap<String, ClientEntry>,
    seq: AtomicU64,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Allocate a session number for a client about to register.
    pub(crate) fn next_session(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Insert or overwrite. Returns the entry previously held under `id`.
    pub(crate) fn insert(&self, id: String, entry: ClientEntry) -> Option<ClientEntry> {
        self.clients.insert(id, entry)
    }

    /// Remove `id`. With `session` set, only the entry admitted under that
    /// session number is removed.
    pub(crate) fn remove(&self, id: &str, session: Option<u64>) -> bool {
        match session {
            Some(s) => self.clients.remove_if(id, |_, e| e.session == s).is_some(),
            None => self.clients.remove(id).is_some(),
        }
    }

    /// Recipients of one broadcast.
    pub(crate) fn snapshot(&self) -> Vec<(String, mpsc::Sender<Message>)> {
        self.clients
            .iter()
            .map(|r| (r.key().clone(), r.value().tx.clone()))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clients.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_and_new_number_sessions_alike() {
        let a = ClientRegistry::default();
        let b = ClientRegistry::new();
        assert_eq!(a.next_session(), 1);
        assert_eq!(b.next_session(), 1);
        assert_eq!(a.next_session(), 2);
        assert!(a.is_empty());
    }
}
