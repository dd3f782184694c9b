//! Connected-client registry
//!
//! Tracks every live connection, its wire protocol, and its bounded
//! outbound queue, plus the user → client mapping used to route trades
//! to counterparties. Shared between the engine thread and connection
//! tasks, so the maps are concurrent.

use dashmap::DashMap;
use protocol::WireProtocol;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;
use types::OutputMessage;

/// Identifier for one connection, unique for the process lifetime.
pub type ClientId = u64;

/// Registered connection state.
#[derive(Debug)]
pub struct ClientEntry {
    pub addr: SocketAddr,
    pub protocol: WireProtocol,
    sender: mpsc::Sender<OutputMessage>,
}

/// Registry of connected clients.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: DashMap<ClientId, ClientEntry>,
    user_to_client: DashMap<u32, ClientId>,
    queue_capacity: usize,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            clients: DashMap::new(),
            user_to_client: DashMap::new(),
            queue_capacity,
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection, returning its id and the receiving end of
    /// its outbound queue (drained by the connection's writer task).
    pub fn register(
        &self,
        addr: SocketAddr,
        protocol: WireProtocol,
    ) -> (ClientId, mpsc::Receiver<OutputMessage>) {
        let client_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        self.clients.insert(
            client_id,
            ClientEntry {
                addr,
                protocol,
                sender,
            },
        );
        debug!(client_id, %addr, ?protocol, "client registered");
        (client_id, receiver)
    }

    /// Drop a connection and any user bindings pointing at it.
    pub fn unregister(&self, client_id: ClientId) {
        self.clients.remove(&client_id);
        self.user_to_client.retain(|_, bound| *bound != client_id);
        debug!(client_id, "client unregistered");
    }

    /// Bind a user id to the connection it last sent from. The latest
    /// binding wins, so a reconnecting user is re-routed to its new
    /// connection.
    pub fn bind_user(&self, client_id: ClientId, user_id: u32) {
        if user_id != 0 {
            self.user_to_client.insert(user_id, client_id);
        }
    }

    /// The connection currently bound to a user id, if any.
    pub fn client_for_user(&self, user_id: u32) -> Option<ClientId> {
        self.user_to_client.get(&user_id).map(|entry| *entry)
    }

    /// Queue a message for one client. Returns false if the client is
    /// gone or its queue is full; the caller counts the drop.
    pub fn send_to_client(&self, client_id: ClientId, msg: OutputMessage) -> bool {
        match self.clients.get(&client_id) {
            Some(entry) => entry.sender.try_send(msg).is_ok(),
            None => false,
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}
