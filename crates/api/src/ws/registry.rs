//! Registry of open realtime connections.
//!
//! Each connection owns an unbounded outbox drained by its socket task. The
//! registry only ever writes into outboxes; a send that fails means the
//! socket task is gone, and the entry is pruned on the spot.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use ctrack_core::types::{DbId, Timestamp};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Receiving end of a connection's outbox.
pub type Inbox = mpsc::UnboundedReceiver<Message>;

struct Client {
    user_id: DbId,
    outbox: mpsc::UnboundedSender<Message>,
    opened_at: Timestamp,
}

/// All WebSocket clients currently subscribed to notifications.
#[derive(Default)]
pub struct ConnectionRegistry {
    clients: RwLock<HashMap<ConnectionId, Client>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id` and hand back its id and inbox.
    pub async fn open(&self, user_id: DbId) -> (ConnectionId, Inbox) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.clients.write().await.insert(
            id,
            Client {
                user_id,
                outbox,
                opened_at: chrono::Utc::now(),
            },
        );
        (id, inbox)
    }

    /// Forget a connection. Returns `false` if it was already gone (pruned
    /// or closed during shutdown).
    pub async fn close(&self, id: ConnectionId) -> bool {
        match self.clients.write().await.remove(&id) {
            Some(client) => {
                let open_for = chrono::Utc::now() - client.opened_at;
                tracing::debug!(
                    conn_id = %id,
                    user_id = client.user_id,
                    open_secs = open_for.num_seconds(),
                    "Connection unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Queue `message` on every connection and return how many accepted it.
    /// Connections whose socket task has exited are removed.
    pub async fn push(&self, message: Message) -> usize {
        let (reached, dead) = {
            let clients = self.clients.read().await;
            let dead: Vec<ConnectionId> = clients
                .iter()
                .filter(|(_, client)| client.outbox.send(message.clone()).is_err())
                .map(|(id, _)| *id)
                .collect();
            (clients.len() - dead.len(), dead)
        };
        if !dead.is_empty() {
            let mut clients = self.clients.write().await;
            for id in &dead {
                clients.remove(id);
            }
            tracing::debug!(pruned = dead.len(), "Pruned closed connections");
        }
        reached
    }

    /// Ping every connection.
    pub async fn ping(&self) -> usize {
        self.push(Message::Ping(Bytes::new())).await
    }

    /// Send Close to every connection and empty the registry. Returns the
    /// number of connections that were open.
    pub async fn close_all(&self) -> usize {
        let mut clients = self.clients.write().await;
        for client in clients.values() {
            let _ = client.outbox.send(Message::Close(None));
        }
        let closed = clients.len();
        clients.clear();
        closed
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Open connections belonging to `user_id`.
    pub async fn count_for_user(&self, user_id: DbId) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|client| client.user_id == user_id)
            .count()
    }
}
