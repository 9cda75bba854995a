use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use futures::{SinkExt, StreamExt, TryFutureExt};
use log::{debug, info, warn};
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use warp::ws::{Message, WebSocket};

/// Currently connected clients.
///
/// - Key is their connection id
/// - Value is a sender of `warp::ws::Message`
pub type Users = Arc<RwLock<HashMap<usize, mpsc::UnboundedSender<Message>>>>;

/// The single chat room behind `/chat/ws`.
#[derive(Debug)]
pub struct ChatRoom {
    pub users: Users,
    next_id: AtomicUsize,
}

impl ChatRoom {
    pub fn new() -> Self {
        ChatRoom {
            users: Users::default(),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Adds a client and returns its id along with the queue of frames
    /// destined for it.
    pub async fn join(&self) -> (usize, mpsc::UnboundedReceiver<Message>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.users.write().await.insert(id, tx);
        (id, rx)
    }

    pub async fn leave(&self, id: usize) {
        self.users.write().await.remove(&id);
    }

    /// Relays `text` unmodified to every connected client, the sender included.
    pub async fn broadcast(&self, text: &str) {
        for (&uid, tx) in self.users.read().await.iter() {
            if let Err(_disconnected) = tx.send(Message::text(text)) {
                // The client's own task is already tearing it down.
                debug!("skipping closed chat client {}", uid);
            }
        }
    }

    pub async fn connected(&self) -> usize {
        self.users.read().await.len()
    }
}

impl Default for ChatRoom {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn user_connected(ws: WebSocket, room: Arc<ChatRoom>) {
    let (my_id, rx) = room.join().await;
    info!("a user connected: {}", my_id);

    // Split the socket into a sender and receiver of messages.
    let (mut user_ws_tx, mut user_ws_rx) = ws.split();

    // The unbounded queue buffers frames while the socket flushes.
    let mut rx = UnboundedReceiverStream::new(rx);
    tokio::task::spawn(async move {
        while let Some(message) = rx.next().await {
            user_ws_tx
                .send(message)
                .unwrap_or_else(|e| {
                    warn!("websocket send error: {}", e);
                })
                .await;
        }
    });

    while let Some(result) = user_ws_rx.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("websocket error(uid={}): {}", my_id, e);
                break;
            }
        };
        // Skip any non-Text frames.
        if let Ok(text) = msg.to_str() {
            room.broadcast(text).await;
        }
    }

    room.leave(my_id).await;
    info!("user disconnected: {}", my_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_everyone() {
        let room = ChatRoom::new();
        let (first, mut first_rx) = room.join().await;
        let (second, mut second_rx) = room.join().await;
        assert_ne!(first, second);
        assert_eq!(room.connected().await, 2);

        room.broadcast("joey: hi").await;
        assert_eq!(first_rx.recv().await.unwrap().to_str().unwrap(), "joey: hi");
        assert_eq!(second_rx.recv().await.unwrap().to_str().unwrap(), "joey: hi");

        room.leave(first).await;
        room.broadcast("anyone?").await;
        assert!(first_rx.recv().await.is_none());
        assert_eq!(second_rx.recv().await.unwrap().to_str().unwrap(), "anyone?");
        assert_eq!(room.connected().await, 1);
    }

    #[tokio::test]
    async fn dropped_receivers_are_tolerated() {
        let room = ChatRoom::new();
        let (_, rx) = room.join().await;
        drop(rx);
        let (_, mut live) = room.join().await;

        room.broadcast("still here").await;
        assert_eq!(live.recv().await.unwrap().to_str().unwrap(), "still here");
    }
}
