//! Broadcast relay for live collaboration.
//!
//! This module maintains an explicit registry of connected WebSocket peers
//! and forwards every inbound message, verbatim, to every other connected
//! peer. Payloads are opaque; no envelope, acknowledgement, or cross-sender
//! ordering is defined.

use crate::config::AppConfig;
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch::Receiver as WatchReceiver, RwLock};
use tracing::{debug, info, warn};

/// Identifier assigned to a peer for the lifetime of its connection.
pub type PeerId = u64;

/// Registry of live collaboration peers.
///
/// Each peer is an entry in an indexed table mapping its id to the send half
/// of its outbound message queue. The table is the only shared mutable state
/// of the relay and is guarded by an async `RwLock`: broadcasts take a read
/// lock, connect/disconnect take a write lock.
pub struct Relay {
    peers: RwLock<HashMap<PeerId, mpsc::UnboundedSender<Message>>>,
    next_peer_id: AtomicU64,
}

impl Relay {
    /// Creates an empty relay with no connected peers.
    pub fn new() -> Self {
        Relay {
            peers: RwLock::new(HashMap::new()),
            next_peer_id: AtomicU64::new(1),
        }
    }

    /// Registers a new peer and returns its id together with the receive
    /// half of its outbound queue.
    ///
    /// No upper bound on concurrent peers is enforced.
    pub async fn connect(&self) -> (PeerId, mpsc::UnboundedReceiver<Message>) {
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.write().await.insert(id, tx);
        (id, rx)
    }

    /// Removes a peer from the live set.
    ///
    /// Dropping the stored sender closes the peer's outbound queue; no
    /// notification is sent to the remaining peers.
    pub async fn disconnect(&self, id: PeerId) {
        self.peers.write().await.remove(&id);
    }

    /// Forwards `message` to every registered peer except the sender.
    ///
    /// Delivery is best-effort: a failed send to one peer (e.g., a peer
    /// mid-close whose queue is already gone) is logged and skipped, and
    /// never aborts delivery to the remaining peers or surfaces to the
    /// sender.
    ///
    /// # Returns
    /// The number of peers the message was queued for.
    pub async fn broadcast(&self, from: PeerId, message: Message) -> usize {
        let peers = self.peers.read().await;
        let mut delivered = 0;
        for (id, tx) in peers.iter() {
            if *id == from {
                continue;
            }
            match tx.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    debug!("Peer {} queue closed mid-broadcast, skipping.", id);
                }
            }
        }
        delivered
    }

    /// Number of currently registered peers.
    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

/// Handles incoming WebSocket upgrade requests on the relay endpoint.
async fn collab_handler(ws: WebSocketUpgrade, State(relay): State<Arc<Relay>>) -> Response {
    info!("New collaboration connection request.");
    ws.on_upgrade(move |socket| handle_peer(socket, relay))
}

/// Handles a single collaboration peer.
///
/// Registers the peer, then spawns two tasks:
/// - One draining the peer's outbound queue into the WebSocket.
/// - One forwarding inbound text/binary frames to all other peers.
///
/// The connection ends when either task finishes; the peer is then removed
/// from the registry. In-flight forwards to a departed peer are abandoned
/// silently.
async fn handle_peer(socket: WebSocket, relay: Arc<Relay>) {
    let (peer_id, mut outbound_rx) = relay.connect().await;
    info!(
        "Peer {} connected to collaboration relay ({} connected).",
        peer_id,
        relay.peer_count().await
    );

    let (mut sender, mut receiver): (SplitSink<WebSocket, Message>, SplitStream<WebSocket>) =
        socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                warn!("Failed to send message to peer, peer disconnected?");
                break;
            }
        }
        debug!("Relay send task for a peer finished.");
    });

    let recv_relay = Arc::clone(&relay);
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(_) | Message::Binary(_) => {
                    let delivered = recv_relay.broadcast(peer_id, msg).await;
                    debug!("Peer {} message relayed to {} peers.", peer_id, delivered);
                }
                Message::Ping(_) => {
                    debug!("Received Ping from peer, Axum handles Pong automatically.");
                }
                Message::Pong(_) => {
                    debug!("Received Pong from peer.");
                }
                Message::Close(_) => {
                    debug!("Peer {} sent Close frame.", peer_id);
                    break;
                }
            }
        }
        debug!("Relay receive task for a peer finished.");
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    relay.disconnect(peer_id).await;
    info!(
        "Peer {} disconnected from collaboration relay ({} connected).",
        peer_id,
        relay.peer_count().await
    );
}

/// Starts the collaboration relay server.
///
/// - Accepts WebSocket connections at `/collab` on the configured relay
///   address, which is distinct from the HTTP address.
/// - Forwards every inbound message to every other connected peer.
/// - Shuts down gracefully when the shutdown signal is triggered.
///
/// # Arguments
/// - `app_config`: Shared application configuration.
/// - `relay`: The shared peer registry.
/// - `shutdown_signal`: Watch channel for graceful shutdown notification.
///
/// # Errors
/// Returns an error if the relay address is invalid or binding fails.
pub async fn start_relay_server(
    app_config: Arc<AppConfig>,
    relay: Arc<Relay>,
    shutdown_signal: WatchReceiver<bool>,
) -> Result<()> {
    let socket_addr: SocketAddr = app_config.relay_addr.parse()?;

    let app = Router::new()
        .route("/collab", get(collab_handler))
        .with_state(relay);

    info!("Collaboration relay starting on ws://{}/collab", socket_addr);

    let mut shutdown = shutdown_signal.clone();
    axum::serve(tokio::net::TcpListener::bind(socket_addr).await?, app)
        .with_graceful_shutdown(async move {
            shutdown.changed().await.ok();
            info!("Collaboration relay shutting down gracefully.");
        })
        .await?;

    info!("Collaboration relay stopped.");
    Ok(())
}
