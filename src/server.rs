use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::admission::{self, AdmissionDecision, AdmissionPredicate, PeerInfo};
use crate::config::RelayConfig;
use crate::connection::ConnectionHandle;
use crate::error::{RelayError, Result};
use crate::framing::Framer;
use crate::protocol::ClientFrame;
use crate::registry::{ConnectionId, SubscriptionRegistry};

/// Owner-facing notifications, fired once per effective operation: never for
/// idempotent no-ops, discarded frames, or rejected connections.
#[derive(Debug, Clone)]
pub enum RelayNotification {
    Subscribed {
        conn: ConnectionId,
        event: String,
    },
    Unsubscribed {
        conn: ConnectionId,
        event: String,
    },
    Broadcast {
        conn: ConnectionId,
        event: String,
        args: Vec<Value>,
    },
}

/// A lagging owner loses old notifications; routing is unaffected either way.
const NOTIFICATION_CAPACITY: usize = 256;

const READ_BUFFER_SIZE: usize = 8192;

/// Registry plus writer handles, mutated under one lock so every subscribe,
/// unsubscribe, cleanup, and broadcast snapshot is serialized.
#[derive(Default)]
struct ServerState {
    registry: SubscriptionRegistry,
    peers: HashMap<ConnectionId, ConnectionHandle>,
}

/// TCP publish/subscribe relay.
///
/// Pure routing plus bookkeeping: clients subscribe to named events and
/// broadcast JSON payloads to every other current subscriber. Event semantics
/// live entirely in the clients.
pub struct RelayServer {
    framer: Arc<Framer>,
    admission: Option<AdmissionPredicate>,
    state: Arc<Mutex<ServerState>>,
    notifications: broadcast::Sender<RelayNotification>,
    next_id: Arc<AtomicU64>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl RelayServer {
    /// Create a relay from its configuration. Fails fast on an empty
    /// delimiter; everything else is validated per-frame at runtime.
    pub fn new(config: RelayConfig) -> Result<Self> {
        let framer = Arc::new(Framer::new(config.delimiter)?);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Ok(Self {
            framer,
            admission: config.admission,
            state: Arc::new(Mutex::new(ServerState::default())),
            notifications,
            next_id: Arc::new(AtomicU64::new(1)),
            accept_task: Mutex::new(None),
        })
    }

    /// Owner-facing event bus. Subscribe before starting to observe every
    /// notification.
    pub fn notifications(&self) -> broadcast::Receiver<RelayNotification> {
        self.notifications.subscribe()
    }

    /// Bind the listener and spawn the accept loop. Returns the bound
    /// address so callers can listen on port 0 and discover the port.
    pub async fn start(&self, addr: SocketAddr) -> Result<SocketAddr> {
        let mut slot = self.accept_task.lock().await;
        if slot.is_some() {
            return Err(RelayError::AlreadyRunning);
        }

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Relay listening on {}", local_addr);

        let framer = Arc::clone(&self.framer);
        let admission = self.admission.clone();
        let state = Arc::clone(&self.state);
        let notifications = self.notifications.clone();
        let next_id = Arc::clone(&self.next_id);

        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        let id = ConnectionId::new(next_id.fetch_add(1, Ordering::Relaxed));
                        tracing::debug!("Accepted {} from {}, pending admission", id, peer_addr);

                        // Each connection is admitted and served on its own
                        // task; a suspended predicate never blocks the
                        // accept loop or other admissions.
                        let framer = Arc::clone(&framer);
                        let admission = admission.clone();
                        let state = Arc::clone(&state);
                        let notifications = notifications.clone();
                        tokio::spawn(async move {
                            admit_and_serve(
                                stream,
                                peer_addr,
                                id,
                                framer,
                                admission,
                                state,
                                notifications,
                            )
                            .await;
                        });
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept client: {}", e);
                    }
                }
            }
        });
        *slot = Some(task);

        Ok(local_addr)
    }

    /// Abort the accept loop and tear down every client connection.
    pub async fn stop(&self) -> Result<()> {
        let mut slot = self.accept_task.lock().await;
        let Some(task) = slot.take() else {
            return Err(RelayError::NotStarted);
        };
        task.abort();

        let mut state = self.state.lock().await;
        for (_, handle) in state.peers.drain() {
            handle.close();
        }
        state.registry.clear();

        tracing::info!("Relay stopped");
        Ok(())
    }

    /// Number of currently admitted connections.
    pub async fn client_count(&self) -> usize {
        self.state.lock().await.peers.len()
    }

    /// Total number of live (connection, event) subscription pairs.
    pub async fn subscription_count(&self) -> usize {
        self.state.lock().await.registry.subscription_count()
    }
}

/// Gate one accepted stream, then run its read loop until the peer goes away.
async fn admit_and_serve(
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: ConnectionId,
    framer: Arc<Framer>,
    admission: Option<AdmissionPredicate>,
    state: Arc<Mutex<ServerState>>,
    notifications: broadcast::Sender<RelayNotification>,
) {
    let peer = PeerInfo { id, addr: peer_addr };
    match admission::evaluate(admission.as_ref(), peer).await {
        AdmissionDecision::Admitted => {
            tracing::info!("Client {} from {} admitted", id, peer_addr);
        }
        AdmissionDecision::Rejected => {
            // Dropping the stream closes it; the connection was never
            // visible to the registry or the notification bus.
            tracing::info!("Client {} from {} rejected at admission", id, peer_addr);
            return;
        }
    }

    let (reader, writer) = stream.into_split();
    let handle = ConnectionHandle::spawn(id, writer);
    state.lock().await.peers.insert(id, handle);

    read_loop(reader, id, &framer, &state, &notifications).await;

    disconnect_cleanup(id, &state, &notifications).await;
}

/// Decode and dispatch frames strictly in arrival order: frame N's mutation
/// or fan-out completes before frame N+1 from this connection is looked at.
async fn read_loop(
    mut reader: OwnedReadHalf,
    id: ConnectionId,
    framer: &Framer,
    state: &Mutex<ServerState>,
    notifications: &broadcast::Sender<RelayNotification>,
) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                // Each chunk is decoded in isolation; an un-terminated tail
                // is dropped, never carried into the next read.
                let chunk = String::from_utf8_lossy(&buf[..n]);
                for candidate in framer.decode(&chunk) {
                    match ClientFrame::parse(candidate) {
                        Some(frame) => dispatch(id, frame, framer, state, notifications).await,
                        None => {
                            tracing::debug!("Discarding unroutable frame from client {}", id);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Read from client {} failed: {}", id, e);
                break;
            }
        }
    }
}

async fn dispatch(
    id: ConnectionId,
    frame: ClientFrame,
    framer: &Framer,
    state: &Mutex<ServerState>,
    notifications: &broadcast::Sender<RelayNotification>,
) {
    match frame {
        ClientFrame::Subscribe { event } => {
            // Subscriptions are only accepted for connections still present
            // in the peer map, so a read task racing a teardown cannot
            // repopulate a cleared registry.
            let added = {
                let mut state = state.lock().await;
                state.peers.contains_key(&id) && state.registry.subscribe(id, &event)
            };
            if added {
                tracing::debug!("Client {} subscribed to {:?}", id, event);
                let _ = notifications.send(RelayNotification::Subscribed { conn: id, event });
            }
        }
        ClientFrame::Unsubscribe { event } => {
            let removed = state.lock().await.registry.unsubscribe(id, &event);
            if removed {
                tracing::debug!("Client {} unsubscribed from {:?}", id, event);
                let _ = notifications.send(RelayNotification::Unsubscribed { conn: id, event });
            }
        }
        ClientFrame::Broadcast { event, args } => {
            broadcast_to_subscribers(id, event, args, framer, state, notifications).await;
        }
    }
}

/// Fan one broadcast out to every current subscriber except the sender.
///
/// The recipient snapshot is taken under the state lock, consistent with
/// concurrent subscribe/unsubscribe; the pushes themselves are non-blocking
/// channel sends, so no recipient's socket is awaited here.
async fn broadcast_to_subscribers(
    sender: ConnectionId,
    event: String,
    args: Vec<Value>,
    framer: &Framer,
    state: &Mutex<ServerState>,
    notifications: &broadcast::Sender<RelayNotification>,
) {
    let encoded = match framer.encode(&event, &args) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!("Failed to encode outbound frame for {:?}: {}", event, e);
            return;
        }
    };

    {
        let state = state.lock().await;
        let subscribers = state.registry.subscribers(&event);
        if subscribers.is_empty() {
            // Broadcasting to an event nobody listens to is valid and silent.
            return;
        }
        for conn in subscribers {
            // Sender exclusion for this call only; its subscription state
            // is untouched.
            if *conn == sender {
                continue;
            }
            if let Some(peer) = state.peers.get(conn) {
                peer.push(encoded.clone());
            }
        }
    }

    tracing::debug!("Client {} broadcast {:?}", sender, event);
    let _ = notifications.send(RelayNotification::Broadcast { conn: sender, event, args });
}

/// Invoked exactly once per admitted connection, when its stream closes by
/// either peer or error. Afterward the registry holds no reference to it.
async fn disconnect_cleanup(
    id: ConnectionId,
    state: &Mutex<ServerState>,
    notifications: &broadcast::Sender<RelayNotification>,
) {
    let removed = {
        let mut state = state.lock().await;
        state.peers.remove(&id);
        state.registry.remove_connection(id)
    };
    for event in removed {
        let _ = notifications.send(RelayNotification::Unsubscribed { conn: id, event });
    }
    tracing::info!("Client {} disconnected", id);
}
