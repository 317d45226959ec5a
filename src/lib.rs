//! TCP publish/subscribe relay.
//!
//! Independent client processes connect over a stream socket, subscribe to
//! named events, and broadcast arbitrary JSON payloads to every other client
//! currently subscribed. The relay holds no business logic about event
//! semantics: it is pure routing plus bookkeeping.
//!
//! # Features
//!
//! - Delimiter-framed JSON wire protocol (default delimiter `@@@`)
//! - Per-event subscriber registry with idempotent subscribe/unsubscribe
//! - Broadcast fan-out with sender exclusion
//! - Non-blocking per-recipient writes (one slow peer never stalls the rest)
//! - Pluggable async admission predicate, fail-closed
//! - Owner-facing notification bus (`subscribed` / `unsubscribed` / `broadcast`)
//!
//! # Wire protocol
//!
//! Client to server, each frame terminated by the delimiter:
//!
//! - `{"type":"subscribe","event":"<name>"}`
//! - `{"type":"unsubscribe","event":"<name>"}`
//! - `{"type":"broadcast","event":"<name>","args":[...]}`
//!
//! Server to client (no `type` field, by contract):
//!
//! - `{"event":"<name>","args":[...]}`
//!
//! Frames that fail to parse or lack required fields are silently discarded;
//! bad data never registers a subscription or triggers a broadcast.
//!
//! # Example
//!
//! ```no_run
//! use relaycast::{admission, RelayConfig, RelayServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::new()
//!         .delimiter("@@@")
//!         .admission(admission::from_fn(|peer| async move {
//!             peer.addr.ip().is_loopback()
//!         }));
//!
//!     let server = RelayServer::new(config)?;
//!     let mut notifications = server.notifications();
//!     let addr = server.start("127.0.0.1:7341".parse()?).await?;
//!     println!("relay on {addr}");
//!
//!     while let Ok(note) = notifications.recv().await {
//!         println!("{note:?}");
//!     }
//!
//!     server.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod config;
pub mod connection;
pub mod error;
pub mod framing;
pub mod protocol;
pub mod registry;
pub mod server;

// Re-exports
pub use admission::{AdmissionDecision, AdmissionPredicate, PeerInfo};
pub use config::{RelayConfig, DEFAULT_DELIMITER};
pub use error::{RelayError, Result};
pub use framing::Framer;
pub use protocol::{ClientFrame, OutboundFrame};
pub use registry::{ConnectionId, SubscriptionRegistry};
pub use server::{RelayNotification, RelayServer};
