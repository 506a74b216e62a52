//! # Coopnet
//!
//! Client networking for multiplayer lobbies.
//!
//! A [`Client`] keeps one control connection to a signaling server, runs
//! lobby operations over it, and owns a table of peer sessions, one per
//! remote user. Everything speaks the same small binary protocol.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coopnet::prelude::*;
//!
//! # fn main() -> Result<(), CoopnetError> {
//! let mut client = Client::connect(ClientConfig::default())?;
//! client.lobby_list_get("my-game")?;
//!
//! loop {
//!     for event in client.update() {
//!         if let ClientEvent::LobbyListEntry(entry) = event {
//!             println!("{} ({}/{})", entry.details.title, entry.connections, entry.max_connections);
//!         }
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! coopnet            ← Client, lobby operations, config
//! coopnet-session    ← Connection framing, peers, peer table
//! coopnet-protocol   ← packets, registry, codec
//! coopnet-transport  ← non-blocking byte streams (TCP, in-memory)
//! ```

mod client;
mod config;
mod error;
mod lobby;

pub use client::{Client, ClientEvent};
pub use config::{ClientConfig, RendezvousConfig};
pub use error::CoopnetError;

pub use coopnet_protocol as protocol;
pub use coopnet_session as session;
pub use coopnet_transport as transport;

/// Common imports for applications.
pub mod prelude {
    pub use crate::{Client, ClientConfig, ClientEvent, CoopnetError};
    pub use coopnet_protocol::{LobbyId, Packet, UserId};
    pub use coopnet_session::{Peer, SessionError};
    pub use coopnet_transport::{MemoryTransport, TcpTransport, Transport};
}
