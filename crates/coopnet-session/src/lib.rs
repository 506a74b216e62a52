//! Connections and peer sessions for Coopnet.
//!
//! This crate sits on top of the wire protocol and owns everything that
//! has a lifetime:
//!
//! 1. **Connection**: one transport plus the inbound buffer that extracts
//!    complete frames from a byte stream ([`Connection`])
//! 2. **Peer**: one remote participant and its connection ([`Peer`])
//! 3. **Peer table**: every open peer session, keyed by user id
//!    ([`PeerTable`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← control connection + peer table, lobby operations
//!     ↕
//! Session Layer (this crate)  ← framing, connection state, peers
//!     ↕
//! Protocol + Transport (below)  ← packets, bytes
//! ```

mod connection;
mod error;
mod peer;
mod table;

pub use connection::{
    Connection, ConnectionState, ConnectionStats, MAX_READ_CHUNK,
};
pub use error::SessionError;
pub use peer::Peer;
pub use table::PeerTable;
