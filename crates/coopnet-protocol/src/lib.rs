//! Wire protocol for Coopnet.
//!
//! This crate defines the binary "language" that clients, the signaling
//! server and peers speak:
//!
//! - **Types** ([`Packet`], [`PacketKind`], the payload records): the
//!   closed set of messages that travel on the wire.
//! - **Registry** ([`PacketMeta`], [`PACKET_TABLE`], [`Role`]): the static
//!   per-kind contract: payload size, string count, and who may send it.
//! - **Codec** ([`encode`], [`decode`], [`FrameHeader`]): how packets are
//!   laid out as frames.
//! - **Errors** ([`ProtocolError`]): what can go wrong.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (connections and peers). It knows nothing about sockets; it turns
//! packets into frames and frames back into packets.
//!
//! ```text
//! Transport (bytes) → Protocol (Packet) → Session (Connection, Peer)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{
    FrameHeader, HEADER_SIZE, MAX_FRAME_SIZE, PROTOCOL_VERSION, decode,
    encode, encode_into,
};
pub use error::ProtocolError;
pub use types::{
    Joined, LobbyCreate, LobbyCreated, LobbyDetails, LobbyId, LobbyJoin,
    LobbyJoined, LobbyLeave, LobbyLeft, LobbyListGet, LobbyListGot,
    PACKET_TABLE, Packet, PacketKind, PacketMeta, Role, UserId,
};

/// Checks that `packet` may be received by an endpoint in `role`.
///
/// This is the dispatch-time validation step: a frame that decodes fine
/// but travels in the wrong direction is rejected here.
pub fn check_role(role: Role, packet: &Packet) -> Result<(), ProtocolError> {
    if role.accepts(packet.meta()) {
        Ok(())
    } else {
        Err(ProtocolError::RoleViolation {
            kind: packet.kind(),
            role,
        })
    }
}
