//! Error types for the session layer.

use coopnet_protocol::{ProtocolError, UserId};
use coopnet_transport::TransportError;

/// Errors that can occur on a connection or in the peer table.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The transport failed. The connection has been torn down.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A packet could not be encoded, or the inbound stream lost framing.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The connection was already disconnected.
    #[error("connection is not connected")]
    NotConnected,

    /// A peer session for this user already exists.
    #[error("peer {0} already exists")]
    PeerExists(UserId),

    /// No peer session exists for this user.
    #[error("peer {0} not found")]
    PeerNotFound(UserId),

    /// A broadcast was attempted with no peers in the table.
    #[error("no peers to send to")]
    NoPeers,

    /// A broadcast reached some peers but not all of them.
    #[error("send failed for {} of {total} peers", failed.len())]
    BroadcastFailed { failed: Vec<UserId>, total: usize },
}
