//! Peer sessions: one remote participant and the connection to it.

use coopnet_protocol::{Packet, Role, UserId};
use coopnet_transport::Transport;

use crate::{Connection, SessionError};

/// One remote participant, identified by user id, owning its connection.
///
/// Peers are created and destroyed only through the [`PeerTable`]; other
/// code borrows them through lookups.
///
/// [`PeerTable`]: crate::PeerTable
#[derive(Debug)]
pub struct Peer<T: Transport> {
    user_id: UserId,
    priority: u32,
    connection: Connection<T>,
}

impl<T: Transport> Peer<T> {
    pub(crate) fn new(
        user_id: UserId,
        priority: u32,
        transport: T,
        read_chunk: usize,
    ) -> Self {
        let connection = Connection::begin(transport, Role::Client)
            .with_label(user_id.to_string())
            .with_read_chunk(read_chunk);
        Self {
            user_id,
            priority,
            connection,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Connection priority assigned when the peer was begun. `1` means the
    /// local side drives connection setup.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection<T> {
        &mut self.connection
    }

    /// Sends an opaque buffer to this peer.
    pub fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
        self.connection.send_bytes(data)
    }

    /// Sends one packet to this peer.
    pub fn send_packet(&mut self, packet: &Packet) -> Result<(), SessionError> {
        self.connection.send(packet)
    }

    /// Polls this peer's connection once. A disconnected peer yields nothing.
    pub fn update(&mut self) -> Result<Vec<Packet>, SessionError> {
        if !self.connection.is_connected() {
            return Ok(Vec::new());
        }
        self.connection.receive()
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }
}
