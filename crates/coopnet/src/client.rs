//! The poll-driven client: one control connection plus the peer table.
//!
//! Nothing here runs in the background. The owning application calls
//! [`Client::update`] from its tick loop; each call polls the control
//! connection once, then every peer once, and returns what happened as a
//! list of [`ClientEvent`]s.
//!
//! ```text
//! tick → update()
//!          ├─ control.receive() → dispatch each packet (lobby state)
//!          └─ for each peer id (snapshot, ascending):
//!               peer.update() → ClientEvent::PeerPacket
//! ```
//!
//! Handlers never call back into application code. Anything the
//! application must act on, like opening a transport to a newly joined
//! user, comes back as an event.

use coopnet_protocol::{
    Joined, LobbyCreated, LobbyId, LobbyJoined, LobbyLeft, LobbyListGot,
    PROTOCOL_VERSION, Packet, Role, UserId,
};
use coopnet_session::{Connection, Peer, PeerTable};
use coopnet_transport::{TcpTransport, Transport};

use crate::{ClientConfig, CoopnetError};

const CONTROL_LABEL: &str = "control";

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// Something the application should know about after a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The signaling server assigned the local user id.
    Joined { user_id: UserId },

    /// A lobby we asked for was created; we are now in it.
    LobbyCreated { lobby_id: LobbyId },

    /// The local user joined a lobby.
    LobbyJoined { lobby_id: LobbyId },

    /// The local user left the lobby. All peer sessions have been ended.
    LobbyLeft { lobby_id: LobbyId },

    /// Another user joined our lobby. The application should establish a
    /// transport to them and hand it to [`Client::peer_begin`] with this
    /// priority.
    PeerJoined {
        lobby_id: LobbyId,
        user_id: UserId,
        priority: u32,
    },

    /// Another user left our lobby; their peer session has been ended.
    PeerLeft { lobby_id: LobbyId, user_id: UserId },

    /// One entry of a lobby list response.
    LobbyListEntry(LobbyListGot),

    /// A packet arrived on a peer connection.
    PeerPacket { user_id: UserId, packet: Packet },

    /// The control connection was lost.
    Disconnected { reason: String },

    /// A peer connection was lost. The peer stays in the table until
    /// [`Client::peer_end`] is called.
    PeerDisconnected { user_id: UserId, reason: String },
}

/// Which connection a packet arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Control,
    Peer(UserId),
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A lobby client.
///
/// Generic over the transport so tests (or a simulator) can drive it over
/// [`MemoryTransport`](coopnet_transport::MemoryTransport); the default is
/// TCP. The control connection and every peer use the same transport type.
#[derive(Debug)]
pub struct Client<T: Transport = TcpTransport> {
    config: ClientConfig,
    control: Connection<T>,
    peers: PeerTable<T>,
    user_id: Option<UserId>,
    lobby_id: Option<LobbyId>,
}

impl Client<TcpTransport> {
    /// Connects to the signaling server named in `config` over TCP.
    ///
    /// # Errors
    /// Returns a transport error if the server cannot be reached.
    pub fn connect(config: ClientConfig) -> Result<Self, CoopnetError> {
        let transport = TcpTransport::open(&config.host, config.port)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client around an already established control transport.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        let control = Connection::begin(transport, Role::Client)
            .with_label(CONTROL_LABEL)
            .with_read_chunk(config.read_chunk_size);
        let peers = PeerTable::new().with_read_chunk(config.read_chunk_size);

        tracing::info!(host = %config.host, port = config.port, "client started");

        Self {
            config,
            control,
            peers,
            user_id: None,
            lobby_id: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The id the signaling server assigned us, once `Joined` arrived.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// The lobby we are currently in, if any.
    pub fn lobby_id(&self) -> Option<LobbyId> {
        self.lobby_id
    }

    pub fn control(&self) -> &Connection<T> {
        &self.control
    }

    pub fn is_connected(&self) -> bool {
        self.control.is_connected()
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Polls the control connection, then every peer, once each.
    ///
    /// Peers are visited in ascending user id over a snapshot of the table,
    /// so handlers may end peers mid-tick without disturbing the loop.
    pub fn update(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();

        if self.control.is_connected() {
            match self.control.receive() {
                Ok(packets) => {
                    for packet in packets {
                        self.dispatch(Origin::Control, packet, &mut events);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "control connection lost");
                    events.push(ClientEvent::Disconnected {
                        reason: e.to_string(),
                    });
                }
            }
        }

        for user_id in self.peers.user_ids() {
            let Some(peer) = self.peers.get_mut(user_id) else {
                continue;
            };
            match peer.update() {
                Ok(packets) => {
                    for packet in packets {
                        self.dispatch(Origin::Peer(user_id), packet, &mut events);
                    }
                }
                Err(e) => {
                    tracing::warn!(%user_id, error = %e, "peer connection lost");
                    events.push(ClientEvent::PeerDisconnected {
                        user_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        events
    }

    /// Ends every peer session, then closes the control connection.
    /// Idempotent.
    pub fn disconnect(&mut self) {
        self.peers.end_all();
        if self.control.is_connected() {
            self.control.disconnect();
            tracing::info!("client disconnected");
        }
        self.lobby_id = None;
    }

    // -----------------------------------------------------------------------
    // Peer table
    // -----------------------------------------------------------------------

    /// Starts a peer session with `user_id` over an established transport.
    ///
    /// # Errors
    /// Fails with [`SessionError::PeerExists`] if a session with that
    /// user is already open; the supplied transport is closed.
    ///
    /// [`SessionError::PeerExists`]: coopnet_session::SessionError::PeerExists
    pub fn peer_begin(
        &mut self,
        user_id: UserId,
        priority: u32,
        transport: T,
    ) -> Result<&mut Peer<T>, CoopnetError> {
        Ok(self.peers.begin(user_id, priority, transport)?)
    }

    /// Ends the peer session with `user_id`. Absent ids are a no-op.
    pub fn peer_end(&mut self, user_id: UserId) {
        self.peers.end(user_id);
    }

    pub fn peer_end_all(&mut self) {
        self.peers.end_all();
    }

    pub fn peer_get(&self, user_id: UserId) -> Option<&Peer<T>> {
        self.peers.get(user_id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Every open peer session, in ascending user id.
    pub fn peers(&self) -> impl Iterator<Item = &Peer<T>> {
        self.peers.iter()
    }

    /// Broadcasts `data` to every peer.
    ///
    /// Peers parse their stream as frames, so `data` must be one or more
    /// encoded frames (see [`coopnet_protocol::encode`]). Anything else
    /// desynchronizes the receiving side.
    ///
    /// # Errors
    /// Fails if there are no peers or if any single send failed. Every
    /// peer is still attempted.
    pub fn peer_send(&mut self, data: &[u8]) -> Result<(), CoopnetError> {
        Ok(self.peers.send(data)?)
    }

    /// Sends `data`, one or more encoded frames, to one peer.
    pub fn peer_send_to(
        &mut self,
        user_id: UserId,
        data: &[u8],
    ) -> Result<(), CoopnetError> {
        Ok(self.peers.send_to(user_id, data)?)
    }

    // -----------------------------------------------------------------------
    // Control connection
    // -----------------------------------------------------------------------

    /// Sends one packet over the control connection.
    pub(crate) fn send_control(&mut self, packet: Packet) -> Result<(), CoopnetError> {
        self.control.send(&packet)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Routes one accepted packet to its handler.
    ///
    /// Only the control connection speaks for the signaling server, so only
    /// its packets touch lobby state. Peer traffic is handed to the
    /// application untouched.
    fn dispatch(
        &mut self,
        origin: Origin,
        packet: Packet,
        events: &mut Vec<ClientEvent>,
    ) {
        let Origin::Peer(user_id) = origin else {
            self.handle_control(packet, events);
            return;
        };
        tracing::trace!(%user_id, kind = %packet.kind(), "peer packet");
        events.push(ClientEvent::PeerPacket { user_id, packet });
    }

    fn handle_control(&mut self, packet: Packet, events: &mut Vec<ClientEvent>) {
        match packet {
            Packet::Joined(p) => self.on_joined(p, events),
            Packet::LobbyCreated(p) => self.on_lobby_created(p, events),
            Packet::LobbyJoined(p) => self.on_lobby_joined(p, events),
            Packet::LobbyLeft(p) => self.on_lobby_left(p, events),
            Packet::LobbyListGot(p) => {
                tracing::debug!(lobby_id = %p.lobby_id, "lobby listed");
                events.push(ClientEvent::LobbyListEntry(p));
            }
            // Client-bound kinds never pass the role check.
            Packet::LobbyCreate(_)
            | Packet::LobbyJoin(_)
            | Packet::LobbyLeave(_)
            | Packet::LobbyListGet(_) => {
                tracing::debug!(kind = %packet.kind(), "ignoring client packet");
            }
        }
    }

    fn on_joined(&mut self, p: Joined, events: &mut Vec<ClientEvent>) {
        if p.version != PROTOCOL_VERSION {
            tracing::warn!(
                server = p.version,
                local = PROTOCOL_VERSION,
                "protocol version mismatch"
            );
        }
        tracing::info!(user_id = %p.user_id, "joined signaling server");
        self.user_id = Some(p.user_id);
        events.push(ClientEvent::Joined { user_id: p.user_id });
    }

    fn on_lobby_created(&mut self, p: LobbyCreated, events: &mut Vec<ClientEvent>) {
        tracing::info!(lobby_id = %p.lobby_id, title = %p.details.title, "lobby created");
        self.lobby_id = Some(p.lobby_id);
        events.push(ClientEvent::LobbyCreated { lobby_id: p.lobby_id });
    }

    fn on_lobby_joined(&mut self, p: LobbyJoined, events: &mut Vec<ClientEvent>) {
        // Without our own id there is no telling our join from another's.
        let Some(local) = self.user_id else {
            tracing::warn!(
                lobby_id = %p.lobby_id,
                user_id = %p.user_id,
                "lobby joined before user id assigned, ignoring"
            );
            return;
        };

        if local == p.user_id {
            tracing::info!(lobby_id = %p.lobby_id, "lobby joined");
            self.lobby_id = Some(p.lobby_id);
            events.push(ClientEvent::LobbyJoined { lobby_id: p.lobby_id });
            return;
        }

        // The lower id drives connection setup.
        let priority = if local < p.user_id { 1 } else { 0 };
        tracing::info!(
            lobby_id = %p.lobby_id,
            user_id = %p.user_id,
            priority,
            "user joined lobby"
        );
        events.push(ClientEvent::PeerJoined {
            lobby_id: p.lobby_id,
            user_id: p.user_id,
            priority,
        });
    }

    fn on_lobby_left(&mut self, p: LobbyLeft, events: &mut Vec<ClientEvent>) {
        if self.user_id == Some(p.user_id) {
            tracing::info!(lobby_id = %p.lobby_id, "lobby left");
            self.lobby_id = None;
            self.peers.end_all();
            events.push(ClientEvent::LobbyLeft { lobby_id: p.lobby_id });
            return;
        }

        tracing::info!(lobby_id = %p.lobby_id, user_id = %p.user_id, "user left lobby");
        self.peers.end(p.user_id);
        events.push(ClientEvent::PeerLeft {
            lobby_id: p.lobby_id,
            user_id: p.user_id,
        });
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// =========================================================================
// Tests
// =========================================================================
