//! Core protocol types for Coopnet's wire format.
//!
//! This module defines every packet that travels "on the wire" between a
//! client and the signaling server (or between two peers), together with
//! the static registry that describes each packet kind.
//!
//! The set of packets is closed: [`PacketKind`] enumerates every kind, and
//! [`Packet`] is a sum type with exactly one variant per kind. Adding a
//! kind means touching both, and the compiler points at every `match` that
//! needs a new arm.

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user, assigned by the signaling server.
///
/// Newtype over `u64` so a `LobbyId` can't be passed where a user is
/// expected. Ordered so the peer table iterates deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A unique identifier for a lobby (a matchmaking room on the server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LobbyId(pub u64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PacketKind + registry
// ---------------------------------------------------------------------------

/// The closed enumeration of packet kinds.
///
/// The discriminant is the `packetType` tag written in the frame header.
/// Tag `0` is reserved (never sent) and anything above `9` is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PacketKind {
    Joined = 1,
    LobbyCreate = 2,
    LobbyCreated = 3,
    LobbyJoin = 4,
    LobbyJoined = 5,
    LobbyLeave = 6,
    LobbyLeft = 7,
    LobbyListGet = 8,
    LobbyListGot = 9,
}

impl PacketKind {
    /// Every kind, in tag order.
    pub const ALL: [PacketKind; 9] = [
        Self::Joined,
        Self::LobbyCreate,
        Self::LobbyCreated,
        Self::LobbyJoin,
        Self::LobbyJoined,
        Self::LobbyLeave,
        Self::LobbyLeft,
        Self::LobbyListGet,
        Self::LobbyListGot,
    ];

    /// Looks up a kind by its wire tag.
    pub fn from_wire(tag: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.to_wire() == tag)
    }

    /// The tag written into the frame header.
    pub fn to_wire(self) -> u16 {
        self as u16
    }

    /// The static contract for this kind.
    pub fn meta(self) -> &'static PacketMeta {
        // ALL is in tag order starting at 1, and PACKET_TABLE mirrors it.
        &PACKET_TABLE[self as usize - 1]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Joined => "Joined",
            Self::LobbyCreate => "LobbyCreate",
            Self::LobbyCreated => "LobbyCreated",
            Self::LobbyJoin => "LobbyJoin",
            Self::LobbyJoined => "LobbyJoined",
            Self::LobbyLeave => "LobbyLeave",
            Self::LobbyLeft => "LobbyLeft",
            Self::LobbyListGet => "LobbyListGet",
            Self::LobbyListGot => "LobbyListGot",
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static, per-kind facts about a packet. Never per-instance data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketMeta {
    /// Which kind this entry describes.
    pub kind: PacketKind,
    /// Exact size in bytes of the fixed payload record.
    pub data_size: u16,
    /// Exact number of strings in the string table.
    pub string_count: u16,
    /// `true` if only the server ever sends this kind.
    pub server_packet: bool,
}

/// The packet registry, indexed by `tag - 1`.
///
/// Payload sizes are the packed little-endian layouts of the records
/// below: `u64` = 8, `u32` = 4, `u16` = 2, no padding.
pub static PACKET_TABLE: [PacketMeta; 9] = [
    PacketMeta { kind: PacketKind::Joined, data_size: 12, string_count: 0, server_packet: true },
    PacketMeta { kind: PacketKind::LobbyCreate, data_size: 2, string_count: 3, server_packet: false },
    PacketMeta { kind: PacketKind::LobbyCreated, data_size: 8, string_count: 3, server_packet: true },
    PacketMeta { kind: PacketKind::LobbyJoin, data_size: 8, string_count: 0, server_packet: false },
    PacketMeta { kind: PacketKind::LobbyJoined, data_size: 16, string_count: 0, server_packet: true },
    PacketMeta { kind: PacketKind::LobbyLeave, data_size: 8, string_count: 0, server_packet: false },
    PacketMeta { kind: PacketKind::LobbyLeft, data_size: 16, string_count: 0, server_packet: true },
    PacketMeta { kind: PacketKind::LobbyListGet, data_size: 0, string_count: 1, server_packet: false },
    PacketMeta { kind: PacketKind::LobbyListGot, data_size: 20, string_count: 3, server_packet: true },
];

// ---------------------------------------------------------------------------
// Role: which direction a connection accepts
// ---------------------------------------------------------------------------

/// The local end's role on a connection.
///
/// A client only accepts packets the server sends; a server only accepts
/// packets clients send. Anything else is a [`RoleViolation`].
///
/// [`RoleViolation`]: crate::ProtocolError::RoleViolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Client,
    Server,
}

impl Role {
    /// Returns `true` if a packet with this metadata may be received here.
    pub fn accepts(self, meta: &PacketMeta) -> bool {
        match self {
            Self::Client => meta.server_packet,
            Self::Server => !meta.server_packet,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload records
// ---------------------------------------------------------------------------

/// The three strings that describe a lobby: game name, game version and
/// a human-readable title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LobbyDetails {
    pub game: String,
    pub version: String,
    pub title: String,
}

impl LobbyDetails {
    pub fn new(
        game: impl Into<String>,
        version: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            game: game.into(),
            version: version.into(),
            title: title.into(),
        }
    }
}

/// Server → Client: "You are connected, this is your user id."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub user_id: UserId,
    pub version: u32,
}

/// Client → Server: "Create a lobby with these details."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyCreate {
    pub max_connections: u16,
    pub details: LobbyDetails,
}

/// Server → Client: "Your lobby exists now."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyCreated {
    pub lobby_id: LobbyId,
    pub details: LobbyDetails,
}

/// Client → Server: "Put me in this lobby."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyJoin {
    pub lobby_id: LobbyId,
}

/// Server → Client: "This user joined this lobby." Sent to the joining
/// user and to every user already in the lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyJoined {
    pub lobby_id: LobbyId,
    pub user_id: UserId,
}

/// Client → Server: "Take me out of this lobby."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyLeave {
    pub lobby_id: LobbyId,
}

/// Server → Client: "This user left this lobby."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyLeft {
    pub lobby_id: LobbyId,
    pub user_id: UserId,
}

/// Client → Server: "List the lobbies for this game."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyListGet {
    pub game: String,
}

/// Server → Client: one entry of a lobby listing. The server answers a
/// [`LobbyListGet`] with one of these per matching lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyListGot {
    pub lobby_id: LobbyId,
    pub owner_id: UserId,
    pub connections: u16,
    pub max_connections: u16,
    pub details: LobbyDetails,
}

// ---------------------------------------------------------------------------
// Packet: the sum type
// ---------------------------------------------------------------------------

/// Any packet, one variant per [`PacketKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Joined(Joined),
    LobbyCreate(LobbyCreate),
    LobbyCreated(LobbyCreated),
    LobbyJoin(LobbyJoin),
    LobbyJoined(LobbyJoined),
    LobbyLeave(LobbyLeave),
    LobbyLeft(LobbyLeft),
    LobbyListGet(LobbyListGet),
    LobbyListGot(LobbyListGot),
}

impl Packet {
    /// The kind of this packet.
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Joined(_) => PacketKind::Joined,
            Self::LobbyCreate(_) => PacketKind::LobbyCreate,
            Self::LobbyCreated(_) => PacketKind::LobbyCreated,
            Self::LobbyJoin(_) => PacketKind::LobbyJoin,
            Self::LobbyJoined(_) => PacketKind::LobbyJoined,
            Self::LobbyLeave(_) => PacketKind::LobbyLeave,
            Self::LobbyLeft(_) => PacketKind::LobbyLeft,
            Self::LobbyListGet(_) => PacketKind::LobbyListGet,
            Self::LobbyListGot(_) => PacketKind::LobbyListGot,
        }
    }

    /// The static contract of this packet's kind.
    pub fn meta(&self) -> &'static PacketMeta {
        self.kind().meta()
    }
}

macro_rules! impl_from_record {
    ($($record:ident),* $(,)?) => {
        $(
            impl From<$record> for Packet {
                fn from(record: $record) -> Self {
                    Self::$record(record)
                }
            }
        )*
    };
}

impl_from_record!(
    Joined,
    LobbyCreate,
    LobbyCreated,
    LobbyJoin,
    LobbyJoined,
    LobbyLeave,
    LobbyLeft,
    LobbyListGet,
    LobbyListGot,
);

// =========================================================================
// Tests
// =========================================================================
