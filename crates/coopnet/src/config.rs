//! Client configuration.

use coopnet_protocol::MAX_FRAME_SIZE;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RendezvousConfig
// ---------------------------------------------------------------------------

/// Where the rendezvous (STUN-style) helper lives.
///
/// The client never talks to it directly. The value is carried so that
/// whatever sets up peer transports can read it from
/// [`Client::config`](crate::Client::config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendezvousConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            host: "stun.l.google.com".to_string(),
            port: 19302,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Client`](crate::Client).
///
/// Every field has a default, so a config document only needs the fields
/// it wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Signaling server host name or address.
    pub host: String,

    /// Signaling server port.
    pub port: u16,

    /// Rendezvous helper used when setting up peer transports.
    pub rendezvous: RendezvousConfig,

    /// Maximum bytes read from a transport per poll. Defaults to one
    /// maximum-size frame.
    pub read_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 34197,
            rendezvous: RendezvousConfig::default(),
            read_chunk_size: MAX_FRAME_SIZE,
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at the given signaling server.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Parses a JSON config document. Missing fields take their defaults.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, crate::CoopnetError> {
        Ok(serde_json::from_str(json)?)
    }
}
