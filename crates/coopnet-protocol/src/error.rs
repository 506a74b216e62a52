//! Error types for the protocol layer.
//!
//! Every variant except [`ProtocolError::Incomplete`] describes a frame
//! that will never decode no matter how many more bytes arrive. The
//! framing layer uses [`ProtocolError::is_recoverable`] to decide between
//! dropping one frame and giving up on the stream.

use crate::{PacketKind, Role};

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Fewer bytes are available than the frame needs. Not a failure:
    /// the caller should keep the bytes and wait for more.
    #[error("incomplete frame: need {needed} bytes, have {available}")]
    Incomplete { needed: usize, available: usize },

    /// The header names a packet type outside the known enumeration.
    #[error("unknown packet type {0}")]
    UnknownPacketType(u16),

    /// The frame is complete but its contents disagree with the static
    /// layout of its packet kind.
    #[error("malformed {kind} packet: {reason}")]
    MalformedPacket { kind: PacketKind, reason: String },

    /// The frame is larger than [`MAX_FRAME_SIZE`](crate::MAX_FRAME_SIZE).
    #[error("frame of {size} bytes exceeds maximum of {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// A string cannot be described by a 16-bit length prefix.
    #[error("string of {len} bytes in {kind} packet is too long")]
    StringTooLong { kind: PacketKind, len: usize },

    /// The packet's direction contradicts the local role.
    #[error("{kind} packet is not accepted in {role} role")]
    RoleViolation { kind: PacketKind, role: Role },
}

impl ProtocolError {
    /// Returns `true` if the offending frame can be skipped and the stream
    /// still parsed afterwards.
    ///
    /// `FrameTooLarge` is not recoverable: the declared length can't be
    /// trusted, so there is no safe place to resume.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownPacketType(_)
                | Self::MalformedPacket { .. }
                | Self::RoleViolation { .. }
        )
    }
}
