//! Unified error type for the Coopnet client.

use coopnet_protocol::ProtocolError;
use coopnet_session::SessionError;
use coopnet_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `coopnet` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CoopnetError {
    /// A transport-level error (connect, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, framing).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (connection state, peer table).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration document could not be parsed.
    #[cfg(feature = "json")]
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use coopnet_protocol::UserId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionReset("gone".into());
        let coopnet_err: CoopnetError = err.into();
        assert!(matches!(coopnet_err, CoopnetError::Transport(_)));
        assert!(coopnet_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownPacketType(99);
        let coopnet_err: CoopnetError = err.into();
        assert!(matches!(coopnet_err, CoopnetError::Protocol(_)));
        assert_eq!(coopnet_err.to_string(), "unknown packet type 99");
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::PeerNotFound(UserId(3));
        let coopnet_err: CoopnetError = err.into();
        assert!(matches!(coopnet_err, CoopnetError::Session(_)));
        assert_eq!(coopnet_err.to_string(), "peer U-3 not found");
    }
}
