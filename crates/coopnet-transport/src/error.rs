/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the stream failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The remote side reset the stream (reset, broken pipe, aborted).
    #[error("connection reset: {0}")]
    ConnectionReset(String),

    /// The remote stopped draining the stream and the write could not
    /// finish in time. Part of the buffer may already be on the wire, so
    /// the stream is no longer usable.
    #[error("write stalled after {written} of {total} bytes")]
    WriteStalled { written: usize, total: usize },

    /// The transport was already closed locally.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Maps an I/O error from a write into the transport taxonomy.
    pub fn from_send(err: std::io::Error) -> Self {
        if is_reset(&err) {
            Self::ConnectionReset(err.to_string())
        } else {
            Self::SendFailed(err)
        }
    }

    /// Maps an I/O error from a read into the transport taxonomy.
    pub fn from_receive(err: std::io::Error) -> Self {
        if is_reset(&err) {
            Self::ConnectionReset(err.to_string())
        } else {
            Self::ReceiveFailed(err)
        }
    }

    /// Returns `true` if the remote side tore the stream down.
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::ConnectionReset(_))
    }
}

fn is_reset(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionAborted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_from_send_broken_pipe_is_reset() {
        let err = TransportError::from_send(Error::from(ErrorKind::BrokenPipe));
        assert!(err.is_reset());
    }

    #[test]
    fn test_from_receive_connection_reset_is_reset() {
        let err = TransportError::from_receive(Error::from(
            ErrorKind::ConnectionReset,
        ));
        assert!(err.is_reset());
    }

    #[test]
    fn test_from_receive_other_error_is_receive_failed() {
        let err = TransportError::from_receive(Error::from(
            ErrorKind::InvalidData,
        ));
        assert!(matches!(err, TransportError::ReceiveFailed(_)));
        assert!(!err.is_reset());
    }
}
