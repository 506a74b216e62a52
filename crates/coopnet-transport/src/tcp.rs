//! TCP transport implementation using a non-blocking `std::net::TcpStream`.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use crate::{ReadOutcome, Transport, TransportError};

/// How long a write waits for a full kernel send buffer to drain.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_millis(100);

/// A [`Transport`] over a TCP stream in non-blocking mode.
///
/// Writes never wait longer than the stall timeout. A remote that stops
/// reading costs its own connection, not the caller's tick.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer_addr: Option<SocketAddr>,
    stall_timeout: Duration,
}

impl TcpTransport {
    /// Resolves `host`, connects to it and switches the socket to
    /// non-blocking mode.
    pub fn open(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect((host, port)).map_err(|source| {
            TransportError::ConnectFailed {
                addr: addr.clone(),
                source,
            }
        })?;
        let transport = Self::from_stream(stream).map_err(|e| match e {
            TransportError::SendFailed(source) => {
                TransportError::ConnectFailed { addr: addr.clone(), source }
            }
            other => other,
        })?;
        tracing::info!(%addr, "TCP transport connected");
        Ok(transport)
    }

    /// Wraps an already-connected stream (e.g. one accepted by a listener).
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        stream
            .set_nonblocking(true)
            .map_err(TransportError::SendFailed)?;
        // Frames are small and latency matters more than batching.
        stream.set_nodelay(true).map_err(TransportError::SendFailed)?;
        let peer_addr = stream.peer_addr().ok();
        Ok(Self {
            stream: Some(stream),
            peer_addr,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        })
    }

    /// Sets how long a write may wait on a full send buffer before it
    /// fails with [`TransportError::WriteStalled`].
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Returns the remote address, if the socket reported one.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
}

impl Transport for TcpTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let mut written = 0;
        let mut stalled_since: Option<Instant> = None;
        while written < data.len() {
            match stream.write(&data[written..]) {
                Ok(0) => {
                    return Err(TransportError::ConnectionReset(
                        "stream accepted zero bytes".into(),
                    ));
                }
                Ok(n) => {
                    written += n;
                    stalled_since = None;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    let since = *stalled_since.get_or_insert_with(Instant::now);
                    if since.elapsed() >= self.stall_timeout {
                        tracing::warn!(
                            peer_addr = ?self.peer_addr,
                            written,
                            total = data.len(),
                            "TCP write stalled"
                        );
                        return Err(TransportError::WriteStalled {
                            written,
                            total: data.len(),
                        });
                    }
                    std::thread::yield_now();
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::from_send(e)),
            }
        }
        Ok(())
    }

    fn try_read(
        &mut self,
        buf: &mut [u8],
    ) -> Result<ReadOutcome, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        match stream.read(buf) {
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(ReadOutcome::WouldBlock)
            }
            Err(e) => Err(TransportError::from_receive(e)),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(stream) = self.stream.take() {
            match stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                // The remote already went away; the socket is closed on drop.
                Err(e) if e.kind() == ErrorKind::NotConnected => {}
                Err(e) => return Err(TransportError::SendFailed(e)),
            }
            tracing::debug!(peer_addr = ?self.peer_addr, "TCP transport closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
