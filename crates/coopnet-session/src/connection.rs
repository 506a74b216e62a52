//! A framed connection: one transport plus the inbound buffer that turns
//! a byte stream back into packets.
//!
//! Sends are write-through: each call encodes one frame and hands it to
//! the transport in a single write. Receives are poll-driven: each call
//! performs one non-blocking read, appends the bytes to the inbound
//! buffer, and peels complete frames off the front.
//!
//! # State machine
//!
//! ```text
//! begin() ──→ [Connected] ──(disconnect() or fatal error)──→ [Disconnected]
//! ```
//!
//! There is no way back: reconnecting means building a new `Connection`.

use bytes::BytesMut;
use coopnet_protocol::{
    FrameHeader, MAX_FRAME_SIZE, Packet, ProtocolError, Role, check_role,
    decode, encode_into,
};
use coopnet_transport::{ReadOutcome, Transport, TransportError};

use crate::SessionError;

/// Upper bound on the scratch buffer for one transport read.
pub const MAX_READ_CHUNK: usize = u16::MAX as usize;

// ---------------------------------------------------------------------------
// ConnectionState / ConnectionStats
// ---------------------------------------------------------------------------

/// Whether the connection still owns a live transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Running counters for one connection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Frames (or raw buffers) written to the transport.
    pub frames_sent: u64,
    /// Frames decoded and accepted.
    pub frames_received: u64,
    /// Complete frames that were skipped (unknown, malformed, wrong role).
    pub frames_dropped: u64,
    /// Bytes written to the transport.
    pub bytes_sent: u64,
    /// Bytes read from the transport.
    pub bytes_received: u64,
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// One transport and the framing state around it.
#[derive(Debug)]
pub struct Connection<T: Transport> {
    /// `None` once disconnected; the transport is closed and dropped.
    transport: Option<T>,
    role: Role,
    label: String,
    /// Bytes received but not yet resolved into a complete frame.
    inbound: BytesMut,
    /// Scratch space for one transport read.
    scratch: Vec<u8>,
    /// Reused for encoding outgoing frames.
    outbound: BytesMut,
    stats: ConnectionStats,
}

impl<T: Transport> Connection<T> {
    /// Wraps an established transport. The connection starts Connected.
    ///
    /// `role` decides which packets are accepted: a [`Role::Client`]
    /// connection only accepts server packets, and vice versa.
    pub fn begin(transport: T, role: Role) -> Self {
        Self {
            transport: Some(transport),
            role,
            label: String::from("connection"),
            inbound: BytesMut::with_capacity(MAX_FRAME_SIZE),
            scratch: vec![0; MAX_FRAME_SIZE],
            outbound: BytesMut::with_capacity(MAX_FRAME_SIZE),
            stats: ConnectionStats::default(),
        }
    }

    /// Sets the name used in log lines (e.g. `"control"` or a user id).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets how many bytes one [`receive`](Self::receive) reads at most,
    /// clamped to `1..=MAX_READ_CHUNK`.
    pub fn with_read_chunk(mut self, size: usize) -> Self {
        self.scratch = vec![0; size.clamp(1, MAX_READ_CHUNK)];
        self
    }

    pub fn state(&self) -> ConnectionState {
        if self.transport.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Number of received bytes still waiting for the rest of their frame.
    pub fn buffered(&self) -> usize {
        self.inbound.len()
    }

    /// Encodes `packet` and writes the frame in one transport write.
    ///
    /// An encode failure leaves the connection untouched. A transport
    /// failure tears the connection down and is returned to the caller;
    /// nothing is retried.
    pub fn send(&mut self, packet: &Packet) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.outbound.clear();
        encode_into(packet, &mut self.outbound)?;

        let frame = std::mem::take(&mut self.outbound);
        let result = self.write(&frame);
        self.outbound = frame;
        result?;

        tracing::debug!(conn = %self.label, kind = %packet.kind(), "frame sent");
        Ok(())
    }

    /// Writes already-encoded bytes (one or more frames, or an opaque
    /// application buffer) in one transport write.
    pub fn send_bytes(&mut self, data: &[u8]) -> Result<(), SessionError> {
        self.write(data)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), SessionError> {
        let transport =
            self.transport.as_mut().ok_or(SessionError::NotConnected)?;
        if let Err(e) = transport.write(data) {
            self.fail(&e);
            return Err(e.into());
        }
        self.stats.frames_sent += 1;
        self.stats.bytes_sent += data.len() as u64;
        Ok(())
    }

    /// Polls the transport once and returns every complete, accepted
    /// packet now available, in arrival order.
    ///
    /// - Nothing to read (would-block or a zero-byte read) is not an error.
    /// - Unknown, malformed and wrong-direction frames are dropped and
    ///   logged; parsing continues with the next frame.
    /// - A read error, or a header announcing a frame larger than
    ///   [`MAX_FRAME_SIZE`], disconnects and returns the error.
    pub fn receive(&mut self) -> Result<Vec<Packet>, SessionError> {
        let transport =
            self.transport.as_mut().ok_or(SessionError::NotConnected)?;

        match transport.try_read(&mut self.scratch) {
            Ok(ReadOutcome::Data(0)) | Ok(ReadOutcome::WouldBlock) => {}
            Ok(ReadOutcome::Data(n)) => {
                self.inbound.extend_from_slice(&self.scratch[..n]);
                self.stats.bytes_received += n as u64;
            }
            Err(e) => {
                self.fail(&e);
                return Err(e.into());
            }
        }

        self.drain_frames()
    }

    /// Peels complete frames off the front of the inbound buffer.
    fn drain_frames(&mut self) -> Result<Vec<Packet>, SessionError> {
        let mut packets = Vec::new();

        while let Some(header) = FrameHeader::peek(&self.inbound) {
            let frame_len = header.frame_len();
            if frame_len > MAX_FRAME_SIZE {
                // Hand over what already decoded; the bad header stays at
                // the front and fails the next receive.
                if !packets.is_empty() {
                    break;
                }
                let err = ProtocolError::FrameTooLarge {
                    size: frame_len,
                    max: MAX_FRAME_SIZE,
                };
                tracing::warn!(
                    conn = %self.label,
                    error = %err,
                    "stream lost framing, disconnecting"
                );
                self.disconnect();
                return Err(err.into());
            }
            if self.inbound.len() < frame_len {
                break;
            }

            let frame = self.inbound.split_to(frame_len);
            let accepted = decode(&frame)
                .and_then(|packet| check_role(self.role, &packet).map(|()| packet));

            match accepted {
                Ok(packet) => {
                    self.stats.frames_received += 1;
                    tracing::debug!(
                        conn = %self.label,
                        kind = %packet.kind(),
                        "frame received"
                    );
                    packets.push(packet);
                }
                Err(e) => {
                    // Every non-recoverable error is caught by the size
                    // check above, so this frame can simply be skipped.
                    self.stats.frames_dropped += 1;
                    tracing::warn!(
                        conn = %self.label,
                        error = %e,
                        frame_len,
                        "dropping frame"
                    );
                }
            }
        }

        Ok(packets)
    }

    /// Closes the transport and clears the inbound buffer. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                tracing::debug!(conn = %self.label, error = %e, "close failed");
            }
            tracing::info!(conn = %self.label, "connection closed");
        }
        self.inbound.clear();
    }

    fn fail(&mut self, err: &TransportError) {
        tracing::warn!(conn = %self.label, error = %err, "transport failed");
        self.disconnect();
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// =========================================================================
// Tests
// =========================================================================
