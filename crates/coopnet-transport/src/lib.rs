//! Transport abstraction layer for Coopnet.
//!
//! Provides the [`Transport`] trait: a non-blocking byte stream that can
//! be written to, polled for bytes, and closed. Everything above this
//! crate speaks in frames; everything in it speaks in bytes.
//!
//! All progress is made by explicit calls. [`Transport::try_read`] never
//! blocks: when nothing is buffered it returns [`ReadOutcome::WouldBlock`]
//! immediately, which callers treat as "no data this tick".
//!
//! # Feature Flags
//!
//! - `tcp` (default): [`TcpTransport`] over a non-blocking `TcpStream`

mod error;
mod memory;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
pub use memory::{FaultInjector, MemoryTransport};
#[cfg(feature = "tcp")]
pub use tcp::{DEFAULT_STALL_TIMEOUT, TcpTransport};

/// The result of one non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were copied into the caller's buffer.
    ///
    /// `Data(0)` is a legal outcome and carries no meaning beyond
    /// "nothing arrived"; it is not an end-of-stream signal.
    Data(usize),

    /// Nothing is buffered right now. Try again next tick.
    WouldBlock,
}

/// A single byte stream that can send and poll for bytes.
pub trait Transport: Send + 'static {
    /// Writes the whole buffer to the remote side.
    ///
    /// Either every byte is handed to the stream or an error is returned.
    /// There is no automatic retry after an error.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Copies whatever bytes are available into `buf` without blocking.
    fn try_read(
        &mut self,
        buf: &mut [u8],
    ) -> Result<ReadOutcome, TransportError>;

    /// Closes the stream. Closing an already-closed transport is a no-op.
    fn close(&mut self) -> Result<(), TransportError>;

    /// Returns `true` until [`close`](Self::close) has been called.
    fn is_open(&self) -> bool;
}
