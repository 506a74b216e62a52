//! In-process loopback transport.
//!
//! [`MemoryTransport::pair`] returns two connected ends: bytes written to
//! one end become readable on the other, in order, exactly like a stream
//! socket. Reads never block and return whatever is buffered up to the
//! caller's buffer size, so a frame written in several pieces is also
//! read in several pieces.
//!
//! Each end carries a [`FaultInjector`] that tests (or a simulator) can
//! hold on to after the transport itself has been moved into a
//! connection, to force write failures or a reset on the next read.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{ReadOutcome, Transport, TransportError};

#[derive(Debug, Default)]
struct Pipe {
    bytes: VecDeque<u8>,
    /// Set when the end that writes into this pipe has closed.
    writer_closed: bool,
}

#[derive(Debug, Default)]
struct Faults {
    fail_writes: bool,
    reset_next_read: bool,
}

/// Handle for injecting failures into one end of a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct FaultInjector {
    faults: Arc<Mutex<Faults>>,
}

impl FaultInjector {
    /// Makes every subsequent write on this end fail with a broken pipe.
    pub fn fail_writes(&self, fail: bool) {
        self.faults.lock().fail_writes = fail;
    }

    /// Makes the next read on this end report a connection reset.
    pub fn reset_next_read(&self) {
        self.faults.lock().reset_next_read = true;
    }
}

/// One end of an in-process byte stream.
#[derive(Debug)]
pub struct MemoryTransport {
    inbox: Arc<Mutex<Pipe>>,
    outbox: Arc<Mutex<Pipe>>,
    faults: Arc<Mutex<Faults>>,
    open: bool,
}

impl MemoryTransport {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Mutex::new(Pipe::default()));
        let b_to_a = Arc::new(Mutex::new(Pipe::default()));
        let a = Self {
            inbox: Arc::clone(&b_to_a),
            outbox: Arc::clone(&a_to_b),
            faults: Arc::default(),
            open: true,
        };
        let b = Self {
            inbox: a_to_b,
            outbox: b_to_a,
            faults: Arc::default(),
            open: true,
        };
        (a, b)
    }

    /// Returns a handle that controls failures on this end.
    pub fn faults(&self) -> FaultInjector {
        FaultInjector {
            faults: Arc::clone(&self.faults),
        }
    }

    /// Number of bytes written by the other end and not yet read here.
    pub fn pending(&self) -> usize {
        self.inbox.lock().bytes.len()
    }

    /// Drains everything the other end has written so far.
    ///
    /// Convenience for tests that inspect raw bytes instead of
    /// polling through [`Transport::try_read`].
    pub fn drain(&mut self) -> Vec<u8> {
        self.inbox.lock().bytes.drain(..).collect()
    }
}

impl Transport for MemoryTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        if self.faults.lock().fail_writes {
            return Err(TransportError::from_send(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
        }

        // The other end writes into our inbox; if it closed, nobody will
        // ever read what we send.
        if self.inbox.lock().writer_closed {
            return Err(TransportError::ConnectionReset(
                "remote end closed".into(),
            ));
        }

        self.outbox.lock().bytes.extend(data.iter().copied());
        Ok(())
    }

    fn try_read(
        &mut self,
        buf: &mut [u8],
    ) -> Result<ReadOutcome, TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        {
            let mut faults = self.faults.lock();
            if faults.reset_next_read {
                faults.reset_next_read = false;
                return Err(TransportError::from_receive(
                    std::io::Error::from(std::io::ErrorKind::ConnectionReset),
                ));
            }
        }

        let mut inbox = self.inbox.lock();
        if inbox.bytes.is_empty() {
            return Ok(ReadOutcome::WouldBlock);
        }
        let n = buf.len().min(inbox.bytes.len());
        for (slot, byte) in buf.iter_mut().zip(inbox.bytes.drain(..n)) {
            *slot = byte;
        }
        Ok(ReadOutcome::Data(n))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.open {
            self.open = false;
            self.outbox.lock().writer_closed = true;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // write() / try_read()
    // =====================================================================

    #[test]
    fn test_write_then_read_delivers_bytes_in_order() {
        let (mut a, mut b) = MemoryTransport::pair();
        a.write(b"hello").unwrap();
        a.write(b" world").unwrap();

        let mut buf = [0u8; 64];
        let outcome = b.try_read(&mut buf).unwrap();

        assert_eq!(outcome, ReadOutcome::Data(11));
        assert_eq!(&buf[..11], b"hello world");
    }

    #[test]
    fn test_try_read_empty_returns_would_block() {
        let (_a, mut b) = MemoryTransport::pair();
        let mut buf = [0u8; 8];
        assert_eq!(b.try_read(&mut buf).unwrap(), ReadOutcome::WouldBlock);
    }

    #[test]
    fn test_try_read_small_buffer_leaves_remainder() {
        let (mut a, mut b) = MemoryTransport::pair();
        a.write(&[1, 2, 3, 4, 5]).unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(b.try_read(&mut buf).unwrap(), ReadOutcome::Data(2));
        assert_eq!(buf, [1, 2]);
        assert_eq!(b.pending(), 3);
    }

    #[test]
    fn test_pair_is_bidirectional() {
        let (mut a, mut b) = MemoryTransport::pair();
        b.write(b"pong").unwrap();
        assert_eq!(a.drain(), b"pong");
        assert_eq!(b.pending(), 0);
    }

    // =====================================================================
    // close() and faults
    // =====================================================================

    #[test]
    fn test_write_after_remote_close_is_reset() {
        let (mut a, mut b) = MemoryTransport::pair();
        b.close().unwrap();

        let err = a.write(b"x").unwrap_err();
        assert!(err.is_reset());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut a, _b) = MemoryTransport::pair();
        a.close().unwrap();
        a.close().unwrap();
        assert!(!a.is_open());
        assert!(matches!(a.write(b"x"), Err(TransportError::Closed)));
    }

    #[test]
    fn test_fail_writes_reports_reset_without_delivering() {
        let (mut a, b) = MemoryTransport::pair();
        let faults = a.faults();
        faults.fail_writes(true);

        assert!(a.write(b"lost").unwrap_err().is_reset());
        assert_eq!(b.pending(), 0);

        faults.fail_writes(false);
        a.write(b"ok").unwrap();
        assert_eq!(b.pending(), 2);
    }

    #[test]
    fn test_reset_next_read_fires_once() {
        let (_a, mut b) = MemoryTransport::pair();
        b.faults().reset_next_read();

        let mut buf = [0u8; 4];
        assert!(b.try_read(&mut buf).unwrap_err().is_reset());
        assert_eq!(b.try_read(&mut buf).unwrap(), ReadOutcome::WouldBlock);
    }
}
