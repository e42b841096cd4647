//! Transport abstraction: any byte-oriented channel to the agent.
//!
//! Concrete implementations:
//! - UDP socket ([`UdpTransport`](crate::adapters::udp::UdpTransport))
//! - [`NullTransport`] for wiring checks
//!
//! [`LinkChannel`](super::channel::LinkChannel) is generic over `Transport`,
//! so a serial or TCP adapter needs no changes to the channel logic.

use crate::error::TransportError;

/// Byte-oriented transport channel.
pub trait Transport {
    /// Acquire the underlying resource.  Opening an open transport is a no-op.
    fn open(&mut self) -> Result<(), TransportError>;

    /// Release the underlying resource.  Closing a closed transport is a no-op.
    fn close(&mut self);

    /// Write `data`, returning the number of bytes written.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read into `buf`, waiting at most `timeout_ms`.
    /// Returns 0 when nothing arrived in time.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, TransportError>;
}

/// Discards all writes and never reads.
#[derive(Debug, Default)]
pub struct NullTransport {
    open: bool,
}

impl Transport for NullTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        Ok(data.len())
    }

    fn read(&mut self, _buf: &mut [u8], _timeout_ms: u32) -> Result<usize, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_transport_requires_open() {
        let mut t = NullTransport::default();
        assert_eq!(t.write(b"x"), Err(TransportError::NotOpen));
        t.open().unwrap();
        assert_eq!(t.write(b"abc"), Ok(3));
        let mut buf = [0u8; 4];
        assert_eq!(t.read(&mut buf, 10), Ok(0));
        t.close();
        assert_eq!(t.read(&mut buf, 10), Err(TransportError::NotOpen));
    }
}
