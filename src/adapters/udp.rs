//! UDP transport adapter.
//!
//! One datagram carries one or more link frames.  Reads block for at most
//! the requested timeout; a timeout is reported as 0 bytes, not an error.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use log::{debug, info};

use crate::error::TransportError;
use crate::link::transport::Transport;

pub struct UdpTransport {
    agent: String,
    bind: String,
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    pub fn new(agent: &str, bind: &str) -> Self {
        Self {
            agent: agent.to_owned(),
            bind: bind.to_owned(),
            socket: None,
            peer: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn resolve(addr: &str) -> Result<SocketAddr, TransportError> {
        addr.to_socket_addrs()
            .map_err(|_| TransportError::BadAddress)?
            .next()
            .ok_or(TransportError::BadAddress)
    }
}

impl Transport for UdpTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.socket.is_some() {
            return Ok(());
        }
        let peer = Self::resolve(&self.agent)?;
        let bind = Self::resolve(&self.bind)?;
        let socket = UdpSocket::bind(bind).map_err(|_| TransportError::OpenFailed)?;
        socket.connect(peer).map_err(|_| TransportError::OpenFailed)?;
        info!("UDP transport {} -> {}", bind, peer);
        self.socket = Some(socket);
        self.peer = Some(peer);
        Ok(())
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("UDP transport closed");
        }
        self.peer = None;
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotOpen)?;
        socket.send(data).map_err(|_| TransportError::WriteFailed)
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotOpen)?;
        // A zero timeout would mean "block forever" to the socket.
        let timeout = Duration::from_millis(u64::from(timeout_ms.max(1)));
        socket
            .set_read_timeout(Some(timeout))
            .map_err(|_| TransportError::ReadFailed)?;
        match socket.recv(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(0),
            // ICMP port unreachable from a missing agent surfaces here.
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => Ok(0),
            Err(_) => Err(TransportError::ReadFailed),
        }
    }
}
