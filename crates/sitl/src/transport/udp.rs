use std::io;
use std::net::{SocketAddr, UdpSocket};

use log::trace;

use super::{no_remote_error, DatagramTransport, RecvPoll};

/// Non-blocking UDP socket sending to a fixed remote.
///
/// The socket is not connected, so replies are accepted from any source.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: Option<SocketAddr>,
}

impl UdpTransport {
    /// Bind to a specific local address in non-blocking mode.
    pub fn bind_to(local: SocketAddr, remote: Option<SocketAddr>) -> io::Result<Self> {
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, remote })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramTransport for UdpTransport {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        let remote = self.remote.ok_or_else(no_remote_error)?;
        let sent = self.socket.send_to(payload, remote)?;
        if sent != payload.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {sent} of {} bytes", payload.len()),
            ));
        }
        Ok(())
    }

    fn poll_receive(&mut self, buf: &mut [u8]) -> io::Result<RecvPoll> {
        match self.socket.recv_from(buf) {
            Ok((len, from)) => {
                trace!("RX {len} bytes from {from}");
                Ok(RecvPoll::Datagram(len))
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                Ok(RecvPoll::WouldBlock)
            }
            Err(e) => Err(e),
        }
    }

    fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    fn set_remote(&mut self, remote: Option<SocketAddr>) {
        self.remote = remote;
    }
}
