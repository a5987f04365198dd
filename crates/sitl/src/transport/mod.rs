//! Datagram transports between the backend and the physics process.
//!
//! One datagram carries exactly one message in each direction. A transport
//! never blocks: [`DatagramTransport::poll_receive`] makes a single attempt
//! and reports [`RecvPoll::WouldBlock`] when nothing is queued, leaving the
//! waiting policy to the caller.

pub mod mock;
pub mod udp;

use std::io;
use std::net::SocketAddr;

pub use mock::MockTransport;
pub use udp::UdpTransport;

/// Outcome of a single non-blocking receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvPoll {
    /// A datagram of this many bytes was copied into the buffer.
    Datagram(usize),
    /// Nothing is queued right now.
    WouldBlock,
}

/// Non-blocking datagram endpoint aimed at a single remote peer.
pub trait DatagramTransport: Send {
    /// Send one datagram to the configured remote.
    ///
    /// Fails with [`io::ErrorKind::AddrNotAvailable`] when no remote is set.
    fn send(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Try once to receive a datagram into `buf`.
    ///
    /// Datagrams longer than `buf` are truncated.
    fn poll_receive(&mut self, buf: &mut [u8]) -> io::Result<RecvPoll>;

    /// Currently configured remote, if any.
    fn remote(&self) -> Option<SocketAddr>;

    /// Replace the remote used by later sends.
    fn set_remote(&mut self, remote: Option<SocketAddr>);
}

/// Whether a receive error leaves the transport unusable for later calls.
///
/// Transient conditions such as an ICMP-triggered `ConnectionRefused` or
/// `ConnectionReset` are left recoverable.
pub fn is_transport_lost(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe | io::ErrorKind::Unsupported
    )
}

pub(crate) fn no_remote_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::AddrNotAvailable,
        "no remote address configured",
    )
}
