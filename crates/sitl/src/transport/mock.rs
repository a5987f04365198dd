//! Scripted transport for host tests.
//!
//! Each call to `poll_receive` pops the next scripted event; once the script
//! is exhausted every poll reports [`RecvPoll::WouldBlock`]. Clones share
//! state, so a test keeps one handle while the backend owns another.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{no_remote_error, DatagramTransport, RecvPoll};

#[derive(Debug, Clone)]
enum Scripted {
    Datagram(Vec<u8>),
    Empty,
    Error(io::ErrorKind),
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Scripted>,
    sent: Vec<Vec<u8>>,
    send_error: Option<io::ErrorKind>,
    polls: usize,
}

/// In-memory [`DatagramTransport`] driven by a script of receive events.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    remote: Option<SocketAddr>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panic in another test thread must not cascade here.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a datagram for a later poll.
    pub fn push_datagram(&self, payload: impl Into<Vec<u8>>) {
        self.state()
            .script
            .push_back(Scripted::Datagram(payload.into()));
    }

    /// Queue `count` polls that find nothing.
    pub fn push_empty(&self, count: usize) {
        let mut state = self.state();
        for _ in 0..count {
            state.script.push_back(Scripted::Empty);
        }
    }

    /// Queue a receive error.
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.state().script.push_back(Scripted::Error(kind));
    }

    /// Make every later send fail with `kind`, or succeed again with `None`.
    pub fn fail_sends(&self, kind: Option<io::ErrorKind>) {
        self.state().send_error = kind;
    }

    /// Every payload sent so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state().sent.clone()
    }

    /// Number of scripted events not yet consumed.
    pub fn pending(&self) -> usize {
        self.state().script.len()
    }

    /// Number of `poll_receive` calls made so far.
    pub fn polls(&self) -> usize {
        self.state().polls
    }
}

impl DatagramTransport for MockTransport {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        if self.remote.is_none() {
            return Err(no_remote_error());
        }
        let mut state = self.state();
        if let Some(kind) = state.send_error {
            return Err(io::Error::from(kind));
        }
        state.sent.push(payload.to_vec());
        Ok(())
    }

    fn poll_receive(&mut self, buf: &mut [u8]) -> io::Result<RecvPoll> {
        let mut state = self.state();
        state.polls += 1;
        match state.script.pop_front() {
            Some(Scripted::Datagram(payload)) => {
                let len = payload.len().min(buf.len());
                buf[..len].copy_from_slice(&payload[..len]);
                Ok(RecvPoll::Datagram(len))
            }
            Some(Scripted::Error(kind)) => Err(io::Error::from(kind)),
            Some(Scripted::Empty) | None => Ok(RecvPoll::WouldBlock),
        }
    }

    fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    fn set_remote(&mut self, remote: Option<SocketAddr>) {
        self.remote = remote;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_consumed_in_order() {
        let mut transport = MockTransport::new();
        transport.push_empty(1);
        transport.push_datagram(b"abc".to_vec());
        transport.push_error(io::ErrorKind::ConnectionReset);

        let mut buf = [0u8; 8];
        assert_eq!(
            transport.poll_receive(&mut buf).unwrap(),
            RecvPoll::WouldBlock
        );
        assert_eq!(
            transport.poll_receive(&mut buf).unwrap(),
            RecvPoll::Datagram(3)
        );
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(
            transport.poll_receive(&mut buf).unwrap_err().kind(),
            io::ErrorKind::ConnectionReset
        );
        assert_eq!(
            transport.poll_receive(&mut buf).unwrap(),
            RecvPoll::WouldBlock
        );
        assert_eq!(transport.polls(), 4);
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn oversized_datagram_is_truncated() {
        let mut transport = MockTransport::new();
        transport.push_datagram(vec![7u8; 16]);
        let mut buf = [0u8; 4];
        assert_eq!(
            transport.poll_receive(&mut buf).unwrap(),
            RecvPoll::Datagram(4)
        );
    }

    #[test]
    fn clones_share_sent_log() {
        let observer = MockTransport::new();
        let mut transport = observer.clone();
        transport.set_remote(Some("127.0.0.1:9002".parse().unwrap()));
        transport.send(&[1, 2, 3]).unwrap();
        assert_eq!(observer.sent(), vec![vec![1, 2, 3]]);

        observer.fail_sends(Some(io::ErrorKind::PermissionDenied));
        assert!(transport.send(&[4]).is_err());
        assert_eq!(observer.sent().len(), 1);
    }

    #[test]
    fn send_requires_remote() {
        let mut transport = MockTransport::new();
        assert_eq!(
            transport.send(&[0]).unwrap_err().kind(),
            io::ErrorKind::AddrNotAvailable
        );
    }
}
