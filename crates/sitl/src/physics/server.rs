//! Async UDP peer serving a [`PointMassModel`].
//!
//! Answers each control frame with one telemetry datagram sent back to the
//! frame's source address. Optionally precedes every n-th reply with a
//! malformed datagram so clients can be checked for recovery.

use std::future::Future;
use std::net::SocketAddr;

use log::{debug, info, warn};
use simlink_core::ControlFrame;
use tokio::net::UdpSocket;

use super::model::PointMassModel;
use crate::error::SimulatorError;

/// Payload used for injected malformed replies.
pub const GARBAGE_DATAGRAM: &[u8] = b"{\"timestamp\": 0, \"imu\": ";

/// Options for [`PhysicsServer`].
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Send a malformed datagram before every n-th reply.
    pub garbage_every: Option<u32>,
}

/// Counters kept by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerStats {
    /// Valid control frames received.
    pub frames: u64,
    /// Datagrams that were not control frames.
    pub invalid: u64,
    /// Malformed replies injected.
    pub garbage_sent: u64,
}

pub struct PhysicsServer {
    socket: UdpSocket,
    model: PointMassModel,
    options: ServerOptions,
    stats: ServerStats,
    recv_buf: Vec<u8>,
}

impl PhysicsServer {
    /// Bind the server socket.
    pub async fn bind(
        addr: SocketAddr,
        model: PointMassModel,
        options: ServerOptions,
    ) -> Result<Self, SimulatorError> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Physics server listening on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            model,
            options,
            stats: ServerStats::default(),
            recv_buf: vec![0u8; 2048],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SimulatorError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    pub fn model(&self) -> &PointMassModel {
        &self.model
    }

    /// Wait for one datagram and answer it if it is a control frame.
    ///
    /// Returns `true` when a reply was sent.
    pub async fn serve_one(&mut self) -> Result<bool, SimulatorError> {
        let (len, from) = self.socket.recv_from(&mut self.recv_buf).await?;
        let frame = match ControlFrame::decode(&self.recv_buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.invalid += 1;
                warn!("Ignoring {len} bytes from {from}: {e}");
                return Ok(false);
            }
        };
        self.stats.frames += 1;

        if let Some(every) = self.options.garbage_every.filter(|&n| n > 0) {
            if self.stats.frames % u64::from(every) == 0 {
                self.socket.send_to(GARBAGE_DATAGRAM, from).await?;
                self.stats.garbage_sent += 1;
                debug!("Injected malformed reply to {from}");
            }
        }

        let record = self.model.step(&frame);
        self.socket.send_to(record.to_json().as_bytes(), from).await?;
        debug!(
            "frame {} from {from}: alt={:.3} t={:.3}",
            frame.frame_count,
            self.model.altitude(),
            record.timestamp
        );
        Ok(true)
    }

    /// Serve until `shutdown` completes or the socket fails.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<ServerStats, SimulatorError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(
                        "Physics server stopping after {} frames ({} invalid)",
                        self.stats.frames, self.stats.invalid
                    );
                    return Ok(self.stats);
                }
                result = self.serve_one() => {
                    result?;
                }
            }
        }
    }
}

impl std::fmt::Debug for PhysicsServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsServer")
            .field("local_addr", &self.socket.local_addr().ok())
            .field("stats", &self.stats)
            .field("model", &self.model)
            .finish()
    }
}
