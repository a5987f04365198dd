use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, error, info, warn};
use simlink_core::{
    decode_telemetry, BackendParams, ConfigStore, ControlFrame, DecodePolicy, MonotonicTime,
    TelemetryRecord, TimeSource,
};

use super::capabilities::{BackendCapabilities, SensorCapabilities};
use super::PhysicsBackend;
use crate::error::SimulatorError;
use crate::transport::{is_transport_lost, DatagramTransport, RecvPoll, UdpTransport};
use crate::types::{ActuatorCommands, BackendStatus, FaultReason};

/// Frame rate in Hz reported to the simulator until changed.
pub const DEFAULT_FRAME_RATE: u16 = 50;

/// Receive buffer size. Longer datagrams are truncated and fail to decode.
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Counters for the most recent exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExchangeStats {
    /// Receive attempts made.
    pub polls: u32,
    /// Datagrams received but rejected by the decoder.
    pub rejected: u32,
    /// Time spent waiting for telemetry.
    pub elapsed: Duration,
}

/// Backend speaking the binary-control / JSON-telemetry protocol.
///
/// Each exchange sends one 40-byte control frame and then polls the transport
/// until a valid telemetry datagram arrives or `telem_timeout` elapses.
/// Malformed datagrams are rejected without resending the frame, and only the
/// first valid datagram is consumed; anything queued behind it is left for the
/// next exchange.
pub struct JsonBackend<T: DatagramTransport = UdpTransport, C: TimeSource = MonotonicTime> {
    name: String,
    params: BackendParams,
    transport: Option<T>,
    time: C,
    status: BackendStatus,
    frame_rate: u16,
    frame_count: u32,
    recv_buf: Vec<u8>,
    last_exchange: ExchangeStats,
}

impl JsonBackend {
    /// Open a UDP backend on all interfaces with an ephemeral port.
    ///
    /// Socket failures do not abort construction; the backend starts
    /// faulted and every exchange fails. An unparsable address is logged and
    /// the backend runs without a remote until reconfigured.
    pub fn new(name: impl Into<String>, params: BackendParams) -> Self {
        Self::bind_to(name, any_local(), params)
    }

    /// Open a UDP backend on a specific local address.
    ///
    /// Fails the same way as [`JsonBackend::new`]: an address that cannot be
    /// bound gives a backend that is `Faulted(Bind)`.
    pub fn bind_to(name: impl Into<String>, local: SocketAddr, params: BackendParams) -> Self {
        let name = name.into();
        match open_socket(&name, local) {
            Ok(transport) => Self::with_transport(name, params, transport, MonotonicTime::new()),
            Err(e) => {
                let reason = socket_fault(&e);
                error!(
                    "{name}: failed to open UDP socket on {local}: {e}, backend unusable ({reason})"
                );
                Self::faulted(name, params, MonotonicTime::new(), reason)
            }
        }
    }

    /// Open a UDP backend, returning the socket error instead of faulting.
    pub fn try_new(
        name: impl Into<String>,
        params: BackendParams,
    ) -> Result<Self, SimulatorError> {
        let name = name.into();
        let transport = open_socket(&name, any_local()).map_err(|e| {
            error!("{name}: failed to open UDP socket: {e}");
            SimulatorError::SocketInit(e)
        })?;
        Ok(Self::with_transport(
            name,
            params,
            transport,
            MonotonicTime::new(),
        ))
    }

    /// Open a UDP backend configured from a section of `store`.
    pub fn from_store(name: impl Into<String>, store: &ConfigStore, section: &str) -> Self {
        Self::new(name, BackendParams::from_store(store, section))
    }
}

impl<T: DatagramTransport, C: TimeSource> JsonBackend<T, C> {
    /// Build a backend around an already opened transport.
    pub fn with_transport(
        name: impl Into<String>,
        params: BackendParams,
        mut transport: T,
        time: C,
    ) -> Self {
        let name = name.into();
        let remote = resolve_remote(&name, &params);
        transport.set_remote(remote);
        if let Some(addr) = remote {
            info!("{name}: sending control frames to {addr}");
        }
        Self {
            name,
            params,
            transport: Some(transport),
            time,
            status: BackendStatus::Good,
            frame_rate: DEFAULT_FRAME_RATE,
            frame_count: 0,
            recv_buf: vec![0u8; RECV_BUFFER_SIZE],
            last_exchange: ExchangeStats::default(),
        }
    }

    fn faulted(name: String, params: BackendParams, time: C, reason: FaultReason) -> Self {
        Self {
            name,
            params,
            transport: None,
            time,
            status: BackendStatus::Faulted(reason),
            frame_rate: DEFAULT_FRAME_RATE,
            frame_count: 0,
            recv_buf: vec![0u8; RECV_BUFFER_SIZE],
            last_exchange: ExchangeStats::default(),
        }
    }

    /// Perform one exchange and report exactly why it failed.
    ///
    /// `frame_count` advances only when a record is returned.
    pub fn exchange(
        &mut self,
        actuators: &ActuatorCommands,
    ) -> Result<TelemetryRecord, SimulatorError> {
        self.last_exchange = ExchangeStats::default();

        if let BackendStatus::Faulted(reason) = self.status {
            debug!("{}: exchange skipped, backend faulted ({reason})", self.name);
            return Err(SimulatorError::Faulted(reason));
        }
        let Some(transport) = self.transport.as_mut() else {
            return Err(SimulatorError::Faulted(FaultReason::TransportLost));
        };

        if transport.remote().is_none() {
            error!("{}: {}", self.name, SimulatorError::NoRemote);
            return Err(SimulatorError::NoRemote);
        }

        let frame =
            ControlFrame::from_actuators(&actuators.channels, self.frame_rate, self.frame_count);
        if let Err(e) = transport.send(&frame.encode()) {
            error!("{}: failed to send control frame: {e}", self.name);
            return Err(SimulatorError::Send(e));
        }

        let timeout_us =
            u64::try_from(self.params.telem_timeout_duration().as_micros()).unwrap_or(u64::MAX);
        let interval = self.params.receive_interval();
        let start = self.time.now_us();
        let mut stats = ExchangeStats::default();
        let mut lost = false;

        let result = loop {
            let elapsed = self.time.elapsed_since(start);
            if elapsed >= timeout_us {
                break Err(SimulatorError::Timeout {
                    elapsed: Duration::from_micros(elapsed),
                    rejected: stats.rejected,
                });
            }

            stats.polls += 1;
            match transport.poll_receive(&mut self.recv_buf) {
                Ok(RecvPoll::Datagram(len)) => match decode_telemetry(&self.recv_buf[..len]) {
                    Ok(record) => break Ok(record),
                    Err(e) => {
                        stats.rejected += 1;
                        warn!("{}: rejected telemetry datagram: {e}", self.name);
                        if self.params.decode_policy == DecodePolicy::FailFast {
                            break Err(SimulatorError::Decode(e));
                        }
                    }
                },
                Ok(RecvPoll::WouldBlock) => self.time.sleep(interval),
                Err(e) => {
                    error!("{}: receive failed: {e}", self.name);
                    lost = is_transport_lost(&e);
                    break Err(SimulatorError::Receive(e));
                }
            }
        };

        stats.elapsed = Duration::from_micros(self.time.elapsed_since(start));
        self.last_exchange = stats;

        if lost {
            self.status = BackendStatus::Faulted(FaultReason::TransportLost);
        }

        match &result {
            Ok(record) => {
                self.frame_count = self.frame_count.wrapping_add(1);
                debug!(
                    "{}: frame {} t={:.3} after {} polls",
                    self.name, self.frame_count, record.timestamp, stats.polls
                );
            }
            Err(e @ SimulatorError::Timeout { .. }) => warn!("{}: {e}", self.name),
            Err(_) => {}
        }

        result
    }

    /// Counters from the most recent exchange.
    pub fn last_exchange(&self) -> &ExchangeStats {
        &self.last_exchange
    }

    pub fn params(&self) -> &BackendParams {
        &self.params
    }

    /// Replace the parameters used by later exchanges.
    ///
    /// The remote address is re-resolved; counters and fault state are kept.
    pub fn reconfigure(&mut self, params: BackendParams) {
        let remote = resolve_remote(&self.name, &params);
        if let Some(transport) = self.transport.as_mut() {
            transport.set_remote(remote);
        }
        info!(
            "{}: reconfigured (remote {}, timeout {:.3}s)",
            self.name,
            remote.map_or_else(|| "none".to_string(), |a| a.to_string()),
            params.telem_timeout
        );
        self.params = params;
    }

    /// Move the transport and session state into a new backend.
    ///
    /// `self` is left `Faulted(MovedOut)` and fails every later exchange.
    pub fn take(&mut self) -> Self {
        let moved = Self {
            name: self.name.clone(),
            params: self.params.clone(),
            transport: self.transport.take(),
            time: self.time.clone(),
            status: self.status,
            frame_rate: self.frame_rate,
            frame_count: self.frame_count,
            recv_buf: vec![0u8; RECV_BUFFER_SIZE],
            last_exchange: self.last_exchange,
        };
        self.status = BackendStatus::Faulted(FaultReason::MovedOut);
        moved
    }

    /// Borrow the transport, if the backend still owns one.
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }
}

impl<T: DatagramTransport, C: TimeSource> PhysicsBackend for JsonBackend<T, C> {
    fn backend_type(&self) -> &'static str {
        "json"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn iterate(&mut self, actuators: &ActuatorCommands) -> Option<TelemetryRecord> {
        self.exchange(actuators).ok()
    }

    fn set_frame_rate(&mut self, hz: u16) {
        self.frame_rate = hz;
    }

    fn frame_rate(&self) -> u16 {
        self.frame_rate
    }

    fn frame_count(&self) -> u32 {
        self.frame_count
    }

    fn status(&self) -> BackendStatus {
        self.status
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            sensors: SensorCapabilities::default(),
            ..BackendCapabilities::default()
        }
    }
}

impl<T: DatagramTransport, C: TimeSource> std::fmt::Debug for JsonBackend<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonBackend")
            .field("name", &self.name)
            .field("remote", &self.transport.as_ref().and_then(|t| t.remote()))
            .field("status", &self.status)
            .field("frame_rate", &self.frame_rate)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

fn any_local() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 0))
}

fn open_socket(name: &str, local: SocketAddr) -> io::Result<UdpTransport> {
    let transport = UdpTransport::bind_to(local, None)?;
    if let Ok(bound) = transport.local_addr() {
        info!("{name}: bound UDP socket on {bound}");
    }
    Ok(transport)
}

/// Address errors mean the bind step failed; anything else is socket creation.
fn socket_fault(e: &io::Error) -> FaultReason {
    match e.kind() {
        io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::PermissionDenied => FaultReason::Bind,
        _ => FaultReason::SocketInit,
    }
}

fn resolve_remote(name: &str, params: &BackendParams) -> Option<SocketAddr> {
    match params.remote_addr() {
        Ok(addr) => Some(addr),
        Err(e) => {
            error!("{name}: {e}, control frames cannot be sent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use simlink_core::{DecodeError, MockTime, CONTROL_MAGIC};

    use super::*;
    use crate::transport::MockTransport;

    const VALID_JSON: &str = r#"{
        "timestamp": 0.1,
        "imu": { "gyro": [-1, -2, -3], "accel_body": [1, 2, 3] },
        "position": [100, 1000, -500],
        "velocity": [1, 10, -5],
        "quaternion": [1, 0.12, 0.34, 0.56]
    }"#;

    fn params(timeout: f64) -> BackendParams {
        BackendParams {
            telem_timeout: timeout,
            ..BackendParams::default()
        }
    }

    fn create_backend(
        timeout: f64,
    ) -> (JsonBackend<MockTransport, MockTime>, MockTransport, MockTime) {
        let transport = MockTransport::new();
        let time = MockTime::new();
        let backend = JsonBackend::with_transport(
            "test-json",
            params(timeout),
            transport.clone(),
            time.clone(),
        );
        (backend, transport, time)
    }

    fn expected_record() -> TelemetryRecord {
        TelemetryRecord {
            timestamp: 0.1,
            gyro: [-1.0, -2.0, -3.0],
            accel: [1.0, 2.0, 3.0],
            position: [100.0, 1000.0, -500.0],
            velocity: [1.0, 10.0, -5.0],
            quaternion: [1.0, 0.12, 0.34, 0.56],
        }
    }

    // --- Exchange tests ---

    #[test]
    fn test_initial_state() {
        let (backend, transport, _) = create_backend(1.0);
        assert!(backend.is_good());
        assert_eq!(backend.frame_rate(), DEFAULT_FRAME_RATE);
        assert_eq!(backend.frame_count(), 0);
        assert_eq!(backend.backend_type(), "json");
        assert_eq!(backend.name(), "test-json");
        assert_eq!(
            backend.transport().and_then(|t| t.remote()),
            Some("127.0.0.1:9002".parse().unwrap())
        );
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_timeout_leaves_frame_count() {
        let (mut backend, transport, time) = create_backend(1.0);

        let result = backend.exchange(&ActuatorCommands::neutral());

        match result {
            Err(SimulatorError::Timeout { elapsed, rejected }) => {
                assert!(elapsed >= Duration::from_secs(1));
                assert_eq!(rejected, 0);
            }
            other => panic!("Expected Timeout, got: {other:?}"),
        }
        assert_eq!(backend.frame_count(), 0);
        assert!(backend.is_good());
        assert_eq!(transport.sent().len(), 1);
        // 10 ms poll interval over a 1 s deadline
        assert_eq!(time.sleep_count(), 100);
        assert_eq!(backend.last_exchange().polls, 100);
    }

    #[test]
    fn test_valid_reply() {
        let (mut backend, transport, time) = create_backend(1.0);
        transport.push_datagram(VALID_JSON);

        let record = backend.iterate(&ActuatorCommands::neutral()).unwrap();

        assert_eq!(record, expected_record());
        assert_eq!(backend.frame_count(), 1);
        assert_eq!(time.sleep_count(), 0);
        assert_eq!(backend.last_exchange().polls, 1);
    }

    #[test]
    fn test_reply_after_empty_polls() {
        let (mut backend, transport, time) = create_backend(1.0);
        transport.push_empty(3);
        transport.push_datagram(VALID_JSON);

        assert!(backend.iterate(&ActuatorCommands::neutral()).is_some());
        assert_eq!(time.sleep_count(), 3);
        assert_eq!(time.now_us(), 30_000);
        assert_eq!(backend.last_exchange().elapsed, Duration::from_millis(30));
    }

    #[test]
    fn test_invalid_then_valid() {
        let (mut backend, transport, time) = create_backend(1.0);
        transport.push_datagram(&b"not json at all"[..]);
        transport.push_datagram(r#"{"timestamp": 1}"#);
        transport.push_datagram(VALID_JSON);

        let record = backend.iterate(&ActuatorCommands::neutral()).unwrap();

        assert_eq!(record, expected_record());
        assert_eq!(backend.frame_count(), 1);
        assert_eq!(backend.last_exchange().rejected, 2);
        // Rejections retry immediately and never resend
        assert_eq!(time.sleep_count(), 0);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_invalid_only_times_out_with_rejections() {
        let (mut backend, transport, _) = create_backend(0.05);
        transport.push_datagram(r#"{"timestamp": 1, "position": [0, 0, 0]}"#);

        match backend.exchange(&ActuatorCommands::neutral()) {
            Err(SimulatorError::Timeout { rejected, .. }) => assert_eq!(rejected, 1),
            other => panic!("Expected Timeout, got: {other:?}"),
        }
        assert_eq!(backend.frame_count(), 0);
    }

    #[test]
    fn test_fail_fast_policy() {
        let (mut backend, transport, _) = create_backend(1.0);
        backend.reconfigure(BackendParams {
            decode_policy: DecodePolicy::FailFast,
            ..params(1.0)
        });
        transport.push_datagram(r#"{"timestamp": 1}"#);
        transport.push_datagram(VALID_JSON);

        match backend.exchange(&ActuatorCommands::neutral()) {
            Err(SimulatorError::Decode(DecodeError::MissingField("imu"))) => {}
            other => panic!("Expected Decode, got: {other:?}"),
        }
        // The valid datagram stays queued for the next exchange
        assert_eq!(transport.pending(), 1);
        assert!(backend.iterate(&ActuatorCommands::neutral()).is_some());
        assert_eq!(backend.frame_count(), 1);
    }

    #[test]
    fn test_only_first_valid_datagram_consumed() {
        let (mut backend, transport, _) = create_backend(1.0);
        transport.push_datagram(VALID_JSON);
        transport.push_datagram(VALID_JSON);

        assert!(backend.iterate(&ActuatorCommands::neutral()).is_some());
        assert_eq!(transport.pending(), 1);
    }

    #[test]
    fn test_sent_frame_contents() {
        let (mut backend, transport, _) = create_backend(1.0);
        backend.set_frame_rate(400);
        transport.push_datagram(VALID_JSON);

        let mut commands = ActuatorCommands::neutral();
        commands.channels[0] = 1.0;
        commands.channels[15] = -1.0;
        backend.iterate(&commands);
        backend.iterate(&commands);

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);

        let first = ControlFrame::decode(&sent[0]).unwrap();
        assert_eq!(u16::from_be_bytes([sent[0][0], sent[0][1]]), CONTROL_MAGIC);
        assert_eq!(first.frame_rate, 400);
        assert_eq!(first.frame_count, 0);
        assert_eq!(first.pwm[0], 2000);
        assert_eq!(first.pwm[1], 1500);
        assert_eq!(first.pwm[15], 1000);

        // Second exchange carries the advanced count
        let second = ControlFrame::decode(&sent[1]).unwrap();
        assert_eq!(second.frame_count, 1);
    }

    #[test]
    fn test_zero_timeout_sends_without_polling() {
        let (mut backend, transport, _) = create_backend(0.0);
        transport.push_datagram(VALID_JSON);

        assert!(matches!(
            backend.exchange(&ActuatorCommands::neutral()),
            Err(SimulatorError::Timeout { .. })
        ));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.polls(), 0);
    }

    // --- Failure handling tests ---

    #[test]
    fn test_send_failure_is_recoverable() {
        let (mut backend, transport, _) = create_backend(1.0);
        transport.fail_sends(Some(io::ErrorKind::PermissionDenied));

        assert!(matches!(
            backend.exchange(&ActuatorCommands::neutral()),
            Err(SimulatorError::Send(_))
        ));
        assert!(backend.is_good());
        assert_eq!(transport.polls(), 0);

        transport.fail_sends(None);
        transport.push_datagram(VALID_JSON);
        assert!(backend.iterate(&ActuatorCommands::neutral()).is_some());
    }

    #[test]
    fn test_transient_receive_error() {
        let (mut backend, transport, _) = create_backend(1.0);
        transport.push_error(io::ErrorKind::ConnectionRefused);

        assert!(matches!(
            backend.exchange(&ActuatorCommands::neutral()),
            Err(SimulatorError::Receive(_))
        ));
        assert!(backend.is_good());
        assert_eq!(backend.frame_count(), 0);
    }

    #[test]
    fn test_lost_transport_faults() {
        let (mut backend, transport, _) = create_backend(1.0);
        transport.push_error(io::ErrorKind::NotConnected);

        assert!(backend.iterate(&ActuatorCommands::neutral()).is_none());
        assert_eq!(
            backend.status(),
            BackendStatus::Faulted(FaultReason::TransportLost)
        );

        // Faulted backends do no I/O
        transport.push_datagram(VALID_JSON);
        assert!(matches!(
            backend.exchange(&ActuatorCommands::neutral()),
            Err(SimulatorError::Faulted(FaultReason::TransportLost))
        ));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_invalid_address_has_no_remote() {
        let transport = MockTransport::new();
        let mut backend = JsonBackend::with_transport(
            "bad-addr",
            BackendParams {
                addr: "localhost".to_string(),
                ..BackendParams::default()
            },
            transport.clone(),
            MockTime::new(),
        );

        assert!(backend.is_good());
        assert!(matches!(
            backend.exchange(&ActuatorCommands::neutral()),
            Err(SimulatorError::NoRemote)
        ));
        assert!(transport.sent().is_empty());

        backend.reconfigure(BackendParams::default());
        transport.push_datagram(VALID_JSON);
        assert!(backend.iterate(&ActuatorCommands::neutral()).is_some());
    }

    #[test]
    fn test_take_moves_session() {
        let (mut backend, transport, _) = create_backend(1.0);
        transport.push_datagram(VALID_JSON);
        backend.iterate(&ActuatorCommands::neutral());

        let mut moved = backend.take();

        assert_eq!(
            backend.status(),
            BackendStatus::Faulted(FaultReason::MovedOut)
        );
        assert!(backend.transport().is_none());
        assert!(matches!(
            backend.exchange(&ActuatorCommands::neutral()),
            Err(SimulatorError::Faulted(FaultReason::MovedOut))
        ));

        assert!(moved.is_good());
        assert_eq!(moved.frame_count(), 1);
        transport.push_datagram(VALID_JSON);
        assert!(moved.iterate(&ActuatorCommands::neutral()).is_some());
        assert_eq!(moved.frame_count(), 2);
    }

    #[test]
    fn test_frame_count_wraps() {
        let (mut backend, transport, _) = create_backend(1.0);
        backend.frame_count = u32::MAX;
        transport.push_datagram(VALID_JSON);
        assert!(backend.iterate(&ActuatorCommands::neutral()).is_some());
        assert_eq!(backend.frame_count(), 0);
    }

    #[test]
    fn test_socket_fault_reasons() {
        for kind in [
            io::ErrorKind::AddrInUse,
            io::ErrorKind::AddrNotAvailable,
            io::ErrorKind::PermissionDenied,
        ] {
            assert_eq!(socket_fault(&io::Error::from(kind)), FaultReason::Bind);
        }
        assert_eq!(
            socket_fault(&io::Error::from(io::ErrorKind::Other)),
            FaultReason::SocketInit
        );
    }

    #[test]
    fn test_faulted_backend_does_no_io() {
        let time = MockTime::new();
        let mut backend: JsonBackend<MockTransport, MockTime> = JsonBackend::faulted(
            "dead".to_string(),
            params(1.0),
            time.clone(),
            FaultReason::SocketInit,
        );

        assert_eq!(
            backend.status(),
            BackendStatus::Faulted(FaultReason::SocketInit)
        );
        assert!(backend.transport().is_none());
        assert!(backend.iterate(&ActuatorCommands::neutral()).is_none());
        assert_eq!(time.sleep_count(), 0);
        assert_eq!(backend.last_exchange().polls, 0);
        assert_eq!(backend.frame_count(), 0);
    }

    #[test]
    fn test_capabilities() {
        let (backend, _, _) = create_backend(1.0);
        let caps = backend.capabilities();
        assert!(caps.sensors.imu);
        assert!(caps.sensors.attitude);
        assert_eq!(caps.actuator_channels, 16);
        assert!(caps.lockstep);
    }
}
