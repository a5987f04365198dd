use simlink_core::{BackendParams, MockTime, TelemetryRecord};
use simlink_sitl::{
    ActuatorCommands, BackendCapabilities, BackendStatus, FaultReason, JsonBackend,
    MockTransport, PhysicsBackend,
};

/// Minimal mock backend for testing trait object safety.
struct MockBackend {
    name: String,
    frame_rate: u16,
    frame_count: u32,
}

impl MockBackend {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frame_rate: 50,
            frame_count: 0,
        }
    }
}

impl PhysicsBackend for MockBackend {
    fn backend_type(&self) -> &'static str {
        "mock"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn iterate(&mut self, actuators: &ActuatorCommands) -> Option<TelemetryRecord> {
        self.frame_count += 1;
        Some(TelemetryRecord {
            timestamp: f64::from(self.frame_count) / f64::from(self.frame_rate),
            velocity: [actuators.channels[0], 0.0, 0.0],
            ..TelemetryRecord::default()
        })
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
        BackendStatus::Good
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }
}

#[test]
fn trait_is_object_safe() {
    // This test verifies that PhysicsBackend can be used as a trait object.
    let mut backend: Box<dyn PhysicsBackend> = Box::new(MockBackend::new("test"));
    assert_eq!(backend.backend_type(), "mock");
    assert_eq!(backend.name(), "test");
    assert!(backend.is_good());

    backend.set_frame_rate(100);
    let record = backend.iterate(&ActuatorCommands::uniform(0.25)).unwrap();
    assert_eq!(record.timestamp, 0.01);
    assert_eq!(record.velocity[0], 0.25);
    assert_eq!(backend.frame_count(), 1);
}

#[test]
fn backends_are_interchangeable() {
    let transport = MockTransport::new();
    let json = JsonBackend::with_transport(
        "json",
        BackendParams {
            telem_timeout: 0.1,
            ..BackendParams::default()
        },
        transport.clone(),
        MockTime::new(),
    );

    let mut backends: Vec<Box<dyn PhysicsBackend>> =
        vec![Box::new(MockBackend::new("mock")), Box::new(json)];

    let results: Vec<bool> = backends
        .iter_mut()
        .map(|b| b.iterate(&ActuatorCommands::neutral()).is_some())
        .collect();

    // The JSON backend has nobody answering
    assert_eq!(results, vec![true, false]);
    assert_eq!(backends[1].frame_count(), 0);
    assert!(backends[1].is_good());
    assert_eq!(transport.sent().len(), 1);
}

#[test]
fn backend_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<JsonBackend>();
    assert_send::<JsonBackend<MockTransport, MockTime>>();
    assert_send::<Box<dyn PhysicsBackend>>();
}

#[test]
fn actuator_commands_derives() {
    let a = ActuatorCommands::uniform(0.5);
    let b = a;
    assert_eq!(a, b);
    assert_ne!(a, ActuatorCommands::neutral());
    assert_eq!(ActuatorCommands::default(), ActuatorCommands::neutral());

    let debug_str = format!("{:?}", a);
    assert!(debug_str.contains("0.5"));
}

#[test]
fn backend_status_derives() {
    let faulted = BackendStatus::Faulted(FaultReason::SocketInit);
    assert_eq!(faulted, BackendStatus::Faulted(FaultReason::SocketInit));
    assert_ne!(faulted, BackendStatus::Faulted(FaultReason::Bind));
    assert!(BackendStatus::Good.is_good());
    assert!(!faulted.is_good());
    assert!(format!("{}", faulted).contains("socket"));
}

#[test]
fn backend_capabilities_default() {
    let caps = BackendCapabilities::default();
    assert!(caps.sensors.imu);
    assert!(caps.sensors.position);
    assert!(caps.sensors.velocity);
    assert!(caps.sensors.attitude);
    assert_eq!(caps.actuator_channels, 16);
    assert_eq!(caps.max_rate_hz, 1000);
    assert!(caps.lockstep);
}
