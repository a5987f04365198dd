//! Vertical point-mass multicopter model.
//!
//! Thrust from the motor channels acts straight up against gravity in the
//! NED frame, with a hard ground plane at `down = 0`. The model steps once
//! per distinct frame count, so a repeated control frame returns the same
//! state without advancing time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simlink_core::protocol::pwm_to_normalized;
use simlink_core::{ControlFrame, TelemetryRecord};

/// Standard gravity in m/s².
const GRAVITY_MSS: f64 = 9.80665;

/// Step used when a frame requests 0 Hz.
const FALLBACK_RATE_HZ: u16 = 50;

/// Configuration for the point-mass model.
#[derive(Debug, Clone)]
pub struct PointMassConfig {
    /// Vehicle mass in kg.
    pub mass_kg: f64,
    /// Combined thrust of all motors at full throttle in N.
    pub max_thrust_n: f64,
    /// Number of leading channels treated as motors.
    pub motor_channels: usize,
    /// Accelerometer noise standard deviation in m/s².
    pub accel_noise_mss: f64,
    /// Gyroscope noise standard deviation in rad/s.
    pub gyro_noise_rads: f64,
    /// RNG seed for deterministic mode. None = random.
    pub seed: Option<u64>,
}

impl Default for PointMassConfig {
    fn default() -> Self {
        Self {
            mass_kg: 1.5,
            max_thrust_n: 30.0,
            motor_channels: 4,
            accel_noise_mss: 0.0,
            gyro_noise_rads: 0.0,
            seed: None,
        }
    }
}

impl PointMassConfig {
    /// Default configuration with typical MEMS sensor noise.
    pub fn noisy() -> Self {
        Self {
            accel_noise_mss: 0.1,
            gyro_noise_rads: 0.01,
            ..Self::default()
        }
    }

    /// Throttle fraction in [0, 1] that balances gravity.
    pub fn hover_throttle(&self) -> f64 {
        (self.mass_kg * GRAVITY_MSS / self.max_thrust_n).clamp(0.0, 1.0)
    }
}

/// Self-contained physics peer for exercising the bridge without an
/// external simulator.
pub struct PointMassModel {
    config: PointMassConfig,
    rng: StdRng,
    time_s: f64,
    position: [f64; 3],
    velocity: [f64; 3],
    last_frame: Option<u32>,
    last: TelemetryRecord,
    steps: u64,
}

impl PointMassModel {
    pub fn new(config: PointMassConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut model = Self {
            config,
            rng,
            time_s: 0.0,
            position: [0.0; 3],
            velocity: [0.0; 3],
            last_frame: None,
            last: TelemetryRecord::default(),
            steps: 0,
        };
        model.last = model.synthesize(0.0);
        model
    }

    /// Advance one frame and return the resulting telemetry.
    ///
    /// A frame whose count matches the previous one is treated as a resend
    /// and answered with the previous state.
    pub fn step(&mut self, frame: &ControlFrame) -> TelemetryRecord {
        if self.last_frame == Some(frame.frame_count) {
            return self.last;
        }
        self.last_frame = Some(frame.frame_count);

        let rate = if frame.frame_rate == 0 {
            FALLBACK_RATE_HZ
        } else {
            frame.frame_rate
        };
        let dt = 1.0 / f64::from(rate);

        let thrust_accel = self.throttle(frame) * self.config.max_thrust_n / self.config.mass_kg;
        self.integrate(GRAVITY_MSS - thrust_accel, dt);
        self.time_s += dt;
        self.steps += 1;

        self.last = self.synthesize(thrust_accel);
        self.last
    }

    /// Mean motor throttle in [0, 1].
    fn throttle(&self, frame: &ControlFrame) -> f64 {
        let motors = self.config.motor_channels.clamp(1, frame.pwm.len());
        let sum: f64 = frame.pwm[..motors]
            .iter()
            .map(|&pwm| (pwm_to_normalized(pwm) + 1.0) / 2.0)
            .sum();
        sum / motors as f64
    }

    /// Integrate vertical motion for one step. `accel_down` is in NED.
    fn integrate(&mut self, accel_down: f64, dt: f64) {
        self.velocity[2] += accel_down * dt;
        self.position[2] += self.velocity[2] * dt;

        // Ground contact
        if self.position[2] >= 0.0 {
            self.position[2] = 0.0;
            self.velocity[2] = self.velocity[2].min(0.0);
        }
    }

    /// Build telemetry from the current state.
    fn synthesize(&mut self, thrust_accel: f64) -> TelemetryRecord {
        // Specific force in FRD body axes: thrust while airborne, the ground
        // reaction when resting on it.
        let on_ground = self.position[2] >= 0.0 && self.velocity[2] >= 0.0;
        let specific_force = if on_ground {
            GRAVITY_MSS.max(thrust_accel)
        } else {
            thrust_accel
        };

        let accel_noise = self.config.accel_noise_mss;
        let gyro_noise = self.config.gyro_noise_rads;
        TelemetryRecord {
            timestamp: self.time_s,
            gyro: [
                self.gaussian_noise(gyro_noise),
                self.gaussian_noise(gyro_noise),
                self.gaussian_noise(gyro_noise),
            ],
            accel: [
                self.gaussian_noise(accel_noise),
                self.gaussian_noise(accel_noise),
                -specific_force + self.gaussian_noise(accel_noise),
            ],
            position: self.position,
            velocity: self.velocity,
            quaternion: [1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Generate Gaussian noise using Box-Muller transform.
    fn gaussian_noise(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let u1: f64 = self.rng.gen::<f64>().max(f64::EPSILON);
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z * stddev
    }

    /// Height above ground in meters.
    pub fn altitude(&self) -> f64 {
        -self.position[2]
    }

    /// Simulated time in seconds.
    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    /// Number of frames that advanced the model.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn config(&self) -> &PointMassConfig {
        &self.config
    }
}

impl std::fmt::Debug for PointMassModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointMassModel")
            .field("time_s", &self.time_s)
            .field("altitude", &self.altitude())
            .field("climb_rate", &-self.velocity[2])
            .field("steps", &self.steps)
            .finish()
    }
}
