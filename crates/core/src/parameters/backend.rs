//! JSON Backend Parameter Definitions
//!
//! Parameters for the simulator exchange, read from the `JSONBackend` section
//! of the configuration store.
//!
//! # Parameters
//!
//! - `telem_timeout` - Seconds to wait for valid telemetry per exchange
//! - `receive_timeout` - Seconds to sleep between empty polls
//! - `addr` - Simulator IPv4 address
//! - `port` - Simulator UDP port
//! - `decode_policy` - `"skip"` to keep polling past malformed datagrams,
//!   `"fail_fast"` to abort the exchange on the first one

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use log::warn;

use super::error::ParameterError;
use super::store::{ConfigSection, ConfigStore};

/// Default configuration section name
pub const DEFAULT_SECTION: &str = "JSONBackend";

/// Default telemetry timeout in seconds
const DEFAULT_TELEM_TIMEOUT: f64 = 10.0;

/// Default interval between receive polls in seconds
const DEFAULT_RECEIVE_TIMEOUT: f64 = 0.01;

/// Default simulator address
const DEFAULT_ADDR: &str = "127.0.0.1";

/// Default simulator port
const DEFAULT_PORT: u16 = 9002;

/// How the exchange loop treats datagrams that fail to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Log, discard and keep polling until the deadline
    #[default]
    SkipInvalid,
    /// Return the decode error immediately
    FailFast,
}

impl DecodePolicy {
    /// Parse a policy name, returning `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "skip" => Some(Self::SkipInvalid),
            "fail_fast" => Some(Self::FailFast),
            _ => None,
        }
    }

    /// Configuration name of this policy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SkipInvalid => "skip",
            Self::FailFast => "fail_fast",
        }
    }
}

/// Simulator connection and timing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BackendParams {
    /// Seconds to wait for a valid telemetry datagram per exchange
    pub telem_timeout: f64,
    /// Seconds to sleep when no datagram is pending
    pub receive_timeout: f64,
    /// Simulator IPv4 address in dotted-decimal form
    pub addr: String,
    /// Simulator UDP port
    pub port: u16,
    /// Handling of malformed telemetry
    pub decode_policy: DecodePolicy,
}

impl Default for BackendParams {
    fn default() -> Self {
        Self {
            telem_timeout: DEFAULT_TELEM_TIMEOUT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            addr: DEFAULT_ADDR.to_string(),
            port: DEFAULT_PORT,
            decode_policy: DecodePolicy::default(),
        }
    }
}

impl BackendParams {
    /// Load backend parameters from the named section of a store
    ///
    /// Missing keys take their defaults. Values that cannot be used (negative
    /// or non-finite timeouts, ports outside 1..=65535, unknown policies) are
    /// replaced by the default and logged.
    pub fn from_store(store: &ConfigStore, section: &str) -> Self {
        Self::from_section(&store.section(section))
    }

    /// Load backend parameters from an already selected section
    pub fn from_section(section: &ConfigSection<'_>) -> Self {
        let telem_timeout = seconds(section, "telem_timeout", DEFAULT_TELEM_TIMEOUT);
        let receive_timeout = seconds(section, "receive_timeout", DEFAULT_RECEIVE_TIMEOUT);
        let addr = section.str("addr", DEFAULT_ADDR);

        let raw_port = section.num("port", DEFAULT_PORT as f64);
        let port = if raw_port.fract() == 0.0 && (1.0..=65535.0).contains(&raw_port) {
            raw_port as u16
        } else {
            warn!(
                "{}.port {} out of range, using {}",
                section.name(),
                raw_port,
                DEFAULT_PORT
            );
            DEFAULT_PORT
        };

        let policy_name = section.str("decode_policy", DecodePolicy::default().name());
        let decode_policy = DecodePolicy::from_name(&policy_name).unwrap_or_else(|| {
            warn!(
                "{}.decode_policy '{}' unknown, using '{}'",
                section.name(),
                policy_name,
                DecodePolicy::default().name()
            );
            DecodePolicy::default()
        });

        Self {
            telem_timeout,
            receive_timeout,
            addr,
            port,
            decode_policy,
        }
    }

    /// Telemetry deadline as a [`Duration`]
    pub fn telem_timeout_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.telem_timeout)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_TELEM_TIMEOUT))
    }

    /// Poll interval as a [`Duration`]
    pub fn receive_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.receive_timeout)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_RECEIVE_TIMEOUT))
    }

    /// Resolve the simulator endpoint
    ///
    /// Only dotted-decimal IPv4 addresses are accepted; host names are not
    /// resolved.
    pub fn remote_addr(&self) -> Result<SocketAddr, ParameterError> {
        let ip: Ipv4Addr = self
            .addr
            .parse()
            .map_err(|_| ParameterError::InvalidAddress(self.addr.clone()))?;
        Ok(SocketAddr::V4(SocketAddrV4::new(ip, self.port)))
    }

    /// Validate backend parameters
    pub fn is_valid(&self) -> bool {
        is_usable_seconds(self.telem_timeout)
            && is_usable_seconds(self.receive_timeout)
            && self.port != 0
            && self.remote_addr().is_ok()
    }
}

/// Whether `value` converts to a [`Duration`] without saturating or failing.
fn is_usable_seconds(value: f64) -> bool {
    value.is_finite() && Duration::try_from_secs_f64(value).is_ok()
}

fn seconds(section: &ConfigSection<'_>, key: &str, default: f64) -> f64 {
    let value = section.num(key, default);
    if is_usable_seconds(value) {
        value
    } else {
        warn!(
            "{}.{} must be a non-negative number of seconds, using {}",
            section.name(),
            key,
            default
        );
        default
    }
}
