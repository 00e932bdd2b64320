//! `joycar-types` – shared vocabulary for the JoyCar motion-control stack.
//!
//! - [`Side`] – which wheel a command or failure refers to.
//! - [`JoyError`] – the one error type returned by every crate in the
//!   workspace.
//! - [`RobotConfig`] – construction-time geometry, bus addresses and timing
//!   constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side of the chassis a wheel is mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides in the order emergency shutdown visits them.
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Side {
    type Err = JoyError;

    /// Parse `"left"` / `"right"` (case-insensitive).  There is no default
    /// side, so anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            other => Err(JoyError::InvalidConfiguration(format!(
                "unknown wheel side '{other}'"
            ))),
        }
    }
}

/// One wheel that could not be stopped during an emergency shutdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutdownFailure {
    pub side: Side,
    pub error: Box<JoyError>,
}

impl fmt::Display for ShutdownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wheel: {}", self.side, self.error)
    }
}

fn describe_failures(failures: &[ShutdownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error type spanning bus contention, transport faults, bad configuration
/// and incomplete emergency stops.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoyError {
    /// The bus could not be claimed before the lock timeout elapsed.  The
    /// pending write was not issued; retry on the next cycle.
    #[error("Bus Lock Timeout: not acquired within {waited_ms} ms")]
    LockTimeout { waited_ms: i32 },

    #[error("Transport Error at 0x{address:02X}: {details}")]
    Transport { address: u8, details: String },

    #[error("Invalid Configuration: {0}")]
    InvalidConfiguration(String),

    /// At least one wheel failed to stop.  Every wheel was still attempted.
    #[error("Emergency Shutdown Incomplete: {}", describe_failures(.0))]
    AggregatedShutdownFailure(Vec<ShutdownFailure>),
}

impl JoyError {
    /// `true` for failures the control loop may simply retry next cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, JoyError::LockTimeout { .. } | JoyError::Transport { .. })
    }
}

/// Construction-time robot parameters.
///
/// Every field has a serde default so a partial TOML table is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Wheel diameter in metres.
    #[serde(default = "default_wheel_diameter")]
    pub wheel_diameter_m: f32,

    /// Distance between the two wheel contact points in metres.
    #[serde(default = "default_wheel_base")]
    pub wheel_base_m: f32,

    /// 7-bit bus address of the PCF8574 sensor expander.
    #[serde(default = "default_expander_address")]
    pub expander_address: u8,

    /// 7-bit bus address of the PCA9633 motor PWM driver.
    #[serde(default = "default_pwm_address")]
    pub pwm_address: u8,

    /// Smallest non-zero PWM level that actually turns a wheel.
    #[serde(default = "default_deadzone")]
    pub deadzone: i32,

    #[serde(default = "default_max_pwm")]
    pub max_pwm: i32,

    /// Calibration gain from wheel revolutions per second to PWM level.
    #[serde(default = "default_pwm_per_rps")]
    pub pwm_per_rps: f32,

    /// Zero-output dwell enforced when a wheel changes direction.
    #[serde(default = "default_reversal_guard_ms")]
    pub reversal_guard_ms: u32,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u32,

    #[serde(default = "default_sensor_poll_ms")]
    pub sensor_poll_ms: u32,
}

fn default_wheel_diameter() -> f32 {
    0.06
}
fn default_wheel_base() -> f32 {
    0.12
}
fn default_expander_address() -> u8 {
    0x38
}
fn default_pwm_address() -> u8 {
    0x62
}
fn default_deadzone() -> i32 {
    20
}
fn default_max_pwm() -> i32 {
    255
}
fn default_pwm_per_rps() -> f32 {
    200.0
}
fn default_reversal_guard_ms() -> u32 {
    100
}
fn default_lock_timeout_ms() -> u32 {
    5
}
fn default_sensor_poll_ms() -> u32 {
    50
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wheel_diameter_m: default_wheel_diameter(),
            wheel_base_m: default_wheel_base(),
            expander_address: default_expander_address(),
            pwm_address: default_pwm_address(),
            deadzone: default_deadzone(),
            max_pwm: default_max_pwm(),
            pwm_per_rps: default_pwm_per_rps(),
            reversal_guard_ms: default_reversal_guard_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
            sensor_poll_ms: default_sensor_poll_ms(),
        }
    }
}

impl RobotConfig {
    /// Check geometry, PWM limits and addresses.
    ///
    /// # Errors
    ///
    /// Returns [`JoyError::InvalidConfiguration`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), JoyError> {
        fn invalid(msg: String) -> Result<(), JoyError> {
            Err(JoyError::InvalidConfiguration(msg))
        }

        if !(self.wheel_diameter_m.is_finite() && self.wheel_diameter_m > 0.0) {
            return invalid(format!(
                "wheel_diameter_m must be positive, got {}",
                self.wheel_diameter_m
            ));
        }
        if !(self.wheel_base_m.is_finite() && self.wheel_base_m > 0.0) {
            return invalid(format!(
                "wheel_base_m must be positive, got {}",
                self.wheel_base_m
            ));
        }
        if !(1..=255).contains(&self.max_pwm) {
            return invalid(format!("max_pwm must be in 1..=255, got {}", self.max_pwm));
        }
        if self.deadzone < 0 || self.deadzone > self.max_pwm {
            return invalid(format!(
                "deadzone must be in 0..={}, got {}",
                self.max_pwm, self.deadzone
            ));
        }
        if !(self.pwm_per_rps.is_finite() && self.pwm_per_rps > 0.0) {
            return invalid(format!(
                "pwm_per_rps must be positive, got {}",
                self.pwm_per_rps
            ));
        }
        for (name, address) in [
            ("expander_address", self.expander_address),
            ("pwm_address", self.pwm_address),
        ] {
            if address > 0x7F {
                return invalid(format!("{name} 0x{address:02X} is not a 7-bit address"));
            }
        }
        if self.expander_address == self.pwm_address {
            return invalid(format!(
                "expander and PWM driver share address 0x{:02X}",
                self.pwm_address
            ));
        }
        Ok(())
    }

    /// Half of [`wheel_base_m`][Self::wheel_base_m], the lever arm used by the
    /// differential-drive model.
    pub fn half_track_width(&self) -> f32 {
        self.wheel_base_m / 2.0
    }
}
