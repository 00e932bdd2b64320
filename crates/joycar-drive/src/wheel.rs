//! [`Wheel`] – one motor and its direction-reversal interlock.
//!
//! Each wheel is driven by an H-bridge fed from two PCA9633 channels, one
//! per direction.  Switching straight from forward to reverse PWM risks
//! shoot-through current, so a sign change always goes through a stop
//! phase:
//!
//! ```text
//!   set_speed(-100) while running at +100
//!     └─ write 0 to both channels, arm the reversal guard (100 ms)
//!   update() before the guard expires
//!     └─ nothing written
//!   update() after the guard expires
//!     └─ write forward = 0, reverse = 100
//! ```
//!
//! Requested levels are sanitised first: zero stays zero, non-zero levels
//! below the deadzone are raised to it, and anything beyond the PWM limit
//! is clamped.

use std::f32::consts::PI;
use std::sync::Arc;

use joycar_hal::{PwmDriver, PwmRegister, RegisterDevice, SharedClock, Timer};
use joycar_types::{JoyError, RobotConfig, Side};
use tracing::debug;

/// Apply the deadzone and the PWM limit to a requested level.
///
/// ```rust
/// use joycar_drive::wheel::sanitize;
///
/// assert_eq!(sanitize(0, 20, 255), 0);
/// assert_eq!(sanitize(5, 20, 255), 20);
/// assert_eq!(sanitize(-999, 20, 255), -255);
/// assert_eq!(sanitize(i32::MIN, 20, 255), -255);
/// ```
pub fn sanitize(level: i32, deadzone: i32, max_pwm: i32) -> i32 {
    if level == 0 {
        return 0;
    }
    let ceiling = max_pwm.max(0).unsigned_abs();
    let floor = deadzone.max(0).unsigned_abs().min(ceiling);
    // The magnitude is at most `max_pwm`, so it fits back into an i32.
    let magnitude = level.unsigned_abs().clamp(floor, ceiling) as i32;
    if level < 0 { -magnitude } else { magnitude }
}

/// `(reverse, forward)` channel pair for a side.  The assignment is fixed by
/// the JoyCar wiring.
fn channels(side: Side) -> (PwmRegister, PwmRegister) {
    match side {
        Side::Right => (PwmRegister::Pwm0, PwmRegister::Pwm1),
        Side::Left => (PwmRegister::Pwm2, PwmRegister::Pwm3),
    }
}

pub struct Wheel {
    side: Side,
    driver: Arc<PwmDriver>,
    reverse_register: PwmRegister,
    forward_register: PwmRegister,
    target: i32,
    last_applied: i32,
    reversal_timer: Timer,
    reversal_guard_ms: u32,
    deadzone: i32,
    max_pwm: i32,
    circumference_m: f32,
    pwm_per_rps: f32,
}

impl Wheel {
    /// # Errors
    ///
    /// [`JoyError::InvalidConfiguration`] when `config` fails
    /// [`RobotConfig::validate`].
    pub fn new(
        side: Side,
        driver: Arc<PwmDriver>,
        clock: SharedClock,
        config: &RobotConfig,
    ) -> Result<Self, JoyError> {
        config.validate()?;
        let (reverse_register, forward_register) = channels(side);
        Ok(Self {
            side,
            driver,
            reverse_register,
            forward_register,
            target: 0,
            last_applied: 0,
            reversal_timer: Timer::new(clock, Some(config.reversal_guard_ms)),
            reversal_guard_ms: config.reversal_guard_ms,
            deadzone: config.deadzone,
            max_pwm: config.max_pwm,
            circumference_m: PI * config.wheel_diameter_m,
            pwm_per_rps: config.pwm_per_rps,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Sanitised level most recently requested.
    pub fn target(&self) -> i32 {
        self.target
    }

    /// Level currently on the PWM channels.
    pub fn last_applied(&self) -> i32 {
        self.last_applied
    }

    /// `true` while the wheel sits in the stop phase of a reversal.
    pub fn is_reversal_pending(&self) -> bool {
        self.reversal_timer.is_started() && !self.reversal_timer.is_expired(None, None)
    }

    pub(crate) fn driver(&self) -> &Arc<PwmDriver> {
        &self.driver
    }

    /// Request a signed PWM level (positive = forward) and apply it right
    /// away, subject to the reversal interlock.
    ///
    /// # Errors
    ///
    /// Bus failures are returned as-is.  The target is kept, so the next
    /// [`update`][Self::update] retries the write.
    pub fn set_speed(&mut self, level: i32) -> Result<(), JoyError> {
        self.target = sanitize(level, self.deadzone, self.max_pwm);
        self.apply_safely()
    }

    pub fn stop(&mut self) -> Result<(), JoyError> {
        self.set_speed(0)
    }

    /// Request a wheel rate in revolutions per second.
    pub fn set_angular_speed(&mut self, rps: f32) -> Result<(), JoyError> {
        self.set_speed((rps * self.pwm_per_rps) as i32)
    }

    /// Request a rim speed in metres per second.
    pub fn set_linear_speed(&mut self, mps: f32) -> Result<(), JoyError> {
        self.set_angular_speed(mps / self.circumference_m)
    }

    /// Advance a pending command.  Call once per control cycle.
    pub fn update(&mut self) -> Result<(), JoyError> {
        self.apply_safely()
    }

    fn direction_changed(&self) -> bool {
        self.target.signum() * self.last_applied.signum() < 0
    }

    fn apply_safely(&mut self) -> Result<(), JoyError> {
        if self.target == self.last_applied {
            return Ok(());
        }

        if self.direction_changed() {
            self.apply_raw(0)?;
            debug!(side = %self.side, guard_ms = self.reversal_guard_ms, "reversal guard engaged");
            self.reversal_timer.start(None, Some(self.reversal_guard_ms));
        }

        if self.is_reversal_pending() {
            return Ok(());
        }

        self.reversal_timer.stop();
        self.apply_raw(self.target)
    }

    /// Write `level` to the channel pair.  The idle channel is zeroed first,
    /// both under one bus acquisition.
    fn apply_raw(&mut self, level: i32) -> Result<(), JoyError> {
        let duty = level.unsigned_abs().min(u32::from(u8::MAX)) as u8;
        let (idle, active) = if level >= 0 {
            (self.reverse_register, self.forward_register)
        } else {
            (self.forward_register, self.reverse_register)
        };
        self.driver
            .write_two_registers(idle.into(), 0, active.into(), duty)?;
        self.last_applied = level;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joycar_hal::BusLock;
    use joycar_hal::sim::{SimBus, SimClock};

    const LEFT_REVERSE: u8 = 0x04;
    const LEFT_FORWARD: u8 = 0x05;

    fn wheel(side: Side) -> (Wheel, SimBus, SimClock) {
        let sim = SimBus::new();
        let clock = SimClock::new();
        let bus = BusLock::new(Box::new(sim.clone()), clock.shared(), 5);
        let driver = Arc::new(PwmDriver::new(bus, 0x62));
        let wheel = Wheel::new(side, driver, clock.shared(), &RobotConfig::default()).unwrap();
        (wheel, sim, clock)
    }

    fn pair(first: u8, first_value: u8, second: u8, second_value: u8) -> Vec<(u8, Vec<u8>)> {
        vec![
            (0x62, vec![first, first_value]),
            (0x62, vec![second, second_value]),
        ]
    }

    #[test]
    fn sanitize_table() {
        assert_eq!(sanitize(0, 20, 255), 0);
        assert_eq!(sanitize(5, 20, 255), 20);
        assert_eq!(sanitize(-10, 20, 255), -20);
        assert_eq!(sanitize(999, 20, 255), 255);
        assert_eq!(sanitize(-999, 20, 255), -255);
        assert_eq!(sanitize(20, 20, 255), 20);
        assert_eq!(sanitize(-137, 20, 255), -137);
        assert_eq!(sanitize(i32::MIN, 20, 255), -255);
        assert_eq!(sanitize(i32::MAX, 20, 255), 255);
    }

    #[test]
    fn sanitize_tolerates_inverted_limits() {
        assert_eq!(sanitize(5, 300, 255), 255);
        assert_eq!(sanitize(-5, 20, -1), 0);
    }

    #[test]
    fn extreme_commands_clamp_to_full_scale() {
        let (mut wheel, _sim, clock) = wheel(Side::Left);
        wheel.set_speed(i32::MIN).unwrap();
        assert_eq!(wheel.last_applied(), -255);

        // Saturating float conversion lands on i32::MIN/MAX first.
        wheel.set_linear_speed(1.0e12).unwrap();
        clock.advance_by(100);
        wheel.update().unwrap();
        assert_eq!(wheel.last_applied(), 255);

        wheel.set_linear_speed(f32::NEG_INFINITY).unwrap();
        clock.advance_by(100);
        wheel.update().unwrap();
        assert_eq!(wheel.last_applied(), -255);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let sim = SimBus::new();
        let clock = SimClock::new();
        let bus = BusLock::new(Box::new(sim.clone()), clock.shared(), 5);
        let driver = Arc::new(PwmDriver::new(bus, 0x62));
        let config = RobotConfig {
            deadzone: 300,
            ..RobotConfig::default()
        };

        let result = Wheel::new(Side::Right, driver, clock.shared(), &config);
        assert!(matches!(result, Err(JoyError::InvalidConfiguration(_))));
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn forward_from_rest_applies_directly() {
        let (mut wheel, sim, _clock) = wheel(Side::Left);

        wheel.set_speed(100).unwrap();
        wheel.update().unwrap();

        assert_eq!(sim.writes(), pair(LEFT_REVERSE, 0, LEFT_FORWARD, 100));
        assert_eq!(wheel.last_applied(), 100);
        assert!(!wheel.is_reversal_pending());
    }

    #[test]
    fn reversal_stops_waits_then_drives() {
        let (mut wheel, sim, clock) = wheel(Side::Left);
        wheel.set_speed(100).unwrap();
        sim.clear_writes();

        // Stop phase.
        wheel.set_speed(-100).unwrap();
        assert_eq!(sim.writes(), pair(LEFT_REVERSE, 0, LEFT_FORWARD, 0));
        assert_eq!(wheel.last_applied(), 0);
        assert!(wheel.is_reversal_pending());

        // Guard still running.
        clock.advance_by(50);
        wheel.update().unwrap();
        clock.advance_by(49);
        wheel.update().unwrap();
        assert_eq!(sim.writes().len(), 2, "nothing written during the guard");
        assert_eq!(wheel.last_applied(), 0);

        // Guard expired.
        clock.advance_by(1);
        wheel.update().unwrap();
        assert_eq!(sim.writes()[2..], pair(LEFT_FORWARD, 0, LEFT_REVERSE, 100)[..]);
        assert_eq!(wheel.last_applied(), -100);
        assert!(!wheel.is_reversal_pending());
    }

    #[test]
    fn identical_commands_write_once() {
        let (mut wheel, sim, _clock) = wheel(Side::Left);
        wheel.set_speed(100).unwrap();
        wheel.set_speed(100).unwrap();
        wheel.update().unwrap();
        assert_eq!(sim.writes().len(), 2);
        assert_eq!(sim.acquisitions(), 1);
    }

    #[test]
    fn magnitude_change_in_same_direction_has_no_guard() {
        let (mut wheel, sim, _clock) = wheel(Side::Left);
        wheel.set_speed(-60).unwrap();
        wheel.set_speed(-200).unwrap();
        assert_eq!(wheel.last_applied(), -200);
        assert_eq!(sim.last_write(), Some((0x62, vec![LEFT_REVERSE, 200])));
    }

    #[test]
    fn stop_is_never_clamped_to_deadzone() {
        let (mut wheel, sim, _clock) = wheel(Side::Left);
        wheel.stop().unwrap();
        assert!(sim.writes().is_empty(), "already stopped");

        wheel.set_speed(50).unwrap();
        wheel.stop().unwrap();
        assert_eq!(wheel.target(), 0);
        assert_eq!(wheel.last_applied(), 0);
        assert_eq!(sim.last_write(), Some((0x62, vec![LEFT_FORWARD, 0])));
    }

    #[test]
    fn new_command_during_guard_waits_for_expiry() {
        let (mut wheel, sim, clock) = wheel(Side::Left);
        wheel.set_speed(100).unwrap();
        wheel.set_speed(-100).unwrap();
        let after_stop = sim.writes().len();

        // Back to forward before the guard expires: still no drive.
        clock.advance_by(30);
        wheel.set_speed(80).unwrap();
        assert_eq!(sim.writes().len(), after_stop);
        assert!(wheel.is_reversal_pending());

        clock.advance_by(70);
        wheel.update().unwrap();
        assert_eq!(wheel.last_applied(), 80);
        assert_eq!(sim.last_write(), Some((0x62, vec![LEFT_FORWARD, 80])));
    }

    #[test]
    fn right_wheel_uses_its_own_channels() {
        let (mut wheel, sim, _clock) = wheel(Side::Right);
        wheel.set_speed(30).unwrap();
        assert_eq!(sim.writes(), pair(0x02, 0, 0x03, 30));
        assert_eq!(wheel.side(), Side::Right);
    }

    #[test]
    fn failed_write_is_retried_next_cycle() {
        let (mut wheel, sim, _clock) = wheel(Side::Left);
        sim.fail_register(LEFT_REVERSE);

        assert!(wheel.set_speed(100).is_err());
        assert_eq!(wheel.target(), 100);
        assert_eq!(wheel.last_applied(), 0, "not applied unless written");

        sim.clear_faults();
        wheel.update().unwrap();
        assert_eq!(wheel.last_applied(), 100);
    }

    #[test]
    fn failed_stop_phase_does_not_arm_guard() {
        let (mut wheel, sim, _clock) = wheel(Side::Left);
        wheel.set_speed(100).unwrap();
        sim.fail_register(LEFT_REVERSE);

        assert!(wheel.set_speed(-100).is_err());
        assert_eq!(wheel.last_applied(), 100);
        assert!(!wheel.is_reversal_pending());

        sim.clear_faults();
        wheel.update().unwrap();
        assert_eq!(wheel.last_applied(), 0);
        assert!(wheel.is_reversal_pending());
    }

    #[test]
    fn lock_timeout_leaves_state_untouched() {
        let (mut wheel, sim, clock) = wheel(Side::Left);
        clock.set_auto_step(1);
        sim.set_contended(true);

        let err = wheel.set_speed(100).unwrap_err();
        assert!(matches!(err, JoyError::LockTimeout { .. }));
        assert_eq!(wheel.last_applied(), 0);
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn linear_speed_goes_through_calibration() {
        let (mut wheel, _sim, _clock) = wheel(Side::Left);
        // 0.1 m/s on a 6 cm wheel: 0.5305 rps * 200 = 106.1
        wheel.set_linear_speed(0.1).unwrap();
        assert_eq!(wheel.last_applied(), 106);

        wheel.set_angular_speed(0.5).unwrap();
        assert_eq!(wheel.last_applied(), 100);
    }

    #[test]
    fn tiny_linear_speed_lands_on_deadzone() {
        let (mut wheel, _sim, _clock) = wheel(Side::Left);
        wheel.set_linear_speed(0.001).unwrap();
        assert_eq!(wheel.last_applied(), 20);
    }
}
