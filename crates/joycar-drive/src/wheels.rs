//! [`Wheels`] – the differential-drive pair.
//!
//! Both wheels share one [`PwmDriver`].  A body velocity `(v, ω)` splits
//! into rim speeds
//!
//! ```text
//! v_left  = v - ω · b/2
//! v_right = v + ω · b/2
//! ```
//!
//! where `b` is the distance between the wheel contact points.

use std::sync::Arc;

use joycar_hal::{PwmDriver, SharedClock};
use joycar_types::{JoyError, RobotConfig, ShutdownFailure, Side};
use tracing::{error, warn};

use crate::wheel::Wheel;

pub struct Wheels {
    left: Wheel,
    right: Wheel,
    half_track_width_m: f32,
}

/// Run both results to completion, then keep the first failure.
fn first_error(results: [Result<(), JoyError>; 2]) -> Result<(), JoyError> {
    results.into_iter().collect()
}

impl Wheels {
    /// Build both wheels on `driver` and configure its outputs.  The output
    /// configuration is written exactly once, before any speed command.
    pub fn new(
        driver: Arc<PwmDriver>,
        clock: SharedClock,
        config: &RobotConfig,
    ) -> Result<Self, JoyError> {
        config.validate()?;
        driver.configure_outputs()?;
        Ok(Self {
            left: Wheel::new(Side::Left, Arc::clone(&driver), clock.clone(), config)?,
            right: Wheel::new(Side::Right, driver, clock, config)?,
            half_track_width_m: config.half_track_width(),
        })
    }

    pub fn left(&self) -> &Wheel {
        &self.left
    }

    pub fn right(&self) -> &Wheel {
        &self.right
    }

    pub fn wheel(&self, side: Side) -> &Wheel {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn wheel_mut(&mut self, side: Side) -> &mut Wheel {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Command a body velocity: `forward_mps` along the heading and
    /// `angular_rad_s` counter-clockwise.
    ///
    /// Both wheels are commanded even if the first one fails.
    pub fn set_velocity(&mut self, forward_mps: f32, angular_rad_s: f32) -> Result<(), JoyError> {
        let turn = angular_rad_s * self.half_track_width_m;
        first_error([
            self.left.set_linear_speed(forward_mps - turn),
            self.right.set_linear_speed(forward_mps + turn),
        ])
    }

    /// Command raw signed PWM levels per wheel.
    pub fn set_speeds(&mut self, left: i32, right: i32) -> Result<(), JoyError> {
        first_error([self.left.set_speed(left), self.right.set_speed(right)])
    }

    pub fn stop(&mut self) -> Result<(), JoyError> {
        first_error([self.left.stop(), self.right.stop()])
    }

    /// Advance pending commands on both wheels.
    pub fn update(&mut self) -> Result<(), JoyError> {
        first_error([self.left.update(), self.right.update()])
    }

    /// Stop every wheel, attempting all of them regardless of individual
    /// failures.
    ///
    /// # Errors
    ///
    /// [`JoyError::AggregatedShutdownFailure`] listing each wheel that could
    /// not be stopped.
    pub fn emergency_shutdown(&mut self) -> Result<(), JoyError> {
        error!("emergency stop");
        let mut failures = Vec::new();
        for side in Side::ALL {
            if let Err(err) = self.wheel_mut(side).stop() {
                warn!(%side, error = %err, "wheel did not stop");
                failures.push(ShutdownFailure {
                    side,
                    error: Box::new(err),
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(JoyError::AggregatedShutdownFailure(failures))
        }
    }
}
