//! The demonstration drive sequence run by the `joycar` binary.

/// One leg of the sequence: hold a body velocity for `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveStep {
    pub name: &'static str,
    pub forward_mps: f32,
    pub angular_rad_s: f32,
    pub duration_ms: u64,
}

impl DriveStep {
    const fn new(name: &'static str, forward_mps: f32, angular_rad_s: f32, duration_ms: u64) -> Self {
        Self {
            name,
            forward_mps,
            angular_rad_s,
            duration_ms,
        }
    }

    /// Number of control cycles this step spans, at least one.
    pub fn cycles(&self, cycle_ms: u64) -> u64 {
        (self.duration_ms / cycle_ms.max(1)).max(1)
    }
}

/// Forward, reverse, spin both ways, stop.  Every direction change goes
/// through the wheels' reversal guard.
pub const DEMO_SCRIPT: [DriveStep; 5] = [
    DriveStep::new("forward", 0.15, 0.0, 1_500),
    DriveStep::new("reverse", -0.10, 0.0, 1_000),
    DriveStep::new("spin left", 0.0, 2.0, 800),
    DriveStep::new("spin right", 0.0, -2.0, 800),
    DriveStep::new("stop", 0.0, 0.0, 300),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_ends_stopped() {
        let last = DEMO_SCRIPT[DEMO_SCRIPT.len() - 1];
        assert_eq!(last.forward_mps, 0.0);
        assert_eq!(last.angular_rad_s, 0.0);
    }

    #[test]
    fn cycles_round_down_but_never_to_zero() {
        let step = DriveStep::new("t", 0.0, 0.0, 25);
        assert_eq!(step.cycles(10), 2);
        assert_eq!(step.cycles(100), 1);
        assert_eq!(step.cycles(0), 25);
    }
}
