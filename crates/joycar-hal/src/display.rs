//! Outgoing-only [`Display`] boundary.
//!
//! The control core never reads display state.  It pushes two things: the
//! current sensor pattern and a "repaint now" hint once per cycle.  The
//! provided [`Display::show_sensor_pattern`] lays the pattern out on the
//! bottom row of the robot's 17×7 LED panel, so a driver only has to
//! implement [`Display::set_pixel`].

/// Row of the LED panel used for the sensor strip.
pub const SENSOR_ROW: u8 = 6;

/// Default intensity of an active sensor cell.
pub const SENSOR_HIGH: u8 = 9;
/// Default intensity of an inactive sensor cell.
pub const SENSOR_LOW: u8 = 1;

/// State of the nine sensor positions a panel can show.  `None` marks a
/// position the robot has no sensor for; it is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorPattern {
    pub obstacle_left: Option<bool>,
    pub far_left: Option<bool>,
    pub left: Option<bool>,
    pub middle_left: Option<bool>,
    pub middle: Option<bool>,
    pub middle_right: Option<bool>,
    pub right: Option<bool>,
    pub far_right: Option<bool>,
    pub obstacle_right: Option<bool>,
}

impl SensorPattern {
    /// `(column, state)` for each position, left edge of the robot first.
    /// The panel is mirrored: the robot's left is the panel's right.
    pub fn cells(&self) -> [(u8, Option<bool>); 9] {
        [
            (16, self.obstacle_left),
            (13, self.far_left),
            (11, self.left),
            (9, self.middle_left),
            (8, self.middle),
            (7, self.middle_right),
            (5, self.right),
            (3, self.far_right),
            (0, self.obstacle_right),
        ]
    }

    /// Pixels to draw as `(column, row, intensity)`, skipping absent sensors.
    pub fn pixels(&self, high: u8, low: u8) -> impl Iterator<Item = (u8, u8, u8)> {
        self.cells().into_iter().filter_map(move |(col, state)| {
            state.map(|active| (col, SENSOR_ROW, if active { high } else { low }))
        })
    }
}

/// A pixel display the robot can draw on.
pub trait Display: Send {
    fn set_pixel(&mut self, col: u8, row: u8, intensity: u8);

    /// Paint `pattern` on the sensor row, active cells at `high` and
    /// inactive ones at `low`.
    fn show_sensor_pattern(&mut self, pattern: &SensorPattern, high: u8, low: u8) {
        for (col, row, intensity) in pattern.pixels(high, low) {
            self.set_pixel(col, row, intensity);
        }
    }

    /// Flush buffered pixels.  Called once per control cycle; the display
    /// decides itself whether it is time to redraw.
    fn repaint(&mut self) {}
}

/// A display that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn set_pixel(&mut self, _col: u8, _row: u8, _intensity: u8) {}
}
