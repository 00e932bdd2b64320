//! [`TerminalDisplay`] – renders the sensor strip as a log line.

use joycar_hal::Display;
use joycar_hal::display::SENSOR_ROW;
use tracing::info;

const COLUMNS: usize = 17;

/// Keeps the sensor row of a 17-column panel and logs it on repaint when
/// it changed.  Pixels on other rows are ignored.
#[derive(Debug)]
pub struct TerminalDisplay {
    row: [u8; COLUMNS],
    dirty: bool,
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self {
            row: [0; COLUMNS],
            dirty: false,
        }
    }
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sensor row as text: `#` lit, `.` dim, space unset.  Column 0 is
    /// printed last, matching the mirrored panel.
    pub fn render(&self) -> String {
        self.row
            .iter()
            .rev()
            .map(|&intensity| match intensity {
                0 => ' ',
                1..=4 => '.',
                _ => '#',
            })
            .collect()
    }
}

impl Display for TerminalDisplay {
    fn set_pixel(&mut self, col: u8, row: u8, intensity: u8) {
        if row != SENSOR_ROW {
            return;
        }
        if let Some(cell) = self.row.get_mut(usize::from(col))
            && *cell != intensity
        {
            *cell = intensity;
            self.dirty = true;
        }
    }

    fn repaint(&mut self) {
        if self.dirty {
            self.dirty = false;
            info!(sensors = %format!("[{}]", self.render()), "display");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joycar_hal::SensorPattern;

    #[test]
    fn renders_sensor_row_mirrored() {
        let mut display = TerminalDisplay::new();
        let pattern = SensorPattern {
            obstacle_left: Some(true),
            middle: Some(false),
            obstacle_right: Some(false),
            ..SensorPattern::default()
        };
        display.show_sensor_pattern(&pattern, 9, 1);
        assert_eq!(display.render(), "#       .       .");
    }

    #[test]
    fn repaint_clears_dirty_flag() {
        let mut display = TerminalDisplay::new();
        display.set_pixel(8, SENSOR_ROW, 9);
        assert!(display.dirty);
        display.repaint();
        assert!(!display.dirty);

        display.set_pixel(8, SENSOR_ROW, 9);
        assert!(!display.dirty, "same value is not a change");
    }

    #[test]
    fn other_rows_and_out_of_range_columns_are_ignored() {
        let mut display = TerminalDisplay::new();
        display.set_pixel(3, 0, 9);
        display.set_pixel(40, SENSOR_ROW, 9);
        assert!(!display.dirty);
        assert_eq!(display.render(), " ".repeat(17));
    }
}
