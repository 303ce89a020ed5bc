//! Stick calibration and direction classification.
//!
//! The SPI flash stores per-axis center and travel offsets as packed
//! 12-bit triplets; the two halves lay the same nine bytes out in a
//! different field order. Live samples are classified into a 9-way
//! compass direction relative to the calibrated center.

use super::driver::JoyconSide;

/// 9-way compass classification of a stick sample, plus an error
/// sentinel for angles no sector covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StickDirection {
    Invalid,
    /// Within the deadzone, equivalent to not touching the stick
    #[default]
    Center,
    Up,
    UpperRight,
    Right,
    LowerRight,
    Down,
    LowerLeft,
    Left,
    UpperLeft,
}

/// Raw 12-bit stick readings and their classified direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickData {
    pub horizontal: u16,
    pub vertical: u16,
    pub direction: StickDirection,
}

/// Per-axis calibration: center plus the travel below and above it,
/// and the deadzone radius from the device parameter section. Read
/// once during connect, immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickCalibration {
    pub x_center: u16,
    pub x_min_below_center: u16,
    pub x_max_above_center: u16,
    pub y_center: u16,
    pub y_min_below_center: u16,
    pub y_max_above_center: u16,
    pub deadzone: u8,
}

/// Combine a low byte with the low nibble of the next byte.
fn low12(lo: u8, hi: u8) -> u16 {
    ((hi as u16) << 8 & 0xF00) | lo as u16
}

/// Combine the high nibble of a byte with the full next byte.
fn high12(lo: u8, hi: u8) -> u16 {
    ((hi as u16) << 4) | (lo as u16 >> 4)
}

impl StickCalibration {
    /// Unmarshal the nine calibration bytes for the given side. The
    /// left layout stores max-above, center, min-below; the right
    /// layout stores center, min-below, max-above.
    pub fn unmarshal(raw: &[u8; 9], side: JoyconSide) -> Self {
        let (x0, y0) = (low12(raw[0], raw[1]), high12(raw[1], raw[2]));
        let (x1, y1) = (low12(raw[3], raw[4]), high12(raw[4], raw[5]));
        let (x2, y2) = (low12(raw[6], raw[7]), high12(raw[7], raw[8]));

        match side {
            JoyconSide::Left => Self {
                x_max_above_center: x0,
                y_max_above_center: y0,
                x_center: x1,
                y_center: y1,
                x_min_below_center: x2,
                y_min_below_center: y2,
                deadzone: 0,
            },
            JoyconSide::Right => Self {
                x_center: x0,
                y_center: y0,
                x_min_below_center: x1,
                y_min_below_center: y1,
                x_max_above_center: x2,
                y_max_above_center: y2,
                deadzone: 0,
            },
        }
    }

    /// Classify a raw sample into a [StickDirection].
    pub fn classify(&self, horizontal: u16, vertical: u16) -> StickDirection {
        let x_min = self.x_center as f64 - self.x_min_below_center as f64;
        let x_max = self.x_center as f64 + self.x_max_above_center as f64;
        let y_min = self.y_center as f64 - self.y_min_below_center as f64;
        let y_max = self.y_center as f64 + self.y_max_above_center as f64;

        let x_center = (x_min + x_max) / 2.0;
        let y_center = (y_min + y_max) / 2.0;

        let dx = horizontal as f64 - x_center;
        let dy = vertical as f64 - y_center;

        let deadzone = self.deadzone as f64;
        if dx * dx + dy * dy < deadzone * deadzone {
            return StickDirection::Center;
        }

        let x = clamp(dx / (x_center - 1.0));
        let y = clamp(dy / (y_center - 1.0));

        let mut degrees = y.atan2(x).to_degrees();
        if degrees < 0.0 {
            degrees += 360.0;
        }
        direction_for_angle(degrees)
    }
}

/// Bucket an angle in [0, 360) into the 9-way compass. Cardinal
/// sectors are 60 degrees wide, diagonal sectors fill the closed
/// 30-degree wedges between them.
pub(crate) fn direction_for_angle(degrees: f64) -> StickDirection {
    if degrees > 60.0 && degrees < 120.0 {
        StickDirection::Up
    } else if (30.0..=60.0).contains(&degrees) {
        StickDirection::UpperRight
    } else if (0.0..30.0).contains(&degrees) || degrees > 330.0 && degrees < 360.0 {
        StickDirection::Right
    } else if (300.0..=330.0).contains(&degrees) {
        StickDirection::LowerRight
    } else if degrees > 240.0 && degrees < 300.0 {
        StickDirection::Down
    } else if (210.0..=240.0).contains(&degrees) {
        StickDirection::LowerLeft
    } else if degrees > 150.0 && degrees < 210.0 {
        StickDirection::Left
    } else if (120.0..=150.0).contains(&degrees) {
        StickDirection::UpperLeft
    } else {
        log::warn!("stick angle {degrees} is not covered by any sector");
        StickDirection::Invalid
    }
}

fn clamp(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}
