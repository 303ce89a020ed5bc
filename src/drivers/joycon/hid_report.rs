//! Wire layout of Joy-Con input reports.
//!
//! Sources:
//! - https://github.com/dekuNukem/Nintendo_Switch_Reverse_Engineering/blob/master/bluetooth_hid_notes.md
//! - https://github.com/torvalds/linux/blob/master/drivers/hid/hid-nintendo.c
use packed_struct::prelude::*;

use super::error::ProtocolError;

/// Fixed length of every report exchanged with the device.
pub const REPORT_LEN: usize = 49;

/// Number of leading report bytes the packed layout below covers. The
/// remainder of a standard-full report holds IMU samples, which are not
/// decoded.
pub const PACKED_LEN: usize = 13;

/// Recognized inbound report ids. Everything else is rejected at the
/// decode boundary.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    /// Standard input report with a subcommand reply attached
    StandardWithReplies = 0x21,
    /// Standard full report pushed at 60Hz
    StandardFull = 0x30,
    /// Standard full report with NFC/IR data appended
    NfcIr = 0x31,
}

impl ReportType {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ReportType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x21 => Ok(Self::StandardWithReplies),
            0x30 => Ok(Self::StandardFull),
            0x31 => Ok(Self::NfcIr),
            _ => Err(ProtocolError::UnsupportedReport(value)),
        }
    }
}

/// Charge level reported in the top nibble of byte 2. Only the five
/// even values are defined; anything else decodes to [Invalid].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryLevel {
    Empty,
    Critical,
    Low,
    Medium,
    Full,
    #[default]
    Invalid,
}

impl BatteryLevel {
    pub fn from_nibble(value: u8) -> Self {
        match value {
            0 => Self::Empty,
            2 => Self::Critical,
            4 => Self::Low,
            6 => Self::Medium,
            8 => Self::Full,
            _ => Self::Invalid,
        }
    }
}

/// Button bytes 3-5: right-half byte, shared byte, left-half byte, each
/// LSB-first on the wire.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "3")]
pub struct ButtonStatus {
    // byte 0 (right half)
    #[packed_field(bits = "7")]
    pub y: bool,
    #[packed_field(bits = "6")]
    pub x: bool,
    #[packed_field(bits = "5")]
    pub b: bool,
    #[packed_field(bits = "4")]
    pub a: bool,
    #[packed_field(bits = "3")]
    pub sr_right: bool,
    #[packed_field(bits = "2")]
    pub sl_right: bool,
    #[packed_field(bits = "1")]
    pub r: bool,
    #[packed_field(bits = "0")]
    pub zr: bool,

    // byte 1 (shared)
    #[packed_field(bits = "15")]
    pub minus: bool,
    #[packed_field(bits = "14")]
    pub plus: bool,
    #[packed_field(bits = "13")]
    pub r_stick: bool,
    #[packed_field(bits = "12")]
    pub l_stick: bool,
    #[packed_field(bits = "11")]
    pub home: bool,
    #[packed_field(bits = "10")]
    pub capture: bool,
    #[packed_field(bits = "9")]
    pub _unused: bool,
    #[packed_field(bits = "8")]
    pub charging_grip: bool,

    // byte 2 (left half)
    #[packed_field(bits = "23")]
    pub down: bool,
    #[packed_field(bits = "22")]
    pub up: bool,
    #[packed_field(bits = "21")]
    pub right: bool,
    #[packed_field(bits = "20")]
    pub left: bool,
    #[packed_field(bits = "19")]
    pub sr_left: bool,
    #[packed_field(bits = "18")]
    pub sl_left: bool,
    #[packed_field(bits = "17")]
    pub l: bool,
    #[packed_field(bits = "16")]
    pub zl: bool,
}

/// Three raw bytes holding two 12-bit ADC readings in the device's
/// nibble-interleaved packing.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "3")]
pub struct RawStick {
    #[packed_field(bytes = "0")]
    pub b0: u8,
    #[packed_field(bytes = "1")]
    pub b1: u8,
    #[packed_field(bytes = "2")]
    pub b2: u8,
}

impl RawStick {
    /// 12-bit horizontal reading: low byte plus the low nibble of the
    /// middle byte.
    pub fn horizontal(&self) -> u16 {
        self.b0 as u16 | ((self.b1 as u16 & 0xF) << 8)
    }

    /// 12-bit vertical reading: high nibble of the middle byte plus the
    /// high byte.
    pub fn vertical(&self) -> u16 {
        (self.b1 as u16 >> 4) | ((self.b2 as u16) << 4)
    }
}

/// Leading bytes shared by all standard input reports. Bytes past
/// [PACKED_LEN] (IMU samples, NFC/IR data, subcommand replies) are not
/// part of the packed layout.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "13")]
pub struct PackedInputReport {
    /// Input report id
    #[packed_field(bytes = "0")]
    pub report_id: u8,
    /// Timer, increments per report. Useful to estimate link latency.
    #[packed_field(bytes = "1")]
    pub timer: u8,
    /// Battery nibble and connection bits
    #[packed_field(bytes = "2")]
    pub power: u8,
    /// Button states for both halves
    #[packed_field(bytes = "3..=5")]
    pub buttons: ButtonStatus,
    /// Left analog stick
    #[packed_field(bytes = "6..=8")]
    pub left_stick: RawStick,
    /// Right analog stick
    #[packed_field(bytes = "9..=11")]
    pub right_stick: RawStick,
    /// Vibrator input report
    #[packed_field(bytes = "12")]
    pub vibrator: u8,
}

impl PackedInputReport {
    /// Battery level from the top nibble of the power byte.
    pub fn battery_level(&self) -> BatteryLevel {
        BatteryLevel::from_nibble((self.power >> 4) & 0xF)
    }

    /// Connection kind from bits 1-2 of the power byte.
    pub fn connection_kind(&self) -> u8 {
        (self.power >> 1) & 0x03
    }
}
