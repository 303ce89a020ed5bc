//! Decoded device state.
//!
//! Turns a raw 49-byte input report into a [DeviceStatus] snapshot.
//! Field extraction is strictly positional; a short buffer is rejected
//! up front so decoding can never index out of bounds.

use packed_struct::PackedStruct;

use super::driver::JoyconSide;
use super::error::ProtocolError;
use super::hid_report::{BatteryLevel, PackedInputReport, ReportType, PACKED_LEN, REPORT_LEN};
use super::joystick::{StickCalibration, StickData};

/// An RGB triple read from the color section of the SPI flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Snapshot of one half's state decoded from a single input report.
/// Only the fields belonging to the session's side are populated; a
/// left half never reports A/B/X/Y and a right half never reports the
/// d-pad.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceStatus {
    pub battery_level: BatteryLevel,
    pub connection_kind: u8,

    // Left half buttons
    pub dpad_down: bool,
    pub dpad_up: bool,
    pub dpad_right: bool,
    pub dpad_left: bool,
    pub left_sr: bool,
    pub left_sl: bool,
    pub button_l: bool,
    pub button_zl: bool,
    pub button_minus: bool,
    pub button_capture: bool,
    pub left_stick_press: bool,

    // Right half buttons
    pub button_y: bool,
    pub button_x: bool,
    pub button_b: bool,
    pub button_a: bool,
    pub right_sr: bool,
    pub right_sl: bool,
    pub button_r: bool,
    pub button_zr: bool,
    pub button_plus: bool,
    pub button_home: bool,
    pub right_stick_press: bool,

    // Shared
    pub charging_grip: bool,

    pub stick: StickData,
}

/// Decode an input report into a [DeviceStatus] for the given side.
pub fn decode(
    buf: &[u8],
    side: JoyconSide,
    calibration: &StickCalibration,
) -> Result<DeviceStatus, ProtocolError> {
    if buf.len() < REPORT_LEN {
        return Err(ProtocolError::Truncated(buf.len()));
    }
    ReportType::try_from(buf[0])?;

    let packed: &[u8; PACKED_LEN] = buf[..PACKED_LEN]
        .try_into()
        .map_err(|_| ProtocolError::Truncated(buf.len()))?;
    let report = PackedInputReport::unpack(packed)
        .map_err(|_| ProtocolError::Truncated(buf.len()))?;

    let mut status = DeviceStatus {
        battery_level: report.battery_level(),
        connection_kind: report.connection_kind(),
        charging_grip: report.buttons.charging_grip,
        ..Default::default()
    };

    let buttons = &report.buttons;
    let raw = match side {
        JoyconSide::Left => {
            status.dpad_down = buttons.down;
            status.dpad_up = buttons.up;
            status.dpad_right = buttons.right;
            status.dpad_left = buttons.left;
            status.left_sr = buttons.sr_left;
            status.left_sl = buttons.sl_left;
            status.button_l = buttons.l;
            status.button_zl = buttons.zl;
            status.button_minus = buttons.minus;
            status.button_capture = buttons.capture;
            status.left_stick_press = buttons.l_stick;
            report.left_stick
        }
        JoyconSide::Right => {
            status.button_y = buttons.y;
            status.button_x = buttons.x;
            status.button_b = buttons.b;
            status.button_a = buttons.a;
            status.right_sr = buttons.sr_right;
            status.right_sl = buttons.sl_right;
            status.button_r = buttons.r;
            status.button_zr = buttons.zr;
            status.button_plus = buttons.plus;
            status.button_home = buttons.home;
            status.right_stick_press = buttons.r_stick;
            report.right_stick
        }
    };

    let horizontal = raw.horizontal();
    let vertical = raw.vertical();
    status.stick = StickData {
        horizontal,
        vertical,
        direction: calibration.classify(horizontal, vertical),
    };

    Ok(status)
}
