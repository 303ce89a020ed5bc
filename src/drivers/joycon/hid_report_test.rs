use crate::drivers::joycon::driver::JoyconSide;
use crate::drivers::joycon::error::ProtocolError;
use crate::drivers::joycon::hid_report::{BatteryLevel, RawStick, REPORT_LEN};
use crate::drivers::joycon::joystick::{StickCalibration, StickDirection};
use crate::drivers::joycon::status::{self, DeviceStatus};

/// Calibration with the stick centered at 2048 and symmetric travel.
pub(crate) fn test_calibration() -> StickCalibration {
    StickCalibration {
        x_center: 2048,
        x_min_below_center: 1024,
        x_max_above_center: 1024,
        y_center: 2048,
        y_min_below_center: 1024,
        y_max_above_center: 1024,
        deadzone: 200,
    }
}

/// Pack two 12-bit stick readings into their three wire bytes.
fn pack_stick(horizontal: u16, vertical: u16) -> [u8; 3] {
    [
        (horizontal & 0xFF) as u8,
        ((horizontal >> 8) & 0xF) as u8 | ((vertical & 0xF) << 4) as u8,
        (vertical >> 4) as u8,
    ]
}

/// A standard full report with the given button bytes and both sticks
/// resting at the calibrated center.
pub(crate) fn full_report(right: u8, shared: u8, left: u8) -> Vec<u8> {
    let mut buf = vec![0u8; REPORT_LEN];
    buf[0] = 0x30;
    buf[2] = 0x80; // battery full, no connection bits
    buf[3] = right;
    buf[4] = shared;
    buf[5] = left;
    buf[6..9].copy_from_slice(&pack_stick(2048, 2048));
    buf[9..12].copy_from_slice(&pack_stick(2048, 2048));
    buf
}

#[test]
fn stick_words_unpack() {
    let bytes = pack_stick(0xABC, 0x123);
    let raw = RawStick {
        b0: bytes[0],
        b1: bytes[1],
        b2: bytes[2],
    };
    assert_eq!(raw.horizontal(), 0xABC);
    assert_eq!(raw.vertical(), 0x123);
}

#[test]
fn battery_nibble_table() {
    assert_eq!(BatteryLevel::from_nibble(0), BatteryLevel::Empty);
    assert_eq!(BatteryLevel::from_nibble(2), BatteryLevel::Critical);
    assert_eq!(BatteryLevel::from_nibble(4), BatteryLevel::Low);
    assert_eq!(BatteryLevel::from_nibble(6), BatteryLevel::Medium);
    assert_eq!(BatteryLevel::from_nibble(8), BatteryLevel::Full);
    for nibble in [1, 3, 5, 7, 9, 15] {
        assert_eq!(BatteryLevel::from_nibble(nibble), BatteryLevel::Invalid);
    }
}

#[test]
fn truncated_frames_are_rejected() {
    let calibration = test_calibration();
    for len in [0, 1, 12, 48] {
        let buf = vec![0x30u8; len];
        let err = status::decode(&buf, JoyconSide::Left, &calibration).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated(n) if n == len));
    }
}

#[test]
fn unknown_report_ids_are_rejected() {
    let calibration = test_calibration();
    let mut buf = full_report(0, 0, 0);
    buf[0] = 0x3F;
    let err = status::decode(&buf, JoyconSide::Right, &calibration).unwrap_err();
    assert!(matches!(err, ProtocolError::UnsupportedReport(0x3F)));
}

#[test]
fn dpad_down_only() {
    let calibration = test_calibration();
    let buf = full_report(0x00, 0x00, 0x01);
    let status = status::decode(&buf, JoyconSide::Left, &calibration).unwrap();

    assert!(status.dpad_down);
    let rest = DeviceStatus {
        dpad_down: false,
        ..status
    };
    let idle = status::decode(&full_report(0, 0, 0), JoyconSide::Left, &calibration).unwrap();
    assert_eq!(rest, idle);
    assert!(!idle.dpad_up);
    assert!(!idle.dpad_right);
    assert!(!idle.dpad_left);
    assert!(!idle.left_sr);
    assert!(!idle.left_sl);
    assert!(!idle.button_l);
    assert!(!idle.button_zl);
    assert!(!idle.button_minus);
    assert!(!idle.button_capture);
    assert!(!idle.left_stick_press);
}

#[test]
fn left_half_buttons() {
    let calibration = test_calibration();
    // ZL (0x80) + L (0x40) + d-pad left (0x08), minus (0x01) + capture (0x20)
    let buf = full_report(0x00, 0x21, 0xC8);
    let status = status::decode(&buf, JoyconSide::Left, &calibration).unwrap();

    assert!(status.button_zl);
    assert!(status.button_l);
    assert!(status.dpad_left);
    assert!(status.button_minus);
    assert!(status.button_capture);
    assert!(!status.dpad_down);
    // Right-half fields stay untouched for a left session
    assert!(!status.button_a);
    assert!(!status.button_home);
}

#[test]
fn right_half_buttons() {
    let calibration = test_calibration();
    // A (0x08) + ZR (0x80), plus (0x02) + home (0x10) + stick press (0x04)
    let buf = full_report(0x88, 0x16, 0x00);
    let status = status::decode(&buf, JoyconSide::Right, &calibration).unwrap();

    assert!(status.button_a);
    assert!(status.button_zr);
    assert!(status.button_plus);
    assert!(status.button_home);
    assert!(status.right_stick_press);
    assert!(!status.button_b);
    // Left-half fields stay untouched for a right session
    assert!(!status.dpad_down);
    assert!(!status.button_minus);
}

#[test]
fn battery_and_connection_fields() {
    let calibration = test_calibration();
    let mut buf = full_report(0, 0, 0);
    buf[2] = 0x46; // battery low, connection kind 3
    let status = status::decode(&buf, JoyconSide::Left, &calibration).unwrap();

    assert_eq!(status.battery_level, BatteryLevel::Low);
    assert_eq!(status.connection_kind, 3);
}

#[test]
fn charging_grip_is_shared() {
    let calibration = test_calibration();
    let buf = full_report(0x00, 0x80, 0x00);
    for side in [JoyconSide::Left, JoyconSide::Right] {
        let status = status::decode(&buf, side, &calibration).unwrap();
        assert!(status.charging_grip);
    }
}

#[test]
fn side_selects_stick_bytes() {
    let calibration = test_calibration();
    let mut buf = full_report(0, 0, 0);
    buf[6..9].copy_from_slice(&pack_stick(3000, 2048));
    buf[9..12].copy_from_slice(&pack_stick(1000, 2048));

    let left = status::decode(&buf, JoyconSide::Left, &calibration).unwrap();
    assert_eq!(left.stick.horizontal, 3000);
    assert_eq!(left.stick.direction, StickDirection::Right);

    let right = status::decode(&buf, JoyconSide::Right, &calibration).unwrap();
    assert_eq!(right.stick.horizontal, 1000);
    assert_eq!(right.stick.direction, StickDirection::Left);
}

#[test]
fn centered_stick_is_center() {
    let calibration = test_calibration();
    let buf = full_report(0, 0, 0);
    let status = status::decode(&buf, JoyconSide::Left, &calibration).unwrap();
    assert_eq!(status.stick.direction, StickDirection::Center);
}
