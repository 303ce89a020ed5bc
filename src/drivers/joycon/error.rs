use thiserror::Error;

use super::hid_report::REPORT_LEN;

/// Errors produced by the subcommand codec, the SPI flash read protocol
/// and the input report decoder. These are always returned to the
/// caller; only the session read loop applies a retry policy.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("timed out waiting for a subcommand reply")]
    Timeout,
    #[error("device did not acknowledge the request")]
    Nack,
    #[error("input report is {0} bytes, expected {REPORT_LEN}")]
    Truncated(usize),
    #[error("unsupported input report id {0:#04x}")]
    UnsupportedReport(u8),
    #[error("subcommand payload is {0} bytes, larger than the frame allows")]
    PayloadTooLarge(usize),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Errors related to the underlying HID device handle.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("failed to open device: {0}")]
    OpenFailed(String),
    #[error("device is already open")]
    AlreadyOpen,
    #[error("device is already closed")]
    AlreadyClosed,
    #[error("device i/o failure: {0}")]
    IoFailure(String),
}

impl From<hidapi::HidError> for DeviceError {
    fn from(err: hidapi::HidError) -> Self {
        DeviceError::IoFailure(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("product id {0:#06x} is not a known Joy-Con side")]
    UnknownSide(u16),
}

/// Umbrella error for session-level operations that can fail anywhere
/// in the protocol stack.
#[derive(Error, Debug)]
pub enum JoyconError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}
