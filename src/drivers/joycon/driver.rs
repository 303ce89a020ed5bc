use std::thread;
use std::time::Duration;

use hidapi::{HidApi, HidDevice};

use super::error::{CalibrationError, DeviceError, ProtocolError};
use super::hid_report::REPORT_LEN;
use super::joystick::StickCalibration;
use super::spi::{self, FlashReadRequest};
use super::status::{self, DeviceStatus, Rgb};
use super::subcommand::{self, FrameEncoder, SubcommandId, HCI_DISCONNECT};
use super::transport::Transport;

// Hardware IDs. The vendor id is shared by every Joy-Con; the product
// id tells the halves apart.
pub const VID: u16 = 0x057E;
pub const PID_LEFT: u16 = 0x2006;
pub const PID_RIGHT: u16 = 0x2007;
/// Pro Controller, not supported
pub const PID_PRO_CONTROLLER: u16 = 0x2009;

/// How long to block on a single input report read.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Settling delay after each configuration subcommand. The firmware
/// drops commands that arrive faster than this.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Which half of the pair a device is, derived from its product id.
/// Any other product id is rejected at the discovery boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoyconSide {
    Left,
    Right,
}

impl JoyconSide {
    pub fn from_product_id(pid: u16) -> Result<Self, CalibrationError> {
        match pid {
            PID_LEFT => Ok(Self::Left),
            PID_RIGHT => Ok(Self::Right),
            other => Err(CalibrationError::UnknownSide(other)),
        }
    }

    pub fn product_id(self) -> u16 {
        match self {
            Self::Left => PID_LEFT,
            Self::Right => PID_RIGHT,
        }
    }
}

/// Blocking driver for one Joy-Con half. Owns the device handle and
/// the frame encoder (and with it the link's sequence counter).
pub struct Driver<T: Transport = HidDevice> {
    transport: T,
    side: JoyconSide,
    encoder: FrameEncoder,
}

impl Driver<HidDevice> {
    /// Open the device identified by (vendor id, product id, serial).
    pub fn open(side: JoyconSide, serial: &str) -> Result<Self, DeviceError> {
        let api = HidApi::new()?;
        let device = api
            .open_serial(VID, side.product_id(), serial)
            .map_err(|err| DeviceError::OpenFailed(err.to_string()))?;
        Ok(Self::new(device, side))
    }
}

impl<T: Transport> Driver<T> {
    pub fn new(transport: T, side: JoyconSide) -> Self {
        Self {
            transport,
            side,
            encoder: FrameEncoder::new(),
        }
    }

    pub fn side(&self) -> JoyconSide {
        self.side
    }

    /// Read the body and button colors from the flash color section.
    pub fn read_colors(&mut self) -> Result<(Rgb, Rgb), ProtocolError> {
        let data = self.read_flash(spi::BODY_COLOR, 6)?;
        let body = Rgb {
            r: data[0],
            g: data[1],
            b: data[2],
        };
        let buttons = Rgb {
            r: data[3],
            g: data[4],
            b: data[5],
        };
        Ok((body, buttons))
    }

    /// Read this side's stick calibration. The user calibration section
    /// is preferred; if it has never been written (every byte 255) the
    /// factory section is substituted. The deadzone radius comes from
    /// the device parameter section and is attached to the result.
    pub fn read_stick_calibration(&mut self) -> Result<StickCalibration, ProtocolError> {
        let user_address = match self.side {
            JoyconSide::Left => spi::LEFT_STICK_USER_CALIBRATION,
            JoyconSide::Right => spi::RIGHT_STICK_USER_CALIBRATION,
        };
        let mut raw = self.read_flash_array::<9>(user_address)?;

        if raw.iter().all(|&b| b == 255) {
            log::info!("stick was never user calibrated, falling back to factory calibration");
            let factory_address = match self.side {
                JoyconSide::Left => spi::LEFT_STICK_FACTORY_CALIBRATION,
                JoyconSide::Right => spi::RIGHT_STICK_FACTORY_CALIBRATION,
            };
            raw = self.read_flash_array::<9>(factory_address)?;
        }

        let parameters_address = match self.side {
            JoyconSide::Left => spi::LEFT_STICK_DEVICE_PARAMETERS,
            JoyconSide::Right => spi::RIGHT_STICK_DEVICE_PARAMETERS,
        };
        let parameters = self.read_flash_array::<5>(parameters_address)?;

        let mut calibration = StickCalibration::unmarshal(&raw, self.side);
        calibration.deadzone = parameters[3];
        Ok(calibration)
    }

    /// Run the configuration handshake: enable the IMU, enable
    /// vibration and switch the device into the 60Hz standard full
    /// report mode. Each subcommand is followed by a settling delay.
    pub fn configure(&mut self) -> Result<(), ProtocolError> {
        log::debug!("enabling IMU");
        self.send(SubcommandId::EnableImu, &[0x01])?;
        thread::sleep(SETTLE_DELAY);

        log::debug!("enabling vibration");
        self.send(SubcommandId::EnableVibration, &[0x01])?;
        thread::sleep(SETTLE_DELAY);

        log::debug!("setting standard full input report mode");
        self.send(SubcommandId::SetInputReportMode, &[0x30])?;
        thread::sleep(SETTLE_DELAY);

        Ok(())
    }

    /// Read and decode one input report. Returns `Ok(None)` when the
    /// read timed out or the frame was rejected by the decoder;
    /// rejections are dropped per frame, never escalated.
    pub fn poll(&mut self, calibration: &StickCalibration) -> Result<Option<DeviceStatus>, DeviceError> {
        let mut buf = [0u8; REPORT_LEN];
        let n = self.transport.read_report(&mut buf, READ_TIMEOUT)?;
        if n == 0 {
            return Ok(None);
        }

        match status::decode(&buf[..n], self.side, calibration) {
            Ok(status) => Ok(Some(status)),
            Err(err) => {
                log::debug!("dropping input report: {err}");
                Ok(None)
            }
        }
    }

    /// Power the device off over HCI.
    pub fn power_off(&mut self) -> Result<(), ProtocolError> {
        self.send(SubcommandId::SetHciState, &[HCI_DISCONNECT])
    }

    fn send(&mut self, id: SubcommandId, payload: &[u8]) -> Result<(), ProtocolError> {
        subcommand::send(&self.transport, &mut self.encoder, id, payload)
    }

    fn read_flash(&mut self, address: u32, size: u8) -> Result<Vec<u8>, ProtocolError> {
        spi::read(
            &self.transport,
            &mut self.encoder,
            FlashReadRequest { address, size },
        )
    }

    fn read_flash_array<const N: usize>(&mut self, address: u32) -> Result<[u8; N], ProtocolError> {
        let data = self.read_flash(address, N as u8)?;
        let len = data.len();
        data.try_into().map_err(|_| ProtocolError::Truncated(len))
    }
}
