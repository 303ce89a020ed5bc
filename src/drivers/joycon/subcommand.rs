//! Outbound subcommand framing.
//!
//! Configuration commands ride inside a fixed 49-byte output report:
//! report id, rolling sequence number, an 8-byte rumble payload and the
//! subcommand id plus its argument bytes.
//! https://github.com/dekuNukem/Nintendo_Switch_Reverse_Engineering/blob/master/bluetooth_hid_notes.md

use super::error::ProtocolError;
use super::hid_report::REPORT_LEN;
use super::transport::Transport;

/// Report id carried by subcommand frames.
pub const OUTPUT_REPORT_SUBCOMMAND: u8 = 0x01;
/// Report id carried by rumble-only frames.
pub const OUTPUT_REPORT_RUMBLE: u8 = 0x10;

/// Neutral rumble payload sent with every subcommand frame.
pub const NEUTRAL_RUMBLE: [u8; 8] = [0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40];

/// Offset of the subcommand payload within the frame.
const PAYLOAD_OFFSET: usize = 11;
/// Maximum number of payload bytes that fit after the subcommand id.
const MAX_PAYLOAD: usize = REPORT_LEN - PAYLOAD_OFFSET;

/// Device configuration subcommands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubcommandId {
    /// Set the type of input mode outputted from the device
    SetInputReportMode = 0x03,
    /// Set the state of the Host Controller Interface (disconnect/page/pair/off)
    SetHciState = 0x06,
    /// Read from the SPI flash
    SpiFlashRead = 0x10,
    /// Enable or disable the IMU
    EnableImu = 0x40,
    /// Enable or disable vibration
    EnableVibration = 0x48,
}

impl SubcommandId {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// Arguments to [SubcommandId::SetHciState].
pub const HCI_DISCONNECT: u8 = 0x00;
pub const HCI_REBOOT_AND_RECONNECT: u8 = 0x01;
pub const HCI_REBOOT_AND_PAIR: u8 = 0x02;

/// Builds outbound frames and owns the rolling sequence number for one
/// physical link. The counter advances by one (mod 16) on every encoded
/// frame and has no reset operation.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    sequence: u8,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&mut self) -> u8 {
        let seq = self.sequence;
        self.sequence = (self.sequence + 1) % 16;
        seq
    }

    /// Encode a subcommand frame with the neutral rumble payload.
    pub fn encode(
        &mut self,
        id: SubcommandId,
        payload: &[u8],
    ) -> Result<[u8; REPORT_LEN], ProtocolError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }

        let mut buf = [0u8; REPORT_LEN];
        buf[0] = OUTPUT_REPORT_SUBCOMMAND;
        buf[1] = self.next_sequence();
        buf[2..10].copy_from_slice(&NEUTRAL_RUMBLE);
        buf[10] = id.byte();
        buf[PAYLOAD_OFFSET..PAYLOAD_OFFSET + payload.len()].copy_from_slice(payload);
        Ok(buf)
    }

    /// Encode a rumble-only frame: no subcommand is attached and the
    /// rumble bytes are left zeroed.
    pub fn encode_rumble(&mut self) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; REPORT_LEN];
        buf[0] = OUTPUT_REPORT_RUMBLE;
        buf[1] = self.next_sequence();
        buf
    }
}

/// Encode and write one subcommand frame to the device.
pub fn send<T: Transport>(
    transport: &T,
    encoder: &mut FrameEncoder,
    id: SubcommandId,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    let buf = encoder.encode(id, payload)?;
    let written = transport.write_report(&buf)?;
    log::trace!("wrote subcommand {id:?} ({written} bytes)");
    Ok(())
}
