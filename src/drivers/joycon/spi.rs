//! SPI flash read protocol.
//!
//! Factory calibration, user calibration and color data live in the
//! device's SPI flash and are fetched with a read subcommand followed
//! by a correlated reply. The protocol is strictly half-duplex per
//! session: at most one read is outstanding at a time.

use std::time::{Duration, Instant};

use super::error::ProtocolError;
use super::hid_report::{ReportType, REPORT_LEN};
use super::subcommand::{self, FrameEncoder, SubcommandId};
use super::transport::Transport;

/// The device caps a single flash read at this many bytes.
pub const MAX_READ_LEN: u8 = 29;

/// How long to wait for the correlated reply.
const READ_DEADLINE: Duration = Duration::from_secs(1);

/// Offset of the data payload region in a flash read reply.
const DATA_OFFSET: usize = 20;
/// Offset of the acknowledge byte in a flash read reply.
const ACK_OFFSET: usize = 13;
/// Offset of the subcommand echo in a flash read reply.
const ECHO_OFFSET: usize = 14;

// Flash sections consumed by the driver.
pub const LEFT_STICK_FACTORY_CALIBRATION: u32 = 0x603D;
pub const RIGHT_STICK_FACTORY_CALIBRATION: u32 = 0x6046;
pub const BODY_COLOR: u32 = 0x6050;
pub const LEFT_STICK_DEVICE_PARAMETERS: u32 = 0x6086;
pub const RIGHT_STICK_DEVICE_PARAMETERS: u32 = 0x6098;
pub const LEFT_STICK_USER_CALIBRATION: u32 = 0x8012;
pub const RIGHT_STICK_USER_CALIBRATION: u32 = 0x801D;

/// A request to read a section of SPI flash memory.
#[derive(Debug, Clone, Copy)]
pub struct FlashReadRequest {
    /// Address of the subsection in SPI flash memory
    pub address: u32,
    /// Number of bytes to read, silently clamped to [MAX_READ_LEN]
    pub size: u8,
}

impl FlashReadRequest {
    fn payload(&self) -> [u8; 5] {
        let mut data = [0u8; 5];
        data[..4].copy_from_slice(&self.address.to_le_bytes());
        data[4] = self.size;
        data
    }
}

/// Read from the device's SPI flash and return the requested bytes.
///
/// Blocks for up to one second. Inbound frames that are not the reply
/// to this request are dropped, not queued.
pub fn read<T: Transport>(
    transport: &T,
    encoder: &mut FrameEncoder,
    request: FlashReadRequest,
) -> Result<Vec<u8>, ProtocolError> {
    let request = FlashReadRequest {
        address: request.address,
        size: request.size.min(MAX_READ_LEN),
    };
    subcommand::send(
        transport,
        encoder,
        SubcommandId::SpiFlashRead,
        &request.payload(),
    )?;

    let reply = await_reply(transport)?;

    let ack = (reply[ACK_OFFSET] >> 7) == 1;
    if !ack {
        return Err(ProtocolError::Nack);
    }

    let size = request.size as usize;
    Ok(reply[DATA_OFFSET..DATA_OFFSET + size].to_vec())
}

/// Read inbound frames until the flash read reply arrives or the
/// deadline elapses. Unrelated frames are discarded.
fn await_reply<T: Transport>(transport: &T) -> Result<[u8; REPORT_LEN], ProtocolError> {
    let deadline = Instant::now() + READ_DEADLINE;
    let mut buf = [0u8; REPORT_LEN];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ProtocolError::Timeout);
        }

        let n = transport.read_report(&mut buf, remaining)?;
        if n == 0 {
            return Err(ProtocolError::Timeout);
        }

        if buf[0] == ReportType::StandardWithReplies.byte()
            && buf[ECHO_OFFSET] == SubcommandId::SpiFlashRead.byte()
        {
            log::trace!("received flash read reply");
            return Ok(buf);
        }
        log::trace!(
            "discarding unrelated input report {:#04x} while awaiting flash reply",
            buf[0]
        );
    }
}
