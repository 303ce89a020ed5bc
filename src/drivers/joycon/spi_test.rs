use crate::drivers::joycon::error::ProtocolError;
use crate::drivers::joycon::hid_report::REPORT_LEN;
use crate::drivers::joycon::spi::{self, FlashReadRequest, MAX_READ_LEN};
use crate::drivers::joycon::subcommand::FrameEncoder;
use crate::drivers::joycon::transport::fake::FakeTransport;

/// Build a flash read reply carrying the given data bytes.
pub(crate) fn flash_reply(data: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; REPORT_LEN];
    buf[0] = 0x21; // standard input report with replies
    buf[13] = 0x80; // ack
    buf[14] = 0x10; // flash read subcommand echo
    buf[20..20 + data.len()].copy_from_slice(data);
    buf
}

#[test]
fn returns_requested_bytes() {
    let transport = FakeTransport::new();
    transport.push_report(flash_reply(&[1, 2, 3, 4, 5, 6]));

    let mut encoder = FrameEncoder::new();
    let request = FlashReadRequest {
        address: spi::BODY_COLOR,
        size: 6,
    };
    let data = spi::read(&transport, &mut encoder, request).unwrap();
    assert_eq!(data, vec![1, 2, 3, 4, 5, 6]);

    // The request frame carries the little-endian address and the size.
    let writes = transport.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0][10], 0x10);
    assert_eq!(&writes[0][11..15], &spi::BODY_COLOR.to_le_bytes());
    assert_eq!(writes[0][15], 6);
}

#[test]
fn oversized_requests_are_clamped() {
    for size in [40u8, MAX_READ_LEN] {
        let transport = FakeTransport::new();
        transport.push_report(flash_reply(&[0xAB; MAX_READ_LEN as usize]));

        let mut encoder = FrameEncoder::new();
        let request = FlashReadRequest { address: 0x6050, size };
        let data = spi::read(&transport, &mut encoder, request).unwrap();

        assert_eq!(data.len(), MAX_READ_LEN as usize);
        assert_eq!(transport.writes()[0][15], MAX_READ_LEN);
    }
}

#[test]
fn unrelated_reports_are_discarded() {
    let transport = FakeTransport::new();
    // A standard full report arrives before the flash reply.
    let mut unrelated = vec![0u8; REPORT_LEN];
    unrelated[0] = 0x30;
    transport.push_report(unrelated);
    transport.push_report(flash_reply(&[7, 8, 9]));

    let mut encoder = FrameEncoder::new();
    let request = FlashReadRequest {
        address: 0x8012,
        size: 3,
    };
    let data = spi::read(&transport, &mut encoder, request).unwrap();
    assert_eq!(data, vec![7, 8, 9]);
}

#[test]
fn nack_is_reported() {
    let transport = FakeTransport::new();
    let mut reply = flash_reply(&[0; 4]);
    reply[13] = 0x00; // acknowledge flag unset
    transport.push_report(reply);

    let mut encoder = FrameEncoder::new();
    let request = FlashReadRequest {
        address: 0x6086,
        size: 4,
    };
    let err = spi::read(&transport, &mut encoder, request).unwrap_err();
    assert!(matches!(err, ProtocolError::Nack));
}

#[test]
fn timeout_is_distinct_from_io_failure() {
    let transport = FakeTransport::new();
    transport.push_timeout();

    let mut encoder = FrameEncoder::new();
    let request = FlashReadRequest {
        address: 0x6050,
        size: 6,
    };
    let err = spi::read(&transport, &mut encoder, request).unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));

    let transport = FakeTransport::new();
    transport.push_failure();
    let err = spi::read(&transport, &mut encoder, request).unwrap_err();
    assert!(matches!(err, ProtocolError::Device(_)));
}
