//! Rumble quantization.
//!
//! The vibration actuators take independent high-band and low-band
//! settings. Frequency and amplitude are quantized on a log2 scale and
//! bit-packed into the byte pairs the device expects.

/// The actuators are not rated above this frequency.
const MAX_FREQUENCY_HZ: f64 = 1252.0;

/// Quantize a frequency in Hz into the high-band / low-band encoding.
/// The high-band value is a 9-bit field split across two payload bytes.
pub fn encode_frequency(frequency: f64) -> (u16, u8) {
    let frequency = frequency.min(MAX_FREQUENCY_HZ);
    let encoded = ((frequency / 10.0).log2() * 32.0).round() as u8;
    // High band range 0x0004-0x01FC in steps of 4, low band 0x01-0x7F.
    let high = (encoded.wrapping_sub(0x60) as u16) * 4;
    let low = encoded.wrapping_sub(0x40);
    (high, low)
}

/// Quantize an amplitude in [0, 1] into the high-band / low-band
/// encoding. Amplitudes at or below 0.12 encode to silence.
pub fn encode_amplitude(amplitude: f64) -> (u16, u8) {
    let amplitude = amplitude.min(1.0);
    let encoded: u8 = if amplitude > 0.23 {
        ((amplitude * 8.7).log2() * 32.0).round() as u8
    } else if amplitude > 0.12 {
        ((amplitude * 17.0).log2() * 16.0).round() as u8
    } else {
        0
    };
    let high = encoded as u16 * 2;
    let low = encoded / 2 + 0x40;
    (high, low)
}

/// Build the 4-byte rumble pattern for one actuator from a frequency
/// and an amplitude.
pub fn encode(frequency: f64, amplitude: f64) -> [u8; 4] {
    let (freq_high, freq_low) = encode_frequency(frequency);
    let (amp_high, amp_low) = encode_amplitude(amplitude);

    [
        (freq_high & 0xFF) as u8,
        // Upper bit of the 9-bit frequency field rides in the amplitude byte
        ((amp_high & 0xFF) as u8).wrapping_add((freq_high >> 8) as u8),
        freq_low,
        amp_low,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_quantization() {
        // 320 Hz -> log2(32) * 32 = 160 = 0xA0
        let (high, low) = encode_frequency(320.0);
        assert_eq!(high, (0xA0 - 0x60) * 4);
        assert_eq!(low, 0xA0 - 0x40);
    }

    #[test]
    fn frequency_is_clamped() {
        assert_eq!(encode_frequency(9999.0), encode_frequency(MAX_FREQUENCY_HZ));
    }

    #[test]
    fn amplitude_bands() {
        // Above the 0.23 threshold: log2(0.5 * 8.7) * 32 rounds to 68.
        let (high, low) = encode_amplitude(0.5);
        assert_eq!(high, 68 * 2);
        assert_eq!(low, 68 / 2 + 0x40);

        // At or below 0.12 the amplitude encodes to silence.
        assert_eq!(encode_amplitude(0.05), (0, 0x40));
        assert_eq!(encode_amplitude(0.12), (0, 0x40));
    }

    #[test]
    fn amplitude_is_clamped() {
        assert_eq!(encode_amplitude(4.2), encode_amplitude(1.0));
    }

    #[test]
    fn pattern_packing() {
        assert_eq!(encode(320.0, 0.5), [0x00, 0x89, 0x60, 0x62]);
    }
}
