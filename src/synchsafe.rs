//! Synchsafe integers: 28-bit values spread over four bytes, seven bits per
//! byte, most-significant group first.  The high bit of every byte is zero
//! so that no byte pattern can be mistaken for an MPEG frame sync.

use thiserror::Error;

/// Largest value representable in four synchsafe bytes.
pub const SYNCHSAFE_MAX: u32 = (1 << 28) - 1;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SynchsafeError {
    #[error("Value {0} does not fit in a 28-bit synchsafe integer (max {SYNCHSAFE_MAX})")]
    OutOfRange(u64),
}

/// Decode four synchsafe bytes.  High bits are ignored, not validated.
pub fn decode(bytes: [u8; 4]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| (acc << 7) | u32::from(b & 0x7F))
}

/// Encode `value` as four synchsafe bytes.
///
/// Values above [`SYNCHSAFE_MAX`] are rejected rather than truncated.
pub fn encode(value: u64) -> Result<[u8; 4], SynchsafeError> {
    if value > u64::from(SYNCHSAFE_MAX) {
        return Err(SynchsafeError::OutOfRange(value));
    }
    let v = value as u32;
    Ok([
        ((v >> 21) & 0x7F) as u8,
        ((v >> 14) & 0x7F) as u8,
        ((v >> 7) & 0x7F) as u8,
        (v & 0x7F) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_values() {
        assert_eq!(decode([0x00, 0x00, 0x00, 0x64]), 100);
        assert_eq!(decode([0x00, 0x00, 0x02, 0x01]), 257);
        assert_eq!(encode(257).unwrap(), [0x00, 0x00, 0x02, 0x01]);
        assert_eq!(encode(u64::from(SYNCHSAFE_MAX)).unwrap(), [0x7F; 4]);
    }

    #[test]
    fn decode_ignores_high_bits() {
        assert_eq!(decode([0x80, 0x80, 0x80, 0xE4]), 100);
    }

    #[test]
    fn encode_rejects_29_bit_values() {
        assert_eq!(encode(1 << 28), Err(SynchsafeError::OutOfRange(1 << 28)));
    }

    proptest! {
        #[test]
        fn roundtrip(x in 0u32..(1u32 << 28)) {
            let bytes = encode(u64::from(x)).unwrap();
            prop_assert!(bytes.iter().all(|b| b & 0x80 == 0));
            prop_assert_eq!(decode(bytes), x);
        }
    }
}
