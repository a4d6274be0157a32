//! The 7-bit value domain shared by every Protocol 2000 field.
//!
//! Bit 7 of every byte on the wire is reserved for framing, so input,
//! output, and machine id fields can only carry values in `0..128`.
//! Values outside that range are rejected here, never clamped.

use crate::error::{Error, Result};

/// Smallest value a protocol field can carry.
pub const VALUE_MIN: u8 = 0;

/// One past the largest value a protocol field can carry.
pub const VALUE_LIMIT: i64 = 128;

/// Largest value a protocol field can carry.
pub const VALUE_MAX: u8 = 127;

/// Machine id that addresses every device on the link.
///
/// Devices answer an instruction carrying this id regardless of their own
/// configured machine number.
pub const BROADCAST_MACHINE_ID: u8 = 0b0100_0001;

/// Validate an optional protocol value, substituting `default` when absent.
///
/// # Example
///
/// ```
/// use p2k_core::value::{validate, BROADCAST_MACHINE_ID};
///
/// assert_eq!(validate(None, BROADCAST_MACHINE_ID).unwrap(), 0x41);
/// assert_eq!(validate(Some(127), 0).unwrap(), 127);
/// assert!(validate(Some(128), 0).is_err());
/// ```
pub fn validate(value: Option<i64>, default: u8) -> Result<u8> {
    match value {
        None => Ok(default),
        Some(v) => check(v),
    }
}

/// Validate a single protocol value.
pub fn check(value: i64) -> Result<u8> {
    if (i64::from(VALUE_MIN)..VALUE_LIMIT).contains(&value) {
        Ok(value as u8)
    } else {
        Err(Error::OutOfRange {
            value,
            min: VALUE_MIN,
            max: VALUE_MAX,
        })
    }
}

/// Clamp a caller-supplied index into `[0, upper]`.
///
/// This is the semantic clamp applied to input/output numbers before they
/// are turned into protocol fields. It does not replace [`check`]: the
/// clamped value is still validated when the instruction is built.
pub fn clamp_index(value: i64, upper: u8) -> i64 {
    value.clamp(0, i64::from(upper))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_value_takes_default() {
        assert_eq!(validate(None, 0).unwrap(), 0);
        assert_eq!(validate(None, BROADCAST_MACHINE_ID).unwrap(), 0x41);
    }

    #[test]
    fn boundaries() {
        assert_eq!(check(0).unwrap(), 0);
        assert_eq!(check(127).unwrap(), 127);
        assert!(matches!(
            check(128),
            Err(Error::OutOfRange {
                value: 128,
                min: 0,
                max: 127
            })
        ));
        assert!(matches!(check(-1), Err(Error::OutOfRange { value: -1, .. })));
    }

    #[test]
    fn present_value_ignores_default() {
        assert_eq!(validate(Some(5), BROADCAST_MACHINE_ID).unwrap(), 5);
        assert!(validate(Some(300), BROADCAST_MACHINE_ID).is_err());
    }

    #[test]
    fn clamp_index_bounds() {
        assert_eq!(clamp_index(-3, 8), 0);
        assert_eq!(clamp_index(4, 8), 4);
        assert_eq!(clamp_index(12, 8), 8);
        assert_eq!(clamp_index(5, 0), 0);
    }
}
