//! BER definite-length codec (X.690 8.1.3).
//!
//! Short form for 0..=127, long form `0x81..=0x84` followed by big-endian
//! length octets. Indefinite form (`0x80`) is rejected.

use crate::error::{DecodeErrorKind, Error, Result};

/// Largest content length accepted while decoding.
pub const MAX_LENGTH: usize = 0x200000;

/// Encode a length for a reverse buffer.
///
/// The returned bytes are in reverse wire order; the count says how many of
/// them are valid.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];
    if len <= 127 {
        buf[0] = len as u8;
        return (buf, 1);
    }

    let mut count = 0;
    let mut rest = len;
    while rest > 0 && count < 4 {
        buf[count] = rest as u8;
        rest >>= 8;
        count += 1;
    }
    buf[count] = 0x80 | count as u8;
    (buf, count + 1)
}

/// Decode a length, returning `(length, bytes_consumed)`.
///
/// `base_offset` is the position of `data` inside the enclosing buffer and
/// is only used for error reporting.
pub fn decode_length(data: &[u8], base_offset: usize) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }
    if first == 0x80 {
        return Err(Error::decode(base_offset, DecodeErrorKind::IndefiniteLength));
    }

    let octets = (first & 0x7F) as usize;
    if octets > 4 {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthTooLong { octets },
        ));
    }
    let Some(body) = data.get(1..1 + octets) else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    let len = body.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if len > MAX_LENGTH {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthExceedsMax {
                length: len,
                max: MAX_LENGTH,
            },
        ));
    }
    Ok((len, 1 + octets))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(len: usize) -> Vec<u8> {
        let (buf, count) = encode_length(len);
        buf[..count].iter().rev().copied().collect()
    }

    #[test]
    fn short_form() {
        assert_eq!(wire(0), vec![0x00]);
        assert_eq!(wire(127), vec![0x7F]);
        assert_eq!(decode_length(&[0x7F], 0).unwrap(), (127, 1));
    }

    #[test]
    fn long_form() {
        assert_eq!(wire(128), vec![0x81, 0x80]);
        assert_eq!(wire(256), vec![0x82, 0x01, 0x00]);
        assert_eq!(wire(0x012345), vec![0x83, 0x01, 0x23, 0x45]);
        assert_eq!(decode_length(&[0x81, 0x80], 0).unwrap(), (128, 2));
        assert_eq!(decode_length(&[0x82, 0xFF, 0xFF], 0).unwrap(), (65535, 3));
    }

    #[test]
    fn non_minimal_long_form_is_accepted() {
        assert_eq!(decode_length(&[0x82, 0x00, 0x05], 0).unwrap(), (5, 3));
    }

    #[test]
    fn indefinite_rejected() {
        let err = decode_length(&[0x80], 7).unwrap_err();
        assert!(matches!(
            *err,
            Error::Decode {
                offset: 7,
                kind: DecodeErrorKind::IndefiniteLength
            }
        ));
    }

    #[test]
    fn truncated_and_oversized() {
        assert!(decode_length(&[], 0).is_err());
        assert!(decode_length(&[0x82, 0x01], 0).is_err());
        assert!(decode_length(&[0x85, 0, 0, 0, 0, 1], 0).is_err());

        let over = MAX_LENGTH + 1;
        let bytes = [0x83, (over >> 16) as u8, (over >> 8) as u8, over as u8];
        let err = decode_length(&bytes, 0).unwrap_err();
        assert!(matches!(
            *err,
            Error::Decode {
                kind: DecodeErrorKind::LengthExceedsMax { .. },
                ..
            }
        ));
    }
}
