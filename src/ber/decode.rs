//! BER decoding over `Bytes`.
//!
//! Content is sliced rather than copied. Sub-decoders for constructed values
//! remember their position in the outer buffer so that error offsets always
//! refer to the original message.

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use bytes::Bytes;

/// BER reader over a byte buffer.
pub struct Decoder {
    data: Bytes,
    offset: usize,
    base: usize,
}

impl Decoder {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            offset: 0,
            base: 0,
        }
    }

    /// Create a decoder over a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Absolute offset of the next byte.
    pub fn offset(&self) -> usize {
        self.base + self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    pub fn remaining_slice(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    fn fail<T>(&self, kind: DecodeErrorKind) -> Result<T> {
        Err(Error::decode(self.offset(), kind))
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let Some(&byte) = self.data.get(self.offset) else {
            return self.fail(DecodeErrorKind::TruncatedData);
        };
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_tag(&mut self) -> Result<u8> {
        self.read_byte()
    }

    pub fn read_length(&mut self) -> Result<usize> {
        let (len, consumed) = decode_length(&self.data[self.offset..], self.offset())?;
        self.offset += consumed;
        Ok(len)
    }

    /// Slice off `len` bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        let end = self.offset.saturating_add(len);
        if end > self.data.len() {
            return self.fail(DecodeErrorKind::TlvOverflow);
        }
        let bytes = self.data.slice(self.offset..end);
        self.offset = end;
        Ok(bytes)
    }

    /// Read a tag, check it, and return the content length.
    pub fn expect_tag(&mut self, expected: u8) -> Result<usize> {
        let at = self.offset();
        let actual = self.read_tag()?;
        if actual != expected {
            return Err(Error::decode(
                at,
                DecodeErrorKind::UnexpectedTag { expected, actual },
            ));
        }
        self.read_length()
    }

    pub fn read_integer(&mut self) -> Result<i32> {
        let len = self.expect_tag(tag::universal::INTEGER)?;
        self.read_integer_value(len)
    }

    /// Decode `len` content octets as a signed 32-bit integer.
    pub fn read_integer_value(&mut self, len: usize) -> Result<i32> {
        if len == 0 {
            return self.fail(DecodeErrorKind::ZeroLengthInteger);
        }
        if len > 4 {
            return self.fail(DecodeErrorKind::IntegerOverflow);
        }
        let bytes = self.read_bytes(len)?;
        let init: i32 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
        Ok(bytes.iter().fold(init, |acc, &b| (acc << 8) | b as i32))
    }

    pub fn read_unsigned32(&mut self, expected_tag: u8) -> Result<u32> {
        let len = self.expect_tag(expected_tag)?;
        self.read_unsigned32_value(len)
    }

    /// Decode `len` content octets as an unsigned 32-bit value.
    ///
    /// One leading zero octet is allowed for the sign bit.
    pub fn read_unsigned32_value(&mut self, len: usize) -> Result<u32> {
        let value = self.read_unsigned_value(len, 4)?;
        Ok(value as u32)
    }

    /// Decode `len` content octets as a Counter64.
    pub fn read_counter64_value(&mut self, len: usize) -> Result<u64> {
        if len > 9 {
            return self.fail(DecodeErrorKind::Integer64TooLong { length: len });
        }
        self.read_unsigned_value(len, 8)
    }

    fn read_unsigned_value(&mut self, len: usize, width: usize) -> Result<u64> {
        if len == 0 {
            return self.fail(DecodeErrorKind::ZeroLengthInteger);
        }
        let at = self.offset();
        let bytes = self.read_bytes(len)?;
        let digits = match bytes.len() {
            n if n == width + 1 && bytes[0] == 0 => &bytes[1..],
            n if n <= width => &bytes[..],
            _ => return Err(Error::decode(at, DecodeErrorKind::IntegerOverflow)),
        };
        Ok(digits.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        if self.peek_tag() == Some(tag::universal::OCTET_STRING_CONSTRUCTED) {
            return self.fail(DecodeErrorKind::ConstructedOctetString);
        }
        let len = self.expect_tag(tag::universal::OCTET_STRING)?;
        self.read_bytes(len)
    }

    pub fn read_null(&mut self) -> Result<()> {
        let len = self.expect_tag(tag::universal::NULL)?;
        if len != 0 {
            return self.fail(DecodeErrorKind::InvalidNull);
        }
        Ok(())
    }

    pub fn read_oid(&mut self) -> Result<Oid> {
        let len = self.expect_tag(tag::universal::OBJECT_IDENTIFIER)?;
        self.read_oid_value(len)
    }

    pub fn read_oid_value(&mut self, len: usize) -> Result<Oid> {
        let at = self.offset();
        let bytes = self.read_bytes(len)?;
        Oid::from_ber(&bytes).map_err(|e| match *e {
            Error::Decode { kind, .. } => Error::decode(at, kind),
            _ => e,
        })
    }

    pub fn read_ip_address_value(&mut self, len: usize) -> Result<[u8; 4]> {
        if len != 4 {
            return self.fail(DecodeErrorKind::InvalidIpAddressLength { length: len });
        }
        let bytes = self.read_bytes(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn read_sequence(&mut self) -> Result<Decoder> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read a constructed value with `expected_tag`, returning a decoder over its contents.
    pub fn read_constructed(&mut self, expected_tag: u8) -> Result<Decoder> {
        let len = self.expect_tag(expected_tag)?;
        self.sub_decoder(len)
    }

    /// Decoder over the next `len` bytes.
    pub fn sub_decoder(&mut self, len: usize) -> Result<Decoder> {
        let base = self.offset();
        let data = self.read_bytes(len)?;
        Ok(Decoder {
            data,
            offset: 0,
            base,
        })
    }

    /// Skip one TLV without interpreting it.
    pub fn skip_tlv(&mut self) -> Result<()> {
        self.read_tag()?;
        let len = self.read_length()?;
        self.read_bytes(len).map(|_| ())
    }

    /// Fail if any bytes are left.
    pub fn finish(&self) -> Result<()> {
        if !self.is_empty() {
            return self.fail(DecodeErrorKind::TrailingData {
                remaining: self.remaining(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_integers() {
        let cases: &[(&[u8], i32)] = &[
            (&[0x02, 0x01, 0x00], 0),
            (&[0x02, 0x01, 0x7F], 127),
            (&[0x02, 0x02, 0x00, 0x80], 128),
            (&[0x02, 0x01, 0xFF], -1),
            (&[0x02, 0x02, 0xFF, 0x7F], -129),
            (&[0x02, 0x02, 0x00, 0x01], 1),
        ];
        for (bytes, expected) in cases {
            assert_eq!(Decoder::from_slice(bytes).read_integer().unwrap(), *expected);
        }
    }

    #[test]
    fn oversized_integer_rejected() {
        let mut dec = Decoder::from_slice(&[0x02, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05]);
        let err = dec.read_integer().unwrap_err();
        assert!(matches!(
            *err,
            Error::Decode {
                kind: DecodeErrorKind::IntegerOverflow,
                ..
            }
        ));
    }

    #[test]
    fn unsigned_with_sign_octet() {
        let mut dec = Decoder::from_slice(&[0x41, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(dec.read_unsigned32(0x41).unwrap(), u32::MAX);

        let mut dec = Decoder::from_slice(&[0x41, 0x05, 0x01, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(dec.read_unsigned32(0x41).is_err());
    }

    #[test]
    fn octet_string_and_null() {
        let mut dec = Decoder::from_slice(&[0x04, 0x05, b'h', b'e', b'l', b'l', b'o', 0x05, 0x00]);
        assert_eq!(&dec.read_octet_string().unwrap()[..], b"hello");
        dec.read_null().unwrap();
        assert!(dec.is_empty());
    }

    #[test]
    fn constructed_octet_string_rejected() {
        let mut dec = Decoder::from_slice(&[0x24, 0x03, 0x04, 0x01, 0x41]);
        assert!(dec.read_octet_string().is_err());
    }

    #[test]
    fn sequence_sub_decoder_reports_absolute_offsets() {
        // SEQUENCE { INTEGER 1, <truncated> }
        let mut dec = Decoder::from_slice(&[0x30, 0x04, 0x02, 0x01, 0x01, 0x02]);
        let mut seq = dec.read_sequence().unwrap();
        assert_eq!(seq.read_integer().unwrap(), 1);
        let err = seq.read_integer().unwrap_err();
        match *err {
            Error::Decode { offset, .. } => assert_eq!(offset, 6),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn unexpected_tag_names_both_tags() {
        let mut dec = Decoder::from_slice(&[0x04, 0x00]);
        let err = dec.read_integer().unwrap_err();
        assert!(matches!(
            *err,
            Error::Decode {
                offset: 0,
                kind: DecodeErrorKind::UnexpectedTag {
                    expected: 0x02,
                    actual: 0x04
                }
            }
        ));
    }

    #[test]
    fn skip_tlv_checks_bounds() {
        let mut dec = Decoder::from_slice(&[0x04, 0x82, 0x01, 0x00, 0xAA]);
        assert!(dec.skip_tlv().is_err());

        let mut dec = Decoder::from_slice(&[0x04, 0x01, 0xAA, 0x05, 0x00]);
        dec.skip_tlv().unwrap();
        assert_eq!(dec.peek_tag(), Some(0x05));
    }
}
