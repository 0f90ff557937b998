//! Hexadecimal helpers.

use std::fmt;

/// Encode bytes as a lowercase hex string.
///
/// ```
/// use snmp_messenger::format::hex::encode;
///
/// assert_eq!(encode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
/// ```
pub fn encode(bytes: &[u8]) -> String {
    Bytes(bytes).to_string()
}

/// Decode a hex string, ignoring `:` and whitespace separators and an optional `0x` prefix.
///
/// Returns `None` for odd digit counts or non-hex characters.
///
/// ```
/// use snmp_messenger::format::hex::decode;
///
/// assert_eq!(decode("80:00:1f:88").unwrap(), vec![0x80, 0x00, 0x1f, 0x88]);
/// assert_eq!(decode("0xABCD").unwrap(), vec![0xab, 0xcd]);
/// assert!(decode("abc").is_none());
/// ```
pub fn decode(s: &str) -> Option<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let digits: Vec<u8> = s
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    if digits.len() % 2 != 0 {
        return None;
    }
    Some(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
}

/// Lazy hex formatter for log fields; formats only when displayed.
pub struct Bytes<'a>(pub &'a [u8]);

impl fmt::Display for Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
