//! Object Identifier (OID) type.
//!
//! An [`Oid`] is a non-empty sequence of `u32` arcs, stored in a `SmallVec`
//! so that typical MIB-2 identifiers never touch the heap.

use crate::error::{DecodeErrorKind, Error, Result};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Maximum number of arcs accepted when decoding (RFC 2578 Section 3.5).
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
///
/// Equality and ordering look only at the arcs. Ordering is lexicographic,
/// and a proper prefix sorts before its descendants. This is the order
/// agents return variables in during a walk.
///
/// ```
/// use snmp_messenger::oid::Oid;
///
/// let a: Oid = "1.3.6.1".parse().unwrap();
/// let b: Oid = "1.3.6.1.2".parse().unwrap();
/// assert!(a < b);
/// assert_eq!(a.to_string(), ".1.3.6.1");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an OID from arc values. Fails when `arcs` is empty.
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Result<Self> {
        let arcs: SmallVec<[u32; 16]> = arcs.into_iter().collect();
        if arcs.is_empty() {
            return Err(Error::InvalidOid("an OID needs at least one arc".into()).boxed());
        }
        Ok(Self { arcs })
    }

    /// Create an OID from a slice of arcs. Fails when `arcs` is empty.
    pub fn from_slice(arcs: &[u32]) -> Result<Self> {
        Self::new(arcs.iter().copied())
    }

    /// Create an OID from a fixed-size array; zero-length arrays are rejected at compile time.
    pub fn from_array<const N: usize>(arcs: [u32; N]) -> Self {
        const { assert!(N > 0, "an OID needs at least one arc") };
        Self {
            arcs: SmallVec::from_slice(&arcs),
        }
    }

    /// Parse dotted-decimal notation.
    ///
    /// Empty segments are skipped, so a leading dot (as printed by
    /// [`Display`](fmt::Display)) or a trailing dot is accepted.
    pub fn parse(s: &str) -> Result<Self> {
        let mut arcs = SmallVec::<[u32; 16]>::new();
        for part in s.split('.').filter(|p| !p.is_empty()) {
            let arc = part.parse::<u32>().map_err(|_| {
                Error::InvalidOid(format!("'{}': bad arc '{}'", s, part).into()).boxed()
            })?;
            arcs.push(arc);
        }
        if arcs.is_empty() {
            return Err(Error::InvalidOid(format!("'{}': no arcs", s).into()).boxed());
        }
        Ok(Self { arcs })
    }

    /// The arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `self` lies in the subtree rooted at `root` (or equals it).
    pub fn starts_with(&self, root: &Oid) -> bool {
        self.arcs.starts_with(&root.arcs)
    }

    /// All arcs but the last; `None` for a single-arc OID.
    pub fn parent(&self) -> Option<Oid> {
        (self.arcs.len() > 1).then(|| Oid {
            arcs: SmallVec::from_slice(&self.arcs[..self.arcs.len() - 1]),
        })
    }

    /// This OID extended by one arc.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Check that the OID survives BER encoding (X.690 8.19.4).
    ///
    /// The first two arcs share one sub-identifier, so there must be at
    /// least two arcs, the first must be 0, 1 or 2, and the second must be
    /// below 40 unless the first is 2.
    ///
    /// ```
    /// use snmp_messenger::oid;
    ///
    /// assert!(oid!(1, 3, 6, 1).validate().is_ok());
    /// assert!(oid!(2, 999).validate().is_ok());
    /// assert!(oid!(1).validate().is_err());
    /// assert!(oid!(1, 50, 1).validate().is_err());
    /// assert!(oid!(3, 0).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.first_subidentifier().is_some() {
            return Ok(());
        }
        let reason = match self.arcs[..] {
            [_] => "needs at least two arcs",
            [first, ..] if first > 2 => "first arc must be 0, 1 or 2",
            [_, second, ..] if second >= 40 && self.arcs[0] < 2 => {
                "second arc must be below 40 under arcs 0 and 1"
            }
            _ => "first sub-identifier exceeds 32 bits",
        };
        Err(Error::InvalidOid(format!("{}: {}", self, reason).into()).boxed())
    }

    /// `40 * X + Y`, or `None` when the pair cannot be encoded losslessly.
    fn first_subidentifier(&self) -> Option<u32> {
        let first = self.arcs[0];
        let second = *self.arcs.get(1)?;
        if first > 2 || (first < 2 && second >= 40) {
            return None;
        }
        first.checked_mul(40)?.checked_add(second)
    }

    /// BER content octets (X.690 8.19) of an OID that passed
    /// [`validate`](Self::validate).
    ///
    /// The messenger validates every outgoing OID before encoding. An OID
    /// that fails validation yields empty content, which no decoder accepts.
    pub(crate) fn to_ber_smallvec(&self) -> SmallVec<[u8; 64]> {
        let mut bytes = SmallVec::new();
        let Some(first) = self.first_subidentifier() else {
            return bytes;
        };
        push_subidentifier(&mut bytes, first);
        for &arc in self.arcs.iter().skip(2) {
            push_subidentifier(&mut bytes, arc);
        }
        bytes
    }

    /// BER content octets. Fails with [`Error::InvalidOid`] when the OID
    /// cannot be encoded without changing its arcs.
    pub fn to_ber(&self) -> Result<Vec<u8>> {
        self.validate()?;
        Ok(self.to_ber_smallvec().to_vec())
    }

    /// Decode BER content octets.
    ///
    /// The first sub-identifier splits into `X = v / 40`, `Y = v % 40`,
    /// with everything from 80 upwards belonging to arc 2.
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::decode(0, DecodeErrorKind::EmptyOid));
        }

        let mut arcs = SmallVec::<[u32; 16]>::new();
        let (first, mut pos) = read_subidentifier(data, 0)?;
        if first < 80 {
            arcs.push(first / 40);
            arcs.push(first % 40);
        } else {
            arcs.push(2);
            arcs.push(first - 80);
        }

        while pos < data.len() {
            let (arc, next) = read_subidentifier(data, pos)?;
            arcs.push(arc);
            pos = next;
            if arcs.len() > MAX_OID_LEN {
                return Err(Error::decode(
                    pos,
                    DecodeErrorKind::OidTooLong {
                        count: arcs.len(),
                        max: MAX_OID_LEN,
                    },
                ));
            }
        }

        Ok(Self { arcs })
    }
}

/// Minimal big-endian base-128, continuation bit on all but the last byte.
fn push_subidentifier(bytes: &mut SmallVec<[u8; 64]>, value: u32) {
    let groups = (32 - value.leading_zeros()).div_ceil(7).max(1);
    for i in (0..groups).rev() {
        let mut byte = ((value >> (i * 7)) & 0x7F) as u8;
        if i > 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
}

/// Read one sub-identifier starting at `pos`, returning it and the next position.
fn read_subidentifier(data: &[u8], mut pos: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    loop {
        let Some(&byte) = data.get(pos) else {
            return Err(Error::decode(pos, DecodeErrorKind::TruncatedData));
        };
        if value > (u32::MAX >> 7) {
            return Err(Error::decode(pos, DecodeErrorKind::OidArcOverflow));
        }
        value = (value << 7) | (byte & 0x7F) as u32;
        pos += 1;
        if byte & 0x80 == 0 {
            return Ok((value, pos));
        }
    }
}

impl Hash for Oid {
    /// XOR fold of all arcs; a zero fold becomes 1.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let fold = self.arcs.iter().fold(0u32, |acc, &arc| acc ^ arc);
        state.write_u32(if fold == 0 { 1 } else { fold });
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.arcs.as_slice().cmp(other.arcs.as_slice())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for arc in &self.arcs {
            write!(f, ".{}", arc)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::from_array(arcs)
    }
}

impl TryFrom<&[u32]> for Oid {
    type Error = Box<Error>;

    fn try_from(arcs: &[u32]) -> Result<Self> {
        Self::from_slice(arcs)
    }
}

/// Build an [`Oid`] from literal arcs.
///
/// ```
/// use snmp_messenger::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert!(sys_descr.starts_with(&oid!(1, 3, 6, 1, 2, 1, 1)));
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),+ $(,)?) => {
        $crate::oid::Oid::from_array([$($arc),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(oid: &Oid) -> u64 {
        let mut h = DefaultHasher::new();
        oid.hash(&mut h);
        h.finish()
    }

    #[test]
    fn parse_and_display() {
        let oid = Oid::parse("1.3.6.1.2.1.1.1.0").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 2, 1, 1, 1, 0]);
        assert_eq!(oid.to_string(), ".1.3.6.1.2.1.1.1.0");
    }

    #[test]
    fn parse_skips_empty_segments() {
        let expected = oid!(1, 3, 6);
        assert_eq!(Oid::parse(".1.3.6").unwrap(), expected);
        assert_eq!(Oid::parse("1.3.6.").unwrap(), expected);
        assert_eq!(Oid::parse("1..3.6").unwrap(), expected);
    }

    #[test]
    fn parse_rejects_garbage_and_empty() {
        assert!(matches!(*Oid::parse("1.3.x").unwrap_err(), Error::InvalidOid(_)));
        assert!(matches!(*Oid::parse("1.3.-6").unwrap_err(), Error::InvalidOid(_)));
        assert!(matches!(*Oid::parse("").unwrap_err(), Error::InvalidOid(_)));
        assert!(matches!(*Oid::parse("...").unwrap_err(), Error::InvalidOid(_)));
        assert!(Oid::new(Vec::new()).is_err());
        assert!(Oid::from_slice(&[]).is_err());
    }

    #[test]
    fn ordering() {
        let a = Oid::parse("1.3.6.1").unwrap();
        let b = Oid::parse("1.3.6.1.2").unwrap();
        let c = Oid::parse("1.3.6.2").unwrap();
        let d = Oid::parse("1.3.6.1.9.9").unwrap();
        assert_eq!(a.cmp(&b), Ordering::Less);
        assert_eq!(c.cmp(&d), Ordering::Greater);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn hash_is_xor_fold() {
        assert_eq!(hash_of(&oid!(1, 2, 3)), hash_of(&oid!(3, 2, 1)));
        // 1 ^ 1 == 0 folds to 1, same as the single arc 1.
        assert_eq!(hash_of(&oid!(1, 1)), hash_of(&oid!(1)));
        assert_eq!(hash_of(&oid!(1, 3, 6)), hash_of(&oid!(1, 3, 6)));
    }

    #[test]
    fn ber_encoding() {
        assert_eq!(oid!(1, 3, 6, 1).to_ber().unwrap(), vec![0x2B, 0x06, 0x01]);
        // 2.999.3: first sub-identifier 1079 = 0x88 0x37
        assert_eq!(oid!(2, 999, 3).to_ber().unwrap(), vec![0x88, 0x37, 0x03]);
        // 128 and 16384 need continuation bytes
        assert_eq!(
            oid!(1, 3, 128, 16384).to_ber().unwrap(),
            vec![0x2B, 0x81, 0x00, 0x81, 0x80, 0x00]
        );
        assert_eq!(
            oid!(1, 3, u32::MAX).to_ber().unwrap(),
            vec![0x2B, 0x8F, 0xFF, 0xFF, 0xFF, 0x7F]
        );
    }

    #[test]
    fn ber_round_trip() {
        for oid in [
            oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
            oid!(1, 3, 6, 1, 4, 1, 2021, 10, 1, 3, 1),
            oid!(2, 999, 3),
            oid!(0, 0),
            oid!(1, 3, u32::MAX, 0, 127, 128),
        ] {
            assert_eq!(Oid::from_ber(&oid.to_ber().unwrap()).unwrap(), oid);
        }
        // Largest first sub-identifier: 80 + (u32::MAX - 80)
        let widest = Oid::from_slice(&[2, u32::MAX - 80]).unwrap();
        assert_eq!(Oid::from_ber(&widest.to_ber().unwrap()).unwrap(), widest);
    }

    #[test]
    fn unencodable_oids_are_rejected() {
        let single = oid!(1);
        let wide_second = Oid::parse("1.50.1").unwrap();
        let huge_first = Oid::parse("4294967295.5").unwrap();
        let overflow = Oid::from_slice(&[2, u32::MAX - 79]).unwrap();

        for oid in [&single, &wide_second, &huge_first, &overflow] {
            let err = oid.to_ber().unwrap_err();
            assert!(matches!(*err, Error::InvalidOid(_)), "{oid}: {err}");
            assert!(oid.validate().is_err());
        }
        assert!(oid!(1).to_ber().unwrap_err().to_string().contains("two arcs"));
        assert!(wide_second.validate().unwrap_err().to_string().contains("below 40"));
        assert!(huge_first.validate().unwrap_err().to_string().contains("0, 1 or 2"));
        assert!(overflow.validate().unwrap_err().to_string().contains("32 bits"));
    }

    #[test]
    fn unencodable_oids_encode_to_undecodable_content() {
        for oid in [oid!(1), Oid::parse("1.50.1").unwrap(), Oid::parse("4294967295.5").unwrap()] {
            assert!(oid.to_ber_smallvec().is_empty());
            assert!(Oid::from_ber(&oid.to_ber_smallvec()).is_err());
        }
    }

    #[test]
    fn ber_decode_errors() {
        assert!(Oid::from_ber(&[]).is_err());
        // Continuation bit on the last byte
        assert!(Oid::from_ber(&[0x2B, 0x86]).is_err());
        // Arc larger than 32 bits
        assert!(Oid::from_ber(&[0x2B, 0x90, 0x80, 0x80, 0x80, 0x00]).is_err());
    }

    #[test]
    fn ber_decode_enforces_max_len() {
        let mut data = vec![0x2B];
        data.extend(std::iter::repeat_n(0x01, MAX_OID_LEN));
        assert!(Oid::from_ber(&data).is_err());
    }

    #[test]
    fn tree_navigation() {
        let system = oid!(1, 3, 6, 1, 2, 1, 1);
        let sys_descr = system.child(1).child(0);
        assert!(sys_descr.starts_with(&system));
        assert!(!system.starts_with(&sys_descr));
        assert_eq!(sys_descr.parent().unwrap(), system.child(1));
        assert!(oid!(1).parent().is_none());
    }
}
