//! Field elements and the fixed-width codec
//!
//! All note fields, commitments and tree nodes are elements of the BN254 scalar
//! field. Externally they travel in two shapes:
//!
//! ```text
//! packed preimage:  31 bytes, little-endian, zero-padded   (hash inputs)
//! ledger word:      32 bytes, big-endian                    (bytes32 / uint256)
//! ```
//!
//! 31 bytes keeps every packed value below 2^248, safely under the ~254-bit modulus.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PrivacyError, Result};

/// Width of the packed little-endian encoding
pub const FIELD_WIDTH_BYTES: usize = 31;

/// Width of a ledger word
pub const WORD_BYTES: usize = 32;

static MODULUS: LazyLock<BigUint> =
    LazyLock::new(|| BigUint::from_bytes_le(&Fr::MODULUS.to_bytes_le()));

/// The BN254 scalar field modulus
pub fn modulus() -> &'static BigUint {
    &MODULUS
}

/// An integer strictly below the field modulus
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldElement(Fr);

impl FieldElement {
    pub fn zero() -> Self {
        Self(Fr::from(0u64))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Wrap an arkworks field element
    pub fn from_fr(f: Fr) -> Self {
        Self(f)
    }

    /// Convert to an arkworks field element
    pub fn to_fr(&self) -> Fr {
        self.0
    }

    /// Checked conversion from an unbounded integer
    pub fn from_biguint(value: &BigUint) -> Result<Self> {
        if value >= modulus() {
            return Err(PrivacyError::NonCanonicalField);
        }
        Ok(Self(Fr::from_le_bytes_mod_order(&value.to_bytes_le())))
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_le(&self.to_le_bytes())
    }

    /// Canonical little-endian bytes (32 bytes, top byte always small)
    pub fn to_le_bytes(&self) -> [u8; WORD_BYTES] {
        let bytes = self.0.into_bigint().to_bytes_le();
        let mut arr = [0u8; WORD_BYTES];
        arr[..bytes.len()].copy_from_slice(&bytes);
        arr
    }

    /// Big-endian ledger word (`bytes32` / `uint256`)
    pub fn to_be_bytes(&self) -> [u8; WORD_BYTES] {
        let mut arr = self.to_le_bytes();
        arr.reverse();
        arr
    }

    /// Parse a big-endian ledger word, rejecting values at or above the modulus
    pub fn from_be_bytes(bytes: &[u8; WORD_BYTES]) -> Result<Self> {
        Self::from_biguint(&BigUint::from_bytes_be(bytes))
    }

    /// `0x`-prefixed, 64 hex digits, big-endian
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    /// Parse big-endian hex with or without `0x`, up to 32 bytes
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 2 * WORD_BYTES {
            return Err(PrivacyError::InvalidHex(s.to_string()));
        }
        let value = BigUint::parse_bytes(digits.as_bytes(), 16)
            .ok_or_else(|| PrivacyError::InvalidHex(s.to_string()))?;
        Self::from_biguint(&value)
    }

    /// Number of significant bits
    pub fn bits(&self) -> u64 {
        self.to_biguint().bits()
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self(Fr::from(value))
    }
}

impl From<u128> for FieldElement {
    fn from(value: u128) -> Self {
        Self(Fr::from(value))
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

/// Decimal, the way snarkjs expects circuit inputs
impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

/// Accepts decimal, or hex when prefixed with `0x`
impl FromStr for FieldElement {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with("0x") {
            return Self::from_hex(s);
        }
        let value = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| PrivacyError::InvalidHex(format!("not a decimal integer: {s}")))?;
        Self::from_biguint(&value)
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Fixed-width codec
// ============================================================================

/// Little-endian, zero-padded to `width` bytes
///
/// Fails when the value needs more than `width * 8` bits or when `width` is
/// outside `1..=FIELD_WIDTH_BYTES`.
pub fn encode(value: &BigUint, width: usize) -> Result<Vec<u8>> {
    if width == 0 || width > FIELD_WIDTH_BYTES {
        return Err(PrivacyError::width(format!(
            "width {width} bytes is outside 1..={FIELD_WIDTH_BYTES}"
        )));
    }
    if value.bits() > (width as u64) * 8 {
        return Err(PrivacyError::width(format!(
            "value needs {} bits, width {width} holds {}",
            value.bits(),
            width * 8
        )));
    }

    let mut bytes = value.to_bytes_le();
    bytes.resize(width, 0);
    Ok(bytes)
}

/// Inverse of [`encode`]
pub fn decode(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_le(bytes)
}

pub fn encode_field(value: &FieldElement, width: usize) -> Result<Vec<u8>> {
    encode(&value.to_biguint(), width)
}

pub fn decode_field(bytes: &[u8]) -> Result<FieldElement> {
    FieldElement::from_biguint(&decode(bytes))
}

/// Concatenation of the `width`-byte encodings, in order
///
/// This is the byte preimage seen by byte-oriented commitment hashes.
pub fn encode_concat(values: &[FieldElement], width: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * width);
    for value in values {
        out.extend_from_slice(&encode_field(value, width)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_little_endian_and_padded() {
        let bytes = encode(&BigUint::from(0x0102u32), 4).unwrap();
        assert_eq!(bytes, vec![0x02, 0x01, 0x00, 0x00]);

        let zero = encode(&BigUint::from(0u32), FIELD_WIDTH_BYTES).unwrap();
        assert_eq!(zero, vec![0u8; FIELD_WIDTH_BYTES]);
    }

    #[test]
    fn test_round_trip_at_width_bounds() {
        for width in [1usize, 2, 8, 16, 31] {
            let max = (BigUint::from(1u8) << (width * 8)) - 1u8;
            let samples = [
                BigUint::from(0u8),
                BigUint::from(1u8),
                &max >> 1,
                max.clone(),
            ];
            for x in samples {
                let bytes = encode(&x, width).unwrap();
                assert_eq!(bytes.len(), width);
                assert_eq!(decode(&bytes), x);
            }
        }
    }

    #[test]
    fn test_value_too_wide_rejected() {
        let too_big = BigUint::from(1u8) << 16;
        assert!(matches!(
            encode(&too_big, 2),
            Err(PrivacyError::InvalidFieldWidth { .. })
        ));
    }

    #[test]
    fn test_width_beyond_field_capacity_rejected() {
        assert!(matches!(
            encode(&BigUint::from(1u8), 32),
            Err(PrivacyError::InvalidFieldWidth { .. })
        ));
        assert!(matches!(
            encode(&BigUint::from(0u8), 0),
            Err(PrivacyError::InvalidFieldWidth { .. })
        ));
    }

    #[test]
    fn test_modulus_is_not_canonical() {
        assert_eq!(
            FieldElement::from_biguint(modulus()),
            Err(PrivacyError::NonCanonicalField)
        );
        let below = modulus().clone() - 1u8;
        let fe = FieldElement::from_biguint(&below).unwrap();
        assert_eq!(fe.to_biguint(), below);
    }

    #[test]
    fn test_hex_is_big_endian() {
        let fe = FieldElement::from(0xabcdu64);
        let hex = fe.to_hex();
        assert_eq!(hex.len(), 66);
        assert!(hex.ends_with("abcd"));
        assert_eq!(FieldElement::from_hex(&hex).unwrap(), fe);
        assert_eq!(FieldElement::from_hex("abcd").unwrap(), fe);
        assert!(FieldElement::from_hex("0x").is_err());
        assert!(FieldElement::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_be_word_matches_hex() {
        let fe = FieldElement::from(1u64);
        let word = fe.to_be_bytes();
        assert_eq!(word[31], 1);
        assert!(word[..31].iter().all(|b| *b == 0));
        assert_eq!(FieldElement::from_be_bytes(&word).unwrap(), fe);
    }

    #[test]
    fn test_decimal_display_and_parse() {
        let fe = FieldElement::from(123456789u64);
        assert_eq!(fe.to_string(), "123456789");
        assert_eq!("123456789".parse::<FieldElement>().unwrap(), fe);
        assert_eq!("0x075bcd15".parse::<FieldElement>().unwrap(), fe);
        assert!("12a".parse::<FieldElement>().is_err());
    }

    #[test]
    fn test_serde_uses_decimal_strings() {
        let fe = FieldElement::from(42u64);
        let json = serde_json::to_string(&fe).unwrap();
        assert_eq!(json, "\"42\"");
        let back: FieldElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fe);
    }

    #[test]
    fn test_encode_concat_layout() {
        let values = [FieldElement::from(1u64), FieldElement::from(2u64)];
        let bytes = encode_concat(&values, FIELD_WIDTH_BYTES).unwrap();
        assert_eq!(bytes.len(), 2 * FIELD_WIDTH_BYTES);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[FIELD_WIDTH_BYTES], 2);
    }
}
