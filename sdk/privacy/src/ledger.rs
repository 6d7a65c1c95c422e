//! Ledger Call Encoding
//!
//! Solidity ABI encoding for the lending contract entry points and for the
//! ffi tuples its test-suite reads.
//!
//! ```text
//! deposit (bytes32 newNoteHash, bytes32 newWillLiqPrice, uint256 newTimestamp,
//!          bytes32 root, bytes32 oldNullifierHash, bytes proof,
//!          uint256 amount, address token)
//! borrow  (..., uint256 amount, address token, address to)
//! repay   (..., uint256 amount, address token)
//! withdraw(..., uint256 amount, address token, address to)
//! ```
//!
//! Only static words and a single `bytes` argument occur, so the encoder
//! handles exactly those two token kinds.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::error::{PrivacyError, Result};
use crate::field::{FieldElement, WORD_BYTES};
use crate::witness::Transition;

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    /// Left-padded ABI word
    pub fn to_word(&self) -> [u8; WORD_BYTES] {
        let mut word = [0u8; WORD_BYTES];
        word[12..].copy_from_slice(&self.0);
        word
    }

    /// The address as a public signal
    pub fn to_field(&self) -> FieldElement {
        FieldElement::from_fr(Fr::from_be_bytes_mod_order(&self.to_word()))
    }
}

impl FromStr for Address {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| PrivacyError::InvalidHex(format!("{s}: {e}")))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| PrivacyError::InvalidHex(format!("{s}: address must be 20 bytes")))?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An ABI argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiToken {
    /// Any static 32-byte value (bytes32, uint256, address)
    Word([u8; WORD_BYTES]),
    /// Dynamic `bytes`
    Bytes(Vec<u8>),
}

impl AbiToken {
    pub fn uint(value: u128) -> Self {
        AbiToken::Word(uint_word(value))
    }

    pub fn field(value: &FieldElement) -> Self {
        AbiToken::Word(value.to_be_bytes())
    }

    pub fn address(value: &Address) -> Self {
        AbiToken::Word(value.to_word())
    }

    fn type_name(&self, word_type: &'static str) -> &'static str {
        match self {
            AbiToken::Word(_) => word_type,
            AbiToken::Bytes(_) => "bytes",
        }
    }
}

/// First four bytes of Keccak-256 of the canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// `abi.encode(tokens...)`
pub fn encode_tuple(tokens: &[AbiToken]) -> Vec<u8> {
    let head_len = tokens.len() * WORD_BYTES;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            AbiToken::Word(word) => head.extend_from_slice(word),
            AbiToken::Bytes(data) => {
                let offset = (head_len + tail.len()) as u128;
                head.extend_from_slice(&uint_word(offset));

                tail.extend_from_slice(&uint_word(data.len() as u128));
                tail.extend_from_slice(data);
                let padded_len = data.len().div_ceil(WORD_BYTES) * WORD_BYTES;
                tail.resize(tail.len() + padded_len - data.len(), 0);
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn uint_word(value: u128) -> [u8; WORD_BYTES] {
    let mut word = [0u8; WORD_BYTES];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// A fully-argued contract call for one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCall {
    pub function: &'static str,
    pub arguments: Vec<AbiToken>,
}

impl LedgerCall {
    /// Arguments for submitting `transition` with an externally produced proof
    pub fn new(transition: &Transition, proof: Vec<u8>, token: Address) -> Result<Self> {
        let public = &transition.bundle.public;

        let mut arguments = vec![
            AbiToken::field(&public.new_note_hash),
            AbiToken::field(&public.new_will_liq_price),
            AbiToken::field(&public.new_timestamp),
            AbiToken::field(&public.root),
            AbiToken::field(&transition.old_nullifier_hash.to_field()),
            AbiToken::Bytes(proof),
            AbiToken::uint(transition.amount),
            AbiToken::address(&token),
        ];

        if transition.operation.pays_out() {
            let to = transition.recipient.ok_or_else(|| {
                PrivacyError::InvalidAction(format!(
                    "{} needs a recipient address",
                    transition.operation
                ))
            })?;
            arguments.push(AbiToken::address(&to));
        }

        Ok(Self {
            function: transition.operation.ledger_function(),
            arguments,
        })
    }

    /// Canonical signature, e.g. `repay(bytes32,bytes32,uint256,...)`
    pub fn signature(&self) -> String {
        // positional word types: the timestamp and amount are uint256, token/to are addresses
        let types: Vec<&str> = self
            .arguments
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                let word_type = match i {
                    2 | 6 => "uint256",
                    7 | 8 => "address",
                    _ => "bytes32",
                };
                arg.type_name(word_type)
            })
            .collect();
        format!("{}({})", self.function, types.join(","))
    }

    /// Selector followed by the encoded arguments
    pub fn calldata(&self) -> Vec<u8> {
        let mut data = selector(&self.signature()).to_vec();
        data.extend(encode_tuple(&self.arguments));
        data
    }
}

/// `abi.encode(bytes32 commitment, bytes32 nullifier, bytes32 secret)`
pub fn commitment_tuple(
    commitment: &FieldElement,
    nullifier: &FieldElement,
    secret: &FieldElement,
) -> Vec<u8> {
    encode_tuple(&[
        AbiToken::field(commitment),
        AbiToken::field(nullifier),
        AbiToken::field(secret),
    ])
}

/// `abi.encode(uint256 0, bytes32 root, bytes32 nullifierHash)`
pub fn witness_tuple(root: &FieldElement, nullifier_hash: &FieldElement) -> Vec<u8> {
    encode_tuple(&[
        AbiToken::uint(0),
        AbiToken::field(root),
        AbiToken::field(nullifier_hash),
    ])
}
