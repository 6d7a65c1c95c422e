//! Hash capabilities
//!
//! Two one-way functions are injected rather than hardcoded:
//!
//! ```text
//! H1 (commitment hasher)  note commitments and nullifier hashes
//! H2 (node hasher)        Merkle node combination
//! ```
//!
//! Both must be bit-compatible with the deployed circuit and verifying contract.
//! A mismatch is not detectable here: proofs simply fail external verification.

use std::fmt;
use std::sync::Arc;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::PrimeField;
use light_poseidon::{Poseidon, PoseidonHasher as _};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::field::{FIELD_WIDTH_BYTES, FieldElement, encode_concat};

/// Failure inside a hash primitive. Aborts the current operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Hash primitive failed: {0}")]
pub struct HashPrimitiveError(String);

impl HashPrimitiveError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A deterministic hash from an ordered sequence of field elements to one element
pub trait FieldHasher: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashPrimitiveError>;

    /// Combine two child nodes
    fn hash_pair(
        &self,
        left: &FieldElement,
        right: &FieldElement,
    ) -> Result<FieldElement, HashPrimitiveError> {
        self.hash(&[*left, *right])
    }
}

/// The pair of hash capabilities a deployment is pinned to
#[derive(Clone)]
pub struct HashSuite {
    /// H1
    pub commitment: Arc<dyn FieldHasher>,
    /// H2
    pub node: Arc<dyn FieldHasher>,
}

impl HashSuite {
    pub fn new(commitment: Arc<dyn FieldHasher>, node: Arc<dyn FieldHasher>) -> Self {
        Self { commitment, node }
    }

    /// Poseidon for both roles
    pub fn poseidon() -> Self {
        let poseidon = Arc::new(PoseidonHasher::new());
        Self {
            commitment: poseidon.clone(),
            node: poseidon,
        }
    }
}

impl fmt::Debug for HashSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashSuite")
            .field("commitment", &self.commitment.name())
            .field("node", &self.node.name())
            .finish()
    }
}

/// Built-in adapters, selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HasherKind {
    #[default]
    Poseidon,
    PoseidonSponge,
    PackedKeccak,
    Keccak,
}

impl HasherKind {
    pub fn build(self) -> Arc<dyn FieldHasher> {
        match self {
            HasherKind::Poseidon => Arc::new(PoseidonHasher::new()),
            HasherKind::PoseidonSponge => Arc::new(PoseidonSpongeHasher::new()),
            HasherKind::PackedKeccak => Arc::new(PackedKeccakHasher),
            HasherKind::Keccak => Arc::new(KeccakHasher),
        }
    }
}

impl std::str::FromStr for HasherKind {
    type Err = HashPrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poseidon" => Ok(HasherKind::Poseidon),
            "poseidon-sponge" => Ok(HasherKind::PoseidonSponge),
            "packed-keccak" => Ok(HasherKind::PackedKeccak),
            "keccak" => Ok(HasherKind::Keccak),
            other => Err(HashPrimitiveError::new(format!("unknown hasher: {other}"))),
        }
    }
}

// ============================================================================
// Poseidon
// ============================================================================

/// circomlib Poseidon over the BN254 scalar field
///
/// One permutation of width `n + 1` per call, with the circom round constants,
/// so `hash_pair` reproduces the ledger contract's zero values and node hashes.
/// Arity is separated by the width; 1 to 12 inputs are supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseidonHasher;

impl PoseidonHasher {
    pub fn new() -> Self {
        Self
    }
}

impl FieldHasher for PoseidonHasher {
    fn name(&self) -> &'static str {
        "poseidon"
    }

    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashPrimitiveError> {
        if inputs.is_empty() {
            return Err(HashPrimitiveError::new("poseidon called with no inputs"));
        }

        let mut poseidon = Poseidon::<Fr>::new_circom(inputs.len())
            .map_err(|e| HashPrimitiveError::new(format!("poseidon({}): {e}", inputs.len())))?;
        let frs: Vec<Fr> = inputs.iter().map(FieldElement::to_fr).collect();
        let result = poseidon
            .hash(&frs)
            .map_err(|e| HashPrimitiveError::new(format!("poseidon: {e}")))?;
        Ok(FieldElement::from_fr(result))
    }
}

/// Poseidon sponge over the BN254 scalar field
///
/// arkworks parameters, not circom compatible. The input count is absorbed
/// first so different arities never collide.
#[derive(Clone)]
pub struct PoseidonSpongeHasher {
    config: PoseidonConfig<Fr>,
}

impl PoseidonSpongeHasher {
    pub fn new() -> Self {
        Self {
            config: poseidon_config(),
        }
    }
}

impl Default for PoseidonSpongeHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldHasher for PoseidonSpongeHasher {
    fn name(&self) -> &'static str {
        "poseidon-sponge"
    }

    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashPrimitiveError> {
        if inputs.is_empty() {
            return Err(HashPrimitiveError::new("poseidon called with no inputs"));
        }

        let mut sponge = PoseidonSponge::new(&self.config);
        sponge.absorb(&Fr::from(inputs.len() as u64));
        for input in inputs {
            sponge.absorb(&input.to_fr());
        }

        let result: Fr = sponge.squeeze_field_elements(1)[0];
        Ok(FieldElement::from_fr(result))
    }
}

/// Poseidon configuration
///
/// Field: BN254 Fr (254 bits)
/// Rate: 2, Capacity: 1
/// Security: 128 bits
fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits: u64 = 254;
    let rate: usize = 2;
    let capacity: usize = 1;
    let full_rounds: u64 = 8;
    let partial_rounds: u64 = 57;
    let alpha: u64 = 5;
    let skip_matrices: u64 = 0;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        rate,
        full_rounds,
        partial_rounds,
        skip_matrices,
    );

    PoseidonConfig::new(
        full_rounds as usize,
        partial_rounds as usize,
        alpha,
        mds,
        ark,
        rate,
        capacity,
    )
}

// ============================================================================
// Packed Keccak
// ============================================================================

/// Keccak-256 over the packed 31-byte little-endian preimage, reduced mod p
///
/// ```text
/// H(x0..xn) = uint256(keccak256(le31(x0) || .. || le31(xn))) % FIELD_SIZE
/// ```
///
/// Inputs wider than 31 bytes cannot be packed and fail the hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedKeccakHasher;

impl FieldHasher for PackedKeccakHasher {
    fn name(&self) -> &'static str {
        "packed-keccak"
    }

    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashPrimitiveError> {
        let preimage = encode_concat(inputs, FIELD_WIDTH_BYTES)
            .map_err(|e| HashPrimitiveError::new(e.to_string()))?;
        let digest = Keccak256::digest(&preimage);
        Ok(FieldElement::from_fr(Fr::from_be_bytes_mod_order(&digest)))
    }
}

/// Keccak-256 over 32-byte big-endian words, reduced mod p
///
/// ```text
/// H(x0..xn) = uint256(keccak256(abi.encodePacked(bytes32(x0), .., bytes32(xn)))) % FIELD_SIZE
/// ```
///
/// Accepts any field element, so it can combine Merkle nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakHasher;

impl FieldHasher for KeccakHasher {
    fn name(&self) -> &'static str {
        "keccak"
    }

    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashPrimitiveError> {
        let mut hasher = Keccak256::new();
        for input in inputs {
            hasher.update(input.to_be_bytes());
        }
        let digest = hasher.finalize();
        Ok(FieldElement::from_fr(Fr::from_be_bytes_mod_order(&digest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poseidon_deterministic() {
        let hasher = PoseidonHasher::new();
        let inputs = [FieldElement::from(1u64), FieldElement::from(2u64)];

        let h1 = hasher.hash(&inputs).unwrap();
        let h2 = hasher.hash(&inputs).unwrap();

        assert_eq!(h1, h2, "same inputs should produce same hash");
    }

    #[test]
    fn test_poseidon_order_matters() {
        let hasher = PoseidonHasher::new();
        let a = FieldElement::from(1u64);
        let b = FieldElement::from(2u64);

        assert_ne!(
            hasher.hash_pair(&a, &b).unwrap(),
            hasher.hash_pair(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_poseidon_matches_circomlib() {
        // circomlibjs poseidon([1, 2])
        let expected = FieldElement::from_hex(
            "0x115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a",
        )
        .unwrap();
        let hash = PoseidonHasher::new()
            .hash_pair(&FieldElement::from(1u64), &FieldElement::from(2u64))
            .unwrap();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_poseidon_arity_separated() {
        let zero = FieldElement::zero();
        for hasher in [HasherKind::Poseidon.build(), HasherKind::PoseidonSponge.build()] {
            assert_ne!(
                hasher.hash(&[zero]).unwrap(),
                hasher.hash(&[zero, zero]).unwrap(),
                "{}",
                hasher.name()
            );
        }
    }

    #[test]
    fn test_poseidon_rejects_empty_input() {
        assert!(PoseidonHasher::new().hash(&[]).is_err());
        assert!(PoseidonSpongeHasher::new().hash(&[]).is_err());
    }

    #[test]
    fn test_poseidon_rejects_too_many_inputs() {
        let inputs = vec![FieldElement::from(1u64); 13];
        assert!(PoseidonHasher::new().hash(&inputs).is_err());
        assert!(PoseidonHasher::new().hash(&inputs[..6]).is_ok());
    }

    #[test]
    fn test_sponge_differs_from_circom() {
        let a = FieldElement::from(1u64);
        assert_ne!(
            PoseidonHasher::new().hash_pair(&a, &a).unwrap(),
            PoseidonSpongeHasher::new().hash_pair(&a, &a).unwrap()
        );
    }

    #[test]
    fn test_packed_keccak_rejects_wide_inputs() {
        let wide = FieldElement::from_biguint(&(num_bigint::BigUint::from(1u8) << 250)).unwrap();
        assert!(PackedKeccakHasher.hash(&[wide]).is_err());
        assert!(PackedKeccakHasher.hash(&[FieldElement::from(7u64)]).is_ok());
    }

    #[test]
    fn test_keccak_accepts_node_values() {
        let node = PoseidonHasher::new()
            .hash(&[FieldElement::from(1u64)])
            .unwrap();
        let parent = KeccakHasher.hash_pair(&node, &node).unwrap();
        assert_ne!(parent, node);
        assert_ne!(
            KeccakHasher.hash(&[FieldElement::from(7u64)]).unwrap(),
            PackedKeccakHasher.hash(&[FieldElement::from(7u64)]).unwrap()
        );
    }

    #[test]
    fn test_hasher_kind_parsing() {
        assert_eq!("poseidon".parse::<HasherKind>().unwrap(), HasherKind::Poseidon);
        assert_eq!(
            "packed-keccak".parse::<HasherKind>().unwrap(),
            HasherKind::PackedKeccak
        );
        assert_eq!("keccak".parse::<HasherKind>().unwrap(), HasherKind::Keccak);
        assert_eq!(
            "poseidon-sponge".parse::<HasherKind>().unwrap(),
            HasherKind::PoseidonSponge
        );
        assert!("sha1".parse::<HasherKind>().is_err());
        assert_eq!(HasherKind::PackedKeccak.build().name(), "packed-keccak");
    }
}
