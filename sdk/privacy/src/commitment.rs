//! Note Commitments
//!
//! ```text
//! Commitment    = H1(lend_amt, borrow_amt, will_liq_price, timestamp, nullifier, secret)
//! NullifierHash = H1(nullifier)
//! ```
//!
//! The field order is fixed by the circuit. Byte-oriented H1 adapters see the
//! six values as one 186-byte preimage of 31-byte little-endian words.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::FieldElement;
use crate::hash::FieldHasher;
use crate::note::Note;
use crate::nullifier::NullifierHash;

/// A note commitment, published as a Merkle leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(pub FieldElement);

impl Commitment {
    pub fn to_field(&self) -> FieldElement {
        self.0
    }

    /// Big-endian `bytes32` word
    pub fn to_word(&self) -> [u8; 32] {
        self.0.to_be_bytes()
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl From<FieldElement> for Commitment {
    fn from(f: FieldElement) -> Self {
        Self(f)
    }
}

/// Commitment scheme over the injected H1
#[derive(Clone)]
pub struct CommitmentScheme {
    hasher: Arc<dyn FieldHasher>,
}

impl CommitmentScheme {
    pub fn new(hasher: Arc<dyn FieldHasher>) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &Arc<dyn FieldHasher> {
        &self.hasher
    }

    /// Commit to every field of a note
    pub fn commit(&self, note: &Note) -> Result<Commitment> {
        Ok(Commitment(self.hasher.hash(&note.fields())?))
    }

    /// Hash a note's nullifier
    pub fn nullifier_hash(&self, note: &Note) -> Result<NullifierHash> {
        self.hash_nullifier(&note.nullifier)
    }

    /// The fixed nullifier hash of the zero note, H1(0)
    ///
    /// Shared by every position creation. No prior commitment exists to link it to.
    pub fn sentinel_nullifier_hash(&self) -> Result<NullifierHash> {
        self.hash_nullifier(&FieldElement::zero())
    }

    fn hash_nullifier(&self, nullifier: &FieldElement) -> Result<NullifierHash> {
        Ok(NullifierHash(self.hasher.hash(&[*nullifier])?))
    }
}

impl std::fmt::Debug for CommitmentScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitmentScheme")
            .field("hasher", &self.hasher.name())
            .finish()
    }
}
