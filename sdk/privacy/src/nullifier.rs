//! Nullifier hashes
//!
//! ```text
//! NullifierHash = H1(nullifier)
//! ```
//!
//! Publishing the hash marks the owning note as spent without revealing which
//! commitment it belonged to. The ledger accepts each hash at most once; the
//! [`NullifierSet`] keeps a caller from proving two transitions off the same note.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{PrivacyError, Result};
use crate::field::FieldElement;

/// Public, one-way tag of a spent note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NullifierHash(pub FieldElement);

impl NullifierHash {
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

/// Local view of spent and in-flight nullifier hashes
///
/// A hash is reserved while its witness is out for proving, then either
/// confirmed (the ledger accepted it) or released (the attempt was discarded).
#[derive(Debug, Default)]
pub struct NullifierSet {
    spent: HashSet<NullifierHash>,
    in_flight: HashSet<NullifierHash>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_spent(&self, hash: &NullifierHash) -> bool {
        self.spent.contains(hash)
    }

    pub fn is_in_flight(&self, hash: &NullifierHash) -> bool {
        self.in_flight.contains(hash)
    }

    /// Claim a nullifier hash for one proving attempt
    ///
    /// The creation sentinel is shared by every new position and is never reserved.
    pub fn reserve(&mut self, hash: NullifierHash, sentinel: &NullifierHash) -> Result<()> {
        if &hash == sentinel {
            return Ok(());
        }
        if self.spent.contains(&hash) {
            return Err(PrivacyError::InvalidAction(format!(
                "note with nullifier hash {} is already spent",
                hash.to_hex()
            )));
        }
        if !self.in_flight.insert(hash) {
            return Err(PrivacyError::InvalidAction(format!(
                "note with nullifier hash {} already has a transition in flight",
                hash.to_hex()
            )));
        }
        Ok(())
    }

    /// Drop a reservation after the proving or submission step failed
    pub fn release(&mut self, hash: &NullifierHash) {
        self.in_flight.remove(hash);
    }

    /// Record a hash the ledger has accepted
    pub fn mark_spent(&mut self, hash: NullifierHash) {
        self.in_flight.remove(&hash);
        self.spent.insert(hash);
    }

    pub fn spent_count(&self) -> usize {
        self.spent.len()
    }
}
