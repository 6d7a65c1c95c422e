//! Error definitions for the note scheme, commitment tree and witness assembly.
//!
//! Every failure is surfaced to the caller as-is. Nothing in this crate retries:
//! re-snapshotting and rebuilding is the orchestrating caller's decision.

use thiserror::Error;

use crate::hash::HashPrimitiveError;

/// Errors that can occur while building notes, trees and witnesses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    /// A value does not fit the requested encoding width
    #[error("Invalid field width: {reason}")]
    InvalidFieldWidth { reason: String },

    /// An integer is not below the field modulus
    #[error("Value is not a canonical field element")]
    NonCanonicalField,

    /// Malformed hex input
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Proof requested for a commitment that is not in the tree
    #[error("Unknown leaf: {0}")]
    UnknownLeaf(String),

    /// The tree already holds 2^height leaves
    #[error("Merkle tree is full: height {height} holds {capacity} leaves")]
    CapacityExceeded { height: usize, capacity: u64 },

    /// Secure randomness could not be obtained
    #[error("Secure entropy source unavailable: {0}")]
    EntropySourceUnavailable(String),

    /// The root a bundle was built against is no longer accepted by the ledger
    #[error("Stale root {root}: rebuild against a fresh leaf snapshot")]
    StaleRoot { root: String },

    /// The injected hash capability failed
    #[error(transparent)]
    HashPrimitive(#[from] HashPrimitiveError),

    /// Zero table length disagrees with the pinned height
    #[error("Tree height mismatch: expected {expected} zero values, got {actual}")]
    TreeHeightMismatch { expected: usize, actual: usize },

    /// A pinned zero value is not H2 of the level below
    #[error("Zero value table mismatch at level {level}")]
    ZeroValueMismatch { level: usize },

    /// Height outside the supported range
    #[error(
        "Invalid tree height: {0} (must be between 1 and {max})",
        max = crate::merkle::MAX_TREE_HEIGHT
    )]
    InvalidTreeHeight(usize),

    /// A delta would drive a balance below zero
    #[error("Balance underflow: {field} would become negative")]
    BalanceUnderflow { field: &'static str },

    /// The requested action does not make sense for the note it is applied to
    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

impl PrivacyError {
    pub(crate) fn width(reason: impl Into<String>) -> Self {
        Self::InvalidFieldWidth {
            reason: reason.into(),
        }
    }
}

/// Result type for privacy operations
pub type Result<T> = std::result::Result<T, PrivacyError>;
