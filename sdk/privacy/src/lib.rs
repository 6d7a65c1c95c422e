//! zkLend Privacy SDK
//!
//! Note-based primitives for confidential lending positions.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Position Transition                       │
//! │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │ Old Nullifier│  │    Root +    │  │   New Commitment    │  │
//! │  │ Hash (spent) │  │  Merkle path │  │   (new note leaf)   │  │
//! │  └──────────────┘  └──────────────┘  └─────────────────────┘  │
//! │         │                 │                     │             │
//! │         ▼                 ▼                     ▼             │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │          External prover (circuit inputs JSON)          │  │
//! │  │  • Old note is a leaf under root                        │  │
//! │  │  • Nullifier hash derives from the old note             │  │
//! │  │  • New balances = old balances ± deltas                 │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │                           │                                   │
//! │                           ▼                                   │
//! │              Ledger call (ABI encoded, see `ledger`)          │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hash functions are injected through [`FieldHasher`]; tree height and zero
//! values are pinned per deployment through [`TreeParams`].

pub mod commitment;
pub mod entropy;
pub mod error;
pub mod field;
pub mod hash;
pub mod ledger;
pub mod merkle;
pub mod note;
pub mod nullifier;
pub mod witness;

pub use commitment::{Commitment, CommitmentScheme};
pub use entropy::{SecureEntropy, os_entropy};
pub use error::{PrivacyError, Result};
pub use field::{FIELD_WIDTH_BYTES, FieldElement, WORD_BYTES};
pub use hash::{
    FieldHasher, HashPrimitiveError, HashSuite, HasherKind, KeccakHasher, PackedKeccakHasher,
    PoseidonHasher, PoseidonSpongeHasher,
};
pub use ledger::{AbiToken, Address, LedgerCall, commitment_tuple, witness_tuple};
pub use merkle::{
    MAX_TREE_HEIGHT, MerkleProof, MerkleTree, ROOT_HISTORY_SIZE, RootHistory, TreeParams,
};
pub use note::{Deltas, Note};
pub use nullifier::{NullifierHash, NullifierSet};
pub use witness::{
    Action, Operation, PositionUpdate, PrivateWitness, PublicSignals, Transition, WitnessAssembler,
    WitnessBundle,
};
