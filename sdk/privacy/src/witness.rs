//! Witness Assembly
//!
//! Turns a position transition into the input bundle for the external prover.
//!
//! ```text
//! old note ──┐
//! action   ──┼──> new note ──> new commitment ─────────────┐
//! entropy  ──┘                                             ├──> WitnessBundle
//! snapshot ──> root + path of old commitment ──────────────┤
//! old note ──> old nullifier hash ─────────────────────────┘
//! ```
//!
//! Opening a position spends the zero note: its nullifier hash is the shared
//! sentinel H1(0) and the path is all zeros. Root and path always come from the
//! same snapshot.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::commitment::{Commitment, CommitmentScheme};
use crate::entropy::SecureEntropy;
use crate::error::{PrivacyError, Result};
use crate::field::FieldElement;
use crate::ledger::Address;
use crate::merkle::{MerkleProof, MerkleTree, RootHistory};
use crate::note::{Deltas, Note};
use crate::nullifier::NullifierHash;

/// The ledger operation a transition is submitted as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Deposit,
    Borrow,
    Repay,
    Withdraw,
}

impl Operation {
    /// Contract function name. Creation goes through `deposit`.
    pub fn ledger_function(&self) -> &'static str {
        match self {
            Operation::Create | Operation::Deposit => "deposit",
            Operation::Borrow => "borrow",
            Operation::Repay => "repay",
            Operation::Withdraw => "withdraw",
        }
    }

    /// Whether the ledger sends tokens out to a recipient
    pub fn pays_out(&self) -> bool {
        matches!(self, Operation::Borrow | Operation::Withdraw)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Deposit => "deposit",
            Operation::Borrow => "borrow",
            Operation::Repay => "repay",
            Operation::Withdraw => "withdraw",
        };
        f.write_str(name)
    }
}

/// A single user action on a position
///
/// JSON form is `{ "kind": "borrow", "amount": 300 }`, keys in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ActionRepr", into = "ActionRepr")]
pub enum Action {
    Deposit(u128),
    Borrow(u128),
    Repay(u128),
    Withdraw(u128),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ActionKind {
    Deposit,
    Borrow,
    Repay,
    Withdraw,
}

// Plain struct so the amount is read in place; tagged enums buffer it and lose u128.
#[derive(Serialize, Deserialize)]
struct ActionRepr {
    kind: ActionKind,
    amount: u128,
}

impl From<ActionRepr> for Action {
    fn from(repr: ActionRepr) -> Self {
        match repr.kind {
            ActionKind::Deposit => Action::Deposit(repr.amount),
            ActionKind::Borrow => Action::Borrow(repr.amount),
            ActionKind::Repay => Action::Repay(repr.amount),
            ActionKind::Withdraw => Action::Withdraw(repr.amount),
        }
    }
}

impl From<Action> for ActionRepr {
    fn from(action: Action) -> Self {
        let kind = match action {
            Action::Deposit(_) => ActionKind::Deposit,
            Action::Borrow(_) => ActionKind::Borrow,
            Action::Repay(_) => ActionKind::Repay,
            Action::Withdraw(_) => ActionKind::Withdraw,
        };
        Self {
            kind,
            amount: action.amount(),
        }
    }
}

impl Action {
    pub fn amount(&self) -> u128 {
        match *self {
            Action::Deposit(x) | Action::Borrow(x) | Action::Repay(x) | Action::Withdraw(x) => x,
        }
    }

    pub fn deltas(&self) -> Deltas {
        match *self {
            Action::Deposit(x) => Deltas {
                lend_in: x,
                ..Default::default()
            },
            Action::Borrow(x) => Deltas {
                borrow_out: x,
                ..Default::default()
            },
            Action::Repay(x) => Deltas {
                borrow_in: x,
                ..Default::default()
            },
            Action::Withdraw(x) => Deltas {
                lend_out: x,
                ..Default::default()
            },
        }
    }

    /// Resolve against the note being spent; the zero note only accepts a deposit
    pub fn operation(&self, old: &Note) -> Result<Operation> {
        if old.is_zero() {
            return match self {
                Action::Deposit(_) => Ok(Operation::Create),
                other => Err(PrivacyError::InvalidAction(format!(
                    "a new position must open with a deposit, got {other}"
                ))),
            };
        }
        Ok(match self {
            Action::Deposit(_) => Operation::Deposit,
            Action::Borrow(_) => Operation::Borrow,
            Action::Repay(_) => Operation::Repay,
            Action::Withdraw(_) => Operation::Withdraw,
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Action::Deposit(_) => "deposit",
            Action::Borrow(_) => "borrow",
            Action::Repay(_) => "repay",
            Action::Withdraw(_) => "withdraw",
        };
        write!(f, "{kind} {}", self.amount())
    }
}

impl FromStr for Action {
    type Err = PrivacyError;

    /// Parses `"<kind> <amount>"`, e.g. `"borrow 300"`
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let (Some(kind), Some(amount), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(PrivacyError::InvalidAction(format!(
                "expected '<kind> <amount>', got '{s}'"
            )));
        };
        let amount: u128 = amount
            .parse()
            .map_err(|_| PrivacyError::InvalidAction(format!("bad amount '{amount}'")))?;

        match kind.to_ascii_lowercase().as_str() {
            "deposit" => Ok(Action::Deposit(amount)),
            "borrow" => Ok(Action::Borrow(amount)),
            "repay" => Ok(Action::Repay(amount)),
            "withdraw" => Ok(Action::Withdraw(amount)),
            other => Err(PrivacyError::InvalidAction(format!("unknown action '{other}'"))),
        }
    }
}

/// Public signals, in circuit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSignals {
    pub root: FieldElement,
    pub nullifier_hash: FieldElement,
    pub new_note_hash: FieldElement,
    pub new_will_liq_price: FieldElement,
    pub new_timestamp: FieldElement,
    pub recipient: FieldElement,
    pub relayer: FieldElement,
    pub fee: FieldElement,
    pub refund: FieldElement,
}

/// Private witness, in circuit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateWitness {
    pub old_lend_amt: FieldElement,
    pub old_borrow_amt: FieldElement,
    pub old_will_liq_price: FieldElement,
    pub old_timestamp: FieldElement,
    pub nullifier: FieldElement,
    pub secret: FieldElement,
    pub new_lend_amt: FieldElement,
    pub new_borrow_amt: FieldElement,
    pub new_nullifier: FieldElement,
    pub new_secret: FieldElement,
    pub lend_in: FieldElement,
    pub borrow_in: FieldElement,
    pub lend_out: FieldElement,
    pub borrow_out: FieldElement,
    pub path_elements: Vec<FieldElement>,
    pub path_indices: Vec<u8>,
}

/// Complete prover input. Serializes to the flat JSON object the proving
/// toolchain reads, public signals first.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessBundle {
    #[serde(flatten)]
    pub public: PublicSignals,
    #[serde(flatten)]
    pub private: PrivateWitness,
}

impl WitnessBundle {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Debug for WitnessBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WitnessBundle")
            .field("public", &self.public)
            .field("private", &"<redacted>")
            .finish()
    }
}

/// Everything a caller needs to prove and submit one state change
///
/// Single use: if proving or submission fails, discard it and assemble again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub operation: Operation,
    pub amount: u128,
    /// Payout address for borrow and withdraw
    pub recipient: Option<Address>,
    pub new_note: Note,
    pub new_commitment: Commitment,
    pub old_nullifier_hash: NullifierHash,
    pub bundle: WitnessBundle,
}

impl Transition {
    /// Snapshot root the bundle proves against
    pub fn root(&self) -> FieldElement {
        self.bundle.public.root
    }

    /// Fail with [`PrivacyError::StaleRoot`] if the ledger no longer accepts the root
    pub fn ensure_current(&self, history: &RootHistory) -> Result<()> {
        history.ensure_fresh(&self.root())
    }
}

/// What the user asks for in one transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionUpdate {
    pub action: Action,
    /// Liquidation price of the successor note
    pub will_liq_price: FieldElement,
    pub timestamp: FieldElement,
    /// Payout address, required for borrow and withdraw
    pub recipient: Option<Address>,
}

impl PositionUpdate {
    pub fn new(action: Action, will_liq_price: FieldElement, timestamp: FieldElement) -> Self {
        Self {
            action,
            will_liq_price,
            timestamp,
            recipient: None,
        }
    }

    pub fn with_recipient(mut self, recipient: Option<Address>) -> Self {
        self.recipient = recipient;
        self
    }
}

/// Builds transitions. Holds no state beyond H1.
#[derive(Debug, Clone)]
pub struct WitnessAssembler {
    scheme: CommitmentScheme,
}

impl WitnessAssembler {
    pub fn new(scheme: CommitmentScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &CommitmentScheme {
        &self.scheme
    }

    /// Assemble a transition from `old` against a freshly built `snapshot`
    pub fn assemble<E: SecureEntropy + ?Sized>(
        &self,
        old: &Note,
        update: PositionUpdate,
        snapshot: &MerkleTree,
        entropy: &mut E,
    ) -> Result<Transition> {
        let PositionUpdate {
            action,
            will_liq_price,
            timestamp,
            recipient,
        } = update;
        let operation = action.operation(old)?;
        let recipient = match (operation.pays_out(), recipient) {
            (true, Some(to)) => Some(to),
            (true, None) => {
                return Err(PrivacyError::InvalidAction(format!(
                    "{operation} needs a recipient address"
                )));
            }
            (false, _) => None,
        };

        let deltas = action.deltas();
        let new_note = old.apply(&deltas, will_liq_price, timestamp, entropy)?;
        let new_commitment = self.scheme.commit(&new_note)?;

        let (old_nullifier_hash, proof) = if operation == Operation::Create {
            (
                self.scheme.sentinel_nullifier_hash()?,
                MerkleProof::empty(snapshot.height(), snapshot.root()),
            )
        } else {
            let old_commitment = self.scheme.commit(old)?;
            (
                self.scheme.nullifier_hash(old)?,
                snapshot.proof(&old_commitment)?,
            )
        };

        debug!(
            "assembled {} against root {} (leaf {}, {} leaves in snapshot)",
            operation,
            proof.root.to_hex(),
            proof.leaf_index,
            snapshot.len()
        );

        let public = PublicSignals {
            root: proof.root,
            nullifier_hash: old_nullifier_hash.to_field(),
            new_note_hash: new_commitment.to_field(),
            new_will_liq_price: new_note.will_liq_price,
            new_timestamp: new_note.timestamp,
            recipient: recipient.map(|a| a.to_field()).unwrap_or_default(),
            relayer: FieldElement::zero(),
            fee: FieldElement::zero(),
            refund: FieldElement::zero(),
        };

        let private = PrivateWitness {
            old_lend_amt: old.lend_amt,
            old_borrow_amt: old.borrow_amt,
            old_will_liq_price: old.will_liq_price,
            old_timestamp: old.timestamp,
            nullifier: old.nullifier,
            secret: old.secret,
            new_lend_amt: new_note.lend_amt,
            new_borrow_amt: new_note.borrow_amt,
            new_nullifier: new_note.nullifier,
            new_secret: new_note.secret,
            lend_in: deltas.lend_in.into(),
            borrow_in: deltas.borrow_in.into(),
            lend_out: deltas.lend_out.into(),
            borrow_out: deltas.borrow_out.into(),
            path_elements: proof.path_elements,
            path_indices: proof.path_indices,
        };

        Ok(Transition {
            operation,
            amount: action.amount(),
            recipient,
            new_note,
            new_commitment,
            old_nullifier_hash,
            bundle: WitnessBundle { public, private },
        })
    }
}
