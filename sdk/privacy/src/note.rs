//! Position Notes
//!
//! A Note is the full confidential record of a lending position.
//!
//! ```text
//! Note = {
//!     lend_amt:       F,   // collateral supplied
//!     borrow_amt:     F,   // debt outstanding
//!     will_liq_price: F,   // price at which the position liquidates
//!     timestamp:      F,   // when this note was produced
//!     nullifier:      F,   // 248 bits of fresh entropy
//!     secret:         F,   // 248 bits of fresh entropy
//! }
//! ```
//!
//! Notes are immutable. Every deposit/borrow/repay/withdraw spends the current
//! note and produces a successor with fresh spend material.

use std::fmt;

use log::debug;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::commitment::{Commitment, CommitmentScheme};
use crate::entropy::SecureEntropy;
use crate::error::{PrivacyError, Result};
use crate::field::{FIELD_WIDTH_BYTES, FieldElement, encode_field};
use crate::nullifier::NullifierHash;

/// A confidential position note
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub lend_amt: FieldElement,
    pub borrow_amt: FieldElement,
    pub will_liq_price: FieldElement,
    pub timestamp: FieldElement,
    pub nullifier: FieldElement,
    pub secret: FieldElement,
}

/// The four non-negative effects an operation can have on a note
///
/// ```text
/// deposit  -> lend_in      lend   += x
/// withdraw -> lend_out     lend   -= x
/// borrow   -> borrow_out   borrow += x
/// repay    -> borrow_in    borrow -= x
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deltas {
    pub lend_in: u128,
    pub borrow_in: u128,
    pub lend_out: u128,
    pub borrow_out: u128,
}

impl Note {
    /// The "no prior note" sentinel used when opening a position
    pub fn zero() -> Self {
        let zero = FieldElement::zero();
        Self {
            lend_amt: zero,
            borrow_amt: zero,
            will_liq_price: zero,
            timestamp: zero,
            nullifier: zero,
            secret: zero,
        }
    }

    pub fn is_zero(&self) -> bool {
        self == &Self::zero()
    }

    /// Create a note with fresh nullifier and secret
    pub fn create<E: SecureEntropy + ?Sized>(
        lend_amt: FieldElement,
        borrow_amt: FieldElement,
        will_liq_price: FieldElement,
        timestamp: FieldElement,
        entropy: &mut E,
    ) -> Result<Self> {
        let nullifier = entropy.field_element()?;
        let secret = entropy.field_element()?;
        Self::with_secrets(
            lend_amt,
            borrow_amt,
            will_liq_price,
            timestamp,
            nullifier,
            secret,
        )
    }

    /// Create a note with explicit spend material (for recovery)
    pub fn with_secrets(
        lend_amt: FieldElement,
        borrow_amt: FieldElement,
        will_liq_price: FieldElement,
        timestamp: FieldElement,
        nullifier: FieldElement,
        secret: FieldElement,
    ) -> Result<Self> {
        let note = Self {
            lend_amt,
            borrow_amt,
            will_liq_price,
            timestamp,
            nullifier,
            secret,
        };
        for value in note.fields() {
            encode_field(&value, FIELD_WIDTH_BYTES)?;
        }
        Ok(note)
    }

    /// Fields in commitment order
    pub fn fields(&self) -> [FieldElement; 6] {
        [
            self.lend_amt,
            self.borrow_amt,
            self.will_liq_price,
            self.timestamp,
            self.nullifier,
            self.secret,
        ]
    }

    /// Successor note after applying `deltas`
    ///
    /// Spend material is always drawn fresh; the old nullifier and secret are never carried over.
    pub fn apply<E: SecureEntropy + ?Sized>(
        &self,
        deltas: &Deltas,
        will_liq_price: FieldElement,
        timestamp: FieldElement,
        entropy: &mut E,
    ) -> Result<Self> {
        let lend_amt = shift(&self.lend_amt, deltas.lend_in, deltas.lend_out, "lend_amt")?;
        let borrow_amt = shift(
            &self.borrow_amt,
            deltas.borrow_out,
            deltas.borrow_in,
            "borrow_amt",
        )?;

        debug!(
            "applying deltas (+{} -{} lend, +{} -{} borrow)",
            deltas.lend_in, deltas.lend_out, deltas.borrow_out, deltas.borrow_in
        );

        Self::create(lend_amt, borrow_amt, will_liq_price, timestamp, entropy)
    }

    pub fn commitment(&self, scheme: &CommitmentScheme) -> Result<Commitment> {
        scheme.commit(self)
    }

    pub fn nullifier_hash(&self, scheme: &CommitmentScheme) -> Result<NullifierHash> {
        scheme.nullifier_hash(self)
    }
}

/// `value + add - sub`, kept non-negative and packable
fn shift(value: &FieldElement, add: u128, sub: u128, field: &'static str) -> Result<FieldElement> {
    let raised = value.to_biguint() + BigUint::from(add);
    let sub = BigUint::from(sub);
    if raised < sub {
        return Err(PrivacyError::BalanceUnderflow { field });
    }
    let result = FieldElement::from_biguint(&(raised - sub))?;
    encode_field(&result, FIELD_WIDTH_BYTES)?;
    Ok(result)
}

impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("lend_amt", &self.lend_amt.to_string())
            .field("borrow_amt", &self.borrow_amt.to_string())
            .field("will_liq_price", &self.will_liq_price.to_string())
            .field("timestamp", &self.timestamp.to_string())
            .field("nullifier", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}
