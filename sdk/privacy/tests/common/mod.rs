#![allow(dead_code)]

use std::sync::Arc;

use ark_bn254::Fr;
use zklend_privacy::{
    CommitmentScheme, FieldElement, FieldHasher, HashPrimitiveError, HashSuite, MerkleTree,
    NullifierHash, NullifierSet, RootHistory, Transition, TreeParams, WitnessAssembler,
};

/// H(x0, x1, ..) = 1 + 3*x0 + 5*x1 + ..
///
/// Not one-way; only for checking tree shape with numbers computable by hand.
pub struct StubHasher;

impl FieldHasher for StubHasher {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashPrimitiveError> {
        let mut acc = Fr::from(1u64);
        for (i, x) in inputs.iter().enumerate() {
            acc += Fr::from(3 + 2 * i as u64) * x.to_fr();
        }
        Ok(FieldElement::from_fr(acc))
    }
}

pub fn fe(v: u64) -> FieldElement {
    FieldElement::from(v)
}

pub fn stub_tree(height: usize) -> MerkleTree {
    let params = TreeParams::derive(height, fe(0), &StubHasher).unwrap();
    MerkleTree::new(params, Arc::new(StubHasher)).unwrap()
}

/// In-memory stand-in for the ledger contract
///
/// Appends new commitments, keeps recent roots and rejects spent nullifier hashes.
pub struct MockLedger {
    pub params: TreeParams,
    pub suite: HashSuite,
    pub leaves: Vec<FieldElement>,
    pub roots: RootHistory,
    pub nullifiers: NullifierSet,
    pub sentinel: NullifierHash,
}

impl MockLedger {
    pub fn new(height: usize, suite: HashSuite) -> Self {
        let params = TreeParams::derive(height, fe(0), suite.node.as_ref()).unwrap();
        let empty = MerkleTree::new(params.clone(), suite.node.clone()).unwrap();
        let mut roots = RootHistory::default();
        roots.push(empty.root());
        let sentinel = CommitmentScheme::new(suite.commitment.clone())
            .sentinel_nullifier_hash()
            .unwrap();

        Self {
            params,
            suite,
            leaves: Vec::new(),
            roots,
            nullifiers: NullifierSet::new(),
            sentinel,
        }
    }

    pub fn assembler(&self) -> WitnessAssembler {
        WitnessAssembler::new(CommitmentScheme::new(self.suite.commitment.clone()))
    }

    /// Fresh snapshot from the current leaf sequence
    pub fn snapshot(&self) -> MerkleTree {
        MerkleTree::from_leaves(self.params.clone(), self.suite.node.clone(), &self.leaves).unwrap()
    }

    /// Accept a transition the way the contract would, minus proof verification
    pub fn submit(&mut self, transition: &Transition) -> Result<u64, String> {
        transition
            .ensure_current(&self.roots)
            .map_err(|e| e.to_string())?;

        let spent = transition.old_nullifier_hash;
        if spent != self.sentinel {
            if self.nullifiers.is_spent(&spent) {
                return Err("nullifier already spent".into());
            }
            self.nullifiers.mark_spent(spent);
        }

        let index = self.leaves.len() as u64;
        self.leaves.push(transition.new_commitment.to_field());
        self.roots.push(self.snapshot().root());
        Ok(index)
    }
}
