mod common;

use std::sync::Arc;

use common::{StubHasher, fe, stub_tree};
use zklend_privacy::{
    Commitment, FieldHasher, MerkleTree, PoseidonHasher, PrivacyError, TreeParams,
};

#[test]
fn height_two_root_matches_hand_computation() {
    // H(A, B) = 1 + 3*1 + 5*2 = 14, H(Z, Z) = 1, root = 1 + 3*14 + 5*1 = 48
    let mut tree = stub_tree(2);
    tree.insert(fe(1)).unwrap();
    tree.insert(fe(2)).unwrap();

    assert_eq!(tree.root(), fe(48));
    assert_eq!(tree.recompute_root().unwrap(), fe(48));
}

#[test]
fn right_leaf_proof_matches_hand_computation() {
    let mut tree = stub_tree(2);
    tree.insert(fe(1)).unwrap();
    tree.insert(fe(2)).unwrap();

    let proof = tree.proof(&Commitment(fe(2))).unwrap();
    assert_eq!(proof.leaf_index, 1);
    assert_eq!(proof.path_elements, vec![fe(1), fe(1)]);
    assert_eq!(proof.path_indices, vec![1, 0]);
    assert_eq!(proof.compute_root(&fe(2), &StubHasher).unwrap(), fe(48));
}

#[test]
fn fifth_insert_into_height_two_fails() {
    let mut tree = stub_tree(2);
    for v in 1..=4 {
        tree.insert(fe(v)).unwrap();
    }

    assert!(matches!(
        tree.insert(fe(5)),
        Err(PrivacyError::CapacityExceeded { height: 2, capacity: 4 })
    ));
}

#[test]
fn every_prefix_snapshot_matches_incremental_root() {
    let hasher: Arc<dyn FieldHasher> = Arc::new(PoseidonHasher::new());
    let params = TreeParams::derive(5, fe(0), hasher.as_ref()).unwrap();
    let leaves: Vec<_> = (0..20u64).map(|v| fe(v * 31 + 1)).collect();

    let mut incremental = MerkleTree::new(params.clone(), hasher.clone()).unwrap();
    for (n, leaf) in leaves.iter().enumerate() {
        incremental.insert(*leaf).unwrap();

        let snapshot =
            MerkleTree::from_leaves(params.clone(), hasher.clone(), &leaves[..=n]).unwrap();
        assert_eq!(snapshot.root(), incremental.root());
        assert_eq!(snapshot.filled_subtrees(), incremental.filled_subtrees());
    }
}

#[test]
fn proofs_stay_valid_against_their_own_snapshot() {
    let mut tree = stub_tree(4);
    tree.insert(fe(10)).unwrap();
    let early = tree.proof_at(0).unwrap();

    for v in 11..20 {
        tree.insert(fe(v)).unwrap();
    }
    let late = tree.proof_at(0).unwrap();

    // both fold correctly, each to the root of the tree it was taken from
    assert!(early.verify(&fe(10), &StubHasher).unwrap());
    assert!(late.verify(&fe(10), &StubHasher).unwrap());
    assert_ne!(early.root, late.root);
}

#[test]
fn pinned_table_from_another_hasher_fails_verification() {
    let stub_params = TreeParams::derive(4, fe(0), &StubHasher).unwrap();
    assert!(stub_params.verify(&StubHasher).is_ok());
    assert!(matches!(
        stub_params.verify(&PoseidonHasher::new()),
        Err(PrivacyError::ZeroValueMismatch { level: 1 })
    ));
}
