//! Script interface for the ledger contract's test-suite
//!
//! Both commands print a single ABI-encoded tuple as `0x` hex with no trailing
//! newline, so the output can be decoded directly by the calling test.

use anyhow::{Context, Result};
use std::io::Write;

use zklend_config::ZkLendConfig;
use zklend_privacy::{
    CommitmentScheme, FieldElement, MerkleTree, Note, commitment_tuple, os_entropy, witness_tuple,
};

/// `commitment <lend> <borrow> <liq_price> <timestamp>`
///
/// Fresh note; prints `abi.encode(commitment, nullifier, secret)`.
pub fn commitment(config: &ZkLendConfig, args: &[String]) -> Result<()> {
    let [lend, borrow, liq_price, timestamp] = parse_fields::<4>(args)?;

    let suite = config.hash_suite();
    let scheme = CommitmentScheme::new(suite.commitment);
    let note = Note::create(lend, borrow, liq_price, timestamp, &mut os_entropy())?;
    let commitment = note.commitment(&scheme)?;

    log::debug!("new commitment {}", commitment.to_hex());
    emit(&commitment_tuple(
        &commitment.to_field(),
        &note.nullifier,
        &note.secret,
    ))
}

/// `witness <lend> <borrow> <liq_price> <timestamp> <nullifier> <secret> [leaves...]`
///
/// Rebuilds the tree from `leaves` and prints `abi.encode(0, root, nullifierHash)`.
pub fn witness(config: &ZkLendConfig, args: &[String]) -> Result<()> {
    if args.len() < 6 {
        anyhow::bail!(
            "Usage: witness <lend> <borrow> <liq_price> <timestamp> <nullifier> <secret> [leaves...]"
        );
    }
    let [lend, borrow, liq_price, timestamp, nullifier, secret] = parse_fields::<6>(&args[..6])?;
    let leaves = args[6..]
        .iter()
        .map(|l| l.parse::<FieldElement>().with_context(|| format!("Invalid leaf: {l}")))
        .collect::<Result<Vec<_>>>()?;

    let suite = config.hash_suite();
    let scheme = CommitmentScheme::new(suite.commitment);
    let note = Note::with_secrets(lend, borrow, liq_price, timestamp, nullifier, secret)?;

    let tree = MerkleTree::from_leaves(config.tree_params()?, suite.node, &leaves)?;
    let proof = tree.proof(&note.commitment(&scheme)?)?;
    let nullifier_hash = note.nullifier_hash(&scheme)?;

    emit(&witness_tuple(&proof.root, &nullifier_hash.to_field()))
}

fn parse_fields<const N: usize>(args: &[String]) -> Result<[FieldElement; N]> {
    if args.len() != N {
        anyhow::bail!("Expected {} numeric arguments, got {}", N, args.len());
    }
    let mut out = [FieldElement::zero(); N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg
            .parse()
            .with_context(|| format!("Invalid number: {arg}"))?;
    }
    Ok(out)
}

fn emit(encoded: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "0x{}", hex::encode(encoded))?;
    stdout.flush()?;
    Ok(())
}
