use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use zklend_config::ZkLendConfig;
use zklend_privacy::{
    Action, Address, CommitmentScheme, FieldElement, LedgerCall, MerkleTree, Note, PositionUpdate,
    Transition, TreeParams, WitnessAssembler, os_entropy,
};

/// Input for `transition`
///
/// ```json
/// {
///   "note": null,
///   "action": { "kind": "deposit", "amount": 1000 },
///   "will_liq_price": "2500",
///   "timestamp": "1700000000",
///   "recipient": null,
///   "leaves": ["0x1f..", "0x0a.."]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Current note; absent when opening a position
    #[serde(default)]
    pub note: Option<Note>,
    pub action: Action,
    pub will_liq_price: FieldElement,
    pub timestamp: FieldElement,
    #[serde(default)]
    pub recipient: Option<Address>,
    /// Ledger leaf sequence, fetched right before this call
    #[serde(default)]
    pub leaves: Vec<FieldElement>,
}

/// `transition <request.json>`: prints the assembled transition as JSON
pub fn transition(config: &ZkLendConfig, request_path: &Path) -> Result<()> {
    let contents = fs::read_to_string(request_path)
        .with_context(|| format!("Failed to read request: {}", request_path.display()))?;
    let request: TransitionRequest = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse request: {}", request_path.display()))?;

    let suite = config.hash_suite();
    let snapshot = MerkleTree::from_leaves(config.tree_params()?, suite.node, &request.leaves)?;
    let assembler = WitnessAssembler::new(CommitmentScheme::new(suite.commitment));
    let old = request.note.unwrap_or_else(Note::zero);

    let update = PositionUpdate::new(request.action, request.will_liq_price, request.timestamp)
        .with_recipient(request.recipient);
    let transition = assembler.assemble(&old, update, &snapshot, &mut os_entropy())?;

    log::info!(
        "{} assembled against root {}",
        transition.operation,
        transition.root().to_hex()
    );
    println!("{}", serde_json::to_string_pretty(&transition)?);
    Ok(())
}

/// `calldata <transition.json> <proof-hex> <token>`: prints ledger calldata
pub fn calldata(
    config: &ZkLendConfig,
    transition_path: &Path,
    proof_hex: &str,
    token: &str,
) -> Result<()> {
    let contents = fs::read_to_string(transition_path)
        .with_context(|| format!("Failed to read transition: {}", transition_path.display()))?;
    let transition: Transition = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse transition: {}", transition_path.display()))?;

    let proof = hex::decode(proof_hex.strip_prefix("0x").unwrap_or(proof_hex))
        .context("Proof must be hex encoded")?;
    let token = config.token(token)?;

    let call = LedgerCall::new(&transition, proof, token)?;
    log::info!("{} on {}", call.signature(), config.ledger.contract);
    println!("0x{}", hex::encode(call.calldata()));
    Ok(())
}

/// `zeros <z0> <height>`: derives a zero table with the configured node hasher
pub fn zeros(config: &ZkLendConfig, zero_leaf: &str, height: &str) -> Result<()> {
    let zero_leaf: FieldElement = zero_leaf
        .parse()
        .with_context(|| format!("Invalid zero leaf: {zero_leaf}"))?;
    let height: usize = height
        .parse()
        .with_context(|| format!("Invalid height: {height}"))?;

    let suite = config.hash_suite();
    let params = TreeParams::derive(height, zero_leaf, suite.node.as_ref())?;
    for value in params.zero_values() {
        println!("{}", value.to_hex());
    }
    Ok(())
}

/// `check-zeros`: verifies the configured zero table against the configured node hasher
pub fn check_zeros(config: &ZkLendConfig) -> Result<()> {
    let params = config.tree_params()?;
    println!(
        "✅ {} zero values consistent with {}",
        params.height(),
        config.hash_suite().node.name()
    );
    Ok(())
}
