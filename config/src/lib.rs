//! zkLend Configuration
//!
//! Pins the deployment a client talks to: tree height and zero values, hash
//! adapters and ledger addresses.
//!
//! Handles loading configuration from:
//! 1. ZK_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.zklend/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

use zklend_privacy::{
    Address, FieldElement, HashSuite, HasherKind, ROOT_HISTORY_SIZE, RootHistory, TreeParams,
};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<ZkLendConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".zklend";

// ============================================================================
// Deployment Constants
// ============================================================================

const DEFAULT_TREE_HEIGHT: usize = 12;

/// Zero values hard-coded by the height-12 ledger contract, leaf level first
pub const HEIGHT_12_ZERO_VALUES: [&str; 12] = [
    "0x2fe54c60d3acabf3343a35b6eba15db4821b340f76e741e2249685ed4899af6c",
    "0x13e37f2d6cb86c78ccc1788607c2b199788c6bb0a615a21f2e7a8e88384222f8",
    "0x217126fa352c326896e8c2803eec8fd63ad50cf65edfef27a41a9e32dc622765",
    "0x0e28a61a9b3e91007d5a9e3ada18e1b24d6d230c618388ee5df34cacd7397eee",
    "0x27953447a6979839536badc5425ed15fadb0e292e9bc36f92f0aa5cfa5013587",
    "0x194191edbfb91d10f6a7afd315f33095410c7801c47175c2df6dc2cce0e3affc",
    "0x1733dece17d71190516dbaf1927936fa643dc7079fc0cc731de9d6845a47741f",
    "0x267855a7dc75db39d81d17f95d0a7aa572bf5ae19f4db0e84221d2b2ef999219",
    "0x1184e11836b4c36ad8238a340ecc0985eeba665327e33e9b0e3641027c27620d",
    "0x0702ab83a135d7f55350ab1bfaa90babd8fc1d2b3e6a7215381a7b2213d6c5ce",
    "0x2eecc0de814cfd8c57ce882babb2e30d1da56621aef7a47f3291cffeaec26ad7",
    "0x280bc02145c155d5833585b6c7b08501055157dd30ce005319621dc462d33b47",
];

const DEFAULT_LEDGER: &str = "0xda574377faFB3775e8A1bC547a9BA387f1c749C5";
const DEFAULT_USDC: &str = "0x0729b1C8aE8AbBF95dAB6F0835CF9962C29c7344";
const DEFAULT_WETH: &str = "0x9c56316255cff57cbeb8a0418c8f5d4f9523588f";

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZkLendConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Commitment tree pinning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_tree_height")]
    pub height: usize,
    /// Hex zero values, leaf level first. Must match the ledger exactly.
    #[serde(default = "default_zero_values")]
    pub zero_values: Vec<String>,
    #[serde(default = "default_root_history")]
    pub root_history_size: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            height: DEFAULT_TREE_HEIGHT,
            zero_values: default_zero_values(),
            root_history_size: ROOT_HISTORY_SIZE,
        }
    }
}

fn default_tree_height() -> usize {
    DEFAULT_TREE_HEIGHT
}

fn default_zero_values() -> Vec<String> {
    HEIGHT_12_ZERO_VALUES.iter().map(|z| z.to_string()).collect()
}

fn default_root_history() -> usize {
    ROOT_HISTORY_SIZE
}

/// Hash adapter selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashingConfig {
    /// H1: note commitments and nullifier hashes
    #[serde(default)]
    pub commitment: HasherKind,
    /// H2: Merkle nodes
    #[serde(default)]
    pub node: HasherKind,
}

/// Ledger contract and token addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger")]
    pub contract: String,
    #[serde(default = "default_tokens")]
    pub tokens: BTreeMap<String, String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract: DEFAULT_LEDGER.into(),
            tokens: default_tokens(),
        }
    }
}

fn default_ledger() -> String {
    DEFAULT_LEDGER.into()
}

fn default_tokens() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("usdc".to_string(), DEFAULT_USDC.to_string()),
        ("weth".to_string(), DEFAULT_WETH.to_string()),
    ])
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Set list field from a comma separated env var if present
fn env_list(key: &str, field: &mut Vec<String>) {
    if let Ok(v) = env::var(key) {
        *field = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl ZkLendConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check ZK_CONFIG env var
        if let Ok(path) = env::var("ZK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("ZK_CONFIG points at {}, which does not exist", path.display());
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.zklend/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Tree
        env_parse("ZK_TREE_HEIGHT", &mut self.tree.height);
        env_list("ZK_ZERO_VALUES", &mut self.tree.zero_values);
        env_parse("ZK_ROOT_HISTORY", &mut self.tree.root_history_size);

        // Hashing
        env_parse("ZK_COMMITMENT_HASHER", &mut self.hashing.commitment);
        env_parse("ZK_NODE_HASHER", &mut self.hashing.node);

        // Ledger
        env_string("ZK_LEDGER_ADDRESS", &mut self.ledger.contract);
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Validated tree parameters
    ///
    /// A height without a matching zero table is an error; tables are never
    /// derived or padded here. The pinned table must also be the chain of the
    /// configured node hasher, otherwise every root built from it is unusable.
    pub fn tree_params(&self) -> Result<TreeParams> {
        let zero_values = self
            .tree
            .zero_values
            .iter()
            .enumerate()
            .map(|(level, z)| {
                FieldElement::from_hex(z)
                    .with_context(|| format!("Invalid zero value at level {level}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let params = TreeParams::new(self.tree.height, zero_values)
            .with_context(|| format!("Invalid [tree] section for height {}", self.tree.height))?;

        let node = self.hashing.node.build();
        params.verify(node.as_ref()).with_context(|| {
            format!("[tree] zero_values do not match the {} node hasher", node.name())
        })?;
        Ok(params)
    }

    /// Hash adapters named by the `[hashing]` section
    pub fn hash_suite(&self) -> HashSuite {
        HashSuite::new(self.hashing.commitment.build(), self.hashing.node.build())
    }

    /// Recent-root window, as deep as the ledger keeps
    pub fn root_history(&self) -> Result<RootHistory> {
        if self.tree.root_history_size == 0 {
            bail!("[tree] root_history_size must be at least 1");
        }
        Ok(RootHistory::new(self.tree.root_history_size))
    }

    pub fn ledger_address(&self) -> Result<Address> {
        self.ledger
            .contract
            .parse()
            .with_context(|| format!("Invalid ledger address: {}", self.ledger.contract))
    }

    /// Resolve a token by configured name (`usdc`) or literal address
    pub fn token(&self, name_or_address: &str) -> Result<Address> {
        let key = name_or_address.to_ascii_lowercase();
        if let Some(address) = self.ledger.tokens.get(&key) {
            return address
                .parse()
                .with_context(|| format!("Invalid address for token {key}: {address}"));
        }
        if name_or_address.starts_with("0x") {
            return name_or_address
                .parse()
                .with_context(|| format!("Invalid token address: {name_or_address}"));
        }
        bail!("Unknown token: {name_or_address}")
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static ZkLendConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: ZkLendConfig) -> Result<(), ZkLendConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `ZkLendConfig::global()`.
#[inline]
pub fn global_config() -> &'static ZkLendConfig {
    ZkLendConfig::global()
}
