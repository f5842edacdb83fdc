//! Configuration module
//! Supported-chain table, explorer endpoints, and the exclusion blacklist.
//!
//! All of this is immutable after startup: the chain table is static data
//! and the blacklist is loaded once and injected into the pipeline.

use std::path::Path;
use tracing::{debug, warn};

use crate::models::{AppError, AppResult};

/// One supported chain: RPC endpoints plus the verified-source explorer API.
#[derive(Debug, Clone, Copy)]
pub struct ChainEntry {
    pub chain_id: u64,
    /// Canonical name accepted on the CLI
    pub name: &'static str,
    /// Alchemy subdomain for dynamic URL construction (None = public RPC only)
    pub alchemy_subdomain: Option<&'static str>,
    /// Public RPC fallback URL
    pub public_rpc: &'static str,
    /// Etherscan-family API base
    pub explorer_api: &'static str,
    /// Environment variable holding the explorer API key
    pub api_key_env: &'static str,
}

/// Supported chains. Requests for anything else fail fast with
/// CFG_UNSUPPORTED_CHAIN before any network traffic.
pub const CHAINS: &[ChainEntry] = &[
    ChainEntry {
        chain_id: 1,
        name: "ethereum",
        alchemy_subdomain: Some("eth-mainnet"),
        public_rpc: "https://eth.llamarpc.com",
        explorer_api: "https://api.etherscan.io/api",
        api_key_env: "ETHERSCAN_API_KEY",
    },
    ChainEntry {
        chain_id: 56,
        name: "bsc",
        alchemy_subdomain: Some("bnb-mainnet"),
        public_rpc: "https://bsc-dataseed.binance.org",
        explorer_api: "https://api.bscscan.com/api",
        api_key_env: "BSCSCAN_API_KEY",
    },
    ChainEntry {
        chain_id: 137,
        name: "polygon",
        alchemy_subdomain: Some("polygon-mainnet"),
        public_rpc: "https://polygon-rpc.com",
        explorer_api: "https://api.polygonscan.com/api",
        api_key_env: "POLYGONSCAN_API_KEY",
    },
    ChainEntry {
        chain_id: 42161,
        name: "arbitrum",
        alchemy_subdomain: Some("arb-mainnet"),
        public_rpc: "https://arb1.arbitrum.io/rpc",
        explorer_api: "https://api.arbiscan.io/api",
        api_key_env: "ARBISCAN_API_KEY",
    },
    ChainEntry {
        chain_id: 10,
        name: "optimism",
        alchemy_subdomain: Some("opt-mainnet"),
        public_rpc: "https://mainnet.optimism.io",
        explorer_api: "https://api-optimistic.etherscan.io/api",
        api_key_env: "OPTIMISM_ETHERSCAN_API_KEY",
    },
    ChainEntry {
        chain_id: 43114,
        name: "avalanche",
        alchemy_subdomain: Some("avax-mainnet"),
        public_rpc: "https://api.avax.network/ext/bc/C/rpc",
        explorer_api: "https://api.snowtrace.io/api",
        api_key_env: "SNOWTRACE_API_KEY",
    },
    ChainEntry {
        chain_id: 8453,
        name: "base",
        alchemy_subdomain: Some("base-mainnet"),
        public_rpc: "https://mainnet.base.org",
        explorer_api: "https://api.basescan.org/api",
        api_key_env: "BASESCAN_API_KEY",
    },
];

/// Look up a chain by canonical name or numeric chain id.
pub fn resolve_chain(identifier: &str) -> AppResult<&'static ChainEntry> {
    let wanted = identifier.trim().to_lowercase();
    CHAINS
        .iter()
        .find(|entry| {
            entry.name == wanted
                || wanted
                    .parse::<u64>()
                    .map(|id| id == entry.chain_id)
                    .unwrap_or(false)
        })
        .ok_or_else(|| AppError::unsupported_chain(identifier))
}

impl ChainEntry {
    /// Primary RPC URL: Alchemy when ALCHEMY_API_KEY is configured,
    /// otherwise the public endpoint. The key is never logged.
    pub fn primary_rpc_url(&self) -> String {
        if let Some(subdomain) = self.alchemy_subdomain {
            if let Ok(key) = std::env::var("ALCHEMY_API_KEY") {
                if !key.is_empty() && key != "YOUR_API_KEY" {
                    return format!("https://{}.g.alchemy.com/v2/{}", subdomain, key);
                }
            }
        }
        self.public_rpc.to_string()
    }

    /// Explorer API key from the environment, if configured.
    pub fn explorer_api_key(&self) -> Option<String> {
        std::env::var(self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Operator-supplied list of literal path substrings. Any file whose path
/// contains one of them is skipped entirely at the persistence layer:
/// never written to disk at all.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    patterns: Vec<String>,
}

impl Blacklist {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Load from a JSON array of strings. A missing file is not an error:
    /// it degrades to an empty blacklist.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No blacklist at {} ({}), using empty list", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(patterns) => {
                debug!("Loaded {} blacklist patterns from {}", patterns.len(), path.display());
                Self { patterns }
            }
            Err(e) => {
                warn!("⚠️ Could not parse blacklist {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Literal substring match against a relative file path.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| path.contains(p.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
