//! sourcescope library
//!
//! Prepares on-chain smart-contract source for manual security audit:
//! - Resolves the true logic address behind proxy contracts (storage-slot
//!   standards, minimal-proxy bytecode, call conventions, beacons, and
//!   source-text heuristics, in reliability order)
//! - Normalizes verified-source payloads into a file tree
//! - Strips comments while preserving string literals
//! - Triages files into must-read, safely-skippable, and red-flag buckets

pub mod classify;
pub mod config;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod rpc;
pub mod source;

pub use classify::{AuditClassifier, Classification};
pub use config::{resolve_chain, Blacklist, ChainEntry, CHAINS};
pub use models::{
    AddressReport, AppError, AppResult, AuditManifest, ContractKind, ErrorCode, FileClass,
    ParsedSourceTree, ProxyMethod, ProxyResolution, SourceRecord, SourceShape,
};
pub use output::{OutputWriter, SaveStats};
pub use pipeline::Pipeline;
pub use registry::SourceRegistry;
pub use resolver::ProxyResolver;
pub use rpc::{ChainReader, RpcProvider};
