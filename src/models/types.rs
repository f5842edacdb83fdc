//! Type definitions for audit preparation
//! Core data structures for proxy resolution and source triage

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the implementation address behind a proxy was discovered.
///
/// Ordered by reliability: a registry-reported implementation beats
/// deterministic storage-slot standards, which beat bytecode signatures,
/// which beat live calls, which beat source-text heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyMethod {
    /// Implementation declared by the block explorer's verified metadata
    EtherscanApi,
    /// EIP-1967 logic slot
    Eip1967,
    /// EIP-1967 beacon slot plus a call on the beacon
    Eip1967Beacon,
    /// Legacy OpenZeppelin upgradeable-proxy slot
    OpenzeppelinSlot,
    /// EIP-1822 PROXIABLE slot
    Eip1822,
    /// EIP-1167 minimal-proxy bytecode template
    Eip1167Bytecode,
    /// `implementation()` call (EIP-897 delegate proxy convention)
    Eip897Call,
    /// `masterCopy()` call (Gnosis Safe proxy convention)
    GnosisSafe,
    /// Textual heuristics over verified source
    SourceAnalysis,
    /// Not a proxy
    None,
}

impl ProxyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMethod::EtherscanApi => "etherscan-api",
            ProxyMethod::Eip1967 => "eip1967",
            ProxyMethod::Eip1967Beacon => "eip1967-beacon",
            ProxyMethod::OpenzeppelinSlot => "openzeppelin-slot",
            ProxyMethod::Eip1822 => "eip1822",
            ProxyMethod::Eip1167Bytecode => "eip1167-bytecode",
            ProxyMethod::Eip897Call => "eip897-call",
            ProxyMethod::GnosisSafe => "gnosis-safe",
            ProxyMethod::SourceAnalysis => "source-analysis",
            ProxyMethod::None => "none",
        }
    }
}

/// Verified-source record for one address, as reported by the block explorer.
///
/// Produced once per address per resolution pass and read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct SourceRecord {
    /// Whether the explorer holds verified source for the address
    pub verified: bool,
    /// Declared contract name (e.g. `TransparentUpgradeableProxy`)
    pub contract_name: String,
    /// Declared main file name, when the explorer reports one
    pub contract_file_name: Option<String>,
    /// Raw source payload: a flat file, standard JSON, or `{{…}}`-wrapped JSON
    pub source_text: String,
    /// Compiler version string as reported
    pub compiler_version: Option<String>,
    /// Explorer-declared "is proxy" flag
    pub declared_proxy: bool,
    /// Explorer-declared implementation address, unvalidated
    pub declared_implementation: Option<String>,
    /// ABI-encoded constructor arguments
    pub constructor_args: Option<Vec<u8>>,
}

/// Result of one proxy resolution pass. Immutable once returned.
#[derive(Debug, Clone)]
pub struct ProxyResolution {
    pub is_proxy: bool,
    pub proxy_address: Address,
    pub implementation: Option<Address>,
    pub method: ProxyMethod,
    pub error: Option<String>,
}

impl ProxyResolution {
    /// A "not a proxy" result: a normal outcome, not an error.
    pub fn not_a_proxy(address: Address) -> Self {
        Self {
            is_proxy: false,
            proxy_address: address,
            implementation: None,
            method: ProxyMethod::None,
            error: None,
        }
    }

    /// Aborted detection: not a proxy as far as anyone can tell, with the
    /// failure recorded as an annotation instead of a thrown error.
    pub fn aborted(address: Address, error: impl Into<String>) -> Self {
        Self {
            is_proxy: false,
            proxy_address: address,
            implementation: None,
            method: ProxyMethod::None,
            error: Some(error.into()),
        }
    }

    pub fn resolved(address: Address, implementation: Address, method: ProxyMethod) -> Self {
        Self {
            is_proxy: true,
            proxy_address: address,
            implementation: Some(implementation),
            method,
            error: None,
        }
    }
}

/// Role of a contract within the output directory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// Stand-alone contract: files land flat in the base directory
    Main,
    /// The proxy half of a proxy pattern: files land under `proxy/`
    Proxy,
    /// The logic half of a proxy pattern: files land under `implementation/`
    Implementation,
}

impl ContractKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractKind::Main => "main",
            ContractKind::Proxy => "proxy",
            ContractKind::Implementation => "implementation",
        }
    }

    /// Subdirectory under the per-address base, if any.
    pub fn subdir(&self) -> Option<&'static str> {
        match self {
            ContractKind::Main => None,
            ContractKind::Proxy => Some("proxy"),
            ContractKind::Implementation => Some("implementation"),
        }
    }
}

/// Shape the raw source payload turned out to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceShape {
    #[default]
    Empty,
    SingleFile,
    StandardJson,
    FlatJson,
}

/// Normalized mapping of relative file path to file text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSourceTree {
    /// Relative forward-slash paths, unique keys
    pub files: BTreeMap<String, String>,
    /// `language` tag carried from a standard-JSON payload
    pub language: Option<String>,
    /// Compiler `settings` carried from a standard-JSON payload
    pub settings: Option<serde_json::Value>,
    pub shape: SourceShape,
}

impl ParsedSourceTree {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Triage outcome for one file. Exactly one per path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileClass {
    /// The main contract file, always kept
    Main,
    /// Must-audit project code at normal priority
    Critical,
    /// Project-owned vendor-style location: must audit, possibly modified vendor code
    RedFlag,
    /// Pure interface, kept at lower review priority
    Interface,
    /// Compiler output, caches, generated typings
    ExcludedBuildArtifact,
    /// Tests, scripts, deployment, mocks, harnesses
    ExcludedDevTooling,
    /// Unmodified dependency-manager vendor tree
    ExcludedVendor,
    /// Matched the operator blacklist, never written to disk
    ExcludedBlacklisted,
}

impl FileClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileClass::Main => "main",
            FileClass::Critical => "critical",
            FileClass::RedFlag => "red-flag",
            FileClass::Interface => "interface",
            FileClass::ExcludedBuildArtifact => "excluded-build-artifact",
            FileClass::ExcludedDevTooling => "excluded-dev-tooling",
            FileClass::ExcludedVendor => "excluded-vendor",
            FileClass::ExcludedBlacklisted => "excluded-blacklisted",
        }
    }

    /// Whether the file survives on disk after the save pass.
    pub fn is_kept(&self) -> bool {
        matches!(
            self,
            FileClass::Main | FileClass::Critical | FileClass::RedFlag | FileClass::Interface
        )
    }

    /// Blacklisted files never reach disk at all.
    pub fn is_blacklisted(&self) -> bool {
        matches!(self, FileClass::ExcludedBlacklisted)
    }
}

/// The only metadata persisted per contract instance. Regenerated each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditManifest {
    pub main_contract: String,
    pub main_contract_path: String,
    pub contract_type: ContractKind,
}

/// Outcome of processing one (address, contract-kind) pass.
///
/// Recoverable conditions produce a report with `success = false` and a
/// reason instead of aborting the surrounding multi-address run.
#[derive(Debug, Clone)]
pub struct AddressReport {
    pub address: Address,
    pub kind: ContractKind,
    pub success: bool,
    pub reason: Option<String>,
    pub main_contract: Option<String>,
    pub files_kept: usize,
    pub files_excluded: usize,
    pub red_flags: usize,
}

impl AddressReport {
    pub fn failed(address: Address, kind: ContractKind, reason: impl Into<String>) -> Self {
        Self {
            address,
            kind,
            success: false,
            reason: Some(reason.into()),
            main_contract: None,
            files_kept: 0,
            files_excluded: 0,
            red_flags: 0,
        }
    }

    /// One-line summary for the final stats block.
    pub fn summary(&self) -> String {
        if self.success {
            format!(
                "✅ {} [{}] kept: {} | excluded: {} | red flags: {} | main: {}",
                self.address,
                self.kind.as_str(),
                self.files_kept,
                self.files_excluded,
                self.red_flags,
                self.main_contract.as_deref().unwrap_or("-"),
            )
        } else {
            format!(
                "❌ {} [{}] {}",
                self.address,
                self.kind.as_str(),
                self.reason.as_deref().unwrap_or("unknown failure"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_method_tags() {
        assert_eq!(ProxyMethod::Eip1967.as_str(), "eip1967");
        assert_eq!(ProxyMethod::Eip1167Bytecode.as_str(), "eip1167-bytecode");
        assert_eq!(ProxyMethod::GnosisSafe.as_str(), "gnosis-safe");
        assert_eq!(ProxyMethod::None.as_str(), "none");
    }

    #[test]
    fn test_aborted_resolution_is_annotated_not_a_proxy() {
        let resolution =
            ProxyResolution::aborted(Address::ZERO, "no deployed code at address");
        assert!(!resolution.is_proxy);
        assert_eq!(resolution.method, ProxyMethod::None);
        assert_eq!(resolution.error.as_deref(), Some("no deployed code at address"));
    }

    #[test]
    fn test_contract_kind_subdirs() {
        assert_eq!(ContractKind::Main.subdir(), None);
        assert_eq!(ContractKind::Proxy.subdir(), Some("proxy"));
        assert_eq!(ContractKind::Implementation.subdir(), Some("implementation"));
    }

    #[test]
    fn test_file_class_retention() {
        assert!(FileClass::Main.is_kept());
        assert!(FileClass::RedFlag.is_kept());
        assert!(FileClass::Interface.is_kept());
        assert!(!FileClass::ExcludedVendor.is_kept());
        assert!(!FileClass::ExcludedBlacklisted.is_kept());
        assert!(FileClass::ExcludedBlacklisted.is_blacklisted());
    }

    #[test]
    fn test_manifest_serializes_camel_case() {
        let manifest = AuditManifest {
            main_contract: "Vault".to_string(),
            main_contract_path: "contracts/Vault.sol".to_string(),
            contract_type: ContractKind::Implementation,
        };
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"mainContract\":\"Vault\""));
        assert!(json.contains("\"contractType\":\"implementation\""));
    }
}
