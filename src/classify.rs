//! Audit triage classifier
//!
//! Partitions a parsed file set into files an auditor must read, files that
//! can be safely skipped as unmodified vendor/tooling code, and red-flag
//! files that must never be skipped, then identifies the main contract file.
//!
//! The path rules are static configuration, not logic: ordered lists of
//! pattern + category pairs evaluated top to bottom, so precedence stays
//! auditable and testable in isolation.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::Blacklist;
use crate::models::{FileClass, ParsedSourceTree};

lazy_static! {
    /// Project-owned vendor-style locations. Code copied under a project's
    /// own lib/vendor/external/utils tree cannot be assumed unmodified, so
    /// these override every exclusion rule: the file is kept and flagged.
    static ref RED_FLAG_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(^|/)(contracts|src)/(lib|vendor|external|utils)/").unwrap(),
        Regex::new(r"(?i)^(lib|vendor|external)/").unwrap(),
    ];

    /// Exclusion rules in priority order: build artifacts, then dev
    /// tooling, then dependency-manager vendor trees, then role-signaling
    /// filenames. First match determines the category.
    static ref EXCLUSION_RULES: Vec<(Regex, FileClass)> = vec![
        // compiler output, caches, generated typings
        (
            Regex::new(r"(?i)(^|/)(artifacts?|out|build|cache|cache_forge|cache_hardhat|typechain|typechain-types|abi|bin|flattened)/").unwrap(),
            FileClass::ExcludedBuildArtifact,
        ),
        (
            Regex::new(r"(?i)\.(json|abi|bin|d\.ts)$").unwrap(),
            FileClass::ExcludedBuildArtifact,
        ),
        // tests, scripts, deployment, mocks, examples, benchmarks, harnesses
        (
            Regex::new(r"(?i)(^|/)(tests?|testing|spec|scripts?|deploy|deployments?|migrations?|mocks?|examples?|samples?|benchmarks?|fuzz|invariants?|echidna|certora|forge-test)/").unwrap(),
            FileClass::ExcludedDevTooling,
        ),
        // dependency-manager trees and widely-audited vendor packages
        (
            Regex::new(r"(?i)(^|/)(node_modules|deps|\.deps|installed_contracts)/").unwrap(),
            FileClass::ExcludedVendor,
        ),
        (
            Regex::new(r"(?i)(^|/)(@openzeppelin|@chainlink|@uniswap|@gnosis\.pm|@aave|@ensdomains|openzeppelin-contracts|openzeppelin-contracts-upgradeable|forge-std|ds-test|solmate|solady|prb-math|hardhat)/").unwrap(),
            FileClass::ExcludedVendor,
        ),
        // filenames that signal a test/mock/deploy/helper role anywhere
        (
            Regex::new(r"(?i)(^|/)[^/]*(\.t\.sol|\.s\.sol|test\.sol|tests\.sol|mock[^/]*\.sol|harness[^/]*\.sol|deploy[^/]*\.(sol|js|ts)|helpers?\.sol)$").unwrap(),
            FileClass::ExcludedDevTooling,
        ),
        (
            Regex::new(r"(?i)(^|/)(test|mock|example)[^/]*\.sol$").unwrap(),
            FileClass::ExcludedDevTooling,
        ),
    ];

    /// `interface X` declaration
    static ref INTERFACE_DECL: Regex = Regex::new(r"\binterface\s+\w+").unwrap();

    /// `contract X` / `library X` declaration with a capture for the name
    static ref CONTRACT_DECL: Regex = Regex::new(r"\b(?:contract|library)\s+(\w+)").unwrap();

    /// external/public function declarations, for the last-resort main-file vote
    static ref PUBLIC_FUNCTION: Regex =
        Regex::new(r"function\s+\w+\s*\([^)]*\)[^;{}]*\b(external|public)\b").unwrap();
}

/// Result of classifying one tree: a class for every path plus the main
/// contract designation.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub classes: BTreeMap<String, FileClass>,
    pub main_file: Option<String>,
    pub main_contract: Option<String>,
}

impl Classification {
    pub fn kept(&self) -> usize {
        self.classes.values().filter(|c| c.is_kept()).count()
    }

    pub fn excluded(&self) -> usize {
        self.classes.values().filter(|c| !c.is_kept()).count()
    }

    pub fn red_flags(&self) -> usize {
        self.classes
            .values()
            .filter(|c| **c == FileClass::RedFlag)
            .count()
    }
}

/// The triage classifier. Holds the injected blacklist; the pattern tables
/// are process-wide static data.
pub struct AuditClassifier<'a> {
    blacklist: &'a Blacklist,
}

impl<'a> AuditClassifier<'a> {
    pub fn new(blacklist: &'a Blacklist) -> Self {
        Self { blacklist }
    }

    /// Classify every file of the tree. Total over the key set: every path
    /// receives exactly one class.
    pub fn classify(
        &self,
        tree: &ParsedSourceTree,
        declared_contract_name: Option<&str>,
        declared_file_name: Option<&str>,
    ) -> Classification {
        let main_file = self.detect_main_file(tree, declared_contract_name, declared_file_name);

        let mut classes = BTreeMap::new();
        for (path, text) in &tree.files {
            let class = self.classify_one(path, text, main_file.as_deref());
            classes.insert(path.clone(), class);
        }

        let main_contract = declared_contract_name
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| main_file.as_deref().map(base_name_without_ext));

        if main_file.is_none() {
            warn!("⚠️ No main contract file could be designated");
        }

        Classification {
            classes,
            main_file,
            main_contract,
        }
    }

    /// Precedence: blacklist, red flag, exclusion tables, main designation,
    /// pure interface, critical. First match wins.
    fn classify_one(&self, path: &str, text: &str, main_file: Option<&str>) -> FileClass {
        if self.blacklist.matches(path) {
            // An operator blacklist entry is an explicit instruction and
            // wins even over a red-flag path, but that suppression is
            // never silent.
            if is_red_flag(path) {
                warn!(
                    "⚠️ Blacklist suppresses red-flag path {}, it will not be written",
                    path
                );
            }
            return FileClass::ExcludedBlacklisted;
        }

        if is_red_flag(path) {
            return FileClass::RedFlag;
        }

        let excluded = EXCLUSION_RULES
            .iter()
            .find(|(pattern, _)| pattern.is_match(path))
            .map(|(_, class)| *class);

        if main_file == Some(path) {
            // the main file never falls into an exclusion bucket
            if let Some(class) = excluded {
                debug!(
                    "Main file {} would have been {}, keeping it",
                    path,
                    class.as_str()
                );
            }
            return FileClass::Main;
        }

        if let Some(class) = excluded {
            return class;
        }

        if is_pure_interface(text) {
            return FileClass::Interface;
        }

        FileClass::Critical
    }

    /// Main-file detection; the first strategy to produce a path wins.
    fn detect_main_file(
        &self,
        tree: &ParsedSourceTree,
        declared_contract_name: Option<&str>,
        declared_file_name: Option<&str>,
    ) -> Option<String> {
        // 1. registry-declared main file name
        if let Some(declared) = declared_file_name.filter(|n| !n.is_empty()) {
            for path in tree.files.keys() {
                if path == declared
                    || path.ends_with(&format!("/{declared}"))
                    || base_name(path) == declared
                {
                    return Some(path.clone());
                }
            }
        }

        // 2. declared contract name: file base name or a declaration in the text
        if let Some(name) = declared_contract_name.filter(|n| !n.is_empty()) {
            for (path, text) in &tree.files {
                if base_name_without_ext(path) == name {
                    return Some(path.clone());
                }
                if CONTRACT_DECL
                    .captures_iter(text)
                    .any(|captures| &captures[1] == name)
                {
                    return Some(path.clone());
                }
            }
        }

        let eligible: Vec<(&String, &String)> = tree
            .files
            .iter()
            .filter(|(path, _)| !self.blacklist.matches(path))
            .filter(|(path, _)| {
                is_red_flag(path)
                    || !EXCLUSION_RULES.iter().any(|(pattern, _)| pattern.is_match(path))
            })
            .collect();

        // 3. largest not-excluded file by byte length
        if let Some((path, _)) = eligible.iter().max_by_key(|(_, text)| text.len()) {
            return Some((*path).clone());
        }

        // 4. most external/public function declarations
        eligible
            .iter()
            .max_by_key(|(_, text)| PUBLIC_FUNCTION.find_iter(text).count())
            .map(|(path, _)| (*path).clone())
    }
}

/// Whether the path falls under a project-owned vendor-style convention.
pub fn is_red_flag(path: &str) -> bool {
    RED_FLAG_PATTERNS.iter().any(|pattern| pattern.is_match(path))
}

/// A pure interface declares `interface` and has no function with a body.
/// Abstract contracts mixing implemented and unimplemented functions have
/// at least one body and stay critical; a fully-unimplemented abstract
/// contract can be misfiled. Known heuristic limitation.
fn is_pure_interface(text: &str) -> bool {
    if !INTERFACE_DECL.is_match(text) {
        return false;
    }
    !has_function_with_body(text)
}

/// Scan from each `function` keyword to the first `{` or `;`. A `{` first
/// means an attached body.
fn has_function_with_body(text: &str) -> bool {
    let mut search_from = 0;
    while let Some(pos) = text[search_from..].find("function") {
        let start = search_from + pos + "function".len();
        for &byte in text.as_bytes()[start..].iter() {
            match byte {
                b'{' => return true,
                b';' => break,
                _ => {}
            }
        }
        search_from = start;
    }
    false
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn base_name_without_ext(path: &str) -> String {
    let base = base_name(path);
    match base.rfind('.') {
        Some(dot) => base[..dot].to_string(),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceShape;

    fn tree_of(entries: &[(&str, &str)]) -> ParsedSourceTree {
        let mut tree = ParsedSourceTree {
            shape: SourceShape::StandardJson,
            ..Default::default()
        };
        for (path, text) in entries {
            tree.files.insert(path.to_string(), text.to_string());
        }
        tree
    }

    #[test]
    fn test_every_path_gets_exactly_one_class() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("contracts/Vault.sol", "contract Vault { function f() public {} }"),
            ("contracts/vendor/SafeMath.sol", "library SafeMath {}"),
            ("test/Vault.t.sol", "contract VaultTest {}"),
            ("artifacts/Vault.json", "{}"),
        ]);
        let result = classifier.classify(&tree, Some("Vault"), None);
        assert_eq!(result.classes.len(), tree.files.len());
    }

    #[test]
    fn test_vendor_under_contracts_is_red_flag_never_excluded() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("contracts/Vault.sol", "contract Vault { function f() public {} }"),
            ("contracts/vendor/Foo.sol", "library Foo { function f() internal {} }"),
        ]);
        let result = classifier.classify(&tree, Some("Vault"), None);
        assert_eq!(
            result.classes["contracts/vendor/Foo.sol"],
            FileClass::RedFlag
        );
    }

    #[test]
    fn test_root_level_lib_is_red_flag() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("contracts/Vault.sol", "contract Vault {}"),
            ("lib/Helpers.sol", "library Helpers {}"),
        ]);
        let result = classifier.classify(&tree, Some("Vault"), None);
        assert_eq!(result.classes["lib/Helpers.sol"], FileClass::RedFlag);
    }

    #[test]
    fn test_blacklist_wins_over_red_flag() {
        let blacklist = Blacklist::new(vec!["vendor/".to_string()]);
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("contracts/Vault.sol", "contract Vault {}"),
            ("contracts/vendor/Foo.sol", "library Foo {}"),
        ]);
        let result = classifier.classify(&tree, Some("Vault"), None);
        assert_eq!(
            result.classes["contracts/vendor/Foo.sol"],
            FileClass::ExcludedBlacklisted
        );
    }

    #[test]
    fn test_node_modules_is_excluded_vendor() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("contracts/Vault.sol", "contract Vault {}"),
            (
                "node_modules/@openzeppelin/contracts/token/ERC20.sol",
                "contract ERC20 {}",
            ),
        ]);
        let result = classifier.classify(&tree, Some("Vault"), None);
        assert_eq!(
            result.classes["node_modules/@openzeppelin/contracts/token/ERC20.sol"],
            FileClass::ExcludedVendor
        );
    }

    #[test]
    fn test_build_artifacts_and_dev_tooling_excluded() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("contracts/Vault.sol", "contract Vault {}"),
            ("artifacts/Vault.json", "{}"),
            ("scripts/deploy.js", "// deploy"),
            ("test/Vault.t.sol", "contract VaultTest {}"),
        ]);
        let result = classifier.classify(&tree, Some("Vault"), None);
        assert_eq!(
            result.classes["artifacts/Vault.json"],
            FileClass::ExcludedBuildArtifact
        );
        assert_eq!(
            result.classes["scripts/deploy.js"],
            FileClass::ExcludedDevTooling
        );
        assert_eq!(
            result.classes["test/Vault.t.sol"],
            FileClass::ExcludedDevTooling
        );
    }

    #[test]
    fn test_main_detection_by_declared_file_name() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("src/Main.sol", "contract Whatever {}"),
            ("src/Base.sol", "contract Base {}"),
        ]);
        let result = classifier.classify(&tree, None, Some("Main.sol"));
        assert_eq!(result.main_file.as_deref(), Some("src/Main.sol"));
        assert_eq!(result.classes["src/Main.sol"], FileClass::Main);
    }

    #[test]
    fn test_main_detection_by_contract_declaration() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("src/core/Engine.sol", "contract Vault { function f() public {} }"),
            ("src/Base.sol", "contract Base {}"),
        ]);
        let result = classifier.classify(&tree, Some("Vault"), None);
        assert_eq!(result.main_file.as_deref(), Some("src/core/Engine.sol"));
    }

    #[test]
    fn test_main_detection_falls_back_to_largest() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("src/Small.sol", "contract A {}"),
            (
                "src/Large.sol",
                "contract B { function f() public {} function g() public {} }",
            ),
            ("test/Huge.t.sol", &"x".repeat(10_000)),
        ]);
        let result = classifier.classify(&tree, None, None);
        // the test file is excluded from candidacy despite being largest
        assert_eq!(result.main_file.as_deref(), Some("src/Large.sol"));
    }

    #[test]
    fn test_main_file_never_excluded_even_when_matching_patterns() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[("scripts/Deployer.sol", "contract Deployer {}")]);
        let result = classifier.classify(&tree, None, Some("Deployer.sol"));
        assert_eq!(result.classes["scripts/Deployer.sol"], FileClass::Main);
    }

    #[test]
    fn test_pure_interface_detection() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("src/Vault.sol", "contract Vault { function f() public {} }"),
            (
                "src/IVault.sol",
                "interface IVault {\n    function deposit(uint256 amount) external;\n    function withdraw(uint256 amount) external;\n}",
            ),
        ]);
        let result = classifier.classify(&tree, Some("Vault"), None);
        assert_eq!(result.classes["src/IVault.sol"], FileClass::Interface);
        assert_eq!(result.classes["src/Vault.sol"], FileClass::Main);
    }

    #[test]
    fn test_interface_with_body_is_critical() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = tree_of(&[
            ("src/Vault.sol", "contract Vault { function f() public {} }"),
            (
                "src/Mixed.sol",
                "interface IThing { function a() external; }\ncontract Thing { function a() external {} }",
            ),
        ]);
        let result = classifier.classify(&tree, Some("Vault"), None);
        assert_eq!(result.classes["src/Mixed.sol"], FileClass::Critical);
    }

    #[test]
    fn test_empty_tree_yields_no_main_and_warns_softly() {
        let blacklist = Blacklist::default();
        let classifier = AuditClassifier::new(&blacklist);
        let tree = ParsedSourceTree::default();
        let result = classifier.classify(&tree, None, None);
        assert!(result.main_file.is_none());
        assert!(result.classes.is_empty());
    }
}
