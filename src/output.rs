//! Output writer
//!
//! Persists a classified file set under one per-address directory:
//! `main`-type contracts flatten at the base, proxy-pattern contracts nest
//! under `proxy/` and `implementation/`. Excluded files share the save path
//! with kept files (written once, then deleted) and blacklisted files
//! never touch disk at all. A persistence failure is a warning, never an
//! abort of the remaining save pipeline.

use alloy_primitives::Address;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::classify::Classification;
use crate::models::{AuditManifest, ContractKind, FileClass, ParsedSourceTree};

const MANIFEST_FILE: &str = "audit-manifest.json";

/// Counters for one save pass
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveStats {
    pub written: usize,
    pub kept: usize,
    pub excluded: usize,
    pub skipped_blacklisted: usize,
}

/// Writer rooted at one per-(chain, address) directory.
pub struct OutputWriter {
    base: PathBuf,
}

impl OutputWriter {
    pub fn new(output_root: &Path, chain_name: &str, address: Address) -> Self {
        let base = output_root.join(format!("{chain_name}-{address:?}"));
        Self { base }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Save one contract's classified tree, then sweep excluded files and
    /// prune emptied directories. Idempotent: a re-run overwrites prior
    /// output.
    pub fn save_contract(
        &self,
        kind: ContractKind,
        tree: &ParsedSourceTree,
        classification: &Classification,
    ) -> SaveStats {
        let target = match kind.subdir() {
            Some(sub) => self.base.join(sub),
            None => self.base.clone(),
        };

        let mut stats = SaveStats::default();
        let mut transient: Vec<PathBuf> = Vec::new();

        if let Err(e) = std::fs::create_dir_all(&target) {
            warn!("⚠️ Could not create {}: {}", target.display(), e);
            return stats;
        }

        for (rel_path, text) in &tree.files {
            let class = classification
                .classes
                .get(rel_path)
                .copied()
                .unwrap_or(FileClass::Critical);

            if class.is_blacklisted() {
                stats.skipped_blacklisted += 1;
                continue;
            }

            let Some(disk_path) = sanitized_join(&target, rel_path) else {
                warn!("⚠️ Skipping unsafe path {}", rel_path);
                continue;
            };

            if let Some(parent) = disk_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!("⚠️ Could not create {}: {}", parent.display(), e);
                    continue;
                }
            }
            if let Err(e) = std::fs::write(&disk_path, text) {
                warn!("⚠️ Could not write {}: {}", disk_path.display(), e);
                continue;
            }
            stats.written += 1;

            if class.is_kept() {
                stats.kept += 1;
                if class == FileClass::RedFlag {
                    info!("🚩 Red flag (possibly modified vendor code): {}", rel_path);
                }
            } else {
                transient.push(disk_path);
            }
        }

        // symmetric cleanup: excluded files were written once, now removed
        for path in transient {
            match std::fs::remove_file(&path) {
                Ok(()) => stats.excluded += 1,
                Err(e) => warn!("⚠️ Could not delete {}: {}", path.display(), e),
            }
        }

        self.prune_empty_dirs(&target);
        self.write_manifest(kind, &target, classification);

        stats
    }

    /// Manifest with exactly the derived metadata, regenerated every run.
    fn write_manifest(&self, kind: ContractKind, target: &Path, classification: &Classification) {
        let manifest = AuditManifest {
            main_contract: classification.main_contract.clone().unwrap_or_default(),
            main_contract_path: classification.main_file.clone().unwrap_or_default(),
            contract_type: kind,
        };
        let path = target.join(MANIFEST_FILE);
        match serde_json::to_string_pretty(&manifest) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!("⚠️ Could not write manifest {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("⚠️ Could not serialize manifest: {}", e),
        }
    }

    /// Remove directories left empty by the exclusion sweep. The base
    /// directory and the proxy/implementation subdirectories are always
    /// retained, even when empty.
    fn prune_empty_dirs(&self, target: &Path) {
        let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();
        collect_dirs(target, &mut dirs);

        // deepest first
        for dir in dirs.iter().rev() {
            if dir == target || is_retained(dir, &self.base) {
                continue;
            }
            if let Ok(mut entries) = std::fs::read_dir(dir) {
                if entries.next().is_none() {
                    match std::fs::remove_dir(dir) {
                        Ok(()) => debug!("Pruned empty dir {}", dir.display()),
                        Err(e) => warn!("⚠️ Could not prune {}: {}", dir.display(), e),
                    }
                }
            }
        }
    }
}

/// The per-address base and its proxy/implementation subdirs survive pruning.
fn is_retained(dir: &Path, base: &Path) -> bool {
    dir == base || dir == base.join("proxy") || dir == base.join("implementation")
}

fn collect_dirs(root: &Path, dirs: &mut BTreeSet<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            dirs.insert(path.clone());
            collect_dirs(&path, dirs);
        }
    }
}

/// Join a registry-supplied relative path under the target directory,
/// dropping absolute prefixes and parent-directory components so a payload
/// can never escape its own output tree.
fn sanitized_join(target: &Path, rel_path: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::from(target);
    let mut pushed = 0usize;
    for component in rel_path.split('/') {
        match component {
            "" | "." | ".." => continue,
            part => {
                clean.push(part);
                pushed += 1;
            }
        }
    }
    (pushed > 0).then_some(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::AuditClassifier;
    use crate::config::Blacklist;
    use crate::models::SourceShape;
    use std::collections::BTreeMap;

    fn sample_tree() -> ParsedSourceTree {
        let mut files = BTreeMap::new();
        files.insert(
            "contracts/Vault.sol".to_string(),
            "contract Vault { function f() public {} }\n".to_string(),
        );
        files.insert(
            "contracts/vendor/Lib.sol".to_string(),
            "library Lib {}\n".to_string(),
        );
        files.insert(
            "test/Vault.t.sol".to_string(),
            "contract VaultTest {}\n".to_string(),
        );
        ParsedSourceTree {
            files,
            language: None,
            settings: None,
            shape: SourceShape::StandardJson,
        }
    }

    #[test]
    fn test_excluded_files_are_written_then_deleted() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = sample_tree();
        let blacklist = Blacklist::default();
        let classification =
            AuditClassifier::new(&blacklist).classify(&tree, Some("Vault"), None);

        let writer = OutputWriter::new(tmp.path(), "ethereum", Address::from([1u8; 20]));
        let stats = writer.save_contract(ContractKind::Main, &tree, &classification);

        assert_eq!(stats.excluded, 1);
        assert!(writer.base_dir().join("contracts/Vault.sol").exists());
        assert!(writer.base_dir().join("contracts/vendor/Lib.sol").exists());
        assert!(!writer.base_dir().join("test/Vault.t.sol").exists());
        // the emptied test/ directory is pruned
        assert!(!writer.base_dir().join("test").exists());
    }

    #[test]
    fn test_blacklisted_files_never_touch_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = sample_tree();
        let blacklist = Blacklist::new(vec!["vendor/".to_string()]);
        let classification =
            AuditClassifier::new(&blacklist).classify(&tree, Some("Vault"), None);

        let writer = OutputWriter::new(tmp.path(), "ethereum", Address::from([1u8; 20]));
        let stats = writer.save_contract(ContractKind::Main, &tree, &classification);

        assert_eq!(stats.skipped_blacklisted, 1);
        assert!(!writer.base_dir().join("contracts/vendor/Lib.sol").exists());
        assert!(!writer.base_dir().join("contracts/vendor").exists());
    }

    #[test]
    fn test_proxy_kind_nests_under_subdir_and_writes_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = sample_tree();
        let blacklist = Blacklist::default();
        let classification =
            AuditClassifier::new(&blacklist).classify(&tree, Some("Vault"), None);

        let writer = OutputWriter::new(tmp.path(), "ethereum", Address::from([2u8; 20]));
        writer.save_contract(ContractKind::Proxy, &tree, &classification);

        let proxy_dir = writer.base_dir().join("proxy");
        assert!(proxy_dir.join("contracts/Vault.sol").exists());

        let manifest: AuditManifest = serde_json::from_str(
            &std::fs::read_to_string(proxy_dir.join(MANIFEST_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.main_contract, "Vault");
        assert_eq!(manifest.main_contract_path, "contracts/Vault.sol");
        assert_eq!(manifest.contract_type, ContractKind::Proxy);
    }

    #[test]
    fn test_rerun_overwrites_prior_output() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = sample_tree();
        let blacklist = Blacklist::default();
        let classification =
            AuditClassifier::new(&blacklist).classify(&tree, Some("Vault"), None);

        let writer = OutputWriter::new(tmp.path(), "ethereum", Address::from([3u8; 20]));
        writer.save_contract(ContractKind::Main, &tree, &classification);
        let stats = writer.save_contract(ContractKind::Main, &tree, &classification);
        assert_eq!(stats.kept, 2);
    }

    #[test]
    fn test_sanitized_join_neutralizes_traversal() {
        let target = Path::new("/out/base");
        let joined = sanitized_join(target, "../../etc/passwd").unwrap();
        assert_eq!(joined, Path::new("/out/base/etc/passwd"));
        assert!(sanitized_join(target, "..").is_none());
    }
}
