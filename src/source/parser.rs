//! Source tree parser
//!
//! Verified-source payloads arrive in three shapes: a bare source file, a
//! standard compiler-input JSON object with a `sources` key, or a flat JSON
//! object of path → content. Some explorers additionally double-wrap the
//! JSON shapes in `{{…}}`. `parse` normalizes all of them into a
//! [`ParsedSourceTree`] without touching the network or the filesystem.

use serde_json::Value;

use crate::models::{ParsedSourceTree, SourceShape};

/// Fallback name when the payload is a single unnamed file
const DEFAULT_FILE_NAME: &str = "contract.sol";

/// Normalize a raw source payload into a path → content mapping.
pub fn parse(raw: &str) -> ParsedSourceTree {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedSourceTree::default();
    }

    // The registry double-wraps some multi-file payloads; unwrap exactly
    // one level of bracing before attempting JSON.
    let candidate = if trimmed.starts_with("{{") && trimmed.ends_with("}}") {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => {
            if let Some(Value::Object(sources)) = map.get("sources") {
                let mut tree = ParsedSourceTree {
                    shape: SourceShape::StandardJson,
                    language: map.get("language").and_then(Value::as_str).map(str::to_string),
                    settings: map.get("settings").cloned(),
                    ..Default::default()
                };
                for (path, entry) in sources {
                    let content = entry
                        .get("content")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    tree.files.insert(path.clone(), content.to_string());
                }
                tree
            } else {
                let mut tree = ParsedSourceTree {
                    shape: SourceShape::FlatJson,
                    ..Default::default()
                };
                for (path, entry) in map {
                    match entry {
                        Value::String(content) => {
                            tree.files.insert(path, content);
                        }
                        Value::Object(ref obj) => {
                            if let Some(content) = obj.get("content").and_then(Value::as_str) {
                                tree.files.insert(path, content.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                tree
            }
        }
        // Not JSON (or JSON that is not an object): the payload is the file.
        _ => {
            let mut tree = ParsedSourceTree {
                shape: SourceShape::SingleFile,
                ..Default::default()
            };
            tree.files.insert(DEFAULT_FILE_NAME.to_string(), raw.to_string());
            tree
        }
    }
}

/// When a tree holds exactly one file and the contract's declared name is
/// known, rename the file to `<ContractName>.<ext>` so single-file payloads
/// line up with named contracts.
pub fn rename_single_file(tree: &mut ParsedSourceTree, contract_name: &str) {
    if tree.files.len() != 1 || contract_name.is_empty() {
        return;
    }
    let Some((old_path, content)) = tree
        .files
        .iter()
        .next()
        .map(|(k, v)| (k.clone(), v.clone()))
    else {
        return;
    };
    let ext = old_path.rsplit('.').next().filter(|e| *e != old_path).unwrap_or("sol");
    let new_path = format!("{contract_name}.{ext}");
    if new_path != old_path {
        tree.files.remove(&old_path);
        tree.files.insert(new_path, content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_empty_tree() {
        let tree = parse("   \n  ");
        assert!(tree.is_empty());
        assert_eq!(tree.shape, SourceShape::Empty);
    }

    #[test]
    fn test_plain_source_becomes_single_file() {
        let src = "pragma solidity ^0.8.0;\ncontract A {}\n";
        let tree = parse(src);
        assert_eq!(tree.shape, SourceShape::SingleFile);
        assert_eq!(tree.files.len(), 1);
        assert_eq!(tree.files[DEFAULT_FILE_NAME], src);
    }

    #[test]
    fn test_parse_idempotent_on_single_file() {
        let src = "contract A { function f() public {} }";
        let once = parse(src);
        let again = parse(&once.files[DEFAULT_FILE_NAME]);
        assert_eq!(once.files, again.files);
    }

    #[test]
    fn test_standard_json_with_sources() {
        let raw = r#"{"language":"Solidity","sources":{"A.sol":{"content":"contract A {}"},"lib/B.sol":{"content":"contract B {}"}},"settings":{"optimizer":{"enabled":true}}}"#;
        let tree = parse(raw);
        assert_eq!(tree.shape, SourceShape::StandardJson);
        assert_eq!(tree.files.len(), 2);
        assert_eq!(tree.files["A.sol"], "contract A {}");
        assert_eq!(tree.files["lib/B.sol"], "contract B {}");
        assert_eq!(tree.language.as_deref(), Some("Solidity"));
        assert!(tree.settings.is_some());
    }

    #[test]
    fn test_double_braced_payload_unwraps_one_level() {
        let raw = r#"{{"sources":{"A.sol":{"content":"X"}}}}"#;
        let tree = parse(raw);
        assert_eq!(tree.shape, SourceShape::StandardJson);
        assert_eq!(tree.files.len(), 1);
        assert_eq!(tree.files["A.sol"], "X");
    }

    #[test]
    fn test_flat_json_object() {
        let raw = r#"{"A.sol":"contract A {}","B.sol":{"content":"contract B {}"},"skip":42}"#;
        let tree = parse(raw);
        assert_eq!(tree.shape, SourceShape::FlatJson);
        assert_eq!(tree.files.len(), 2);
        assert_eq!(tree.files["A.sol"], "contract A {}");
        assert_eq!(tree.files["B.sol"], "contract B {}");
    }

    #[test]
    fn test_standard_json_missing_content_is_empty_string() {
        let raw = r#"{"sources":{"A.sol":{},"B.sol":{"content":"b"}}}"#;
        let tree = parse(raw);
        assert_eq!(tree.files["A.sol"], "");
        assert_eq!(tree.files["B.sol"], "b");
    }

    #[test]
    fn test_rename_single_file() {
        let mut tree = parse("contract Vault {}");
        rename_single_file(&mut tree, "Vault");
        assert_eq!(tree.files.len(), 1);
        assert!(tree.files.contains_key("Vault.sol"));
    }

    #[test]
    fn test_rename_skipped_for_multi_file_trees() {
        let raw = r#"{"sources":{"A.sol":{"content":"a"},"B.sol":{"content":"b"}}}"#;
        let mut tree = parse(raw);
        rename_single_file(&mut tree, "Vault");
        assert!(tree.files.contains_key("A.sol"));
        assert!(tree.files.contains_key("B.sol"));
    }
}
