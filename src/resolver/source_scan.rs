//! Source-text proxy heuristics
//!
//! Last-resort signals for custom proxies that follow no on-chain standard:
//! an inheritance from a `*Proxy*` base, an implementation-accessor function
//! by conventional name, or a `bytes32` constant naming a custom storage
//! slot. These carry no formal guarantee; they only gate which speculative
//! on-chain reads are worth attempting.

use alloy_primitives::{Address, B256};
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;

lazy_static! {
    /// `contract X is ... Proxy`: any base whose name contains "Proxy"
    static ref PROXY_INHERITANCE: Regex =
        Regex::new(r"\bcontract\s+\w+\s+is\s+[^{]*Proxy").unwrap();

    /// Conventional implementation-accessor declarations returning an address
    static ref IMPLEMENTATION_ACCESSOR: Regex = Regex::new(
        r"function\s+(_implementation|_getImplementation|getImplementation|implementation)\s*\(\s*\)[^;{]*\breturns\s*\(\s*address\b",
    )
    .unwrap();

    /// `bytes32 … constant NAME = 0x<64 hex>` custom slot declarations
    static ref SLOT_CONSTANT: Regex = Regex::new(
        r"bytes32\s+(?:internal\s+|private\s+|public\s+)?constant\s+(\w+)\s*=\s*(0x[0-9a-fA-F]{64})",
    )
    .unwrap();
}

/// Default accessor tried when the source names none explicitly
const DEFAULT_ACCESSOR: &str = "implementation";

/// Textual signals extracted from one verified source payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSignals {
    /// Inherits a base contract whose name contains "Proxy"
    pub inherits_proxy: bool,
    /// Name of the conventional accessor found, if any
    pub accessor: Option<String>,
    /// Custom storage-slot literal whose constant name contains STORAGE and SLOT
    pub custom_slot: Option<B256>,
}

impl SourceSignals {
    /// Whether anything at all suggests a custom proxy.
    pub fn any(&self) -> bool {
        self.inherits_proxy || self.accessor.is_some() || self.custom_slot.is_some()
    }

    /// Accessor to call when probing, defaulting to the delegate-proxy
    /// convention when only non-accessor signals were found.
    pub fn accessor_name(&self) -> &str {
        self.accessor.as_deref().unwrap_or(DEFAULT_ACCESSOR)
    }
}

/// Scan source text for custom-proxy signals.
pub fn scan_source(text: &str) -> SourceSignals {
    let mut signals = SourceSignals {
        inherits_proxy: PROXY_INHERITANCE.is_match(text),
        ..Default::default()
    };

    if let Some(captures) = IMPLEMENTATION_ACCESSOR.captures(text) {
        signals.accessor = Some(captures[1].to_string());
    }

    for captures in SLOT_CONSTANT.captures_iter(text) {
        let name = captures[1].to_uppercase();
        if name.contains("STORAGE") && name.contains("SLOT") {
            if let Ok(slot) = B256::from_str(&captures[2]) {
                signals.custom_slot = Some(slot);
                break;
            }
        }
    }

    signals
}

/// Address-shaped words in an ABI-encoded constructor-argument byte string:
/// 32-byte words with 12 zero bytes of padding and a non-zero tail.
pub fn constructor_arg_addresses(args: &[u8]) -> Vec<Address> {
    let mut found = Vec::new();
    for word in args.chunks_exact(32) {
        if word[..12].iter().all(|b| *b == 0) {
            let address = Address::from_slice(&word[12..]);
            if address != Address::ZERO && !found.contains(&address) {
                found.push(address);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_inheritance_detected() {
        let src = "contract MyProxy is TransparentUpgradeableProxy { }";
        assert!(scan_source(src).inherits_proxy);

        let src2 = "contract Vault is ERC20, Ownable { }";
        assert!(!scan_source(src2).inherits_proxy);
    }

    #[test]
    fn test_accessor_detected_by_convention() {
        let src = r#"
            contract P {
                function _implementation() internal view override returns (address impl) {
                    return _impl;
                }
            }
        "#;
        let signals = scan_source(src);
        assert_eq!(signals.accessor.as_deref(), Some("_implementation"));
        assert_eq!(signals.accessor_name(), "_implementation");
    }

    #[test]
    fn test_accessor_name_defaults() {
        let signals = SourceSignals::default();
        assert_eq!(signals.accessor_name(), "implementation");
    }

    #[test]
    fn test_custom_slot_requires_storage_and_slot_in_name() {
        let src = "bytes32 internal constant IMPL_STORAGE_SLOT = 0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc;";
        let signals = scan_source(src);
        assert!(signals.custom_slot.is_some());

        let src2 = "bytes32 internal constant MERKLE_ROOT = 0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc;";
        assert!(scan_source(src2).custom_slot.is_none());
    }

    #[test]
    fn test_no_signals_on_ordinary_contract() {
        let src = "contract Token { function transfer(address to, uint256 amount) external {} }";
        let signals = scan_source(src);
        assert!(!signals.any());
    }

    #[test]
    fn test_constructor_arg_addresses() {
        let mut args = vec![0u8; 32];
        args[12..].copy_from_slice(&[0xAB; 20]);
        // a non-address word: no zero padding
        args.extend_from_slice(&[0xFF; 32]);
        // a zero word
        args.extend_from_slice(&[0u8; 32]);

        let found = constructor_arg_addresses(&args);
        assert_eq!(found, vec![Address::from([0xAB; 20])]);
    }

    #[test]
    fn test_constructor_arg_addresses_dedup() {
        let mut word = vec![0u8; 32];
        word[12..].copy_from_slice(&[0xCD; 20]);
        let mut args = word.clone();
        args.extend_from_slice(&word);
        assert_eq!(constructor_arg_addresses(&args).len(), 1);
    }
}
