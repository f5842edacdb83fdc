//! Proxy resolution engine
//!
//! Given an address, its deployed bytecode, and an optional verified-source
//! record, decides whether the address is a proxy and which implementation
//! address to treat as the real contract.
//!
//! The engine is an ordered, short-circuiting chain: the first probe to
//! yield an implementation wins and its tag is recorded in the result.
//! Priority is reliability-ordered: a registry-reported implementation
//! beats deterministic storage-slot standards, which beat bytecode
//! signatures, which beat live calls, which beat source-text heuristics.
//! Any individual probe failure (revert, timeout, decode error) counts as
//! "no answer" from that probe, never as an engine-level failure.

pub mod bytecode;
pub mod slots;
pub mod source_scan;

use alloy_primitives::{keccak256, Address, B256};
use alloy_sol_types::{sol, SolCall};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::models::{AppError, AppResult, ProxyMethod, ProxyResolution, SourceRecord};
use crate::rpc::ChainReader;

sol! {
    function implementation() external view returns (address);
    function masterCopy() external view returns (address);
    function childImplementation() external view returns (address);
}

/// Storage-slot probes in fixed priority order
const SLOT_PROBES: &[(B256, ProxyMethod)] = &[
    (slots::EIP1967_LOGIC_SLOT, ProxyMethod::Eip1967),
    (slots::OZ_IMPLEMENTATION_SLOT, ProxyMethod::OpenzeppelinSlot),
    (slots::EIP1822_PROXIABLE_SLOT, ProxyMethod::Eip1822),
];

/// Proxy resolution engine over a read-only chain view.
pub struct ProxyResolver<'a> {
    chain: &'a dyn ChainReader,
}

impl<'a> ProxyResolver<'a> {
    pub fn new(chain: &'a dyn ChainReader) -> Self {
        Self { chain }
    }

    /// Resolve one address. "Not a proxy" is a normal result; the only
    /// failure is an address with no deployed code at all.
    pub async fn resolve(
        &self,
        address: Address,
        deployed_code: &[u8],
        record: Option<&SourceRecord>,
    ) -> AppResult<ProxyResolution> {
        if deployed_code.is_empty() {
            return Err(AppError::no_contract_at(address));
        }

        // 1. Declared-proxy shortcut: the registry already resolved this
        //    from verified metadata, but its value is re-validated here.
        if let Some(record) = record {
            if record.declared_proxy {
                if let Some(implementation) = declared_implementation(record) {
                    debug!("Proxy {} resolved via registry declaration", address);
                    return Ok(ProxyResolution::resolved(
                        address,
                        implementation,
                        ProxyMethod::EtherscanApi,
                    ));
                }
            }
        }

        // 2. Well-known storage slots
        for (slot, method) in SLOT_PROBES {
            if let Some(implementation) = self.slot_probe(address, *slot).await {
                debug!("Proxy {} resolved via {}", address, method.as_str());
                return Ok(ProxyResolution::resolved(address, implementation, *method));
            }
        }

        // 3. Minimal-proxy bytecode templates
        if let Some(implementation) = bytecode::match_minimal_proxy(deployed_code) {
            debug!("Proxy {} resolved via minimal-proxy bytecode", address);
            return Ok(ProxyResolution::resolved(
                address,
                implementation,
                ProxyMethod::Eip1167Bytecode,
            ));
        }

        // 4. Zero-argument view-call conventions
        if let Some(implementation) = self.call_probe(address, implementationCall::SELECTOR).await
        {
            debug!("Proxy {} resolved via implementation() call", address);
            return Ok(ProxyResolution::resolved(
                address,
                implementation,
                ProxyMethod::Eip897Call,
            ));
        }
        if let Some(implementation) = self.call_probe(address, masterCopyCall::SELECTOR).await {
            debug!("Proxy {} resolved via masterCopy() call", address);
            return Ok(ProxyResolution::resolved(
                address,
                implementation,
                ProxyMethod::GnosisSafe,
            ));
        }

        // 5. Beacon indirection
        if let Some(implementation) = self.beacon_probe(address).await {
            debug!("Proxy {} resolved via beacon", address);
            return Ok(ProxyResolution::resolved(
                address,
                implementation,
                ProxyMethod::Eip1967Beacon,
            ));
        }

        // 6. Source-text heuristics, only with verified source in hand
        if let Some(record) = record {
            if record.verified {
                if let Some(implementation) = self.source_probe(address, record).await {
                    debug!("Proxy {} resolved via source analysis", address);
                    return Ok(ProxyResolution::resolved(
                        address,
                        implementation,
                        ProxyMethod::SourceAnalysis,
                    ));
                }
            }
        }

        Ok(ProxyResolution::not_a_proxy(address))
    }

    /// Read one well-known slot and interpret it as a right-aligned address.
    async fn slot_probe(&self, address: Address, slot: B256) -> Option<Address> {
        let word = self.chain.get_storage_at(address, slot).await.ok()?;
        address_from_word(word.as_slice())
    }

    /// Invoke a zero-argument view function; revert, empty return, and the
    /// zero address all count as "no answer".
    async fn call_probe(&self, address: Address, selector: [u8; 4]) -> Option<Address> {
        let returned = self.chain.call(address, &selector).await.ok()?;
        address_from_word(returned.as_ref())
    }

    /// EIP-1967 beacon slot, then `implementation()` and
    /// `childImplementation()` on the beacon; first non-empty wins.
    async fn beacon_probe(&self, address: Address) -> Option<Address> {
        let beacon = self.slot_probe(address, slots::EIP1967_BEACON_SLOT).await?;
        if let Some(implementation) = self.call_probe(beacon, implementationCall::SELECTOR).await {
            return Some(implementation);
        }
        self.call_probe(beacon, childImplementationCall::SELECTOR).await
    }

    /// Speculative resolution for custom proxies, gated on textual signals.
    async fn source_probe(&self, address: Address, record: &SourceRecord) -> Option<Address> {
        let signals = source_scan::scan_source(&record.source_text);
        if !signals.any() {
            return None;
        }
        let selector = accessor_selector(signals.accessor_name());

        // the conventional accessor on the contract itself
        if let Some(implementation) = self.call_probe(address, selector).await {
            return Some(implementation);
        }

        // a custom slot may point at an intermediary that knows the answer
        if let Some(slot) = signals.custom_slot {
            if let Some(holder) = self.slot_probe(address, slot).await {
                if self.has_code(holder).await {
                    if let Some(implementation) = self.call_probe(holder, selector).await {
                        return Some(implementation);
                    }
                }
            }
        }

        // deployed contracts among the constructor arguments
        if let Some(args) = record.constructor_args.as_deref() {
            for candidate in source_scan::constructor_arg_addresses(args) {
                if self.has_code(candidate).await {
                    if let Some(implementation) = self.call_probe(candidate, selector).await {
                        return Some(implementation);
                    }
                }
            }
        }

        None
    }

    async fn has_code(&self, address: Address) -> bool {
        self.chain
            .get_code(address)
            .await
            .map(|code| !code.is_empty())
            .unwrap_or(false)
    }
}

/// Right-aligned address in a 32-byte word: the 12 padding bytes must be
/// zero and the address itself must be non-zero.
fn address_from_word(word: &[u8]) -> Option<Address> {
    if word.len() < 32 {
        return None;
    }
    let word = &word[..32];
    if word[..12].iter().any(|b| *b != 0) {
        return None;
    }
    let address = Address::from_slice(&word[12..]);
    (address != Address::ZERO).then_some(address)
}

/// Selector for a zero-argument accessor by name.
fn accessor_selector(name: &str) -> [u8; 4] {
    let hash = keccak256(format!("{name}()").as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Validate the registry-declared implementation address. Invalid values
/// are logged and fall through to the on-chain probes rather than trusted.
fn declared_implementation(record: &SourceRecord) -> Option<Address> {
    let raw = record.declared_implementation.as_deref()?.trim();
    match validate_address(raw) {
        Some(address) => Some(address),
        None => {
            warn!(
                "⚠️ Registry-declared implementation {:?} is not a valid address, ignoring",
                raw
            );
            None
        }
    }
}

/// Syntactic address validation: well-formed hex, non-zero, and (when the
/// input is mixed-case) a correct EIP-55 checksum.
pub fn validate_address(raw: &str) -> Option<Address> {
    let address = Address::from_str(raw).ok()?;
    if address == Address::ZERO {
        return None;
    }
    let hex_part = raw.strip_prefix("0x").unwrap_or(raw);
    let mixed = hex_part.chars().any(|c| c.is_ascii_uppercase())
        && hex_part.chars().any(|c| c.is_ascii_lowercase());
    if mixed && Address::parse_checksummed(raw, None).is_err() {
        return None;
    }
    Some(address)
}
