//! Audit preparation pipeline
//!
//! Orchestrates one address end to end: registry lookup → proxy resolution
//! → (for each resolved contract) parse, strip, classify, save. A proxy
//! address fans out into two passes, one for the proxy itself and one for
//! its implementation, writing to disjoint subdirectories. Recoverable
//! conditions become per-address reports instead of aborting the run.

use alloy_primitives::{Address, Bytes};
use dashmap::DashMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::classify::AuditClassifier;
use crate::config::{Blacklist, ChainEntry};
use crate::models::{AddressReport, AppResult, ContractKind, SourceRecord};
use crate::output::OutputWriter;
use crate::registry::SourceRegistry;
use crate::resolver::ProxyResolver;
use crate::rpc::{ChainReader, RpcProvider};
use crate::source::{parse, rename_single_file, strip_file};

/// One pipeline per chain; addresses are processed independently.
pub struct Pipeline {
    chain: &'static ChainEntry,
    rpc: RpcProvider,
    registry: SourceRegistry,
    blacklist: Blacklist,
    output_root: PathBuf,
    /// Bytecode memo: the resolver and the proxy/implementation passes can
    /// touch the same address more than once per run.
    code_cache: DashMap<Address, Bytes>,
}

impl Pipeline {
    pub fn new(
        chain: &'static ChainEntry,
        blacklist: Blacklist,
        output_root: PathBuf,
    ) -> AppResult<Self> {
        let rpc = RpcProvider::new(chain).map_err(crate::models::AppError::from)?;
        let registry = SourceRegistry::new(chain);
        Ok(Self {
            chain,
            rpc,
            registry,
            blacklist,
            output_root,
            code_cache: DashMap::new(),
        })
    }

    /// Process one address, returning one report per contract pass.
    pub async fn process_address(&self, address: Address) -> Vec<AddressReport> {
        info!("🚀 Preparing {} on {}", address, self.chain.name);

        let record = match self.registry.get_source(address).await {
            Ok(record) => record,
            Err(e) => {
                return vec![AddressReport::failed(
                    address,
                    ContractKind::Main,
                    format!("registry lookup failed: {e}"),
                )];
            }
        };

        let code = match self.cached_code(address).await {
            Some(code) => code,
            None => {
                return vec![AddressReport::failed(
                    address,
                    ContractKind::Main,
                    "chain unreachable while fetching bytecode",
                )];
            }
        };

        let resolver = ProxyResolver::new(&self.rpc);
        let resolution = match resolver.resolve(address, code.as_ref(), Some(&record)).await {
            Ok(resolution) => resolution,
            Err(e) => {
                // no deployed code: fatal for this resolution, not the run
                let aborted = crate::models::ProxyResolution::aborted(address, e.to_string());
                warn!("⚠️ Proxy detection aborted for {}: {}", address, e);
                return vec![AddressReport::failed(
                    address,
                    ContractKind::Main,
                    aborted.error.unwrap_or_default(),
                )];
            }
        };

        match resolution.implementation {
            Some(implementation) if resolution.is_proxy => {
                info!(
                    "🔀 {} is a proxy (method: {}) → implementation {}",
                    address,
                    resolution.method.as_str(),
                    implementation
                );
                // two sequential passes writing to disjoint subdirectories
                let mut reports = Vec::with_capacity(2);
                reports.push(
                    self.save_pass(address, address, ContractKind::Proxy, Some(record))
                        .await,
                );
                reports.push(
                    self.save_pass(address, implementation, ContractKind::Implementation, None)
                        .await,
                );
                reports
            }
            _ => {
                info!("📄 {} is not a proxy", address);
                vec![
                    self.save_pass(address, address, ContractKind::Main, Some(record))
                        .await,
                ]
            }
        }
    }

    /// Fetch, normalize, triage, and persist one contract. `base_address`
    /// names the output directory; `source_address` is whose source to use.
    async fn save_pass(
        &self,
        base_address: Address,
        source_address: Address,
        kind: ContractKind,
        prefetched: Option<SourceRecord>,
    ) -> AddressReport {
        let record = match prefetched {
            Some(record) => record,
            None => match self.registry.get_source(source_address).await {
                Ok(record) => record,
                Err(e) => {
                    return AddressReport::failed(
                        source_address,
                        kind,
                        format!("registry lookup failed: {e}"),
                    );
                }
            },
        };

        if !record.verified {
            return AddressReport::failed(source_address, kind, "contract source not verified");
        }

        let mut tree = parse(&record.source_text);
        if tree.is_empty() {
            return AddressReport::failed(source_address, kind, "verified record has no source text");
        }
        rename_single_file(&mut tree, &record.contract_name);

        for (path, text) in tree.files.clone() {
            tree.files.insert(path.clone(), strip_file(&path, &text));
        }

        let classifier = AuditClassifier::new(&self.blacklist);
        let classification = classifier.classify(
            &tree,
            Some(record.contract_name.as_str()).filter(|n| !n.is_empty()),
            record.contract_file_name.as_deref(),
        );

        let writer = OutputWriter::new(&self.output_root, self.chain.name, base_address);
        let stats = writer.save_contract(kind, &tree, &classification);

        info!(
            "💾 Saved {} [{}]: {} kept, {} excluded, {} blacklisted",
            source_address,
            kind.as_str(),
            stats.kept,
            stats.excluded,
            stats.skipped_blacklisted
        );

        AddressReport {
            address: source_address,
            kind,
            success: true,
            reason: None,
            main_contract: classification.main_contract.clone(),
            files_kept: stats.kept,
            files_excluded: stats.excluded + stats.skipped_blacklisted,
            red_flags: classification.red_flags(),
        }
    }

    async fn cached_code(&self, address: Address) -> Option<Bytes> {
        if let Some(code) = self.code_cache.get(&address) {
            return Some(code.clone());
        }
        match self.rpc.get_code(address).await {
            Ok(code) => {
                self.code_cache.insert(address, code.clone());
                Some(code)
            }
            Err(e) => {
                warn!("⚠️ Bytecode fetch failed for {}: {}", address, e);
                None
            }
        }
    }
}
