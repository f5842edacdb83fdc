//! Verified-source registry client
//!
//! Talks to an Etherscan-family `getsourcecode` endpoint and normalizes the
//! response into a [`SourceRecord`]. The registry is the only place that
//! knows about explorer response quirks: the `{{…}}` double-wrapping stays
//! in `source_text` for the parser, but flag fields ("1"/"0" strings, empty
//! strings for missing addresses) are decoded here.
//!
//! Free-tier keys are aggressively rate limited; the client retries once on
//! the explorer's "Max rate limit reached" answer before giving up.

use alloy_primitives::Address;
use eyre::{eyre, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ChainEntry;
use crate::models::SourceRecord;

const REGISTRY_TIMEOUT_SECS: u64 = 15;

/// Delay before retrying a rate-limited explorer request
const RATE_LIMIT_BACKOFF_MS: u64 = 1100;

/// Block-explorer API client for one chain
pub struct SourceRegistry {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    chain_name: &'static str,
}

/// Raw explorer envelope: `status` is "1" on success, `result` is either an
/// array of source entries or a bare error string.
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    message: String,
    result: serde_json::Value,
}

/// One entry of the `getsourcecode` result array
#[derive(Debug, Deserialize)]
struct ExplorerSourceEntry {
    #[serde(rename = "SourceCode", default)]
    source_code: String,
    #[serde(rename = "ABI", default)]
    abi: String,
    #[serde(rename = "ContractName", default)]
    contract_name: String,
    #[serde(rename = "ContractFileName", default)]
    contract_file_name: String,
    #[serde(rename = "CompilerVersion", default)]
    compiler_version: String,
    #[serde(rename = "ConstructorArguments", default)]
    constructor_arguments: String,
    #[serde(rename = "Proxy", default)]
    proxy: String,
    #[serde(rename = "Implementation", default)]
    implementation: String,
}

impl SourceRegistry {
    pub fn new(entry: &ChainEntry) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: entry.explorer_api.to_string(),
            api_key: entry.explorer_api_key(),
            chain_name: entry.name,
        }
    }

    /// Fetch the verified-source record for an address.
    ///
    /// Returns `Ok` with `verified = false` when the explorer responds but
    /// holds no verified source; transport and API errors are `Err`.
    pub async fn get_source(&self, address: Address) -> Result<SourceRecord> {
        info!("🔍 Registry: fetching verified source for {} on {}", address, self.chain_name);

        let entry = match self.fetch(address).await {
            Ok(entry) => entry,
            Err(e) if e.to_string().contains("rate limit") => {
                warn!("⏳ Registry rate limited, backing off once");
                tokio::time::sleep(Duration::from_millis(RATE_LIMIT_BACKOFF_MS)).await;
                self.fetch(address).await?
            }
            Err(e) => return Err(e),
        };

        // The explorer answers 200/OK for unverified contracts too; the
        // sentinel lives in the ABI field.
        let verified =
            !entry.source_code.is_empty() && !entry.abi.contains("not verified");
        if !verified {
            debug!("Source for {} is not verified", address);
        }

        Ok(SourceRecord {
            verified,
            contract_name: entry.contract_name,
            contract_file_name: non_empty(entry.contract_file_name),
            source_text: entry.source_code,
            compiler_version: non_empty(entry.compiler_version),
            declared_proxy: entry.proxy.trim() == "1",
            declared_implementation: non_empty(entry.implementation),
            constructor_args: decode_constructor_args(&entry.constructor_arguments),
        })
    }

    async fn fetch(&self, address: Address) -> Result<ExplorerSourceEntry> {
        let address_hex = format!("{address:?}");
        let mut query: Vec<(&str, &str)> = vec![
            ("module", "contract"),
            ("action", "getsourcecode"),
            ("address", &address_hex),
        ];
        if let Some(ref key) = self.api_key {
            query.push(("apikey", key));
        }

        let response = self
            .client
            .get(&self.api_url)
            .query(&query)
            .timeout(Duration::from_secs(REGISTRY_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| eyre!("Registry request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(eyre!("Registry API error: {}", response.status()));
        }

        let envelope: ExplorerResponse = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse registry response: {}", e))?;

        if envelope.status != "1" {
            // `result` degrades to a bare string on errors
            let detail = envelope
                .result
                .as_str()
                .map(str::to_string)
                .unwrap_or(envelope.message);
            return Err(eyre!("Registry rejected request: {}", detail));
        }

        let mut entries: Vec<ExplorerSourceEntry> = serde_json::from_value(envelope.result)
            .map_err(|e| eyre!("Unexpected registry result shape: {}", e))?;
        if entries.is_empty() {
            return Err(eyre!("Registry returned an empty result set"));
        }
        Ok(entries.remove(0))
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Constructor args arrive as bare hex without the 0x prefix.
fn decode_constructor_args(raw: &str) -> Option<Vec<u8>> {
    let stripped = raw.trim().trim_start_matches("0x");
    if stripped.is_empty() {
        return None;
    }
    match hex::decode(stripped) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            debug!("Ignoring undecodable constructor args: {}", e);
            None
        }
    }
}
