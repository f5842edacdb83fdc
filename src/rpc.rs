//! JSON-RPC chain access
//!
//! Read-only view of an EVM chain: deployed bytecode, storage slots, and
//! zero-argument view calls. Primary endpoint with retry and exponential
//! backoff, falling back to a public RPC when the primary is down.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ChainEntry;

const USER_AGENT_STRING: &str = "sourcescope/0.2.0";

/// Default timeout for RPC requests
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const BASE_RETRY_DELAY_MS: u64 = 100;

/// The three chain reads the resolver consumes. A trait seam so tests can
/// drive the probe chain with an in-memory chain.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Deployed bytecode at an address. Empty bytes means nothing deployed.
    async fn get_code(&self, address: Address) -> Result<Bytes>;

    /// One 32-byte storage slot.
    async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256>;

    /// Read-only call with raw calldata. A revert surfaces as an `Err`,
    /// which callers treat as "no answer".
    async fn call(&self, to: Address, data: &[u8]) -> Result<Bytes>;
}

/// RPC provider with retry logic and public fallback
#[derive(Clone)]
pub struct RpcProvider {
    /// Primary RPC URL
    primary_url: String,
    /// Fallback RPC URL (public)
    fallback_url: Option<String>,
    /// HTTP client with custom headers
    client: reqwest::Client,
    /// Chain name for logging
    chain_name: &'static str,
}

impl RpcProvider {
    pub fn new(entry: &ChainEntry) -> Result<Self> {
        let primary_url = entry.primary_rpc_url();
        let fallback_url = if primary_url == entry.public_rpc {
            None
        } else {
            Some(entry.public_rpc.to_string())
        };

        let client = Self::build_client()?;

        Ok(Self {
            primary_url,
            fallback_url,
            client,
            chain_name: entry.name,
        })
    }

    fn build_client() -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
    }

    /// Execute JSON-RPC call with retry logic and fallback
    async fn rpc<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        match self.call_with_retry(&self.primary_url, &payload).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                warn!("⚠️ Primary RPC failed on {}: {}", self.chain_name, e);
            }
        }

        if let Some(ref fallback) = self.fallback_url {
            debug!("🔄 Trying fallback RPC for {}", self.chain_name);
            match self.call_with_retry(fallback, &payload).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!("⚠️ Fallback RPC also failed: {}", e);
                }
            }
        }

        Err(eyre!("All RPC endpoints failed for {}", self.chain_name))
    }

    /// Execute call with exponential backoff retry
    async fn call_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 100ms, 200ms, 400ms...
                let delay = BASE_RETRY_DELAY_MS * (2_u64.pow(attempt - 1));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.execute_call::<T>(url, payload).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.to_string().contains("429") || e.to_string().contains("rate limit") {
                        warn!(
                            "⏳ Rate limited, backing off (attempt {}/{})",
                            attempt + 1,
                            MAX_RETRIES
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| eyre!("Unknown error after {} retries", MAX_RETRIES)))
    }

    /// Execute single RPC call
    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| eyre!("Request failed: {}", e))?;

        let status = response.status();
        if status == 429 {
            return Err(eyre!("Rate limited (HTTP 429)"));
        }
        if !status.is_success() {
            return Err(eyre!("HTTP error: {}", status));
        }

        let json: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse response: {}", e))?;

        if let Some(error) = json.error {
            return Err(eyre!("RPC error: {} (code: {})", error.message, error.code));
        }

        json.result.ok_or_else(|| eyre!("No result in response"))
    }

    /// RPC URL for logging, with the API key masked
    pub fn masked_url(&self) -> String {
        if self.primary_url.contains("/v2/") {
            let parts: Vec<&str> = self.primary_url.split("/v2/").collect();
            if parts.len() == 2 {
                return format!("{}/v2/***HIDDEN***", parts[0]);
            }
        }
        self.primary_url.clone()
    }
}

#[async_trait]
impl ChainReader for RpcProvider {
    async fn get_code(&self, address: Address) -> Result<Bytes> {
        let params = serde_json::json!([format!("{address:?}"), "latest"]);
        let raw: String = self.rpc("eth_getCode", params).await?;
        Bytes::from_str(&raw).map_err(|e| eyre!("Invalid bytecode hex: {}", e))
    }

    async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256> {
        let params = serde_json::json!([format!("{address:?}"), format!("{slot}"), "latest"]);
        let raw: String = self.rpc("eth_getStorageAt", params).await?;
        parse_storage_word(&raw)
    }

    async fn call(&self, to: Address, data: &[u8]) -> Result<Bytes> {
        let params = serde_json::json!([
            {
                "to": format!("{to:?}"),
                "data": format!("0x{}", hex::encode(data)),
            },
            "latest"
        ]);
        let raw: String = self.rpc("eth_call", params).await?;
        Bytes::from_str(&raw).map_err(|e| eyre!("Invalid call return hex: {}", e))
    }
}

/// Some nodes return storage words without left zero-padding; normalize to
/// a full 32 bytes before interpreting.
fn parse_storage_word(raw: &str) -> Result<B256> {
    let stripped = raw.trim().trim_start_matches("0x");
    if stripped.len() > 64 {
        return Err(eyre!("Storage word longer than 32 bytes: {}", raw));
    }
    let padded = format!("{:0>64}", stripped);
    B256::from_str(&padded).map_err(|e| eyre!("Invalid storage word {}: {}", raw, e))
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<RpcError>,
    #[allow(dead_code)]
    id: u64,
}

/// JSON-RPC error structure
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}
