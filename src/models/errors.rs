//! Centralized error handling
//!
//! Every failure carries a unique string code so log lines can be grepped
//! and monitored without parsing free-form messages.
//!
//! Error codes follow the pattern CATEGORY_SPECIFIC_ERROR:
//! - RPC_xxx: chain JSON-RPC errors
//! - REG_xxx: block-explorer registry errors
//! - SRC_xxx: source availability
//! - ADDR_xxx: address preconditions
//! - CFG_xxx: configuration errors
//! - PERSIST_xxx: output persistence

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // RPC Errors
    // ============================================
    /// RPC connection failed
    RpcConnectionFailed,
    /// RPC request timeout
    RpcTimeout,
    /// RPC rate limited (HTTP 429)
    RpcRateLimited,
    /// RPC returned error response
    RpcError,
    /// Invalid RPC response
    RpcInvalidResponse,

    // ============================================
    // Registry Errors
    // ============================================
    /// Block-explorer API error
    RegistryError,
    /// Block-explorer rate limit
    RegistryRateLimited,
    /// Invalid registry response
    RegistryInvalidResponse,

    // ============================================
    // Source / Address Errors
    // ============================================
    /// Registry reports no verified source for the address
    SourceNotVerified,
    /// Bytecode fetch returned empty: nothing deployed at the address
    NoContractAtAddress,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Requested chain identifier is not in the supported set
    ConfigUnsupportedChain,
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Missing API key
    ConfigMissingApiKey,

    // ============================================
    // Persistence Errors
    // ============================================
    /// Could not write a file or directory
    PersistWriteFailed,
    /// Could not delete a transiently written file
    PersistDeleteFailed,

    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // RPC Errors
            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcRateLimited => "RPC_RATE_LIMITED",
            Self::RpcError => "RPC_ERROR",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",

            // Registry Errors
            Self::RegistryError => "REG_ERROR",
            Self::RegistryRateLimited => "REG_RATE_LIMITED",
            Self::RegistryInvalidResponse => "REG_INVALID_RESPONSE",

            // Source / Address Errors
            Self::SourceNotVerified => "SRC_NOT_VERIFIED",
            Self::NoContractAtAddress => "ADDR_NO_CODE",

            // Configuration Errors
            Self::ConfigUnsupportedChain => "CFG_UNSUPPORTED_CHAIN",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigMissingApiKey => "CFG_MISSING_API_KEY",

            // Persistence Errors
            Self::PersistWriteFailed => "PERSIST_WRITE_FAILED",
            Self::PersistDeleteFailed => "PERSIST_DELETE_FAILED",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Check if error is retryable at the transport layer
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RpcTimeout
                | Self::RpcRateLimited
                | Self::RpcConnectionFailed
                | Self::RegistryRateLimited
        )
    }

    /// Fatal errors abort the invocation; everything else degrades to a
    /// per-address report.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigUnsupportedChain | Self::ConfigInvalidValue | Self::ConfigMissingApiKey
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    pub fn unsupported_chain(chain: &str) -> Self {
        Self::new(
            ErrorCode::ConfigUnsupportedChain,
            format!("Unsupported chain: {}", chain),
        )
    }

    pub fn no_contract_at(address: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::NoContractAtAddress,
            format!("No deployed code at address {}", address),
        )
    }

    pub fn not_verified(address: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::SourceNotVerified,
            format!("Contract source not verified for {}", address),
        )
    }

    pub fn registry_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RegistryError, msg)
    }

    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    pub fn persist_write(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::PersistWriteFailed, msg)
    }

    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::PersistWriteFailed, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::RpcTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::RpcConnectionFailed, "Connection failed")
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::no_contract_at("0x0000000000000000000000000000000000000001");
        assert_eq!(err.code, ErrorCode::NoContractAtAddress);
        assert_eq!(err.code_str(), "ADDR_NO_CODE");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::RpcTimeout.is_retryable());
        assert!(ErrorCode::RegistryRateLimited.is_retryable());
        assert!(!ErrorCode::SourceNotVerified.is_retryable());
    }

    #[test]
    fn test_fatal() {
        assert!(ErrorCode::ConfigUnsupportedChain.is_fatal());
        assert!(!ErrorCode::SourceNotVerified.is_fatal());
        assert!(!ErrorCode::NoContractAtAddress.is_fatal());
    }

    #[test]
    fn test_display_includes_code() {
        let err = AppError::unsupported_chain("dogechain");
        assert_eq!(
            err.to_string(),
            "[CFG_UNSUPPORTED_CHAIN] Unsupported chain: dogechain"
        );
    }
}
