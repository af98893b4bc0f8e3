//! Error types for key handling

use thiserror::Error;

/// Errors that can occur while parsing or loading archive keys
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key format
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),
}
