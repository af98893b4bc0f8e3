//! Extraction settings

use serde::{Deserialize, Serialize};

/// Default per-entry ceiling on decoded output (1 GiB)
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 1024 * 1024 * 1024;

/// What to do when the decoded length differs from the header's declared size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCheck {
    /// Return the decoded bytes without comparing
    Ignore,
    /// Return the decoded bytes and log a warning on mismatch
    #[default]
    Warn,
    /// Fail with [`crate::DtaError::SizeMismatch`] on mismatch
    Strict,
}

/// Configuration for archive extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DtaConfig {
    /// Declared-size policy
    pub size_check: SizeCheck,

    /// Maximum decoded bytes for a single entry
    pub max_output_size: usize,

    /// Fail DPCM entries instead of decoding them with the placeholder delta
    /// tables
    pub require_delta_tables: bool,
}

impl Default for DtaConfig {
    fn default() -> Self {
        Self {
            size_check: SizeCheck::Warn,
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            require_delta_tables: false,
        }
    }
}

impl DtaConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the declared-size policy
    #[must_use]
    pub const fn with_size_check(mut self, size_check: SizeCheck) -> Self {
        self.size_check = size_check;
        self
    }

    /// Set the per-entry output ceiling
    #[must_use]
    pub const fn with_max_output_size(mut self, size: usize) -> Self {
        self.max_output_size = size;
        self
    }

    /// Require loaded delta tables for DPCM entries
    #[must_use]
    pub const fn with_require_delta_tables(mut self, required: bool) -> Self {
        self.require_delta_tables = required;
        self
    }
}
