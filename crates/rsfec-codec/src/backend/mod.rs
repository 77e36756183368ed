//! Block codec backend abstraction
//!
//! The file codec only needs a primitive that turns `data_length` symbols
//! into `check_length` check symbols and repairs a possibly corrupted
//! codeword in place. This module defines that seam as a trait so the
//! chunking, interleaving and driver layers never depend on a concrete code.
//!
//! # Backends
//!
//! - `reed_solomon`: systematic Reed-Solomon over GF(2^8) with
//!   Berlekamp-Massey decoding (default)

pub mod galois;
pub mod reed_solomon;

use rsfec_common::{CodeParameters, Error as CommonError, config::CodeConfig};
use thiserror::Error;

/// Errors raised by a block codec backend
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("codeword is uncorrectable: {0}")]
    Uncorrectable(String),

    #[error("length mismatch: expected {expected} symbols, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl From<CodecError> for CommonError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::InvalidConfig(msg) => CommonError::Configuration(msg),
            other => CommonError::Codec(other.to_string()),
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, CodecError>;

/// Capabilities of a block codec backend
#[derive(Clone, Debug, Default)]
pub struct BackendCapabilities {
    /// Backend name for identification
    pub name: &'static str,
    /// Corrects errors at unknown positions (not just erasures)
    pub corrects_errors: bool,
    /// Maximum codeword length supported
    pub max_codeword_length: usize,
}

/// Core trait for block codec backends
///
/// Implementations are immutable after construction; every call works on
/// caller-owned buffers so one backend can be shared across threads.
pub trait BlockCodec: Send + Sync {
    /// Get backend capabilities
    fn capabilities(&self) -> BackendCapabilities;

    /// Get the codeword geometry
    fn parameters(&self) -> CodeParameters;

    /// Total symbols per codeword
    fn codeword_length(&self) -> usize {
        self.parameters().codeword_length()
    }

    /// Check symbols per codeword
    fn check_length(&self) -> usize {
        self.parameters().check_length()
    }

    /// Data symbols per codeword
    fn data_length(&self) -> usize {
        self.parameters().data_length()
    }

    /// Symbol errors a codeword can absorb
    fn correction_capacity(&self) -> usize {
        self.parameters().correction_capacity()
    }

    /// Compute check symbols for one codeword
    ///
    /// # Arguments
    /// * `data` - Exactly `data_length` data symbols
    ///
    /// # Returns
    /// The `check_length` check symbols
    fn encode(&self, data: &[u8]) -> BackendResult<Vec<u8>>;

    /// Correct a codeword in place
    ///
    /// # Arguments
    /// * `codeword` - `data_length` data symbols followed by `check_length`
    ///   check symbols
    ///
    /// # Returns
    /// Positions (indices into `codeword`) that were corrected, or
    /// `CodecError::Uncorrectable` when the error count exceeds the
    /// correction capacity. On failure the buffer is left untouched.
    fn decode(&self, codeword: &mut [u8]) -> BackendResult<Vec<usize>>;
}

/// Configuration for creating a backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Codeword geometry
    pub parameters: CodeParameters,
    /// Field generator polynomial, including the x^8 term
    pub primitive_polynomial: u16,
    /// Exponent of the first consecutive generator root
    pub first_root_index: u32,
}

impl BackendConfig {
    /// Create a configuration with the default field and root placement
    pub const fn new(parameters: CodeParameters) -> Self {
        Self {
            parameters,
            primitive_polynomial: galois::DEFAULT_PRIMITIVE_POLYNOMIAL,
            first_root_index: 120,
        }
    }

    /// Set the field generator polynomial
    #[must_use]
    pub const fn with_primitive_polynomial(mut self, polynomial: u16) -> Self {
        self.primitive_polynomial = polynomial;
        self
    }

    /// Set the first consecutive root exponent
    #[must_use]
    pub const fn with_first_root_index(mut self, index: u32) -> Self {
        self.first_root_index = index;
        self
    }

    /// Build from the `[code]` section of a configuration file
    pub fn from_code_config(config: &CodeConfig) -> rsfec_common::Result<Self> {
        Ok(Self {
            parameters: config.parameters()?,
            primitive_polynomial: config.primitive_polynomial,
            first_root_index: config.first_root_index,
        })
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(CodeParameters::default())
    }
}

// Re-exports
pub use galois::GaloisField;
pub use reed_solomon::ReedSolomonBackend;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config_from_code_config() {
        let code = CodeConfig {
            codeword_length: 64,
            check_length: 8,
            primitive_polynomial: 0x11d,
            first_root_index: 0,
        };
        let config = BackendConfig::from_code_config(&code).unwrap();
        assert_eq!(config.parameters.data_length(), 56);
        assert_eq!(config.primitive_polynomial, 0x11d);
        assert_eq!(config.first_root_index, 0);
    }

    #[test]
    fn test_codec_error_conversion() {
        let err: CommonError = CodecError::InvalidConfig("bad".into()).into();
        assert!(matches!(err, CommonError::Configuration(_)));

        let err: CommonError = CodecError::Uncorrectable("17 errors".into()).into();
        assert!(matches!(err, CommonError::Codec(_)));
    }
}
