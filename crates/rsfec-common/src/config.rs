//! Configuration types for rsfec
//!
//! The configuration is a TOML file in which every field has a default, so an
//! empty file (or no file at all) yields the RS(255, 223) setup with 1 MiB
//! super-chunks.

use crate::error::{Error, Result};
use crate::types::{CodeParameters, UncorrectablePolicy, WireFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration for rsfec
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Block code configuration
    #[serde(default)]
    pub code: CodeConfig,
    /// Super-chunk sizing
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Decode behavior
    #[serde(default)]
    pub decode: DecodeConfig,
    /// Output framing
    #[serde(default)]
    pub format: FormatConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let params = self.code.parameters()?;
        if self.chunking.super_chunk_budget < params.data_length() {
            return Err(Error::Configuration(format!(
                "super_chunk_budget {} is smaller than one data unit ({} bytes)",
                self.chunking.super_chunk_budget,
                params.data_length()
            )));
        }
        let poly = self.code.primitive_polynomial;
        if poly & !0x1FF != 0 || poly & 0x100 == 0 {
            return Err(Error::Configuration(format!(
                "primitive_polynomial {poly:#x} is not a degree-8 polynomial"
            )));
        }
        Ok(())
    }
}

/// Block code configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Total symbols per codeword
    #[serde(default = "default_codeword_length")]
    pub codeword_length: usize,
    /// Check symbols per codeword
    #[serde(default = "default_check_length")]
    pub check_length: usize,
    /// Field generator polynomial, including the x^8 term
    #[serde(default = "default_primitive_polynomial")]
    pub primitive_polynomial: u16,
    /// Exponent of the first consecutive generator root
    #[serde(default = "default_first_root_index")]
    pub first_root_index: u32,
}

impl CodeConfig {
    /// Validated codeword geometry
    pub fn parameters(&self) -> Result<CodeParameters> {
        CodeParameters::new(self.codeword_length, self.check_length)
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            codeword_length: default_codeword_length(),
            check_length: default_check_length(),
            primitive_polynomial: default_primitive_polynomial(),
            first_root_index: default_first_root_index(),
        }
    }
}

/// Super-chunk sizing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Data bytes interleaved together as one super-chunk
    #[serde(default = "default_super_chunk_budget")]
    pub super_chunk_budget: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            super_chunk_budget: default_super_chunk_budget(),
        }
    }
}

/// Decode behavior
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Policy for blocks the code cannot correct
    #[serde(default)]
    pub on_uncorrectable: UncorrectablePolicy,
}

/// Output framing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Framed (header + payload) or raw payload
    #[serde(default)]
    pub framing: WireFormat,
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_codeword_length() -> usize {
    255
}

const fn default_check_length() -> usize {
    32
}

// x^8 + x^7 + x^2 + x + 1
const fn default_primitive_polynomial() -> u16 {
    0x187
}

const fn default_first_root_index() -> u32 {
    120
}

const fn default_super_chunk_budget() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.code.parameters().unwrap(), CodeParameters::RS_255_223);
        assert_eq!(config.code.primitive_polynomial, 0x187);
        assert_eq!(config.code.first_root_index, 120);
        assert_eq!(config.chunking.super_chunk_budget, 1_048_576);
        assert_eq!(config.decode.on_uncorrectable, UncorrectablePolicy::Abort);
        assert_eq!(config.format.framing, WireFormat::Framed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_full_toml() {
        let text = r#"
            [code]
            codeword_length = 64
            check_length = 8
            primitive_polynomial = 0x11d
            first_root_index = 0

            [chunking]
            super_chunk_budget = 4096

            [decode]
            on_uncorrectable = "skip-and-continue"

            [format]
            framing = "raw"

            [logging]
            level = "debug"
        "#;
        let config = Config::from_toml_str(text).unwrap();
        assert_eq!(config.code.parameters().unwrap().data_length(), 56);
        assert_eq!(config.code.primitive_polynomial, 0x11d);
        assert_eq!(config.chunking.super_chunk_budget, 4096);
        assert_eq!(
            config.decode.on_uncorrectable,
            UncorrectablePolicy::SkipAndContinue
        );
        assert_eq!(config.format.framing, WireFormat::Raw);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let small_budget = "[chunking]\nsuper_chunk_budget = 100\n";
        assert!(matches!(
            Config::from_toml_str(small_budget),
            Err(Error::Configuration(_))
        ));

        let bad_geometry = "[code]\ncheck_length = 255\n";
        assert!(Config::from_toml_str(bad_geometry).is_err());

        let bad_poly = "[code]\nprimitive_polynomial = 0x1d\n";
        assert!(Config::from_toml_str(bad_poly).is_err());

        let bad_policy = "[decode]\non_uncorrectable = \"retry\"\n";
        assert!(Config::from_toml_str(bad_policy).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsfec.toml");
        std::fs::write(&path, "[format]\nframing = \"raw\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.format.framing, WireFormat::Raw);

        assert!(Config::load(dir.path().join("missing.toml")).is_err());
    }
}
