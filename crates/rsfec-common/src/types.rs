//! Core type definitions for rsfec
//!
//! This module defines the code geometry, block identifiers and the
//! enumerations that select decode policy and wire framing.

use crate::error::{Error, Result};
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest codeword a GF(2^8) Reed-Solomon code can carry
pub const MAX_CODEWORD_LENGTH: usize = 255;

/// Immutable codeword geometry shared by encoder and decoder
///
/// Both sides must agree on these values. In raw framing they are not
/// stored anywhere in the output stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeParameters {
    codeword_length: usize,
    check_length: usize,
}

impl CodeParameters {
    /// RS(255, 223): 223 data symbols, 32 check symbols
    pub const RS_255_223: Self = Self {
        codeword_length: 255,
        check_length: 32,
    };

    /// Create validated parameters
    pub fn new(codeword_length: usize, check_length: usize) -> Result<Self> {
        if codeword_length > MAX_CODEWORD_LENGTH {
            return Err(Error::Configuration(format!(
                "codeword_length {codeword_length} exceeds {MAX_CODEWORD_LENGTH}"
            )));
        }
        if check_length == 0 {
            return Err(Error::Configuration("check_length must be > 0".into()));
        }
        if check_length >= codeword_length {
            return Err(Error::Configuration(format!(
                "check_length {check_length} must be smaller than codeword_length {codeword_length}"
            )));
        }
        Ok(Self {
            codeword_length,
            check_length,
        })
    }

    /// Total symbols per codeword (N)
    #[must_use]
    pub const fn codeword_length(&self) -> usize {
        self.codeword_length
    }

    /// Check symbols per codeword
    #[must_use]
    pub const fn check_length(&self) -> usize {
        self.check_length
    }

    /// Data symbols per codeword (N - check)
    #[must_use]
    pub const fn data_length(&self) -> usize {
        self.codeword_length - self.check_length
    }

    /// Symbol errors a single codeword can absorb
    #[must_use]
    pub const fn correction_capacity(&self) -> usize {
        self.check_length / 2
    }
}

impl Default for CodeParameters {
    fn default() -> Self {
        Self::RS_255_223
    }
}

impl fmt::Display for CodeParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RS({}, {})", self.codeword_length, self.data_length())
    }
}

/// Position of a codeword within the whole file
///
/// Used for diagnostics only; it never influences the bytes produced.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    Display, From, Into,
)]
#[display("{_0}")]
pub struct BlockIndex(u64);

impl BlockIndex {
    /// Create from a raw counter value
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Get the raw counter value
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Index `n` blocks after this one
    #[must_use]
    pub const fn offset(self, n: u64) -> Self {
        Self(self.0 + n)
    }
}

/// What the decoder does with a block it cannot correct
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UncorrectablePolicy {
    /// Stop the run at the first uncorrectable block
    #[default]
    Abort,
    /// Emit the block's received data bytes as-is and keep going
    SkipAndContinue,
}

impl UncorrectablePolicy {
    /// Get the policy name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::SkipAndContinue => "skip-and-continue",
        }
    }
}

impl fmt::Display for UncorrectablePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for UncorrectablePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" | "fail" => Ok(Self::Abort),
            "skip-and-continue" | "skip_and_continue" | "skip" | "continue" => {
                Ok(Self::SkipAndContinue)
            }
            _ => Err(format!("unknown uncorrectable-block policy: {s}")),
        }
    }
}

/// Framing of the encoded stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireFormat {
    /// Stream header carrying geometry and original size, then the payload
    #[default]
    Framed,
    /// Interleaved super-chunks only; the decoder infers the original size
    /// from the encoded size
    Raw,
}

impl WireFormat {
    /// Get the format name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Framed => "framed",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "framed" | "header" => Ok(Self::Framed),
            "raw" => Ok(Self::Raw),
            _ => Err(format!("unknown wire format: {s}")),
        }
    }
}
