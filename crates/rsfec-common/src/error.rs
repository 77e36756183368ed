//! Error types for rsfec
//!
//! Every failure of an encode or decode run surfaces to the caller as one of
//! these variants. Nothing is swallowed: even the skip-and-continue policy
//! records the blocks it skipped.

use crate::types::BlockIndex;
use thiserror::Error;

/// Common result type for rsfec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for rsfec
#[derive(Debug, Error)]
pub enum Error {
    // Stream errors
    #[error("input unavailable: {context}")]
    InputUnavailable {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("output unavailable: {context}")]
    OutputUnavailable {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("input is empty")]
    EmptyInput,

    // Codec errors
    #[error("encoding failed at block {block_index}: {reason}")]
    EncodeFailure {
        block_index: BlockIndex,
        reason: String,
    },

    #[error("block {block_index} is uncorrectable")]
    BlockUncorrectable { block_index: BlockIndex },

    #[error("format mismatch: {0}")]
    FormatMismatch(String),

    #[error("block codec error: {0}")]
    Codec(String),

    // Run control
    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create an input error with context
    pub fn input_unavailable(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::InputUnavailable {
            context: context.into(),
            source,
        }
    }

    /// Create an output error with context
    pub fn output_unavailable(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::OutputUnavailable {
            context: context.into(),
            source,
        }
    }

    /// Create a format mismatch error
    pub fn format_mismatch(msg: impl Into<String>) -> Self {
        Self::FormatMismatch(msg.into())
    }

    /// Block the error refers to, if any
    #[must_use]
    pub const fn block_index(&self) -> Option<BlockIndex> {
        match self {
            Self::EncodeFailure { block_index, .. } | Self::BlockUncorrectable { block_index } => {
                Some(*block_index)
            }
            _ => None,
        }
    }

    /// Check if the configured uncorrectable-block policy decides the outcome
    ///
    /// All other errors end the run unconditionally.
    #[must_use]
    pub const fn is_policy_controlled(&self) -> bool {
        matches!(self, Self::BlockUncorrectable { .. })
    }

    /// Name of the stage that failed
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::InputUnavailable { .. } => "read",
            Self::OutputUnavailable { .. } => "write",
            Self::EmptyInput | Self::Configuration(_) => "planning",
            Self::EncodeFailure { .. } => "encode",
            Self::BlockUncorrectable { .. } | Self::Codec(_) => "decode",
            Self::FormatMismatch(_) => "format",
            Self::Cancelled => "cancelled",
        }
    }

    /// Process exit code (sysexits conventions)
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            // EX_DATAERR
            Self::EmptyInput | Self::BlockUncorrectable { .. } | Self::FormatMismatch(_) => 65,

            // EX_NOINPUT
            Self::InputUnavailable { .. } => 66,

            // EX_SOFTWARE
            Self::EncodeFailure { .. } | Self::Codec(_) => 70,

            // EX_CANTCREAT
            Self::OutputUnavailable { .. } => 73,

            // EX_CONFIG
            Self::Configuration(_) => 78,

            // Interrupted
            Self::Cancelled => 130,
        }
    }
}
