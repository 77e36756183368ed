//! rsfec codec - Chunked, interleaved Reed-Solomon file protection
//!
//! This crate encodes a file into a stream that survives scattered symbol
//! errors and contiguous bursts, and decodes such a stream back, repairing
//! what the code allows:
//! - Systematic RS(n, k) over GF(2^8), `n <= 255`, correcting up to
//!   `(n - k) / 2` symbol errors per codeword
//! - Super-chunks of many codewords, interleaved column-major so a burst
//!   of `rows * t` wire bytes is spread at most `t` symbols per codeword
//! - A framed stream header (default) or a raw payload whose original size
//!   is inferred from its length
//!
//! # Layers
//!
//! - **backend**: The `BlockCodec` trait and the Reed-Solomon backend
//! - **planner**: Partitioning of a file into super-chunks and data units
//! - **interleave**: Jagged column-major (de)interleaving
//! - **assembler**: Data unit to codeword and back, padding included
//! - **driver**: The per-file state machine tying the layers together
//!
//! # Example
//!
//! ```
//! use rsfec_codec::prelude::*;
//! use std::sync::Arc;
//!
//! let backend = ReedSolomonBackend::new(BackendConfig::default()).unwrap();
//! let mut driver = FileCodecDriver::new(Arc::new(backend), DriverOptions::default()).unwrap();
//!
//! let data = b"Hello, World!";
//! let mut encoded = Vec::new();
//! driver.encode(&data[..], data.len() as u64, &mut encoded).unwrap();
//!
//! let mut decoded = Vec::new();
//! driver.decode(&encoded[..], encoded.len() as u64, &mut decoded).unwrap();
//! assert_eq!(decoded, data);
//! ```

pub mod assembler;
pub mod backend;
pub mod driver;
pub mod header;
pub mod interleave;
pub mod planner;

// Re-exports for convenience
pub use assembler::{BlockAssembler, DecodedBlock};
pub use backend::{
    BackendCapabilities, BackendConfig, BlockCodec, CodecError, GaloisField, ReedSolomonBackend,
};
pub use driver::{CancelHandle, DriverOptions, DriverState, FileCodecDriver, RunReport};
pub use header::{HEADER_LEN, StreamHeader};
pub use interleave::{ChunkLayout, deinterleave, interleave};
pub use planner::{ChunkPlanner, SuperChunkPlan};

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        BackendConfig, BlockCodec, CancelHandle, ChunkPlanner, DriverOptions, FileCodecDriver,
        ReedSolomonBackend, RunReport,
    };
}
