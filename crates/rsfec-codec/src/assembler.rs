//! Block assembly
//!
//! Turns a data unit into a codeword and back. Partial units are zero-padded
//! to `data_length` for the codec call only; the padding never reaches the
//! wire, so a partial codeword is `unit || check` (`L + check_length` bytes).
//!
//! All scratch buffers are per call, so one assembler can be shared freely.

use crate::backend::{BlockCodec, CodecError};
use rsfec_common::{BlockIndex, CodeParameters, Error, Result};
use std::sync::Arc;
use tracing::trace;

/// Outcome of decoding one codeword
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedBlock {
    /// Corrected data bytes, padding removed
    pub data: Vec<u8>,
    /// Number of symbols the codec repaired
    pub corrected: usize,
}

/// Builds codewords from data units and recovers data units from codewords
#[derive(Clone)]
pub struct BlockAssembler {
    codec: Arc<dyn BlockCodec>,
    params: CodeParameters,
}

impl BlockAssembler {
    /// Create an assembler around a codec backend
    pub fn new(codec: Arc<dyn BlockCodec>) -> Self {
        let params = codec.parameters();
        Self { codec, params }
    }

    /// Codeword geometry
    #[must_use]
    pub const fn parameters(&self) -> CodeParameters {
        self.params
    }

    /// Encode one data unit
    ///
    /// # Arguments
    /// * `unit` - `1..=data_length` payload bytes
    /// * `block_index` - Position of the block in the file, for diagnostics
    ///
    /// # Returns
    /// `unit.len() + check_length` bytes: the unit followed by its check
    /// symbols
    pub fn encode_unit(&self, unit: &[u8], block_index: BlockIndex) -> Result<Vec<u8>> {
        let k = self.params.data_length();
        if unit.is_empty() || unit.len() > k {
            return Err(Error::EncodeFailure {
                block_index,
                reason: format!("data unit of {} bytes, expected 1..={k}", unit.len()),
            });
        }

        let mut data = vec![0u8; k];
        data[..unit.len()].copy_from_slice(unit);

        let check = self
            .codec
            .encode(&data)
            .map_err(|e| Error::EncodeFailure {
                block_index,
                reason: e.to_string(),
            })?;

        let mut codeword = Vec::with_capacity(unit.len() + check.len());
        codeword.extend_from_slice(unit);
        codeword.extend_from_slice(&check);
        Ok(codeword)
    }

    /// Decode one codeword
    ///
    /// # Arguments
    /// * `codeword` - `L + check_length` bytes as read from the wire, with
    ///   `1 <= L <= data_length`
    /// * `block_index` - Position of the block in the file, for diagnostics
    ///
    /// # Errors
    /// `BlockUncorrectable` if the codec gives up, or if its repair touches
    /// the implicit zero padding of a partial codeword.
    pub fn decode_codeword(&self, codeword: &[u8], block_index: BlockIndex) -> Result<DecodedBlock> {
        let k = self.params.data_length();
        let m = self.params.check_length();
        if codeword.len() <= m || codeword.len() > self.params.codeword_length() {
            return Err(Error::format_mismatch(format!(
                "block {block_index}: codeword of {} bytes, expected {}..={}",
                codeword.len(),
                m + 1,
                self.params.codeword_length()
            )));
        }
        let used = codeword.len() - m;

        let mut work = vec![0u8; self.params.codeword_length()];
        work[..used].copy_from_slice(&codeword[..used]);
        work[k..].copy_from_slice(&codeword[used..]);

        let corrected = match self.codec.decode(&mut work) {
            Ok(positions) => positions,
            Err(CodecError::Uncorrectable(reason)) => {
                trace!(block = %block_index, %reason, "codec gave up");
                return Err(Error::BlockUncorrectable { block_index });
            }
            Err(e) => return Err(e.into()),
        };

        if corrected.iter().any(|&p| (used..k).contains(&p)) {
            trace!(block = %block_index, "correction landed in zero padding");
            return Err(Error::BlockUncorrectable { block_index });
        }

        trace!(block = %block_index, corrected = corrected.len(), "decoded block");
        work.truncate(used);
        Ok(DecodedBlock {
            data: work,
            corrected: corrected.len(),
        })
    }
}

impl std::fmt::Debug for BlockAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockAssembler")
            .field("backend", &self.codec.capabilities().name)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendConfig, ReedSolomonBackend};

    fn assembler() -> BlockAssembler {
        let backend = ReedSolomonBackend::new(BackendConfig::default()).unwrap();
        BlockAssembler::new(Arc::new(backend))
    }

    #[test]
    fn test_full_unit_codeword() {
        let asm = assembler();
        let unit: Vec<u8> = (0..223).map(|i| i as u8).collect();
        let codeword = asm.encode_unit(&unit, BlockIndex::new(0)).unwrap();
        assert_eq!(codeword.len(), 255);
        assert_eq!(&codeword[..223], unit.as_slice());

        let decoded = asm.decode_codeword(&codeword, BlockIndex::new(0)).unwrap();
        assert_eq!(decoded.data, unit);
        assert_eq!(decoded.corrected, 0);
    }

    #[test]
    fn test_partial_unit_drops_padding() {
        let asm = assembler();
        for len in [1usize, 77, 222] {
            let unit = vec![0xA5u8; len];
            let codeword = asm.encode_unit(&unit, BlockIndex::new(3)).unwrap();
            assert_eq!(codeword.len(), len + 32);

            let decoded = asm.decode_codeword(&codeword, BlockIndex::new(3)).unwrap();
            assert_eq!(decoded.data, unit);
        }
    }

    #[test]
    fn test_partial_codeword_corrects_errors() {
        let asm = assembler();
        let unit: Vec<u8> = (0..77).map(|i| (i * 3) as u8).collect();
        let mut codeword = asm.encode_unit(&unit, BlockIndex::new(1)).unwrap();
        codeword[0] ^= 0xFF;
        codeword[50] ^= 0x01;
        codeword[80] ^= 0x10; // check region

        let decoded = asm.decode_codeword(&codeword, BlockIndex::new(1)).unwrap();
        assert_eq!(decoded.data, unit);
        assert_eq!(decoded.corrected, 3);
    }

    #[test]
    fn test_uncorrectable_reports_block_index() {
        let asm = assembler();
        let unit = vec![7u8; 223];
        let mut codeword = asm.encode_unit(&unit, BlockIndex::new(42)).unwrap();
        for i in 0..17 {
            codeword[i * 13] ^= 0x5A;
        }

        let err = asm.decode_codeword(&codeword, BlockIndex::new(42)).unwrap_err();
        assert!(matches!(
            err,
            Error::BlockUncorrectable { block_index } if block_index == BlockIndex::new(42)
        ));
    }

    #[test]
    fn test_rejects_bad_lengths() {
        let asm = assembler();
        assert!(matches!(
            asm.encode_unit(&[], BlockIndex::new(0)),
            Err(Error::EncodeFailure { .. })
        ));
        assert!(asm.encode_unit(&[0u8; 224], BlockIndex::new(0)).is_err());
        assert!(matches!(
            asm.decode_codeword(&[0u8; 32], BlockIndex::new(0)),
            Err(Error::FormatMismatch(_))
        ));
        assert!(asm.decode_codeword(&[0u8; 256], BlockIndex::new(0)).is_err());
    }
}
