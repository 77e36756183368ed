//! Stream header for the framed wire format
//!
//! The header records the original file size and the geometry used to
//! encode it, so the decoder no longer has to re-derive them from the
//! encoded size.
//!
//! Header format:
//! ```text
//! +--------+---------+-----+-----+------+-----------+--------+
//! | Magic  | Version | N   | M   | Rows | Orig size | CRC32C |
//! | 4B     | 1B      | 2B  | 2B  | 4B   | 8B        | 4B     |
//! +--------+---------+-----+-----+------+-----------+--------+
//! ```
//!
//! Integers are little-endian; the CRC covers every preceding byte.

use crate::planner::ChunkPlanner;
use bytes::{Buf, BufMut, BytesMut};
use rsfec_common::{CodeParameters, Error, Result};
use std::io::Read;

/// Header magic number
const HEADER_MAGIC: u32 = 0x4346_5352; // "RSFC"

/// Current header version
const HEADER_VERSION: u8 = 1;

/// Encoded header size
pub const HEADER_LEN: usize = 25;

/// Metadata written ahead of a framed payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    /// Codeword geometry used by the encoder
    pub params: CodeParameters,
    /// Data units per super-chunk
    pub rows: u32,
    /// Size of the original input
    pub original_size: u64,
}

impl StreamHeader {
    /// Serialize to exactly `HEADER_LEN` bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        buf.put_u32_le(HEADER_MAGIC);
        buf.put_u8(HEADER_VERSION);
        buf.put_u16_le(self.params.codeword_length() as u16);
        buf.put_u16_le(self.params.check_length() as u16);
        buf.put_u32_le(self.rows);
        buf.put_u64_le(self.original_size);
        let crc = crc32c::crc32c(&buf);
        buf.put_u32_le(crc);

        let mut out = [0u8; HEADER_LEN];
        out.copy_from_slice(&buf);
        out
    }

    /// Parse and verify a header
    ///
    /// Any corruption (bad magic, unknown version, CRC mismatch, invalid
    /// geometry) is reported as `FormatMismatch`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::format_mismatch(format!(
                "stream header needs {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let bytes = &bytes[..HEADER_LEN];

        let stored_crc = (&bytes[HEADER_LEN - 4..]).get_u32_le();
        let actual_crc = crc32c::crc32c(&bytes[..HEADER_LEN - 4]);
        if stored_crc != actual_crc {
            return Err(Error::format_mismatch(format!(
                "stream header checksum mismatch: stored {stored_crc:#010x}, computed {actual_crc:#010x}"
            )));
        }

        let mut buf = bytes;
        let magic = buf.get_u32_le();
        if magic != HEADER_MAGIC {
            return Err(Error::format_mismatch(format!(
                "bad stream magic {magic:#010x}"
            )));
        }
        let version = buf.get_u8();
        if version != HEADER_VERSION {
            return Err(Error::format_mismatch(format!(
                "unsupported stream version {version}"
            )));
        }

        let codeword_length = usize::from(buf.get_u16_le());
        let check_length = usize::from(buf.get_u16_le());
        let params = CodeParameters::new(codeword_length, check_length)
            .map_err(|e| Error::format_mismatch(format!("stream header geometry: {e}")))?;
        let rows = buf.get_u32_le();
        let original_size = buf.get_u64_le();

        if rows == 0 {
            return Err(Error::format_mismatch("stream header declares zero rows"));
        }
        if original_size == 0 {
            return Err(Error::format_mismatch("stream header declares an empty input"));
        }

        Ok(Self {
            params,
            rows,
            original_size,
        })
    }

    /// Read and verify a header from the front of a stream
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut raw = [0u8; HEADER_LEN];
        reader.read_exact(&mut raw).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::format_mismatch("input ends inside the stream header")
            } else {
                Error::input_unavailable("read stream header", e)
            }
        })?;
        Self::from_bytes(&raw)
    }

    /// Rebuild the encoder's chunk plan from the header fields
    ///
    /// A size the plan cannot represent is a `FormatMismatch`: the CRC
    /// only proves the header is intact, not that it is plausible.
    pub fn planner(&self) -> Result<ChunkPlanner> {
        ChunkPlanner::with_rows(self.params, self.rows as usize, self.original_size).map_err(
            |e| match e {
                Error::Configuration(msg) => Error::format_mismatch(format!("stream header: {msg}")),
                other => other,
            },
        )
    }

    /// Check the header against the decoder's own geometry
    pub fn ensure_parameters(&self, expected: &CodeParameters) -> Result<()> {
        if self.params != *expected {
            return Err(Error::format_mismatch(format!(
                "stream was encoded with {}, decoder is configured for {expected}",
                self.params
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> StreamHeader {
        StreamHeader {
            params: CodeParameters::RS_255_223,
            rows: 4702,
            original_size: 300,
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = header().to_bytes();
        assert_eq!(&bytes[..4], b"RSFC");
        assert_eq!(bytes[4], 1);
        assert_eq!(u16::from_le_bytes([bytes[5], bytes[6]]), 255);
        assert_eq!(StreamHeader::from_bytes(&bytes).unwrap(), header());
    }

    #[test]
    fn test_header_detects_corruption() {
        for i in 0..HEADER_LEN {
            let mut bytes = header().to_bytes();
            bytes[i] ^= 0x40;
            assert!(
                matches!(StreamHeader::from_bytes(&bytes), Err(Error::FormatMismatch(_))),
                "flip at byte {i} not detected"
            );
        }
    }

    #[test]
    fn test_header_rejects_short_input() {
        let bytes = header().to_bytes();
        assert!(StreamHeader::from_bytes(&bytes[..HEADER_LEN - 1]).is_err());
    }

    #[test]
    fn test_read_from_stream() {
        let mut stream = header().to_bytes().to_vec();
        stream.extend_from_slice(b"payload");
        let mut reader = &stream[..];
        assert_eq!(StreamHeader::read_from(&mut reader).unwrap(), header());
        assert_eq!(reader, b"payload");

        let short = &stream[..10];
        assert!(matches!(
            StreamHeader::read_from(short),
            Err(Error::FormatMismatch(_))
        ));
    }

    #[test]
    fn test_planner_from_header() {
        let planner = header().planner().unwrap();
        assert_eq!(planner.rows_per_chunk(), 4702);
        assert_eq!(planner.encoded_size(), 364);

        let oversized = StreamHeader {
            original_size: u64::MAX,
            ..header()
        };
        assert!(matches!(oversized.planner(), Err(Error::FormatMismatch(_))));
    }

    #[test]
    fn test_ensure_parameters() {
        let h = header();
        assert!(h.ensure_parameters(&CodeParameters::RS_255_223).is_ok());
        let other = CodeParameters::new(255, 16).unwrap();
        assert!(matches!(
            h.ensure_parameters(&other),
            Err(Error::FormatMismatch(_))
        ));
    }
}
