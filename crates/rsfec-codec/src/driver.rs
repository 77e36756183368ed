//! File codec driver
//!
//! Runs a whole encode or decode pass: plan the file, then for each
//! super-chunk read its bytes, run the block assembler over every unit,
//! (de)interleave, and write the result with one `write_all`. A super-chunk
//! either reaches the output whole or not at all; bytes already written for
//! earlier super-chunks are not rolled back when a later one fails.

use crate::assembler::BlockAssembler;
use crate::backend::{BackendConfig, BlockCodec, ReedSolomonBackend};
use crate::header::{HEADER_LEN, StreamHeader};
use crate::interleave::{deinterleave, interleave};
use crate::planner::{ChunkPlanner, SuperChunkPlan};
use rsfec_common::{
    BlockIndex, CodeParameters, Config, Error, Result, UncorrectablePolicy, WireFormat,
};
use serde::Serialize;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Default data bytes per super-chunk (1 MiB)
pub const DEFAULT_SUPER_CHUNK_BUDGET: usize = 1024 * 1024;

/// Run options for [`FileCodecDriver`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverOptions {
    /// Target data bytes per super-chunk
    pub super_chunk_budget: usize,
    /// What to do with a block the decoder cannot repair
    pub policy: UncorrectablePolicy,
    /// Framed (header + payload) or raw payload
    pub wire_format: WireFormat,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            super_chunk_budget: DEFAULT_SUPER_CHUNK_BUDGET,
            policy: UncorrectablePolicy::default(),
            wire_format: WireFormat::default(),
        }
    }
}

impl DriverOptions {
    /// Take run options from a loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            super_chunk_budget: config.chunking.super_chunk_budget,
            policy: config.decode.on_uncorrectable,
            wire_format: config.format.framing,
        }
    }

    #[must_use]
    pub const fn with_budget(mut self, budget: usize) -> Self {
        self.super_chunk_budget = budget;
        self
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: UncorrectablePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn with_wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }
}

/// Where a driver is in its current run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DriverState {
    #[default]
    Idle,
    Planning,
    EncodingChunk { chunk: u64 },
    DecodingChunk { chunk: u64 },
    Flushing,
    Done,
    Failed(String),
}

impl DriverState {
    /// Whether the last run has finished, successfully or not
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Planning => write!(f, "planning"),
            Self::EncodingChunk { chunk } => write!(f, "encoding super-chunk {chunk}"),
            Self::DecodingChunk { chunk } => write!(f, "decoding super-chunk {chunk}"),
            Self::Flushing => write!(f, "flushing"),
            Self::Done => write!(f, "done"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Shared cancellation flag
///
/// Once cancelled, every later run of the driver that owns the flag ends
/// with [`Error::Cancelled`] at its first check.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of one encode or decode run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Size of the original (decoded) data
    pub original_size: u64,
    /// Size of the encoded stream, header included when framed
    pub encoded_size: u64,
    /// Super-chunks written to the output
    pub super_chunks: u64,
    /// Codewords processed
    pub blocks: u64,
    /// Symbols repaired by the decoder
    pub corrected_symbols: u64,
    /// Blocks emitted uncorrected under the skip-and-continue policy
    pub uncorrectable_blocks: Vec<BlockIndex>,
}

impl RunReport {
    /// Whether every block came out intact
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.uncorrectable_blocks.is_empty()
    }
}

/// Drives a chunked, interleaved Reed-Solomon pass over a file
pub struct FileCodecDriver {
    assembler: BlockAssembler,
    options: DriverOptions,
    state: DriverState,
    cancel: CancelHandle,
}

impl FileCodecDriver {
    /// Create a driver around a codec backend
    ///
    /// Fails with `Configuration` if the budget cannot hold one data unit.
    pub fn new(codec: Arc<dyn BlockCodec>, options: DriverOptions) -> Result<Self> {
        let assembler = BlockAssembler::new(codec);
        ChunkPlanner::rows_for_budget(&assembler.parameters(), options.super_chunk_budget)?;
        Ok(Self {
            assembler,
            options,
            state: DriverState::Idle,
            cancel: CancelHandle::default(),
        })
    }

    /// Build the Reed-Solomon backend and run options from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let backend = ReedSolomonBackend::new(BackendConfig::from_code_config(&config.code)?)?;
        Self::new(Arc::new(backend), DriverOptions::from_config(config))
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &DriverState {
        &self.state
    }

    #[must_use]
    pub const fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Codeword geometry
    #[must_use]
    pub const fn parameters(&self) -> CodeParameters {
        self.assembler.parameters()
    }

    /// Handle that cancels this driver's runs from another thread
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Encode `input_len` bytes from `input` into `output`
    pub fn encode<R: Read, W: Write>(
        &mut self,
        input: R,
        input_len: u64,
        output: W,
    ) -> Result<RunReport> {
        let result = self.run_encode(input, input_len, output);
        self.finish(result)
    }

    /// Decode an encoded stream of `input_len` bytes from `input` into `output`
    pub fn decode<R: Read, W: Write>(
        &mut self,
        input: R,
        input_len: u64,
        output: W,
    ) -> Result<RunReport> {
        let result = self.run_decode(input, input_len, output);
        self.finish(result)
    }

    /// Encode the file at `input` into a new file at `output`
    pub fn encode_file(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<RunReport> {
        self.transition(DriverState::Planning);
        match open_files(input.as_ref(), output.as_ref()) {
            Ok((reader, len, writer)) => self.encode(reader, len, writer),
            Err(e) => self.finish(Err(e)),
        }
    }

    /// Decode the file at `input` into a new file at `output`
    pub fn decode_file(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<RunReport> {
        self.transition(DriverState::Planning);
        match open_files(input.as_ref(), output.as_ref()) {
            Ok((reader, len, writer)) => self.decode(reader, len, writer),
            Err(e) => self.finish(Err(e)),
        }
    }

    fn run_encode<R: Read, W: Write>(
        &mut self,
        mut input: R,
        input_len: u64,
        mut output: W,
    ) -> Result<RunReport> {
        self.transition(DriverState::Planning);
        let params = self.parameters();
        let planner = ChunkPlanner::new(params, self.options.super_chunk_budget, input_len)?;
        info!(
            size = input_len,
            %params,
            rows = planner.rows_per_chunk(),
            chunks = planner.chunk_count(),
            format = %self.options.wire_format,
            "Encoding"
        );

        let mut report = RunReport {
            original_size: input_len,
            ..RunReport::default()
        };

        if self.options.wire_format == WireFormat::Framed {
            self.check_cancelled()?;
            let header = stream_header(&planner)?;
            output
                .write_all(&header.to_bytes())
                .map_err(|e| Error::output_unavailable("write stream header", e))?;
            report.encoded_size += HEADER_LEN as u64;
        }

        let mut data = Vec::new();
        for chunk in planner.chunks() {
            self.transition(DriverState::EncodingChunk { chunk: chunk.index });
            self.check_cancelled()?;

            data.resize(chunk.data_len(&params), 0);
            input.read_exact(&mut data).map_err(|e| {
                Error::input_unavailable(
                    format!(
                        "read {} source bytes at offset {}",
                        chunk.data_len(&params),
                        chunk.data_offset
                    ),
                    e,
                )
            })?;

            let mut codewords = Vec::with_capacity(chunk.unit_count());
            let mut offset = 0;
            for (i, len) in chunk.unit_lengths(&params).enumerate() {
                self.check_cancelled()?;
                let block = chunk.first_block.offset(i as u64);
                codewords.push(self.assembler.encode_unit(&data[offset..offset + len], block)?);
                offset += len;
            }

            let wire = interleave(&codewords, &chunk.layout(&params))?;
            self.check_cancelled()?;
            output
                .write_all(&wire)
                .map_err(|e| write_error(&chunk, e))?;

            report.super_chunks += 1;
            report.blocks += chunk.unit_count() as u64;
            report.encoded_size += wire.len() as u64;
            debug!(
                chunk = chunk.index,
                units = chunk.unit_count(),
                bytes = wire.len(),
                "Encoded super-chunk"
            );
        }

        self.transition(DriverState::Flushing);
        output
            .flush()
            .map_err(|e| Error::output_unavailable("flush encoded output", e))?;
        Ok(report)
    }

    fn run_decode<R: Read, W: Write>(
        &mut self,
        mut input: R,
        input_len: u64,
        mut output: W,
    ) -> Result<RunReport> {
        self.transition(DriverState::Planning);
        if input_len == 0 {
            return Err(Error::EmptyInput);
        }
        let params = self.parameters();

        let planner = match self.options.wire_format {
            WireFormat::Framed => {
                let payload_len = input_len.checked_sub(HEADER_LEN as u64).ok_or_else(|| {
                    Error::format_mismatch(format!(
                        "{input_len} bytes cannot hold a {HEADER_LEN}-byte stream header"
                    ))
                })?;
                let header = StreamHeader::read_from(&mut input)?;
                header.ensure_parameters(&params)?;
                let planner = header.planner()?;
                if planner.encoded_size() != payload_len {
                    return Err(Error::format_mismatch(format!(
                        "header declares {} original bytes ({} encoded), found {payload_len} payload bytes",
                        header.original_size,
                        planner.encoded_size()
                    )));
                }
                planner
            }
            WireFormat::Raw => {
                let rows = ChunkPlanner::rows_for_budget(&params, self.options.super_chunk_budget)?;
                let size = ChunkPlanner::original_size_for(params, rows, input_len)?;
                ChunkPlanner::with_rows(params, rows, size)?
            }
        };
        info!(
            encoded = input_len,
            size = planner.total_size(),
            %params,
            rows = planner.rows_per_chunk(),
            chunks = planner.chunk_count(),
            policy = %self.options.policy,
            "Decoding"
        );

        let mut report = RunReport {
            original_size: planner.total_size(),
            encoded_size: input_len,
            ..RunReport::default()
        };

        let mut wire = Vec::new();
        for chunk in planner.chunks() {
            self.transition(DriverState::DecodingChunk { chunk: chunk.index });
            self.check_cancelled()?;

            wire.resize(chunk.encoded_len(&params), 0);
            input
                .read_exact(&mut wire)
                .map_err(|e| encoded_read_error(&chunk, e))?;
            let codewords = deinterleave(&wire, &chunk.layout(&params))?;

            let mut data = Vec::with_capacity(chunk.data_len(&params));
            let mut corrected = 0u64;
            for (i, codeword) in codewords.iter().enumerate() {
                self.check_cancelled()?;
                let block = chunk.first_block.offset(i as u64);
                match self.assembler.decode_codeword(codeword, block) {
                    Ok(decoded) => {
                        corrected += decoded.corrected as u64;
                        data.extend_from_slice(&decoded.data);
                    }
                    Err(e)
                        if e.is_policy_controlled()
                            && self.options.policy == UncorrectablePolicy::SkipAndContinue =>
                    {
                        let block_index = e.block_index().unwrap_or(block);
                        warn!(block = %block_index, "Uncorrectable block, emitting received data");
                        report.uncorrectable_blocks.push(block_index);
                        data.extend_from_slice(&codeword[..codeword.len() - params.check_length()]);
                    }
                    Err(e) => return Err(e),
                }
            }

            self.check_cancelled()?;
            output
                .write_all(&data)
                .map_err(|e| write_error(&chunk, e))?;

            report.super_chunks += 1;
            report.blocks += chunk.unit_count() as u64;
            report.corrected_symbols += corrected;
            debug!(
                chunk = chunk.index,
                units = chunk.unit_count(),
                corrected,
                bytes = data.len(),
                "Decoded super-chunk"
            );
        }

        self.transition(DriverState::Flushing);
        output
            .flush()
            .map_err(|e| Error::output_unavailable("flush decoded output", e))?;
        Ok(report)
    }

    fn finish(&mut self, result: Result<RunReport>) -> Result<RunReport> {
        match &result {
            Ok(report) => {
                info!(
                    original = report.original_size,
                    encoded = report.encoded_size,
                    blocks = report.blocks,
                    corrected = report.corrected_symbols,
                    uncorrectable = report.uncorrectable_blocks.len(),
                    "Run complete"
                );
                self.transition(DriverState::Done);
            }
            Err(e) => {
                warn!(stage = e.stage(), block = ?e.block_index(), error = %e, "Run failed");
                self.transition(DriverState::Failed(e.to_string()));
            }
        }
        result
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = %self.state, to = %next, "Driver state");
        self.state = next;
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileCodecDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCodecDriver")
            .field("assembler", &self.assembler)
            .field("options", &self.options)
            .field("state", &self.state)
            .finish()
    }
}

fn stream_header(planner: &ChunkPlanner) -> Result<StreamHeader> {
    let rows = u32::try_from(planner.rows_per_chunk()).map_err(|_| {
        Error::Configuration(format!(
            "{} units per super-chunk do not fit the stream header",
            planner.rows_per_chunk()
        ))
    })?;
    Ok(StreamHeader {
        params: planner.parameters(),
        rows,
        original_size: planner.total_size(),
    })
}

fn encoded_read_error(chunk: &SuperChunkPlan, e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::UnexpectedEof {
        return Error::format_mismatch(format!("input ended inside super-chunk {}", chunk.index));
    }
    Error::input_unavailable(format!("read super-chunk {}", chunk.index), e)
}

fn write_error(chunk: &SuperChunkPlan, e: std::io::Error) -> Error {
    Error::output_unavailable(format!("write super-chunk {}", chunk.index), e)
}

fn open_files(input: &Path, output: &Path) -> Result<(File, u64, File)> {
    let reader = File::open(input)
        .map_err(|e| Error::input_unavailable(format!("open {}", input.display()), e))?;
    let len = reader
        .metadata()
        .map_err(|e| Error::input_unavailable(format!("stat {}", input.display()), e))?
        .len();
    if len == 0 {
        return Err(Error::EmptyInput);
    }
    let writer = File::create(output)
        .map_err(|e| Error::output_unavailable(format!("create {}", output.display()), e))?;
    Ok((reader, len, writer))
}
