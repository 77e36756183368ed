//! rsfec CLI - Reed-Solomon file protection
//!
//! Encodes files into burst-tolerant interleaved streams and decodes them
//! back, repairing symbol errors along the way.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rsfec_codec::{ChunkPlanner, FileCodecDriver, HEADER_LEN, RunReport, StreamHeader};
use rsfec_common::{Config, UncorrectablePolicy, WireFormat};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rsfec")]
#[command(about = "Chunked, interleaved Reed-Solomon file codec")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "RSFEC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overrides the configuration file)
    #[arg(long)]
    log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Default)]
struct CodeArgs {
    /// Codeword length n (at most 255)
    #[arg(long)]
    codeword_length: Option<usize>,

    /// Check symbols per codeword (n - k)
    #[arg(long)]
    check_length: Option<usize>,

    /// Data bytes per super-chunk
    #[arg(long)]
    budget: Option<usize>,

    /// Write or expect a raw payload without stream header
    #[arg(long)]
    raw: bool,
}

impl CodeArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(n) = self.codeword_length {
            config.code.codeword_length = n;
        }
        if let Some(m) = self.check_length {
            config.code.check_length = m;
        }
        if let Some(budget) = self.budget {
            config.chunking.super_chunk_budget = budget;
        }
        if self.raw {
            config.format.framing = WireFormat::Raw;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Protect a file with Reed-Solomon check symbols
    Encode {
        /// File to protect
        input: PathBuf,
        /// Encoded output file
        output: PathBuf,
        #[command(flatten)]
        code: CodeArgs,
    },
    /// Repair and recover a protected file
    Decode {
        /// Encoded input file
        input: PathBuf,
        /// Recovered output file
        output: PathBuf,
        #[command(flatten)]
        code: CodeArgs,
        /// What to do with a block that cannot be repaired
        #[arg(long)]
        on_uncorrectable: Option<UncorrectablePolicy>,
    },
    /// Show how a file of SIZE bytes would be partitioned
    Plan {
        /// Original file size in bytes
        size: u64,
        #[command(flatten)]
        code: CodeArgs,
    },
    /// Print the stream header of a framed file
    Inspect {
        /// Encoded file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = e
                .downcast_ref::<rsfec_common::Error>()
                .map_or(1, rsfec_common::Error::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // Initialize logging
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Commands::Encode {
            input,
            output,
            code,
        } => {
            code.apply(&mut config);
            let mut driver = FileCodecDriver::from_config(&config)?;
            info!(input = %input.display(), output = %output.display(), "Encoding file");
            let report = driver.encode_file(&input, &output)?;
            print_report("Encoded", &report, args.json)?;
        }
        Commands::Decode {
            input,
            output,
            code,
            on_uncorrectable,
        } => {
            code.apply(&mut config);
            if let Some(policy) = on_uncorrectable {
                config.decode.on_uncorrectable = policy;
            }
            let mut driver = FileCodecDriver::from_config(&config)?;
            info!(input = %input.display(), output = %output.display(), "Decoding file");
            let report = driver.decode_file(&input, &output)?;
            print_report("Decoded", &report, args.json)?;
        }
        Commands::Plan { size, code } => {
            code.apply(&mut config);
            config.validate()?;
            print_plan(&config, size, args.json)?;
        }
        Commands::Inspect { file } => inspect(&file, args.json)?,
    }

    Ok(())
}

fn print_report(action: &str, report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{action} {} -> {} bytes", report.original_size, report.encoded_size);
    println!("  Super-chunks:      {}", report.super_chunks);
    println!("  Blocks:            {}", report.blocks);
    println!("  Corrected symbols: {}", report.corrected_symbols);
    if !report.is_clean() {
        let blocks: Vec<String> = report
            .uncorrectable_blocks
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "  Uncorrectable:     {} (blocks {})",
            blocks.len(),
            blocks.join(", ")
        );
    }
    Ok(())
}

fn print_plan(config: &Config, size: u64, json: bool) -> Result<()> {
    let params = config.code.parameters()?;
    let planner = ChunkPlanner::new(params, config.chunking.super_chunk_budget, size)?;
    let header = match config.format.framing {
        WireFormat::Framed => HEADER_LEN as u64,
        WireFormat::Raw => 0,
    };

    if json {
        let chunks: Vec<_> = planner
            .chunks()
            .map(|c| {
                json!({
                    "index": c.index,
                    "first_block": c.first_block,
                    "data_offset": c.data_offset,
                    "full_units": c.full_units,
                    "partial_len": c.partial_len,
                    "encoded_len": c.encoded_len(&params),
                })
            })
            .collect();
        let summary = json!({
            "code": params.to_string(),
            "format": config.format.framing.name(),
            "original_size": size,
            "rows_per_chunk": planner.rows_per_chunk(),
            "super_chunks": planner.chunk_count(),
            "blocks": planner.block_count(),
            "encoded_size": planner.encoded_size().saturating_add(header),
            "chunks": chunks,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Plan for {size} bytes with {params} ({})", config.format.framing);
    println!("  Units per super-chunk: {}", planner.rows_per_chunk());
    println!("  Super-chunks:          {}", planner.chunk_count());
    println!("  Blocks:                {}", planner.block_count());
    println!(
        "  Encoded size:          {}",
        planner.encoded_size().saturating_add(header)
    );
    println!();
    println!(
        "{:<8} {:<12} {:<14} {:<8} {:<8} {:<10}",
        "CHUNK", "FIRST BLOCK", "DATA OFFSET", "UNITS", "PARTIAL", "ENCODED"
    );
    println!("{}", "-".repeat(64));
    for chunk in planner.chunks() {
        println!(
            "{:<8} {:<12} {:<14} {:<8} {:<8} {:<10}",
            chunk.index,
            chunk.first_block,
            chunk.data_offset,
            chunk.full_units,
            chunk.partial_len.map_or_else(|| "-".to_string(), |l| l.to_string()),
            chunk.encoded_len(&params)
        );
    }
    Ok(())
}

fn inspect(path: &Path, json: bool) -> Result<()> {
    let file = std::fs::File::open(path)
        .map_err(|e| rsfec_common::Error::input_unavailable(format!("open {}", path.display()), e))?;
    let len = file
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    let header = StreamHeader::read_from(file)?;
    let planner = header.planner()?;
    let expected = planner.encoded_size().saturating_add(HEADER_LEN as u64);

    if json {
        let summary = json!({
            "code": header.params.to_string(),
            "rows_per_chunk": header.rows,
            "original_size": header.original_size,
            "super_chunks": planner.chunk_count(),
            "blocks": planner.block_count(),
            "expected_size": expected,
            "actual_size": len,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Stream header of {}", path.display());
    println!("  Code:                  {}", header.params);
    println!("  Units per super-chunk: {}", header.rows);
    println!("  Original size:         {}", header.original_size);
    println!("  Super-chunks:          {}", planner.chunk_count());
    println!("  Blocks:                {}", planner.block_count());
    println!("  File size:             {len} (expected {expected})");
    if len != expected {
        println!("  Warning: file size does not match the header");
    }
    Ok(())
}
