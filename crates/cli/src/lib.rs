//! lincheck CLI -- generate, verify and format call histories.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lincheck_testgen::generator::{HistParams, OpMix};

#[derive(Debug, Parser)]
#[command(
    name = "lincheck",
    about = "Linearizability checking for concurrent object histories"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate random call histories
    Generate(GenerateArgs),
    /// Check histories for linearizability
    Verify(VerifyArgs),
    /// Format compact history (.hist) files
    Fmt(FmtArgs),
    /// Print the JSON Schema for the history input format to stdout
    Schema,
}

#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Number of histories to generate
    #[arg(long)]
    pub n_hist: u64,
    /// Number of threads
    #[arg(long, default_value_t = 3)]
    pub n_thread: u64,
    /// Number of calls per history
    #[arg(long, default_value_t = 8)]
    pub n_call: u64,
    /// Register values are drawn from 0..=n_value
    #[arg(long, default_value_t = 4)]
    pub n_value: u64,
    /// Kinds of calls to generate
    #[arg(long, value_delimiter = ',', default_values = ["io", "cas"])]
    pub ops: Vec<OpArg>,
    #[arg(long, default_value_t = 1)]
    pub min_offset: u32,
    #[arg(long, default_value_t = 5)]
    pub max_offset: u32,
    #[arg(long, default_value_t = 1)]
    pub min_duration: u32,
    #[arg(long, default_value_t = 10)]
    pub max_duration: u32,
    /// Label every history with its verdict, keeping this many linearizable ones
    #[arg(long, value_name = "N_LINEARIZABLE")]
    pub label: Option<u64>,
    /// Draws before labelled generation gives up
    #[arg(long, default_value_t = 100_000)]
    pub max_attempts: u64,
    /// Output directory for generated history files
    #[arg(long)]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpArg {
    Io,
    Cas,
    Queue,
}

#[derive(Debug, Parser)]
pub struct VerifyArgs {
    /// Input directory containing .json or .hist history files
    #[arg(long)]
    pub input_dir: PathBuf,
    /// Linearization engine to run
    #[arg(long, value_enum, default_value_t = EngineArg::Auto)]
    pub engine: EngineArg,
    /// Print witness details on PASS and full error details on FAIL
    #[arg(long)]
    pub verbose: bool,
    /// Output results as JSON (one object per file)
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineArg {
    Auto,
    Generic,
    Register,
}

#[derive(Debug, Parser)]
pub struct FmtArgs {
    /// Input files or directories to format
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Check formatting without modifying files (exit 1 if unformatted)
    #[arg(long)]
    pub check: bool,
}

impl From<EngineArg> for lincheck_core::Engine {
    fn from(engine: EngineArg) -> Self {
        match engine {
            EngineArg::Auto => Self::Auto,
            EngineArg::Generic => Self::Generic,
            EngineArg::Register => Self::Register,
        }
    }
}

impl From<OpArg> for OpMix {
    fn from(op: OpArg) -> Self {
        match op {
            OpArg::Io => Self::Io,
            OpArg::Cas => Self::Cas,
            OpArg::Queue => Self::Queue,
        }
    }
}

impl GenerateArgs {
    #[must_use]
    pub fn params(&self) -> HistParams {
        HistParams::builder()
            .n_thread(self.n_thread)
            .n_call(self.n_call)
            .n_value(self.n_value)
            .ops(self.ops.iter().copied().map(OpMix::from).collect())
            .min_offset(self.min_offset)
            .max_offset(self.max_offset)
            .min_duration(self.min_duration)
            .max_duration(self.max_duration)
            .build()
    }
}
