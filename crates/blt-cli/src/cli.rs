use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blt",
    about = "Build Log Tree: convert, compare and inspect structured build logs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a log between formats (chosen by file extension)
    Convert(ConvertArgs),
    /// Check two logs for structural equivalence
    Diff(DiffArgs),
    /// Print a log as an indented outline
    Dump(DumpArgs),
    /// Count nodes by kind
    Stats(StatsArgs),
    /// Round-trip a log through every codec and check the results
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Log to read
    pub input: PathBuf,
    /// Log to write; its extension picks the format
    pub output: PathBuf,
    /// Binary framing for .bltb / .binlog output
    #[arg(long)]
    pub framing: Option<FramingArg>,
    /// Writer settings (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Convert whatever a truncated binary log still holds
    #[arg(long)]
    pub allow_partial: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum FramingArg {
    EndMarker,
    ChildCount,
}

impl From<FramingArg> for blt_binary::Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::EndMarker => Self::EndMarker,
            FramingArg::ChildCount => Self::ChildCount,
        }
    }
}

#[derive(Args)]
pub struct DiffArgs {
    /// First log
    pub left: PathBuf,
    /// Second log
    pub right: PathBuf,
    /// Also print a line-level report of the differences
    #[arg(long)]
    pub report: bool,
}

#[derive(Args)]
pub struct DumpArgs {
    /// Log to print
    pub input: PathBuf,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Log to summarize
    pub input: PathBuf,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Log to check
    pub input: PathBuf,
}
