//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "unpackr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract RAR and ZIP archives through the worker queue
    Extract(ExtractArgs),
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Archives to extract (first volume for multi-volume RAR sets)
    #[arg(value_name = "ARCHIVE", required = true)]
    pub archives: Vec<PathBuf>,

    /// Output directory (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Password to try, in order (can be repeated)
    #[arg(short, long = "password", value_name = "PASSWORD")]
    pub passwords: Vec<String>,

    /// Number of archives extracted in parallel
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,

    /// Queued archives waiting for a worker (0: unbounded, negative: none)
    #[arg(long, default_value = "1000", allow_negative_numbers = true)]
    pub buffer_size: i64,

    /// Extract into a temporary sibling directory, merge on success
    #[arg(long)]
    pub staged: bool,

    /// Suffix of the temporary directory used by --staged
    #[arg(long, value_name = "SUFFIX", requires = "staged")]
    pub suffix: Option<String>,

    /// Mode for extracted files, in octal
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub file_mode: Option<u32>,

    /// Mode for created directories, in octal
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub dir_mode: Option<u32>,
}

/// Parse an octal permission mode, with or without a `0o` or `0` prefix
fn parse_mode(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let digits = s.strip_prefix("0o").unwrap_or(s);
    if digits.is_empty() {
        return Err("empty mode".to_string());
    }

    u32::from_str_radix(digits, 8)
        .map_err(|_| format!("invalid octal mode: {s}"))
        .and_then(|mode| {
            if mode > 0o7777 {
                Err(format!("mode out of range: {s}"))
            } else {
                Ok(mode)
            }
        })
}
