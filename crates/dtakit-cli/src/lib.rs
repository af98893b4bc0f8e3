//! dta command-line library
//!
//! This library provides the argument types and command handlers for the
//! `dta` CLI tool.

pub mod commands;

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Archive file
    pub archive: PathBuf,

    /// Show declared sizes
    #[arg(short, long)]
    pub sizes: bool,

    /// Show every header field
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Archive file
    pub archive: PathBuf,

    /// Entry name exactly as listed
    pub name: String,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractAllArgs {
    /// Archive file
    pub archive: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct DecryptArgs {
    /// Encrypted input file
    pub input: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Keystream rotation applied at the first byte
    #[arg(short, long, default_value_t = 0)]
    pub shift: u32,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// Global options shared by every command
#[derive(Clone, Debug, Default)]
pub struct CommandContext {
    /// Output format
    pub format: OutputFormat,
    /// Key table file
    pub keys: Option<PathBuf>,
    /// Explicit first key
    pub key1: Option<String>,
    /// Explicit second key
    pub key2: Option<String>,
    /// JSON settings file
    pub config: Option<PathBuf>,
    /// Replacement delta tables
    pub delta_tables: Option<PathBuf>,
    /// Force strict size checking
    pub strict_size: bool,
}
