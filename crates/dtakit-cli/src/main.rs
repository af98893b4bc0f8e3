use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use dtakit_cli::{
    CommandContext, DecryptArgs, ExtractAllArgs, ExtractArgs, ListArgs, OutputFormat, commands,
};

#[derive(Parser)]
#[command(
    name = "dta",
    about = "Inspect and unpack ISD0 (DTA) game archives",
    version,
    author,
    long_about = "A command-line tool for DTA archives: list the catalog, extract single entries or the whole archive, and run the archive cipher over raw files."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Output format
    #[arg(short = 'f', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    /// Key table file (CSV `name,key1,key2` or whitespace-separated text)
    #[arg(short, long, global = true, env = "DTA_KEYS")]
    keys: Option<PathBuf>,

    /// First archive key, overriding the key table
    #[arg(long, global = true, requires = "key2")]
    key1: Option<String>,

    /// Second archive key, overriding the key table
    #[arg(long, global = true, requires = "key1")]
    key2: Option<String>,

    /// Path to a JSON extraction settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Replacement DPCM delta tables (1792 bytes, little-endian u16)
    #[arg(long, global = true)]
    delta_tables: Option<PathBuf>,

    /// Fail when a decoded entry differs from its declared size
    #[arg(long, global = true)]
    strict_size: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List archive entries
    List(ListArgs),

    /// Extract one entry by name
    Extract(ExtractArgs),

    /// Extract every entry into a directory
    ExtractAll(ExtractAllArgs),

    /// Apply the archive cipher to a whole file
    Decrypt(DecryptArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so listings stay machine-readable
    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CommandContext {
        format: cli.format,
        keys: cli.keys,
        key1: cli.key1,
        key2: cli.key2,
        config: cli.config,
        delta_tables: cli.delta_tables,
        strict_size: cli.strict_size,
    };

    match cli.command {
        Commands::List(args) => commands::list::handle(&args, &ctx)?,
        Commands::Extract(args) => commands::extract::handle(&args, &ctx)?,
        Commands::ExtractAll(args) => commands::extract::handle_all(&args, &ctx)?,
        Commands::Decrypt(args) => commands::decrypt::handle(&args, &ctx)?,
    }

    Ok(())
}
