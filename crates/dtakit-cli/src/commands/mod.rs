//! Command handlers

pub mod decrypt;
pub mod extract;
pub mod list;

use anyhow::{Context, Result};
use dtakit_crypto::{KeyPair, KeyTable};
use dtakit_formats::{DeltaTables, DtaArchive, DtaConfig, SizeCheck};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

use crate::{CommandContext, OutputFormat};

/// Archive opened from disk
pub type FileArchive = DtaArchive<BufReader<File>>;

/// Load the key table named on the command line, if any
pub fn load_key_table(ctx: &CommandContext) -> Result<KeyTable> {
    let mut table = KeyTable::new();
    let Some(path) = &ctx.keys else {
        return Ok(table);
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read key table {}", path.display()))?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let loaded = if is_csv {
        table.load_from_csv(&content)
    } else {
        table.load_from_txt(&content)
    };

    debug!(path = %path.display(), loaded, "loaded key table");
    Ok(table)
}

/// Keys for `path`: explicit `--key1/--key2` first, then the key table
pub fn resolve_keys(path: &Path, ctx: &CommandContext) -> Result<KeyPair> {
    if let (Some(key1), Some(key2)) = (&ctx.key1, &ctx.key2) {
        return KeyPair::parse(key1, key2).context("invalid --key1/--key2");
    }

    let table = load_key_table(ctx)?;
    Ok(table.resolve(&path.to_string_lossy()))
}

/// Extraction settings from `--config` with flag overrides applied
pub fn load_config(ctx: &CommandContext) -> Result<DtaConfig> {
    let mut config = match &ctx.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => DtaConfig::default(),
    };

    if ctx.strict_size {
        config = config.with_size_check(SizeCheck::Strict);
    }
    Ok(config)
}

/// Open an archive with every global option applied
pub fn open_archive(path: &Path, ctx: &CommandContext) -> Result<FileArchive> {
    let keys = resolve_keys(path, ctx)?;
    let config = load_config(ctx)?;

    let file =
        File::open(path).with_context(|| format!("failed to open archive {}", path.display()))?;
    let mut archive = DtaArchive::load_with_config(BufReader::new(file), keys, config)
        .with_context(|| format!("failed to load archive {}", path.display()))?;

    if let Some(tables_path) = &ctx.delta_tables {
        let bytes = fs::read(tables_path)
            .with_context(|| format!("failed to read delta tables {}", tables_path.display()))?;
        let tables = DeltaTables::from_le_bytes(&bytes)
            .with_context(|| format!("invalid delta tables {}", tables_path.display()))?;
        archive = archive.with_delta_tables(tables);
    }

    Ok(archive)
}

/// Print `value` as JSON in the requested style
pub fn print_json<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let output = if matches!(format, OutputFormat::JsonPretty) {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
