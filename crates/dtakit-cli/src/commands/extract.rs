use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use super::{open_archive, print_json};
use crate::{CommandContext, ExtractAllArgs, ExtractArgs, OutputFormat};

#[derive(Debug, Default, Serialize)]
struct ExtractSummary {
    extracted: usize,
    bytes: u64,
    failed: Vec<String>,
    skipped: Vec<String>,
}

pub fn handle(args: &ExtractArgs, ctx: &CommandContext) -> Result<()> {
    let archive = open_archive(&args.archive, ctx)?;
    let data = archive
        .extract_by_name(&args.name)
        .with_context(|| format!("failed to extract {}", args.name))?;

    write_file(&args.output, &data)?;
    info!(
        name = %args.name,
        output = %args.output.display(),
        bytes = data.len(),
        "extracted entry"
    );

    if matches!(ctx.format, OutputFormat::Json | OutputFormat::JsonPretty) {
        let summary = serde_json::json!({
            "name": args.name,
            "output": args.output.display().to_string(),
            "bytes": data.len(),
        });
        print_json(&summary, ctx.format)?;
    }

    Ok(())
}

pub fn handle_all(args: &ExtractAllArgs, ctx: &CommandContext) -> Result<()> {
    let archive = open_archive(&args.archive, ctx)?;
    let mut summary = ExtractSummary::default();

    for entry in archive.catalog() {
        let Some(relative) = entry_output_path(&entry.name) else {
            warn!(name = %entry.name, "skipping entry with unsafe path");
            summary.skipped.push(entry.name.clone());
            continue;
        };

        // One bad entry does not stop the rest
        let data = match archive.extract(entry.index) {
            Ok(data) => data,
            Err(e) => {
                warn!(name = %entry.name, error = %e, "failed to extract entry");
                summary.failed.push(entry.name.clone());
                continue;
            }
        };

        write_file(&args.output.join(&relative), &data)?;
        summary.extracted += 1;
        summary.bytes += data.len() as u64;
    }

    info!(
        extracted = summary.extracted,
        bytes = summary.bytes,
        failed = summary.failed.len(),
        skipped = summary.skipped.len(),
        "extraction finished"
    );

    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(&summary, ctx.format)?,
        OutputFormat::Text => println!(
            "Extracted {} of {} entries ({} bytes) to {}",
            summary.extracted,
            archive.len(),
            summary.bytes,
            args.output.display()
        ),
    }

    if !summary.failed.is_empty() || !summary.skipped.is_empty() {
        bail!(
            "{} entries failed and {} were skipped",
            summary.failed.len(),
            summary.skipped.len()
        );
    }
    Ok(())
}

/// Relative output path for an entry name
///
/// Names are lowercased and backslashes become separators. Names that would
/// escape the output directory yield `None`.
pub fn entry_output_path(name: &str) -> Option<PathBuf> {
    let normalized = name.to_ascii_lowercase().replace('\\', "/");
    let mut path = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if path.as_os_str().is_empty() {
        return None;
    }
    Some(path)
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}
