use anyhow::Result;
use dtakit_formats::CatalogEntry;
use serde::Serialize;
use tracing::info;

use super::{open_archive, print_json};
use crate::{CommandContext, ListArgs, OutputFormat};

#[derive(Debug, Serialize)]
struct EntrySummary<'a> {
    index: usize,
    name: &'a str,
    size: u64,
    blocks: u32,
    encrypted: bool,
    header_offset: u32,
    data_offset: u32,
    name_checksum: u16,
    timestamps: [u32; 2],
}

impl<'a> From<&'a CatalogEntry> for EntrySummary<'a> {
    fn from(entry: &'a CatalogEntry) -> Self {
        Self {
            index: entry.index,
            name: &entry.name,
            size: entry.size(),
            blocks: entry.block_count(),
            encrypted: entry.is_encrypted(),
            header_offset: entry.record.header_offset,
            data_offset: entry.record.data_offset,
            name_checksum: entry.record.name_checksum,
            timestamps: entry.header.timestamps,
        }
    }
}

pub fn handle(args: &ListArgs, ctx: &CommandContext) -> Result<()> {
    let archive = open_archive(&args.archive, ctx)?;
    let catalog = archive.catalog();
    info!(
        archive = %args.archive.display(),
        entries = catalog.len(),
        "listing archive"
    );

    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let entries: Vec<EntrySummary<'_>> = catalog.iter().map(EntrySummary::from).collect();
            print_json(&entries, ctx.format)?;
        }
        OutputFormat::Text => {
            for entry in catalog {
                println!("{}", format_entry(entry, args.sizes, args.verbose));
            }
            if args.sizes || args.verbose {
                println!(
                    "{} entries, {} bytes total",
                    catalog.len(),
                    catalog.total_size()
                );
            }
        }
    }

    Ok(())
}

fn format_entry(entry: &CatalogEntry, sizes: bool, verbose: bool) -> String {
    if verbose {
        format!(
            "{:>5}  {:>10}  blocks={:<4} {}  header=0x{:08X} data=0x{:08X} checksum=0x{:04X}  {}",
            entry.index,
            entry.size(),
            entry.block_count(),
            if entry.is_encrypted() { "enc" } else { "   " },
            entry.record.header_offset,
            entry.record.data_offset,
            entry.record.name_checksum,
            entry.name
        )
    } else if sizes {
        format!("{:>10}  {}", entry.size(), entry.name)
    } else {
        entry.name.clone()
    }
}
