use anyhow::{Context, Result};
use dtakit_crypto::DtaCipher;
use std::fs;
use tracing::info;

use super::{print_json, resolve_keys};
use crate::{CommandContext, DecryptArgs, OutputFormat};

/// Run the archive cipher over a whole file
///
/// The transform is its own inverse, so the same command re-encrypts.
pub fn handle(args: &DecryptArgs, ctx: &CommandContext) -> Result<()> {
    let keys = resolve_keys(&args.input, ctx)?;
    let data = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let output = DtaCipher::new(keys).transform(&data, args.shift);
    fs::write(&args.output, &output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        keys = %keys,
        shift = args.shift,
        bytes = output.len(),
        "transformed file"
    );

    if matches!(ctx.format, OutputFormat::Json | OutputFormat::JsonPretty) {
        let summary = serde_json::json!({
            "input": args.input.display().to_string(),
            "output": args.output.display().to_string(),
            "keys": keys.to_string(),
            "shift": args.shift,
            "bytes": output.len(),
        });
        print_json(&summary, ctx.format)?;
    }

    Ok(())
}
