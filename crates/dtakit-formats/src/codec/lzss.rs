//! LZSS decompression with a run-length escape
//!
//! The payload is a sequence of groups. Each group opens with a 16-bit
//! big-endian control word whose bits, most significant first, select a
//! literal byte (0) or a token (1) for the following items. A control word of
//! zero instead introduces up to 16 uncompressed bytes.
//!
//! Tokens are two bytes: a 12-bit distance and a 4-bit length. A distance of
//! zero marks a run of one repeated byte:
//!
//! ```text
//! back-reference: [dddddddd] [ddddllll]                  copy l+3 bytes from d back
//! run:            [00000000] [0000hhhh] [llllllll] [v]   repeat v (h<<8|l)+16 times
//! ```
//!
//! Distances are measured against the output of the current block only.

use crate::error::{DtaError, DtaResult};

/// Bytes copied by a zero control word
pub const LITERAL_RUN_MAX: usize = 16;

/// Shortest back-reference length
pub const MIN_MATCH_LEN: usize = 3;

/// Shortest run length
pub const MIN_RUN_LEN: usize = 16;

/// Decompress an LZSS block payload
pub fn decompress(input: &[u8]) -> DtaResult<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len() * 2);
    let mut pos = 0;

    while pos < input.len() {
        let high = next_byte(input, &mut pos, "control word")?;
        let low = next_byte(input, &mut pos, "control word")?;
        let control = u16::from_be_bytes([high, low]);

        if control == 0 {
            let run = (input.len() - pos).min(LITERAL_RUN_MAX);
            output.extend_from_slice(&input[pos..pos + run]);
            pos += run;
            continue;
        }

        for bit in (0..16).rev() {
            if pos >= input.len() {
                break;
            }

            if control & (1 << bit) == 0 {
                output.push(input[pos]);
                pos += 1;
                continue;
            }

            let b0 = next_byte(input, &mut pos, "token")?;
            let b1 = next_byte(input, &mut pos, "token")?;
            let distance = (usize::from(b0) << 4) | usize::from(b1 >> 4);
            let length = usize::from(b1 & 0x0F);

            if distance == 0 {
                let low_len = next_byte(input, &mut pos, "run length")?;
                let value = next_byte(input, &mut pos, "run value")?;
                let count = ((length << 8) | usize::from(low_len)) + MIN_RUN_LEN;
                output.resize(output.len() + count, value);
            } else {
                copy_match(&mut output, distance, length + MIN_MATCH_LEN)?;
            }
        }
    }

    Ok(output)
}

fn next_byte(input: &[u8], pos: &mut usize, what: &str) -> DtaResult<u8> {
    let byte = input.get(*pos).copied().ok_or_else(|| {
        DtaError::CorruptBlock(format!("LZSS {what} truncated at payload offset {pos}"))
    })?;
    *pos += 1;
    Ok(byte)
}

fn copy_match(output: &mut Vec<u8>, distance: usize, length: usize) -> DtaResult<()> {
    if distance > output.len() {
        return Err(DtaError::CorruptBlock(format!(
            "LZSS back-reference distance {distance} exceeds {} decoded bytes",
            output.len()
        )));
    }

    let start = output.len() - distance;
    if length > distance {
        // Source overlaps the bytes being written
        output.reserve(length);
        for i in 0..length {
            let byte = output[start + i];
            output.push(byte);
        }
    } else {
        output.extend_from_within(start..start + length);
    }

    Ok(())
}
