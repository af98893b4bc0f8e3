//! Delta-PCM audio blocks
//!
//! The first DPCM block of a file carries an encrypted 44-byte RIFF/WAVE
//! header ahead of its samples. Sample data is a 16-bit little-endian seed
//! followed by one byte per sample: bit 7 selects subtraction, the low seven
//! bits index the variant's delta table.

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};

use crate::error::{DtaError, DtaResult};

/// Size of the embedded RIFF/WAVE header
pub const WAV_HEADER_SIZE: usize = 44;

/// Sign bit of a sample code
pub const SIGN_BIT: u8 = 0x80;

/// Canonical 44-byte PCM WAVE header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct WavHeader {
    /// `RIFF`
    pub riff_id: [u8; 4],
    /// File size minus 8
    pub riff_size: u32,
    /// `WAVE`
    pub wave_id: [u8; 4],
    /// `fmt `
    pub fmt_id: [u8; 4],
    /// Format chunk size, 16 for PCM
    pub fmt_size: u32,
    /// 1 for PCM
    pub format_tag: u16,
    /// Channel count
    pub channels: u16,
    /// Samples per second
    pub sample_rate: u32,
    /// Bytes per second
    pub byte_rate: u32,
    /// Bytes per sample frame
    pub block_align: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
    /// `data`
    pub data_id: [u8; 4],
    /// Sample data size in bytes
    pub data_size: u32,
}

impl WavHeader {
    /// Build a 16-bit PCM header
    ///
    /// Derived fields wrap on overflow, as a 32-bit RIFF writer would.
    pub fn pcm16(channels: u16, sample_rate: u32, data_size: u32) -> Self {
        let block_align = channels.wrapping_mul(2);
        Self {
            riff_id: *b"RIFF",
            riff_size: data_size.wrapping_add(36),
            wave_id: *b"WAVE",
            fmt_id: *b"fmt ",
            fmt_size: 16,
            format_tag: 1,
            channels,
            sample_rate,
            byte_rate: sample_rate.wrapping_mul(u32::from(block_align)),
            block_align,
            bits_per_sample: 16,
            data_id: *b"data",
            data_size,
        }
    }

    /// Serialize to the 44-byte on-disk form
    pub fn to_bytes(&self) -> DtaResult<[u8; WAV_HEADER_SIZE]> {
        let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_SIZE));
        self.write(&mut cursor)?;
        let mut bytes = [0u8; WAV_HEADER_SIZE];
        bytes.copy_from_slice(cursor.get_ref());
        Ok(bytes)
    }
}

/// Expand a seed and sample codes into 16-bit little-endian PCM
///
/// An empty input produces no samples. A lone byte cannot hold the seed and is
/// rejected.
pub fn decode_samples(table: &[u16; 128], input: &[u8], output: &mut Vec<u8>) -> DtaResult<()> {
    let Some((seed, codes)) = input.split_first_chunk::<2>() else {
        if input.is_empty() {
            return Ok(());
        }
        return Err(DtaError::CorruptBlock(
            "audio block ends inside the seed sample".to_string(),
        ));
    };

    output.reserve(2 + codes.len() * 2);
    output.extend_from_slice(seed);

    let mut sample = u16::from_le_bytes(*seed);
    for &code in codes {
        let delta = table[usize::from(code & !SIGN_BIT)];
        sample = if code & SIGN_BIT == 0 {
            sample.wrapping_add(delta)
        } else {
            sample.wrapping_sub(delta)
        };
        output.extend_from_slice(&sample.to_le_bytes());
    }

    Ok(())
}
