//! Block type tags and the per-extraction decode session
//!
//! Every data block starts with a one-byte type tag selecting the codec for
//! the remaining payload. Blocks of one file may mix codecs; their decoded
//! outputs are concatenated.

pub mod dpcm;
pub mod lzss;
pub mod tables;

use binrw::BinRead;
use binrw::io::Cursor;
use dtakit_crypto::DtaCipher;
use tracing::{trace, warn};

use crate::error::{DtaError, DtaResult};
use dpcm::{WAV_HEADER_SIZE, WavHeader};
use tables::DeltaTables;

/// Block codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockType {
    /// Stored without compression
    Raw = 0,
    /// LZSS back-references with a run-length escape
    Lzss = 1,
    /// Delta-PCM audio, table 0
    Dpcm0 = 8,
    /// Delta-PCM audio, table 1
    Dpcm1 = 12,
    /// Delta-PCM audio, table 2
    Dpcm2 = 16,
    /// Delta-PCM audio, table 3
    Dpcm3 = 20,
    /// Delta-PCM audio, table 4
    Dpcm4 = 24,
    /// Delta-PCM audio, table 5
    Dpcm5 = 28,
    /// Delta-PCM audio, table 6
    Dpcm6 = 32,
}

impl BlockType {
    /// Parse a block type from its tag byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Raw),
            1 => Some(Self::Lzss),
            8 => Some(Self::Dpcm0),
            12 => Some(Self::Dpcm1),
            16 => Some(Self::Dpcm2),
            20 => Some(Self::Dpcm3),
            24 => Some(Self::Dpcm4),
            28 => Some(Self::Dpcm5),
            32 => Some(Self::Dpcm6),
            _ => None,
        }
    }

    /// Get the tag byte
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Delta table index for DPCM block types
    pub fn dpcm_variant(self) -> Option<usize> {
        match self {
            Self::Raw | Self::Lzss => None,
            dpcm => Some(usize::from((dpcm.as_byte() - Self::Dpcm0.as_byte()) / 4)),
        }
    }
}

/// Audio header progress within one extraction
#[derive(Debug, Clone, Default)]
pub enum AudioHeaderState {
    /// No DPCM block has been seen yet
    #[default]
    Pending,
    /// The embedded header was emitted by an earlier block
    Consumed {
        /// Decrypted header bytes as written to the output
        raw: [u8; WAV_HEADER_SIZE],
        /// Parsed header
        header: WavHeader,
    },
}

/// State carried across the blocks of a single file
///
/// A session is created for one extraction and dropped with it; it is never
/// shared between extractions, so concurrent or nested extractions cannot see
/// each other's audio header progress.
#[derive(Debug)]
pub struct DecodeSession<'a> {
    cipher: &'a DtaCipher,
    tables: &'a DeltaTables,
    audio: AudioHeaderState,
    require_loaded_tables: bool,
    placeholder_used: bool,
}

impl<'a> DecodeSession<'a> {
    /// Start a session with the archive cipher and the DPCM delta tables
    pub fn new(cipher: &'a DtaCipher, tables: &'a DeltaTables) -> Self {
        Self {
            cipher,
            tables,
            audio: AudioHeaderState::Pending,
            require_loaded_tables: false,
            placeholder_used: false,
        }
    }

    /// Refuse DPCM blocks while the delta tables are the built-in placeholder
    #[must_use]
    pub const fn with_required_tables(mut self, required: bool) -> Self {
        self.require_loaded_tables = required;
        self
    }

    /// Whether a DPCM block was decoded with the placeholder tables
    pub fn placeholder_tables_used(&self) -> bool {
        self.placeholder_used
    }

    /// Current audio header state
    pub fn audio_state(&self) -> &AudioHeaderState {
        &self.audio
    }

    /// Decrypted audio header bytes, once a DPCM block has supplied them
    pub fn audio_header(&self) -> Option<&[u8]> {
        match &self.audio {
            AudioHeaderState::Pending => None,
            AudioHeaderState::Consumed { raw, .. } => Some(raw),
        }
    }
}

/// Split a raw block into its type tag and codec payload
pub fn split_block(block: &[u8]) -> DtaResult<(u8, &[u8])> {
    block
        .split_first()
        .map(|(&tag, payload)| (tag, payload))
        .ok_or_else(|| DtaError::CorruptBlock("empty block has no type tag".to_string()))
}

/// Decode one block payload according to its tag
pub fn decode_block(tag: u8, payload: &[u8], session: &mut DecodeSession<'_>) -> DtaResult<Vec<u8>> {
    let block_type = BlockType::from_byte(tag).ok_or(DtaError::UnknownBlockType(tag))?;
    trace!(?block_type, payload_len = payload.len(), "decoding block");

    match block_type {
        BlockType::Raw => Ok(payload.to_vec()),
        BlockType::Lzss => lzss::decompress(payload),
        dpcm_type => {
            let variant = dpcm_type
                .dpcm_variant()
                .ok_or(DtaError::UnknownBlockType(tag))?;
            decode_dpcm_block(variant, payload, session)
        }
    }
}

/// Decode a DPCM block, emitting the embedded audio header on first use
fn decode_dpcm_block(
    variant: usize,
    payload: &[u8],
    session: &mut DecodeSession<'_>,
) -> DtaResult<Vec<u8>> {
    if session.tables.is_builtin() {
        if session.require_loaded_tables {
            return Err(DtaError::PlaceholderDeltaTables);
        }
        if !session.placeholder_used {
            warn!("decoding DPCM audio with placeholder delta tables; sample values will be wrong");
            session.placeholder_used = true;
        }
    }

    let mut output = Vec::with_capacity(WAV_HEADER_SIZE + payload.len() * 2);
    let mut samples = payload;

    if matches!(session.audio, AudioHeaderState::Pending) {
        if payload.len() < WAV_HEADER_SIZE {
            return Err(DtaError::CorruptBlock(format!(
                "audio block of {} bytes cannot hold the {WAV_HEADER_SIZE}-byte audio header",
                payload.len()
            )));
        }

        let mut raw = [0u8; WAV_HEADER_SIZE];
        raw.copy_from_slice(&payload[..WAV_HEADER_SIZE]);
        session.cipher.decrypt_in_place(&mut raw);
        let header = WavHeader::read(&mut Cursor::new(&raw[..]))?;

        trace!(
            channels = header.channels,
            sample_rate = header.sample_rate,
            "consumed embedded audio header"
        );

        output.extend_from_slice(&raw);
        session.audio = AudioHeaderState::Consumed { raw, header };
        samples = &payload[WAV_HEADER_SIZE..];
    }

    let channels = match &session.audio {
        AudioHeaderState::Consumed { header, .. } => header.channels,
        AudioHeaderState::Pending => 0,
    };
    if channels != 1 {
        return Err(DtaError::UnsupportedAudioLayout { channels });
    }

    dpcm::decode_samples(session.tables.table(variant), samples, &mut output)?;
    Ok(output)
}
