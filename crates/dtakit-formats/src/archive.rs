//! Archive handle and file extraction
//!
//! [`DtaArchive`] validates the signature, decrypts the header and file table,
//! and builds the [`Catalog`] once on load. Entries are decoded on demand:
//! each extraction walks the entry's length-prefixed blocks, decrypts them
//! when the entry is flagged, and concatenates the decoded output.
//!
//! The underlying stream sits behind a mutex so a shared archive can serve
//! extractions from several threads. [`extract_entry`] runs the same decode
//! against any caller-owned stream.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use dtakit_crypto::{DtaCipher, KeyPair, KeyTable};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::catalog::{Catalog, CatalogEntry, read_catalog};
use crate::codec::tables::DeltaTables;
use crate::codec::{DecodeSession, decode_block, split_block};
use crate::config::{DtaConfig, SizeCheck};
use crate::error::{DtaError, DtaResult, read_exact_or_truncated};
use crate::header::{ArchiveHeader, read_signature};

/// Significant bits of a block length field
pub const BLOCK_LENGTH_MASK: u32 = 0xFFFF;

/// Upper bound on the output buffer reserved from a header's declared size
pub const PRESIZE_LIMIT: usize = 4 * 1024 * 1024;

/// An opened DTA archive
#[derive(Debug)]
pub struct DtaArchive<R> {
    reader: Mutex<R>,
    header: ArchiveHeader,
    catalog: Catalog,
    cipher: DtaCipher,
    tables: DeltaTables,
    config: DtaConfig,
}

impl<R: Read + Seek> DtaArchive<R> {
    /// Load an archive from a stream positioned anywhere, using default settings
    pub fn load(reader: R, keys: KeyPair) -> DtaResult<Self> {
        Self::load_with_config(reader, keys, DtaConfig::default())
    }

    /// Load an archive from a stream with explicit settings
    pub fn load_with_config(mut reader: R, keys: KeyPair, config: DtaConfig) -> DtaResult<Self> {
        let cipher = DtaCipher::new(keys);

        reader.seek(SeekFrom::Start(0))?;
        read_signature(&mut reader)?;
        let header = ArchiveHeader::read_encrypted(&mut reader, &cipher)?;

        debug!(
            file_count = header.file_count,
            table_offset = header.file_table_offset,
            table_size = header.file_table_size,
            "decrypted archive header"
        );

        let catalog = read_catalog(&mut reader, &cipher, &header)?;

        info!(
            entries = catalog.len(),
            total_size = catalog.total_size(),
            "loaded DTA archive"
        );

        Ok(Self {
            reader: Mutex::new(reader),
            header,
            catalog,
            cipher,
            tables: DeltaTables::default(),
            config,
        })
    }

    /// Replace the DPCM delta tables used for audio entries
    #[must_use]
    pub fn with_delta_tables(mut self, tables: DeltaTables) -> Self {
        self.tables = tables;
        self
    }

    /// Replace the extraction settings
    #[must_use]
    pub fn with_config(mut self, config: DtaConfig) -> Self {
        self.config = config;
        self
    }

    /// Decrypted archive header
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Entry index
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Archive cipher
    pub fn cipher(&self) -> &DtaCipher {
        &self.cipher
    }

    /// Delta tables in use
    pub fn delta_tables(&self) -> &DeltaTables {
        &self.tables
    }

    /// Extraction settings
    pub fn config(&self) -> &DtaConfig {
        &self.config
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    /// Whether the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Index of the entry with exactly this name
    pub fn find_index_by_name(&self, name: &str) -> Option<usize> {
        self.catalog.find_index_by_name(name)
    }

    /// Declared decoded size of an entry
    pub fn file_size(&self, index: usize) -> DtaResult<u64> {
        Ok(self.catalog.entry(index)?.size())
    }

    /// Decode the entry at `index`
    pub fn extract(&self, index: usize) -> DtaResult<Vec<u8>> {
        let entry = self.catalog.entry(index)?;
        let mut reader = self.reader.lock();
        extract_entry(&mut *reader, entry, &self.cipher, &self.tables, &self.config)
    }

    /// Decode the entry with exactly this name
    pub fn extract_by_name(&self, name: &str) -> DtaResult<Vec<u8>> {
        let index = self
            .find_index_by_name(name)
            .ok_or_else(|| DtaError::EntryNotFound(name.to_string()))?;
        self.extract(index)
    }

    /// Release the underlying stream
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

impl DtaArchive<BufReader<File>> {
    /// Open an archive file, taking its keys from `keys` by file name
    pub fn open<P: AsRef<Path>>(path: P, keys: &KeyTable) -> DtaResult<Self> {
        Self::open_with_config(path, keys, DtaConfig::default())
    }

    /// Open an archive file with explicit settings
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        keys: &KeyTable,
        config: DtaConfig,
    ) -> DtaResult<Self> {
        let path = path.as_ref();
        let pair = keys.resolve(&path.to_string_lossy());
        if pair == KeyPair::zero() {
            debug!(path = %path.display(), "no keys registered, using zero keys");
        }

        info!(path = %path.display(), "opening DTA archive");
        let file = File::open(path)?;
        Self::load_with_config(BufReader::new(file), pair, config)
    }
}

/// Decode one catalog entry from `reader`
///
/// Each call owns a fresh [`DecodeSession`], so the audio header of one
/// extraction never leaks into another.
pub fn extract_entry<R: Read + Seek>(
    reader: &mut R,
    entry: &CatalogEntry,
    cipher: &DtaCipher,
    tables: &DeltaTables,
    config: &DtaConfig,
) -> DtaResult<Vec<u8>> {
    let limit = config.max_output_size;
    let declared = entry.header.size as usize;
    let encrypted = entry.is_encrypted();

    debug!(
        index = entry.index,
        name = %entry.name,
        declared,
        blocks = entry.block_count(),
        encrypted,
        "extracting entry"
    );

    // Declared size is untrusted
    let mut output = Vec::with_capacity(declared.min(limit).min(PRESIZE_LIMIT));
    let mut session =
        DecodeSession::new(cipher, tables).with_required_tables(config.require_delta_tables);
    let mut block = Vec::new();

    let mut offset = u64::from(entry.record.data_offset);
    reader.seek(SeekFrom::Start(offset))?;

    for block_index in 0..entry.block_count() {
        let mut length_field = [0u8; 4];
        read_exact_or_truncated(reader, &mut length_field, "block length", offset)?;
        offset += 4;

        let raw_length = u32::from_le_bytes(length_field);
        let length = raw_length & BLOCK_LENGTH_MASK;
        if raw_length != length {
            trace!(block_index, raw_length, "ignoring upper bits of block length");
        }

        block.resize(length as usize, 0);
        read_exact_or_truncated(reader, &mut block, "block", offset)?;
        offset += u64::from(length);

        if encrypted {
            cipher.decrypt_in_place(&mut block);
        }

        let (tag, payload) = split_block(&block)?;
        let decoded = decode_block(tag, payload, &mut session)?;

        trace!(
            block_index,
            tag,
            stored = length,
            decoded = decoded.len(),
            "decoded block"
        );

        if output.len() + decoded.len() > limit {
            return Err(DtaError::OutputTooLarge { limit });
        }
        output.extend_from_slice(&decoded);
    }

    check_size(entry, output.len(), config.size_check)?;
    Ok(output)
}

fn check_size(entry: &CatalogEntry, actual: usize, policy: SizeCheck) -> DtaResult<()> {
    let expected = entry.size();
    let actual = actual as u64;
    if expected == actual {
        return Ok(());
    }

    match policy {
        SizeCheck::Ignore => Ok(()),
        SizeCheck::Warn => {
            warn!(
                name = %entry.name,
                expected,
                actual,
                "decoded size differs from header"
            );
            Ok(())
        }
        SizeCheck::Strict => Err(DtaError::SizeMismatch {
            name: entry.name.clone(),
            expected,
            actual,
        }),
    }
}
