//! ISD0 header structures and parsing
//!
//! All three index structures are stored encrypted. They are read as raw
//! bytes, run through the archive cipher with a zero shift, and only then
//! parsed with binrw from the plaintext buffer.

use binrw::io::{Cursor, Read};
use binrw::{BinRead, BinWrite};
use dtakit_crypto::DtaCipher;

use crate::error::{DtaError, DtaResult, read_exact_or_truncated};

/// Archive signature bytes
pub const DTA_MAGIC: [u8; 4] = *b"ISD0";

/// Bit in `DataFileHeader::flags[0]` marking individually encrypted blocks
pub const ENCRYPTED_BLOCKS_FLAG: u8 = 0x80;

/// Maximum stored name length inside a data file header
pub const MAX_NAME_LEN: usize = 256;

/// Read the 4-byte signature and reject anything other than [`DTA_MAGIC`]
///
/// Nothing past the signature is consumed when it does not match.
pub fn read_signature<R: Read>(reader: &mut R) -> DtaResult<()> {
    let mut magic = [0u8; 4];
    read_exact_or_truncated(reader, &mut magic, "signature", 0)?;

    if magic != DTA_MAGIC {
        return Err(DtaError::BadSignature(magic));
    }
    Ok(())
}

/// Decrypt `raw` in place and parse a little-endian structure from it
fn decrypt_and_parse<T>(raw: &mut [u8], cipher: &DtaCipher) -> DtaResult<T>
where
    T: for<'a> BinRead<Args<'a> = ()> + binrw::meta::ReadEndian,
{
    cipher.decrypt_in_place(raw);
    Ok(T::read(&mut Cursor::new(&raw[..]))?)
}

/// Encrypted archive header that follows the signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct ArchiveHeader {
    /// Number of entries in the file table
    pub file_count: u32,
    /// Absolute offset of the file table
    pub file_table_offset: u32,
    /// Size of the file table in bytes as recorded by the packer
    pub file_table_size: u32,
    /// Unused by the reader, kept verbatim
    pub reserved: u32,
}

impl ArchiveHeader {
    /// On-disk size of the encrypted header
    pub const SIZE: usize = 16;

    /// Read and decrypt the header located right after the signature
    pub fn read_encrypted<R: Read>(reader: &mut R, cipher: &DtaCipher) -> DtaResult<Self> {
        let mut raw = [0u8; Self::SIZE];
        read_exact_or_truncated(reader, &mut raw, "archive header", DTA_MAGIC.len() as u64)?;
        decrypt_and_parse(&mut raw, cipher)
    }

    /// Size in bytes of the record table as implied by `file_count`
    pub fn table_len(&self) -> u64 {
        u64::from(self.file_count) * FileTableRecord::SIZE as u64
    }
}

/// One file table entry pointing at a data file header and its blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct FileTableRecord {
    /// Checksum of the entry name
    pub name_checksum: u16,
    /// Length of the entry name
    pub name_length: u16,
    /// Absolute offset of the entry's [`DataFileHeader`]
    pub header_offset: u32,
    /// Absolute offset of the entry's first compressed block
    pub data_offset: u32,
    /// First bytes of the entry name
    pub name_prefix: [u8; 4],
}

impl FileTableRecord {
    /// On-disk size of one record
    pub const SIZE: usize = 16;

    /// Decrypt a whole file table and split it into records, in table order
    ///
    /// The table is encrypted as one buffer, so the keystream continues across
    /// record boundaries.
    pub fn parse_table(raw: &mut [u8], count: usize, cipher: &DtaCipher) -> DtaResult<Vec<Self>> {
        if raw.len() < count * Self::SIZE {
            return Err(DtaError::Truncated {
                what: "file table",
                offset: 0,
                needed: (count * Self::SIZE) as u64,
            });
        }

        cipher.decrypt_in_place(raw);

        let mut cursor = Cursor::new(&raw[..]);
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(Self::read(&mut cursor)?);
        }
        Ok(records)
    }
}

/// Per-file metadata stored at [`FileTableRecord::header_offset`]
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct DataFileHeader {
    /// Unused by the reader, kept verbatim
    pub reserved: [u8; 4],
    /// Packer timestamps, kept verbatim
    pub timestamps: [u32; 2],
    /// Total decoded size of the file
    pub size: u32,
    /// Number of length-prefixed blocks holding the file data
    pub compressed_block_count: u32,
    /// Number of significant bytes in `name`
    pub name_length: u8,
    /// Flag bytes; see [`ENCRYPTED_BLOCKS_FLAG`]
    pub flags: [u8; 7],
    /// Entry name, padded
    pub name: [u8; MAX_NAME_LEN],
}

impl DataFileHeader {
    /// On-disk size of the header, including the padded name
    pub const SIZE: usize = 284;

    /// Build a header for `name`
    ///
    /// Names longer than 255 bytes are cut to fit the length field.
    pub fn new(name: &[u8], size: u32, compressed_block_count: u32, encrypted: bool) -> Self {
        let name_length = name.len().min(usize::from(u8::MAX));
        let mut padded = [0u8; MAX_NAME_LEN];
        padded[..name_length].copy_from_slice(&name[..name_length]);

        let mut flags = [0u8; 7];
        if encrypted {
            flags[0] |= ENCRYPTED_BLOCKS_FLAG;
        }

        Self {
            reserved: [0; 4],
            timestamps: [0; 2],
            size,
            compressed_block_count,
            name_length: name_length as u8,
            flags,
            name: padded,
        }
    }

    /// Read and decrypt a header at the reader's current position
    pub fn read_encrypted<R: Read>(
        reader: &mut R,
        cipher: &DtaCipher,
        offset: u64,
    ) -> DtaResult<Self> {
        let mut raw = [0u8; Self::SIZE];
        read_exact_or_truncated(reader, &mut raw, "data file header", offset)?;
        decrypt_and_parse(&mut raw, cipher)
    }

    /// Name bytes, terminated by `name_length`
    pub fn name_bytes(&self) -> &[u8] {
        &self.name[..usize::from(self.name_length)]
    }

    /// Name as text; bytes that are not valid UTF-8 are replaced
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    /// Whether every block of this file is individually encrypted
    pub fn has_encrypted_blocks(&self) -> bool {
        self.flags[0] & ENCRYPTED_BLOCKS_FLAG != 0
    }
}
