//! Synthetic archive writer for integration tests
#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use binrw::BinWrite;
use binrw::io::Cursor;
use dtakit_crypto::{DtaCipher, KeyPair};
use dtakit_formats::header::DTA_MAGIC;
use dtakit_formats::{ArchiveHeader, BlockType, DataFileHeader, FileTableRecord};

pub const TEST_KEYS: KeyPair = KeyPair::new(0x1234_5678, 0x9ABC_DEF0);

/// A member file as stored blocks
pub struct FixtureEntry {
    pub name: String,
    pub blocks: Vec<Vec<u8>>,
    pub declared_size: u32,
    pub encrypted: bool,
}

/// Builds a complete ISD0 archive in memory
pub struct ArchiveBuilder {
    cipher: DtaCipher,
    entries: Vec<FixtureEntry>,
}

impl ArchiveBuilder {
    pub fn new(keys: KeyPair) -> Self {
        Self {
            cipher: DtaCipher::new(keys),
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, name: &str, blocks: Vec<Vec<u8>>, declared_size: u32) -> Self {
        self.entries.push(FixtureEntry {
            name: name.to_string(),
            blocks,
            declared_size,
            encrypted: false,
        });
        self
    }

    pub fn encrypted_entry(mut self, name: &str, blocks: Vec<Vec<u8>>, declared_size: u32) -> Self {
        self.entries.push(FixtureEntry {
            name: name.to_string(),
            blocks,
            declared_size,
            encrypted: true,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let count = self.entries.len();
        let table_offset = DTA_MAGIC.len() + ArchiveHeader::SIZE;
        let headers_offset = table_offset + count * FileTableRecord::SIZE;
        let mut data_offset = headers_offset + count * DataFileHeader::SIZE;

        let mut table = Vec::new();
        let mut headers = Vec::new();
        let mut data = Vec::new();

        for (i, entry) in self.entries.iter().enumerate() {
            let name = entry.name.as_bytes();
            let mut prefix = [0u8; 4];
            let prefix_len = name.len().min(4);
            prefix[..prefix_len].copy_from_slice(&name[..prefix_len]);

            let record = FileTableRecord {
                name_checksum: 0,
                name_length: name.len() as u16,
                header_offset: (headers_offset + i * DataFileHeader::SIZE) as u32,
                data_offset: data_offset as u32,
                name_prefix: prefix,
            };
            table.extend(to_bytes(&record));

            let header = DataFileHeader::new(
                name,
                entry.declared_size,
                entry.blocks.len() as u32,
                entry.encrypted,
            );
            headers.extend(self.cipher.transform(&to_bytes(&header), 0));

            for block in &entry.blocks {
                data.extend((block.len() as u32).to_le_bytes());
                if entry.encrypted {
                    data.extend(self.cipher.transform(block, 0));
                } else {
                    data.extend_from_slice(block);
                }
                data_offset += 4 + block.len();
            }
        }

        let header = ArchiveHeader {
            file_count: count as u32,
            file_table_offset: table_offset as u32,
            file_table_size: table.len() as u32,
            reserved: 0,
        };

        let mut archive = DTA_MAGIC.to_vec();
        archive.extend(self.cipher.transform(&to_bytes(&header), 0));
        archive.extend(self.cipher.transform(&table, 0));
        archive.extend(headers);
        archive.extend(data);
        archive
    }
}

fn to_bytes<T>(value: &T) -> Vec<u8>
where
    T: for<'a> BinWrite<Args<'a> = ()> + binrw::meta::WriteEndian,
{
    let mut cursor = Cursor::new(Vec::new());
    value.write(&mut cursor).expect("fixture structures always serialize");
    cursor.into_inner()
}

/// Block with a type tag prepended
pub fn block(block_type: BlockType, payload: &[u8]) -> Vec<u8> {
    let mut block = vec![block_type.as_byte()];
    block.extend_from_slice(payload);
    block
}

pub fn raw_block(payload: &[u8]) -> Vec<u8> {
    block(BlockType::Raw, payload)
}

/// LZSS block holding `data` as plain literal groups
pub fn literal_lzss_block(data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    for chunk in data.chunks(16) {
        payload.extend([0x00, 0x00]);
        payload.extend_from_slice(chunk);
    }
    block(BlockType::Lzss, &payload)
}
