//! In-memory index of archive entries
//!
//! The catalog pairs each file table record with its data file header, in
//! file table order. It is built once when an archive is loaded and never
//! changes afterward.

use std::io::{Read, Seek, SeekFrom};

use dtakit_crypto::DtaCipher;
use tracing::debug;

use crate::error::{DtaError, DtaResult, read_exact_or_truncated};
use crate::header::{ArchiveHeader, DataFileHeader, FileTableRecord};

/// One archive member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Position in the file table
    pub index: usize,
    /// File table record
    pub record: FileTableRecord,
    /// Decrypted data file header
    pub header: DataFileHeader,
    /// Entry name decoded from the header
    pub name: String,
}

impl CatalogEntry {
    /// Declared decoded size
    pub fn size(&self) -> u64 {
        u64::from(self.header.size)
    }

    /// Number of compressed blocks
    pub fn block_count(&self) -> u32 {
        self.header.compressed_block_count
    }

    /// Whether the entry's blocks are individually encrypted
    pub fn is_encrypted(&self) -> bool {
        self.header.has_encrypted_blocks()
    }

    /// Raw name bytes as stored in the header
    pub fn name_bytes(&self) -> &[u8] {
        self.header.name_bytes()
    }
}

/// Ordered, immutable list of archive entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    /// Entry at `index`, or [`DtaError::IndexOutOfRange`]
    pub fn entry(&self, index: usize) -> DtaResult<&CatalogEntry> {
        self.entries.get(index).ok_or(DtaError::IndexOutOfRange {
            index,
            count: self.entries.len(),
        })
    }

    /// Iterate entries in file table order
    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    /// Index of the first entry whose name matches exactly
    pub fn find_index_by_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    /// Total declared decoded size of all entries
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(CatalogEntry::size).sum()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Read the file table and every data file header described by `header`
pub fn read_catalog<R: Read + Seek>(
    reader: &mut R,
    cipher: &DtaCipher,
    header: &ArchiveHeader,
) -> DtaResult<Catalog> {
    let table_offset = u64::from(header.file_table_offset);
    let table_len = header.table_len();

    // Reject impossible tables before allocating for them
    let stream_len = reader.seek(SeekFrom::End(0))?;
    if table_offset.saturating_add(table_len) > stream_len {
        return Err(DtaError::Truncated {
            what: "file table",
            offset: table_offset,
            needed: table_len,
        });
    }

    let count = header.file_count as usize;
    let mut raw = vec![0u8; count * FileTableRecord::SIZE];
    reader.seek(SeekFrom::Start(table_offset))?;
    read_exact_or_truncated(reader, &mut raw, "file table", table_offset)?;
    let records = FileTableRecord::parse_table(&mut raw, count, cipher)?;

    let mut entries = Vec::with_capacity(count);
    for (index, record) in records.into_iter().enumerate() {
        let header_offset = u64::from(record.header_offset);
        reader.seek(SeekFrom::Start(header_offset))?;
        let header = DataFileHeader::read_encrypted(reader, cipher, header_offset)?;
        let name = header.name_lossy();

        debug!(
            index,
            name = %name,
            size = header.size,
            blocks = header.compressed_block_count,
            encrypted = header.has_encrypted_blocks(),
            "catalog entry"
        );

        entries.push(CatalogEntry {
            index,
            record,
            header,
            name,
        });
    }

    Ok(Catalog { entries })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::BinWrite;
    use binrw::io::Cursor;
    use dtakit_crypto::KeyPair;

    fn write_encrypted<T>(out: &mut Vec<u8>, value: &T, cipher: &DtaCipher)
    where
        T: for<'a> BinWrite<Args<'a> = ()> + binrw::meta::WriteEndian,
    {
        let mut cursor = Cursor::new(Vec::new());
        value.write(&mut cursor).expect("Test operation should succeed");
        out.extend(cipher.transform(cursor.get_ref(), 0));
    }

    /// Header region only: table at 16, data file headers after it
    fn catalog_bytes(names: &[&str], cipher: &DtaCipher) -> (ArchiveHeader, Vec<u8>) {
        let table_offset = 16u32;
        let headers_start = table_offset as usize + names.len() * FileTableRecord::SIZE;

        let mut table = Vec::new();
        let mut headers = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let header_offset = (headers_start + i * DataFileHeader::SIZE) as u32;
            let record = FileTableRecord {
                name_checksum: 0,
                name_length: name.len() as u16,
                header_offset,
                data_offset: 0,
                name_prefix: [0; 4],
            };
            let mut cursor = Cursor::new(Vec::new());
            record.write(&mut cursor).expect("Test operation should succeed");
            table.extend_from_slice(cursor.get_ref());

            let header = DataFileHeader::new(name.as_bytes(), (i as u32 + 1) * 100, 0, i % 2 == 1);
            write_encrypted(&mut headers, &header, cipher);
        }

        let mut bytes = vec![0u8; table_offset as usize];
        bytes.extend(cipher.transform(&table, 0));
        bytes.extend(headers);

        let header = ArchiveHeader {
            file_count: names.len() as u32,
            file_table_offset: table_offset,
            file_table_size: (names.len() * FileTableRecord::SIZE) as u32,
            reserved: 0,
        };
        (header, bytes)
    }

    #[test]
    fn test_read_catalog() {
        let cipher = DtaCipher::new(KeyPair::new(0xAAAA_5555, 0x0F0F_F0F0));
        let (header, bytes) = catalog_bytes(&["maps\\town.4ds", "SOUNDS\\Door.wav", "x"], &cipher);

        let catalog =
            read_catalog(&mut Cursor::new(bytes), &cipher, &header).expect("Test operation should succeed");

        assert_eq!(catalog.len(), 3);
        let names: Vec<_> = catalog.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["maps\\town.4ds", "SOUNDS\\Door.wav", "x"]);

        let second = catalog.get(1).expect("Test operation should succeed");
        assert_eq!(second.index, 1);
        assert_eq!(second.size(), 200);
        assert!(second.is_encrypted());
        assert!(!catalog.get(0).expect("Test operation should succeed").is_encrypted());
        assert_eq!(catalog.total_size(), 600);
    }

    #[test]
    fn test_find_index_by_name_is_exact() {
        let cipher = DtaCipher::new(KeyPair::zero());
        let (header, bytes) = catalog_bytes(&["a.txt", "B.txt", "a.txt"], &cipher);
        let catalog =
            read_catalog(&mut Cursor::new(bytes), &cipher, &header).expect("Test operation should succeed");

        assert_eq!(catalog.find_index_by_name("a.txt"), Some(0));
        assert_eq!(catalog.find_index_by_name("B.txt"), Some(1));
        assert_eq!(catalog.find_index_by_name("b.txt"), None);
        assert_eq!(catalog.find_index_by_name("a.tx"), None);
    }

    #[test]
    fn test_entry_out_of_range() {
        let catalog = Catalog::default();
        assert!(catalog.is_empty());
        assert!(matches!(
            catalog.entry(0),
            Err(DtaError::IndexOutOfRange { index: 0, count: 0 })
        ));
    }

    #[test]
    fn test_table_past_end_of_stream() {
        let cipher = DtaCipher::new(KeyPair::zero());
        let (mut header, bytes) = catalog_bytes(&["only"], &cipher);
        header.file_count = 1_000_000;

        let result = read_catalog(&mut Cursor::new(bytes), &cipher, &header);
        assert!(matches!(
            result,
            Err(DtaError::Truncated {
                what: "file table",
                offset: 16,
                needed: 16_000_000
            })
        ));
    }

    #[test]
    fn test_header_offset_past_end() {
        let cipher = DtaCipher::new(KeyPair::zero());
        let (header, mut bytes) = catalog_bytes(&["a", "b"], &cipher);
        // Drop half of the second data file header
        bytes.truncate(bytes.len() - DataFileHeader::SIZE / 2);

        let result = read_catalog(&mut Cursor::new(bytes), &cipher, &header);
        assert!(matches!(
            result,
            Err(DtaError::Truncated {
                what: "data file header",
                ..
            })
        ));
    }
}
