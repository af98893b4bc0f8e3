//! Archive key pairs and the name-to-key mapping
//!
//! Each DTA archive is encrypted with its own pair of 32-bit keys. The keys are
//! not stored anywhere inside the archive; tools look them up by the archive's
//! file name. [`KeyTable`] is that lookup, filled from data the caller supplies.

use std::collections::HashMap;
use std::fmt;

use crate::error::CryptoError;

/// The two 32-bit keys protecting one archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyPair {
    /// First key word
    pub key1: u32,
    /// Second key word
    pub key2: u32,
}

impl KeyPair {
    /// Create a new key pair
    pub const fn new(key1: u32, key2: u32) -> Self {
        Self { key1, key2 }
    }

    /// The all-zero pair used when no key is known for an archive
    pub const fn zero() -> Self {
        Self { key1: 0, key2: 0 }
    }

    /// Parse both key words from strings (hex with `0x` prefix, 8-digit bare
    /// hex, or decimal)
    ///
    /// Exactly eight hex digits without a prefix are always read as hex, so
    /// `12345678` is `0x12345678`. Write shorter decimal values as they are, or
    /// use the `0x` form to be explicit.
    pub fn parse(key1: &str, key2: &str) -> Result<Self, CryptoError> {
        Ok(Self::new(parse_key_word(key1)?, parse_key_word(key2)?))
    }
}

impl fmt::Display for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}:{:08X}", self.key1, self.key2)
    }
}

/// Lookup table from archive file name to [`KeyPair`]
///
/// Names are normalized before insertion and lookup: only the final path
/// component is kept and it is ASCII-lowercased, so `C:\Game\A0.DTA`,
/// `a0.dta` and `data/A0.dta` all resolve to the same entry.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    keys: HashMap<String, KeyPair>,
}

impl KeyTable {
    /// Create an empty key table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the keys for an archive name
    pub fn insert(&mut self, archive_name: &str, keys: KeyPair) {
        self.keys.insert(normalize_archive_name(archive_name), keys);
    }

    /// Get the keys for an archive name, if known
    pub fn get(&self, archive_name: &str) -> Option<KeyPair> {
        self.keys
            .get(&normalize_archive_name(archive_name))
            .copied()
    }

    /// Get the keys for an archive name, falling back to [`KeyPair::zero`]
    ///
    /// A miss is not an error: the archive will simply fail signature or
    /// structure checks later if it really needed other keys.
    pub fn resolve(&self, archive_name: &str) -> KeyPair {
        self.get(archive_name).unwrap_or_default()
    }

    /// Remove the keys for an archive name
    pub fn remove(&mut self, archive_name: &str) -> Option<KeyPair> {
        self.keys.remove(&normalize_archive_name(archive_name))
    }

    /// Number of archive names in the table
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Load entries from CSV content (format: `name,key1,key2`)
    ///
    /// Lines starting with `#` are treated as comments. Malformed lines are
    /// skipped. Returns the number of entries loaded.
    ///
    /// # Example
    ///
    /// ```
    /// use dtakit_crypto::KeyTable;
    ///
    /// let csv_content = r#"
    /// # name,key1,key2
    /// a0.dta,0x12345678,0x9ABCDEF0
    /// A1.DTA,DEADBEEF,0BADF00D
    /// "#;
    ///
    /// let mut table = KeyTable::new();
    /// assert_eq!(table.load_from_csv(csv_content), 2);
    /// assert_eq!(table.get("a1.dta").map(|k| k.key1), Some(0xDEAD_BEEF));
    /// ```
    pub fn load_from_csv(&mut self, content: &str) -> usize {
        let mut count = 0;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            if parts.len() != 3 || parts[0].is_empty() {
                continue;
            }

            if let Ok(keys) = KeyPair::parse(parts[1], parts[2]) {
                self.insert(parts[0], keys);
                count += 1;
            }
        }

        count
    }

    /// Load entries from text content (format: `name key1 key2` per line)
    ///
    /// Lines starting with `#` or `//` are treated as comments. Returns the
    /// number of entries loaded.
    pub fn load_from_txt(&mut self, content: &str) -> usize {
        let mut count = 0;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                continue;
            }

            if let Ok(keys) = KeyPair::parse(parts[1], parts[2]) {
                self.insert(parts[0], keys);
                count += 1;
            }
        }

        count
    }

    /// Iterate over `(normalized name, keys)` entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, KeyPair)> + '_ {
        self.keys.iter().map(|(name, &keys)| (name.as_str(), keys))
    }
}

/// Reduce an archive path to its lowercased file name
pub fn normalize_archive_name(archive_name: &str) -> String {
    archive_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(archive_name)
        .trim()
        .to_ascii_lowercase()
}

/// Parse one 32-bit key word (hex with prefix, 8-digit hex, or decimal)
fn parse_key_word(s: &str) -> Result<u32, CryptoError> {
    let s = s.trim();

    if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(digits, 16)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid hex key word: {e}")))
    } else if s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit()) {
        let mut word = [0u8; 4];
        hex::decode_to_slice(s, &mut word)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid hex key word: {e}")))?;
        Ok(u32::from_be_bytes(word))
    } else {
        s.parse()
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid decimal key word: {e}")))
    }
}
