//! Repeating-key XOR stream cipher used by ISD0 archives.
//!
//! Every encrypted structure in a DTA archive (the archive header, the file
//! table, each per-file header, embedded audio headers and optionally every
//! data block) is protected with the same transform: the two 32-bit halves of
//! the archive's [`KeyPair`] are whitened with fixed constants and laid out
//! little-endian into an 8-byte keystream that repeats for the whole buffer.
//!
//! Applying the transform twice with the same keys and shift yields the
//! original bytes, so there is no separate encrypt/decrypt direction.
//!
//! ## Usage
//!
//! ```rust
//! use dtakit_crypto::{DtaCipher, KeyPair};
//!
//! let cipher = DtaCipher::new(KeyPair::new(0x1234_5678, 0x9ABC_DEF0));
//!
//! let mut data = b"Hello, ISD0!".to_vec();
//! cipher.apply_keystream(&mut data, 0);
//! assert_ne!(&data[..], b"Hello, ISD0!");
//!
//! cipher.apply_keystream(&mut data, 0);
//! assert_eq!(&data[..], b"Hello, ISD0!");
//! ```

use crate::keys::KeyPair;

/// Whitening constant XORed into `key1`.
pub const KEY1_MASK: u32 = 0x3947_5694;

/// Whitening constant XORed into `key2`.
pub const KEY2_MASK: u32 = 0x3498_5762;

/// Length of the repeating keystream in bytes.
pub const KEYSTREAM_LEN: usize = 8;

/// Keyed, position-dependent, self-inverse byte transform.
///
/// The cipher holds no running state: the keystream byte for a given buffer
/// position depends only on `(position + shift) mod 8`, which makes a single
/// instance safe to share between threads and reuse across buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DtaCipher {
    /// Effective keystream, `key1 ^ KEY1_MASK` then `key2 ^ KEY2_MASK`, both LE
    keystream: [u8; KEYSTREAM_LEN],
}

impl DtaCipher {
    /// Create a cipher for the given archive key pair.
    pub fn new(keys: KeyPair) -> Self {
        let mut keystream = [0u8; KEYSTREAM_LEN];
        keystream[..4].copy_from_slice(&(keys.key1 ^ KEY1_MASK).to_le_bytes());
        keystream[4..].copy_from_slice(&(keys.key2 ^ KEY2_MASK).to_le_bytes());
        Self { keystream }
    }

    /// The 8-byte effective keystream.
    pub fn keystream(&self) -> &[u8; KEYSTREAM_LEN] {
        &self.keystream
    }

    /// Keystream byte applied at buffer position `index` for a given shift.
    #[inline]
    fn key_byte(&self, index: usize, shift: u32) -> u8 {
        let slot = (index as u64 + u64::from(shift)) % KEYSTREAM_LEN as u64;
        self.keystream[slot as usize]
    }

    /// Apply the keystream to `data` in place.
    ///
    /// `shift` rotates the keystream relative to the start of the buffer. All
    /// archive structures are decrypted with a shift of zero; other values are
    /// only useful when probing a raw file for key alignment.
    pub fn apply_keystream(&self, data: &mut [u8], shift: u32) {
        for (index, byte) in data.iter_mut().enumerate() {
            *byte ^= self.key_byte(index, shift);
        }
    }

    /// Apply the keystream to a copy of `data`.
    pub fn transform(&self, data: &[u8], shift: u32) -> Vec<u8> {
        let mut output = data.to_vec();
        self.apply_keystream(&mut output, shift);
        output
    }

    /// Decrypt an archive structure in place (shift zero).
    pub fn decrypt_in_place(&self, data: &mut [u8]) {
        self.apply_keystream(data, 0);
    }
}

impl From<KeyPair> for DtaCipher {
    fn from(keys: KeyPair) -> Self {
        Self::new(keys)
    }
}
