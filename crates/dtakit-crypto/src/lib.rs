//! Cryptographic primitives for ISD0 (DTA) game archives
//!
//! This crate provides the keyed stream cipher that protects every structure
//! in a DTA archive, together with the key types used to select it.
//!
//! # Components
//!
//! - **Cipher**: [`DtaCipher`], an 8-byte repeating-key XOR transform that is
//!   its own inverse
//! - **Keys**: [`KeyPair`] (the two 32-bit archive keys) and [`KeyTable`], a
//!   caller-supplied mapping from archive file name to key pair
//!
//! # Examples
//!
//! ```
//! use dtakit_crypto::{DtaCipher, KeyTable};
//!
//! let mut table = KeyTable::new();
//! table.load_from_csv("a0.dta,0x12345678,0x9ABCDEF0");
//!
//! let cipher = DtaCipher::new(table.resolve("A0.DTA"));
//! let encrypted = cipher.transform(b"ISD0", 0);
//! assert_eq!(cipher.transform(&encrypted, 0), b"ISD0");
//! ```

#![warn(missing_docs)]

pub mod cipher;
pub mod error;
pub mod keys;

pub use cipher::DtaCipher;
pub use error::CryptoError;
pub use keys::{KeyPair, KeyTable, normalize_archive_name};
