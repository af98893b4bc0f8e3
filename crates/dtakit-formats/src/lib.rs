//! Reader and block decoders for ISD0 (DTA) game archives
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Format names like ISD0 and DPCM
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::missing_errors_doc)] // Every fallible call returns DtaError
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! A DTA archive starts with the `ISD0` signature, followed by an encrypted
//! header, an encrypted file table and one encrypted header per member file.
//! Member data is stored as a sequence of length-prefixed blocks, each
//! compressed with one of several codecs.
//!
//! # Components
//!
//! - **Header**: [`ArchiveHeader`], [`FileTableRecord`] and [`DataFileHeader`]
//!   with binrw parsing after decryption
//! - **Catalog**: ordered entry index built on load, queried by position or name
//! - **Codecs**: raw, LZSS with a run-length escape, and seven delta-PCM
//!   audio variants
//! - **Archive**: [`DtaArchive`] opens a stream and extracts entries;
//!   [`extract_entry`] decodes from any caller-owned stream
//!
//! # Examples
//!
//! ```no_run
//! use dtakit_crypto::KeyTable;
//! use dtakit_formats::DtaArchive;
//!
//! let mut keys = KeyTable::new();
//! keys.load_from_csv("a0.dta,0x12345678,0x9ABCDEF0");
//!
//! let archive = DtaArchive::open("A0.dta", &keys)?;
//! for entry in archive.catalog() {
//!     println!("{} ({} bytes)", entry.name, entry.size());
//! }
//! let data = archive.extract_by_name("missions\\intro.txt")?;
//! # Ok::<(), dtakit_formats::DtaError>(())
//! ```

#![warn(missing_docs)]

pub mod archive;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod header;

pub use archive::{DtaArchive, extract_entry};
pub use catalog::{Catalog, CatalogEntry};
pub use codec::tables::DeltaTables;
pub use codec::{BlockType, DecodeSession, decode_block};
pub use config::{DtaConfig, SizeCheck};
pub use error::{DtaError, DtaResult};
pub use header::{ArchiveHeader, DataFileHeader, FileTableRecord};
