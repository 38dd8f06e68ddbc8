#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Raw deflate helpers matching rsync's sync-flush wire format, used to
//! precompute the compressed content blocks a module snapshot stores
//! alongside each file.
//!
//! # Design
//!
//! [`zlib::compress_sync_flushed`] produces a raw DEFLATE stream (no zlib
//! header, no Adler-32 trailer) flushed with `Z_SYNC_FLUSH` and then strips
//! the resulting 4-byte sync marker (`00 00 FF FF`), matching what upstream
//! rsync transmits on the wire. [`zlib::decompress_sync_flushed`] is its
//! exact inverse: it re-appends the marker before inflating, which is what
//! lets a stored block be validated against the original content at
//! snapshot-build time.
//!
//! # Invariants
//!
//! - `decompress_sync_flushed(compress_sync_flushed(data)?)? == data` for
//!   every byte slice, including the empty slice.
//!
//! # Errors
//!
//! Both functions return [`std::io::Error`]; the underlying deflate
//! implementation never fails on well-formed input, so in practice these
//! surface only if a corrupted block is fed to decompression.
//!
//! # Examples
//!
//! ```
//! use compress::zlib::{compress_sync_flushed, decompress_sync_flushed, CompressionLevel};
//!
//! let block = compress_sync_flushed(b"file contents", CompressionLevel::Default).unwrap();
//! assert_eq!(decompress_sync_flushed(&block).unwrap(), b"file contents");
//! ```

pub mod zlib;
