#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The MD5 strong checksum used to validate a module snapshot's stored file
//! contents.
//!
//! # Design
//!
//! Snapshot construction is the only caller: every [`Md5`] instance is
//! created, fed a whole file's contents once, and finalised — never reused
//! across files. The API stays streaming-shaped anyway so callers can feed
//! large files in chunks without buffering them twice.
//!
//! # Invariants
//!
//! - [`Md5::digest`] and the streaming `new`/`update`/`finalize` sequence
//!   agree on every input, including the empty slice.
//!
//! # Examples
//!
//! ```
//! use checksums::Md5;
//!
//! let mut hasher = Md5::new();
//! hasher.update(b"hello");
//! let digest = hasher.finalize();
//! assert_eq!(digest, Md5::digest(b"hello"));
//! ```

mod md5;

pub use md5::Md5;
