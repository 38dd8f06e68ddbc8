#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The module cache and per-connection session handler for the rsync
//! daemon protocol: everything above the wire codec in `protocol` and
//! below the process entry point.
//!
//! # Design
//!
//! [`repository::Repository`]/[`repository::Node`] abstract over where
//! file bytes come from; [`module::MemoryCachedModule`] walks one into a
//! fully materialized [`flist::RsyncFile`] tree and publishes two
//! precomputed listing maps (recursive and non-recursive, keyed by path)
//! behind an atomic pointer swap, so a lookup never touches the filesystem
//! or the CPU. [`session::SessionHandler`] drives one
//! [`protocol::codec::SessionCodec`] end to end over one connection,
//! translating wire messages into [`module::Module`] calls and back.
//! [`config::parse_config`] reads the on-disk module table the daemon is
//! configured with, once, at startup.
//!
//! # Errors
//!
//! [`error::ModuleError`] covers cache construction and lookup failures;
//! [`error::ConfigError`] covers malformed configuration text.
//!
//! # Examples
//!
//! ```
//! use daemon::config::parse_config;
//!
//! let modules = parse_config("[archive]\npath = /srv/archive\n").unwrap();
//! assert_eq!(modules[0].name, "archive");
//! ```
//!
//! # See also
//!
//! [`checksums::Md5`] and [`compress::zlib`] for the digest and
//! compression a snapshot's [`flist::RsyncFile`] entries are built with.

pub mod config;
pub mod error;
pub mod module;
pub mod repository;
pub mod session;

pub use error::{ConfigError, ModuleError};
pub use module::{MemoryCachedModule, Module};
pub use repository::{FsRepository, Node, Repository};
pub use session::SessionHandler;
