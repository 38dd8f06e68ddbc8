#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Immutable file-list trees and the builder that flattens them into the
//! recursive and non-recursive listings a module snapshot serves.
//!
//! # Design
//!
//! [`RsyncFile`] is a fully materialized node — contents, compressed
//! contents and checksum are already computed by the time one exists, so
//! serving a listing never touches the CPU. A tree's interior nodes are
//! shared via [`std::sync::Arc`] so the same subtree can appear, without
//! copying, in both the recursive and non-recursive listing rooted at any
//! of its ancestors, and so a published snapshot can be read concurrently
//! from every connection's thread. [`FileListBuilder::build`] is the one
//! place that walks a tree into a flat [`FileList`].
//!
//! # Invariants
//!
//! - Recursive builds enumerate descendants depth-first in the order the
//!   source tree presents them; they are never re-sorted.
//! - Non-recursive builds contain exactly the root plus its direct
//!   children.
//!
//! # Examples
//!
//! ```
//! use flist::{FileListBuilder, RsyncFile};
//! use std::sync::Arc;
//!
//! let leaf = Arc::new(RsyncFile::file("mod/a.txt", b"hi".to_vec(), 0));
//! let root = Arc::new(RsyncFile::directory("mod", vec![Arc::clone(&leaf)]));
//!
//! let list = FileListBuilder::build("mod", &root, true);
//! assert_eq!(list.entries.len(), 2);
//! ```

mod file;
mod list;

pub use file::RsyncFile;
pub use list::{FileList, FileListBuilder};
