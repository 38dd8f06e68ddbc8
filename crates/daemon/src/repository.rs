//! The filesystem-facing side of a module: a tree the cache can walk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A single node in a repository's tree, as seen by [`crate::module::MemoryCachedModule`].
///
/// `Node` is deliberately narrow: it exposes only what
/// [`crate::module::materialize`] needs to build an [`flist::RsyncFile`]
/// tree, not a general filesystem abstraction.
pub trait Node {
    /// The node's own name (not a full path).
    fn name(&self) -> &str;
    /// Whether this node is a directory.
    fn is_directory(&self) -> bool;
    /// Raw contents; `None` for directories, `Some` (possibly empty) for files.
    fn contents(&self) -> Option<&[u8]>;
    /// Seconds since the Unix epoch.
    fn last_modified_time(&self) -> u64;
    /// Direct children, in a stable, deterministic order.
    fn children(&self) -> &[Box<dyn Node>];
}

/// The backing store a module serves. `MemoryCachedModule` consumes this at
/// construction and on every rescan, and never touches the filesystem (or
/// whatever a non-`Fs` implementation backs onto) directly.
pub trait Repository {
    /// Returns the root node of the tree as it currently stands.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store could not be read.
    fn repository_root(&self) -> io::Result<Box<dyn Node>>;

    /// Refreshes whatever cache backs [`Repository::repository_root`].
    ///
    /// The default implementation does nothing, for backing stores with no
    /// notion of staleness. [`FsRepository`] overrides it to re-walk disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails.
    fn rescan(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A materialized node read from a real directory on disk.
#[derive(Debug)]
pub struct FsNode {
    name: String,
    is_directory: bool,
    contents: Option<Vec<u8>>,
    last_modified_time: u64,
    children: Vec<Box<dyn Node>>,
}

impl Node for FsNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_directory(&self) -> bool {
        self.is_directory
    }

    fn contents(&self) -> Option<&[u8]> {
        self.contents.as_deref()
    }

    fn last_modified_time(&self) -> u64 {
        self.last_modified_time
    }

    fn children(&self) -> &[Box<dyn Node>] {
        &self.children
    }
}

impl Clone for Box<dyn Node> {
    fn clone(&self) -> Self {
        Box::new(FsNode {
            name: self.name().to_string(),
            is_directory: self.is_directory(),
            contents: self.contents().map(<[u8]>::to_vec),
            last_modified_time: self.last_modified_time(),
            children: self.children().to_vec(),
        })
    }
}

/// The simplest [`Repository`] that is correct: a real directory on disk,
/// walked into an in-memory tree on construction and on every [`FsRepository::rescan`].
///
/// Between rescans, `repository_root` serves the tree captured at the last
/// scan; it never re-reads the filesystem on its own.
pub struct FsRepository {
    root_path: PathBuf,
    root_name: String,
    cached: Box<dyn Node>,
}

impl FsRepository {
    /// Walks `root_path` once and caches the result. `root_name` is the name
    /// reported for the top-level node (the module name, by convention).
    ///
    /// # Errors
    ///
    /// Returns an error if `root_path` cannot be walked.
    pub fn new(root_path: impl AsRef<Path>, root_name: impl Into<String>) -> io::Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        let root_name = root_name.into();
        let cached = walk(&root_path, &root_name)?;
        Ok(Self {
            root_path,
            root_name,
            cached,
        })
    }

    /// Re-walks the directory and replaces the cached tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be walked.
    pub fn rescan(&mut self) -> io::Result<()> {
        self.cached = walk(&self.root_path, &self.root_name)?;
        Ok(())
    }
}

impl Repository for FsRepository {
    fn repository_root(&self) -> io::Result<Box<dyn Node>> {
        Ok(self.cached.clone())
    }

    fn rescan(&mut self) -> io::Result<()> {
        Self::rescan(self)
    }
}

fn walk(path: &Path, name: &str) -> io::Result<Box<dyn Node>> {
    let metadata = fs::metadata(path)?;
    let last_modified_time = modified_unix_seconds(&metadata)?;

    if metadata.is_dir() {
        let mut entries: Vec<_> = fs::read_dir(path)?.collect::<Result<_, _>>()?;
        entries.sort_by_key(std::fs::DirEntry::file_name);

        let mut children = Vec::with_capacity(entries.len());
        for entry in entries {
            let child_name = entry.file_name().to_string_lossy().into_owned();
            children.push(walk(&entry.path(), &child_name)?);
        }

        Ok(Box::new(FsNode {
            name: name.to_string(),
            is_directory: true,
            contents: None,
            last_modified_time,
            children,
        }))
    } else {
        let contents = fs::read(path)?;
        Ok(Box::new(FsNode {
            name: name.to_string(),
            is_directory: false,
            contents: Some(contents),
            last_modified_time,
            children: Vec::new(),
        }))
    }
}

fn modified_unix_seconds(metadata: &fs::Metadata) -> io::Result<u64> {
    let modified = metadata.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0))
}
