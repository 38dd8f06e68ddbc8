use std::sync::Arc;

/// A fully materialized file or directory node.
///
/// Every field that depends on file contents is computed once, at
/// snapshot-build time, by the caller that assembles the tree (the `daemon`
/// crate, using `checksums` and `compress`) — this type never computes
/// anything itself.
#[derive(Debug, Clone)]
pub struct RsyncFile {
    /// Path relative to the module root, `/`-separated.
    pub name: String,
    /// Size in bytes; `0` for directories.
    pub size: u64,
    /// Raw contents; `None` for directories.
    pub contents: Option<Vec<u8>>,
    /// Sync-flushed raw-deflate contents; `None` for directories. Paired
    /// with `checksums::Md5`/`compress::zlib` at snapshot-build time.
    pub compressed_contents: Option<Vec<u8>>,
    /// 16-byte MD5 of `contents`; `None` for directories.
    pub checksum: Option<[u8; 16]>,
    /// Seconds since the Unix epoch.
    pub last_modified_time: u64,
    /// Whether this node is a directory.
    pub is_directory: bool,
    /// Direct children, in the order the source repository produced them.
    /// Always empty for non-directories.
    pub children: Vec<Arc<RsyncFile>>,
}

impl RsyncFile {
    /// Builds a fully-specified file node.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        size: u64,
        contents: Option<Vec<u8>>,
        compressed_contents: Option<Vec<u8>>,
        checksum: Option<[u8; 16]>,
        last_modified_time: u64,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            contents,
            compressed_contents,
            checksum,
            last_modified_time,
            is_directory: false,
            children: Vec::new(),
        }
    }

    /// Convenience constructor for a leaf file, useful in tests where the
    /// precomputed checksum/compressed form are not under test.
    #[must_use]
    pub fn file(name: impl Into<String>, contents: Vec<u8>, last_modified_time: u64) -> Self {
        let size = contents.len() as u64;
        Self {
            name: name.into(),
            size,
            contents: Some(contents),
            compressed_contents: None,
            checksum: None,
            last_modified_time,
            is_directory: false,
            children: Vec::new(),
        }
    }

    /// Convenience constructor for a directory node.
    #[must_use]
    pub fn directory(name: impl Into<String>, children: Vec<Arc<RsyncFile>>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            contents: None,
            compressed_contents: None,
            checksum: None,
            last_modified_time: 0,
            is_directory: true,
            children,
        }
    }
}
