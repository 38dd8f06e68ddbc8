//! The in-memory, pre-materialized listing a session serves requests from.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use checksums::Md5;
use compress::zlib::{self, CompressionLevel};
use flist::{FileList, FileListBuilder, RsyncFile};

use crate::error::ModuleError;
use crate::repository::{Node, Repository};

/// The read side of a module: everything a [`crate::session::SessionHandler`]
/// needs to answer a file-list request.
pub trait Module: Send + Sync {
    /// The module's logical name, as clients request it.
    fn get_name(&self) -> &str;

    /// An optional free-text description.
    fn get_description(&self) -> Option<&str>;

    /// Returns the listing rooted at `root_path`.
    ///
    /// `root_path` is either the bare module name or the module name plus a
    /// `/`-separated subpath within it; both forms are rewritten to the
    /// canonical `name/` key the snapshot was indexed under.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NoSuchPath`] if `root_path` has no entry in
    /// the current snapshot.
    fn get_file_list(&self, root_path: &str, recursive: bool) -> Result<FileList, ModuleError>;
}

/// A [`Module`] backed by a [`Repository`], with every listing precomputed
/// and published behind an atomic pointer swap.
///
/// # Design
///
/// [`repository_updated`](Self::repository_updated) builds two parallel
/// maps — recursive and non-recursive listings, keyed by path — and
/// installs both behind one [`ArcSwap`] so a lookup in progress on one
/// connection's thread never observes a half-updated snapshot while a
/// rescan is publishing a new one.
pub struct MemoryCachedModule<R> {
    name: String,
    description: Option<String>,
    repository: Mutex<R>,
    compression_level: CompressionLevel,
    snapshot: ArcSwap<Snapshot>,
}

struct Snapshot {
    recursive_lists: HashMap<String, FileList>,
    non_recursive_lists: HashMap<String, FileList>,
}

impl<R: Repository> MemoryCachedModule<R> {
    /// Builds a module by walking `repository` once via
    /// [`Repository::repository_root`].
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] if the repository cannot be walked or a
    /// file's contents cannot be compressed.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        repository: R,
        compression_level: CompressionLevel,
    ) -> Result<Self, ModuleError> {
        let name = name.into();
        let root = repository
            .repository_root()
            .map_err(ModuleError::Scan)?;
        let materialized = materialize(&name, root.as_ref(), compression_level)?;
        let snapshot = build_snapshot(&name, &materialized);

        Ok(Self {
            name,
            description,
            repository: Mutex::new(repository),
            compression_level,
            snapshot: ArcSwap::new(Arc::new(snapshot)),
        })
    }

    /// Re-walks the backing repository and atomically republishes both maps.
    ///
    /// Readers in flight continue to see the snapshot that was current when
    /// their lookup began; this never blocks a concurrent
    /// [`Module::get_file_list`] call. The repository itself is locked only
    /// for the duration of the walk, never while the snapshot is being read.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] if the repository cannot be walked or a
    /// file's contents cannot be compressed.
    pub fn repository_updated(&self) -> Result<(), ModuleError> {
        let root = {
            let mut repository = self.repository.lock().expect("repository mutex poisoned");
            repository.rescan().map_err(ModuleError::Scan)?;
            repository.repository_root().map_err(ModuleError::Scan)?
        };
        let materialized = materialize(&self.name, root.as_ref(), self.compression_level)?;
        let snapshot = build_snapshot(&self.name, &materialized);
        self.snapshot.store(Arc::new(snapshot));
        Ok(())
    }
}

impl<R: Repository> Module for MemoryCachedModule<R> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn get_file_list(&self, root_path: &str, recursive: bool) -> Result<FileList, ModuleError> {
        let key = canonical_key(&self.name, root_path);
        let snapshot = self.snapshot.load();
        let map = if recursive {
            &snapshot.recursive_lists
        } else {
            &snapshot.non_recursive_lists
        };
        map.get(&key)
            .cloned()
            .ok_or_else(|| ModuleError::NoSuchPath(root_path.to_string()))
    }
}

/// Rewrites a client-supplied root path to the key it was indexed under:
/// the bare module name is rewritten to `name + "/"`; any other path must
/// already be module-prefixed.
fn canonical_key(module_name: &str, root_path: &str) -> String {
    if root_path == module_name {
        format!("{module_name}/")
    } else {
        root_path.to_string()
    }
}

/// Builds both the recursive and non-recursive listing maps for every
/// directory in `root`, following the population rule: each node keyed by
/// its own name, and every directory additionally keyed by `name + "/"`.
fn build_snapshot(module_name: &str, root: &Arc<RsyncFile>) -> Snapshot {
    let mut recursive_lists = HashMap::new();
    let mut non_recursive_lists = HashMap::new();
    populate(module_name, root, &mut recursive_lists, &mut non_recursive_lists);
    Snapshot {
        recursive_lists,
        non_recursive_lists,
    }
}

fn populate(
    root_for_listing: &str,
    node: &Arc<RsyncFile>,
    recursive_lists: &mut HashMap<String, FileList>,
    non_recursive_lists: &mut HashMap<String, FileList>,
) {
    recursive_lists.insert(
        node.name.clone(),
        FileListBuilder::build(root_for_listing, node, true),
    );
    non_recursive_lists.insert(
        node.name.clone(),
        FileListBuilder::build(root_for_listing, node, false),
    );

    if node.is_directory {
        let slash_key = format!("{}/", node.name);
        recursive_lists.insert(
            slash_key.clone(),
            FileListBuilder::build(&node.name, node, true),
        );
        non_recursive_lists.insert(slash_key, FileListBuilder::build(&node.name, node, false));

        for child in &node.children {
            populate(&node.name, child, recursive_lists, non_recursive_lists);
        }
    }
}

/// Walks a [`Node`] tree into an [`RsyncFile`] tree, computing each leaf's
/// checksum and sync-flushed compressed form.
fn materialize(
    path: &str,
    node: &dyn Node,
    compression_level: CompressionLevel,
) -> Result<Arc<RsyncFile>, ModuleError> {
    if node.is_directory() {
        let mut children = Vec::with_capacity(node.children().len());
        for child in node.children() {
            let child_path = format!("{path}/{}", child.name());
            children.push(materialize(&child_path, child.as_ref(), compression_level)?);
        }
        Ok(Arc::new(RsyncFile::directory(path, children)))
    } else {
        let contents = node.contents().unwrap_or(&[]).to_vec();
        let checksum = Md5::digest(&contents);
        let compressed_contents = zlib::compress_sync_flushed(&contents, compression_level)
            .map_err(ModuleError::Compression)?;
        Ok(Arc::new(RsyncFile::new(
            path,
            contents.len() as u64,
            Some(contents),
            Some(compressed_contents),
            Some(checksum),
            node.last_modified_time(),
        )))
    }
}

/// The set of modules a running daemon serves, keyed by logical name.
///
/// Built once from parsed configuration at startup and shared, read-only,
/// across every connection's thread.
#[derive(Default)]
pub struct ModuleTable {
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ModuleTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Registers a module, replacing any previous entry under the same name.
    pub fn insert(&mut self, module: Arc<dyn Module>) {
        self.modules.insert(module.get_name().to_string(), module);
    }

    /// Looks a module up by the name a client requested.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::FsRepository;
    use std::fs;

    fn sample_repository() -> (tempfile::TempDir, FsRepository) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"aaa").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"bbb").unwrap();
        let repo = FsRepository::new(dir.path(), "mod").unwrap();
        (dir, repo)
    }

    #[test]
    fn materializes_checksums_and_compressed_contents() {
        let (_dir, repo) = sample_repository();
        let module =
            MemoryCachedModule::new("mod", None, repo, CompressionLevel::Default).unwrap();

        let list = module.get_file_list("mod", true).unwrap();
        let a = list.entries.iter().find(|f| f.name == "mod/a.txt").unwrap();
        assert_eq!(a.checksum, Some(Md5::digest(b"aaa")));
        assert!(a.compressed_contents.is_some());
    }

    #[test]
    fn bare_module_name_is_rewritten_to_the_trailing_slash_key() {
        let (_dir, repo) = sample_repository();
        let module =
            MemoryCachedModule::new("mod", None, repo, CompressionLevel::Default).unwrap();

        let bare = module.get_file_list("mod", false).unwrap();
        let slashed = module.get_file_list("mod/", false).unwrap();
        assert_eq!(bare.entries.len(), slashed.entries.len());
    }

    #[test]
    fn subdirectory_lookup_returns_its_own_subtree() {
        let (_dir, repo) = sample_repository();
        let module =
            MemoryCachedModule::new("mod", None, repo, CompressionLevel::Default).unwrap();

        let list = module.get_file_list("mod/sub", true).unwrap();
        let names: Vec<&str> = list.entries.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["mod/sub", "mod/sub/b.txt"]);
    }

    #[test]
    fn unknown_path_is_no_such_path() {
        let (_dir, repo) = sample_repository();
        let module =
            MemoryCachedModule::new("mod", None, repo, CompressionLevel::Default).unwrap();

        let err = module.get_file_list("mod/missing", true).unwrap_err();
        assert!(matches!(err, ModuleError::NoSuchPath(p) if p == "mod/missing"));
    }

    #[test]
    fn repository_updated_republishes_new_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"aaa").unwrap();
        let repo = FsRepository::new(dir.path(), "mod").unwrap();
        let module =
            MemoryCachedModule::new("mod", None, repo, CompressionLevel::Default).unwrap();
        assert_eq!(module.get_file_list("mod", true).unwrap().entries.len(), 2);

        fs::write(dir.path().join("b.txt"), b"bbb").unwrap();
        module.repository_updated().unwrap();
        assert_eq!(module.get_file_list("mod", true).unwrap().entries.len(), 3);
    }

    #[test]
    fn module_table_looks_up_by_name() {
        let (_dir, repo) = sample_repository();
        let module: Arc<dyn Module> = Arc::new(
            MemoryCachedModule::new("mod", None, repo, CompressionLevel::Default).unwrap(),
        );
        let mut table = ModuleTable::new();
        table.insert(module);

        assert!(table.get("mod").is_some());
        assert!(table.get("other").is_none());
    }
}
