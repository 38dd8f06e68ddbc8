use std::sync::Arc;

use crate::RsyncFile;

/// An immutable listing rooted at a path.
///
/// `root` is the parent directory of the requested entry; `entries` is the
/// flattened sequence visible from that root, root node included.
#[derive(Debug, Clone)]
pub struct FileList {
    /// The root path this listing was built for.
    pub root: String,
    /// The flattened, never-resorted sequence of visible entries.
    pub entries: Vec<Arc<RsyncFile>>,
}

/// Builds [`FileList`]s from a materialized [`RsyncFile`] tree.
pub struct FileListBuilder;

impl FileListBuilder {
    /// Builds the listing rooted at `root`/`node`.
    ///
    /// `recursive` selects between a depth-first walk of every descendant
    /// and a shallow listing of the root plus its direct children.
    #[must_use]
    pub fn build(root: &str, node: &Arc<RsyncFile>, recursive: bool) -> FileList {
        let mut entries = vec![Arc::clone(node)];
        if recursive {
            Self::collect_descendants(node, &mut entries);
        } else if node.is_directory {
            entries.extend(node.children.iter().cloned());
        }
        FileList {
            root: root.to_string(),
            entries,
        }
    }

    fn collect_descendants(node: &Arc<RsyncFile>, out: &mut Vec<Arc<RsyncFile>>) {
        for child in &node.children {
            out.push(Arc::clone(child));
            if child.is_directory {
                Self::collect_descendants(child, out);
            }
        }
    }
}
