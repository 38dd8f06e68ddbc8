//! Error types for the module cache and its configuration.

use thiserror::Error;

/// Failure modes of [`crate::module::MemoryCachedModule`].
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The requested root was outside the module's namespace, or the
    /// snapshot has no listing for it.
    #[error("no such path: {0}")]
    NoSuchPath(String),

    /// The backing repository could not be walked or a file's contents
    /// could not be read while building a snapshot.
    #[error("repository scan failed: {0}")]
    Scan(#[source] std::io::Error),

    /// Compressing a file's contents at snapshot-build time failed.
    #[error("content compression failed: {0}")]
    Compression(#[source] std::io::Error),
}

/// Failure modes of [`crate::config::parse_config`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A `key = value` line appeared before any `[module]` header.
    #[error("line {line}: setting outside of any module section")]
    SettingOutsideSection {
        /// 1-based line number.
        line: usize,
    },

    /// A line was neither a section header, a setting, a comment, nor
    /// blank.
    #[error("line {line}: malformed configuration line: {text:?}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// The offending line, verbatim.
        text: String,
    },

    /// A module section had no `path` setting.
    #[error("module {name:?} has no path setting")]
    MissingPath {
        /// The module's `[name]`.
        name: String,
    },

    /// The same module name appeared in more than one section.
    #[error("duplicate module section {name:?}")]
    DuplicateModule {
        /// The repeated module name.
        name: String,
    },
}
