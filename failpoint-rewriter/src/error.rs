//! Errors from rewriting and restoring source files.

use std::path::PathBuf;
use thiserror::Error;

/// Something went wrong turning marker calls into real evaluation code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RewriteError {
    /// Could not read the source file.
    #[error("reading {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid Rust.
    #[error("parsing {path}: {source}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: syn::Error,
    },

    /// A marker call was used in a way its contract forbids — wrong
    /// arity, wrong closure shape, `Continue` targeting a non-loop
    /// label, and so on.
    #[error("{path}: {message}")]
    InvalidMarker {
        /// The file containing the offending call.
        path: PathBuf,
        /// A human-readable description of the violation.
        message: String,
    },
}

/// Something went wrong putting stashed originals back.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RestoreError {
    /// Could not read or write a file during restoration.
    #[error("{path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A stashed file's rewritten sibling contains an evaluated
    /// failpoint name with no corresponding marker call in the
    /// stashed original — restoring would silently drop whatever
    /// hand-edits were made to the rewritten copy. Per this project's
    /// policy, this is always a hard error rather than a best-effort
    /// merge.
    #[error("{file}: rewritten copy and stashed original disagree on failpoint `{name}`; refusing to merge")]
    Unmergeable {
        /// The file whose stash/rewrite pair could not be reconciled.
        file: PathBuf,
        /// The failpoint name responsible for the conflict.
        name: String,
    },
}
