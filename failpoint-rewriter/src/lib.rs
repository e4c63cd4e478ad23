//! # failpoint-rewriter
//!
//! The offline counterpart to the `failpoint` crate's no-op marker functions:
//! walks a crate's source tree, finds marker calls, and rewrites each
//! one into real evaluation logic. Run before `cargo build` (by hand,
//! from `failpoint-ctl`, or from a CI step) — never at compile time
//! itself, since this operates on whole files rather than a single
//! macro-invocation site.
//!
//! ## Pipeline
//!
//! 1. [`imports`] resolves, per file, which local identifiers refer to
//!    the marker functions.
//! 2. [`walker`] descends every statement/expression container and
//!    rewrites marker calls in place.
//! 3. [`labels`] and [`rewriters`] implement the individual
//!    transforms the walker dispatches to.
//! 4. [`stash`] preserves the pre-rewrite source beside the rewritten
//!    file, so [`restore_dir`] can put it back.
//! 5. [`binding`] emits the `_curpkg_` helper each rewritten call site
//!    references.

#![deny(missing_docs)]

mod binding;
pub mod error;
mod imports;
mod labels;
mod rewriters;
mod stash;
mod walker;

use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

pub use error::{RestoreError, RewriteError};

/// Rewrites every `.rs` file under `crate_root` (a directory containing
/// a `Cargo.toml`) that imports `failpoint`'s markers, then emits the
/// `_curpkg_` binding helper. Returns the paths actually rewritten.
///
/// Every candidate file is parsed and rewritten in memory first; only
/// once every file in the tree has rewritten without error does this
/// commit any of it to disk (stash + overwrite, then the binding
/// file). A parse or rewrite failure partway through the tree leaves
/// every file exactly as it was found, per §7's "no file mutation
/// unless *all* files rewrote successfully".
pub fn enable_dir(crate_root: &Path) -> Result<Vec<PathBuf>, RewriteError> {
    let mut pending = Vec::new();
    for entry in WalkDir::new(crate_root).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()) == Some(binding::BINDING_FILE_NAME) {
            continue;
        }
        if let Some(rewrite) = compute_rewrite(path)? {
            pending.push((path.to_path_buf(), rewrite));
        }
    }

    for (path, rewrite) in &pending {
        stash::stash_and_write(path, &rewrite.original, &rewrite.rewritten).map_err(|source| {
            RewriteError::Io {
                path: path.clone(),
                source,
            }
        })?;
        info!(file = %path.display(), "rewrote failpoint markers");
    }

    let rewritten: Vec<PathBuf> = pending.into_iter().map(|(path, _)| path).collect();
    if !rewritten.is_empty() {
        binding::write_binding(crate_root).map_err(|source| RewriteError::Io {
            path: crate_root.join("src").join(binding::BINDING_FILE_NAME),
            source,
        })?;
        info!(count = rewritten.len(), "rewrote failpoint markers");
    }
    Ok(rewritten)
}

/// The in-memory result of rewriting one file: its original source
/// (for the stash) and the rewritten source to write in its place.
struct PendingRewrite {
    original: String,
    rewritten: String,
}

/// Parses `path` and runs the marker rewrite over it without touching
/// disk. Returns `None` if the file has no marker calls to rewrite.
fn compute_rewrite(path: &Path) -> Result<Option<PendingRewrite>, RewriteError> {
    let source = std::fs::read_to_string(path).map_err(|source| RewriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut file = syn::parse_file(&source).map_err(|source| RewriteError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let imports = imports::ImportMap::build(&file);
    let mut walker = walker::Walker::new(&imports, path);
    walker.walk_items(&mut file.items)?;

    if !walker.changed {
        return Ok(None);
    }

    let rewritten = prettyplease::unparse(&file);
    Ok(Some(PendingRewrite {
        original: source,
        rewritten,
    }))
}

/// Rewrites a single file in place if it imports any marker, stashing
/// the original beside it. Returns whether a rewrite happened.
pub fn rewrite_file(path: &Path) -> Result<bool, RewriteError> {
    let Some(rewrite) = compute_rewrite(path)? else {
        return Ok(false);
    };
    stash::stash_and_write(path, &rewrite.original, &rewrite.rewritten).map_err(|source| {
        RewriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(file = %path.display(), "rewrote failpoint markers");
    Ok(true)
}

/// Restores every file stashed by a previous [`enable_dir`]/
/// [`rewrite_file`] run found under `root`.
pub fn restore_dir(root: &Path) -> Result<Vec<PathBuf>, RestoreError> {
    stash::restore_dir(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn untouched_file_without_import_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "plain.rs", "fn f() { let x = 1; }\n");
        assert!(!rewrite_file(&path).unwrap());
        assert!(!stash::stash_path(&path).exists());
    }

    #[test]
    fn enable_dir_mutates_nothing_if_any_file_fails_to_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();

        let good_src = "use failpoint::Inject;\n\nfn good() {\n    Inject(\"demo/good\", |_| {});\n}\n";
        let good_path = write_tmp(&dir, "src/good.rs", good_src);

        // Wrong arity: `Inject` takes exactly 2 arguments.
        let bad_src = "use failpoint::Inject;\n\nfn bad() {\n    Inject(\"demo/bad\");\n}\n";
        let bad_path = write_tmp(&dir, "src/bad.rs", bad_src);

        assert!(enable_dir(dir.path()).is_err());

        assert_eq!(std::fs::read_to_string(&good_path).unwrap(), good_src);
        assert_eq!(std::fs::read_to_string(&bad_path).unwrap(), bad_src);
        assert!(!stash::stash_path(&good_path).exists());
        assert!(!stash::stash_path(&bad_path).exists());
        assert!(!dir.path().join("src").join(binding::BINDING_FILE_NAME).exists());
    }

    #[test]
    fn rewrites_inject_and_stashes_original() {
        let dir = tempfile::tempdir().unwrap();
        let src = r#"
use failpoint::Inject;

fn f() {
    Inject("demo/point", |val| {
        println!("{:?}", val);
    });
}
"#;
        let path = write_tmp(&dir, "lib.rs", src);
        assert!(rewrite_file(&path).unwrap());
        assert!(stash::stash_path(&path).exists());

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("failpoint::eval"));
        assert!(rewritten.contains("_curpkg_"));
        assert!(!rewritten.contains("Inject(\"demo/point\""));

        let original = std::fs::read_to_string(stash::stash_path(&path)).unwrap();
        assert_eq!(original, src);
    }

    #[test]
    fn enable_dir_emits_the_binding_file_once_per_crate() {
        let dir = tempfile::tempdir().unwrap();
        let src_dir = dir.path().join("src");
        std::fs::create_dir_all(&src_dir).unwrap();
        write_tmp(
            &dir,
            "src/lib.rs",
            "use failpoint::Inject;\n\nfn f() {\n    Inject(\"demo/point\", |_| {});\n}\n",
        );

        let rewritten = enable_dir(dir.path()).unwrap();
        assert_eq!(rewritten.len(), 1);

        let binding_path = src_dir.join(binding::BINDING_FILE_NAME);
        assert!(binding_path.exists());
        let binding_src = std::fs::read_to_string(&binding_path).unwrap();
        assert!(binding_src.contains("_curpkg_"));
        assert!(binding_src.contains("CARGO_PKG_NAME"));
    }

    #[test]
    fn rewrites_label_break_continue_goto_fallthrough() {
        let dir = tempfile::tempdir().unwrap();
        let src = r#"
use failpoint::{Label, Goto, Fallthrough};

fn f() {
    Label("retry");
    for i in 0..10 {
        if i == 3 {
            failpoint::r#break("retry");
        }
        if i == 5 {
            failpoint::r#continue("retry");
        }
        if i == 7 {
            Goto("retry");
        }
        Fallthrough();
    }
}
"#;
        let path = write_tmp(&dir, "lib.rs", src);
        assert!(rewrite_file(&path).unwrap());
        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("'retry_FP"));
        assert!(rewritten.contains("break 'retry_FP"));
        assert!(rewritten.contains("continue 'retry_FP"));
        assert!(!rewritten.contains("Fallthrough"));
    }

    #[test]
    fn restore_round_trips_an_unmodified_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let src = r#"
use failpoint::Inject;

fn f() {
    Inject("demo/point", |_| {});
}
"#;
        let path = write_tmp(&dir, "lib.rs", src);
        rewrite_file(&path).unwrap();
        let restored = restore_dir(dir.path()).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), src);
        assert!(!stash::stash_path(&path).exists());
    }
}
