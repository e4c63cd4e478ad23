//! Stash-then-rewrite, and restoring a stashed original.
//!
//! Restoring always either fully succeeds or fully refuses — see
//! [`RestoreError::Unmergeable`]. No attempt is made to merge a
//! rewritten file's hand-edits back into the restored original; if the
//! set of failpoint names actually evaluated in the rewritten file
//! doesn't match what the stashed original would regenerate, that is
//! treated as ambiguous and rejected rather than guessed at.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use syn::visit::{self, Visit};
use syn::{Expr, ExprCall};
use walkdir::WalkDir;

use crate::error::RestoreError;

const STASH_SUFFIX: &str = "__failpoint_stash__";

pub(crate) fn stash_path(original: &Path) -> PathBuf {
    let mut name = original.as_os_str().to_os_string();
    name.push(OsString::from(STASH_SUFFIX));
    PathBuf::from(name)
}

fn original_path(stash: &Path) -> Option<PathBuf> {
    let s = stash.as_os_str().to_str()?;
    s.strip_suffix(STASH_SUFFIX).map(PathBuf::from)
}

/// Writes `original` to a stash file beside `path`, then writes
/// `rewritten` to `path` itself.
pub(crate) fn stash_and_write(path: &Path, original: &str, rewritten: &str) -> std::io::Result<()> {
    std::fs::write(stash_path(path), original)?;
    std::fs::write(path, rewritten)
}

fn ident_text(ident: &syn::Ident) -> String {
    let s = ident.to_string();
    s.strip_prefix("r#").unwrap_or(&s).to_string()
}

#[derive(Default)]
struct MarkerNames {
    names: HashSet<String>,
}

impl<'ast> Visit<'ast> for MarkerNames {
    fn visit_expr_call(&mut self, call: &'ast ExprCall) {
        if let Expr::Path(p) = &*call.func {
            if let Some(seg) = p.path.segments.last() {
                let id = ident_text(&seg.ident);
                if matches!(id.as_str(), "Inject" | "InjectContext" | "InjectCall") {
                    if let Some(Expr::Lit(lit)) = call.args.first() {
                        if let syn::Lit::Str(s) = &lit.lit {
                            self.names.insert(s.value());
                        }
                    }
                }
            }
        }
        visit::visit_expr_call(self, call);
    }
}

#[derive(Default)]
struct CurpkgNames {
    names: HashSet<String>,
}

impl<'ast> Visit<'ast> for CurpkgNames {
    fn visit_expr_call(&mut self, call: &'ast ExprCall) {
        if let Expr::Path(p) = &*call.func {
            if let Some(seg) = p.path.segments.last() {
                if ident_text(&seg.ident) == "_curpkg_" {
                    if let Some(Expr::Lit(lit)) = call.args.first() {
                        if let syn::Lit::Str(s) = &lit.lit {
                            self.names.insert(s.value());
                        }
                    }
                }
            }
        }
        visit::visit_expr_call(self, call);
    }
}

fn marker_names_in(source: &str) -> HashSet<String> {
    let Ok(file) = syn::parse_file(source) else {
        return HashSet::new();
    };
    let mut collector = MarkerNames::default();
    collector.visit_file(&file);
    collector.names
}

fn curpkg_names_in(source: &str) -> HashSet<String> {
    let Ok(file) = syn::parse_file(source) else {
        return HashSet::new();
    };
    let mut collector = CurpkgNames::default();
    collector.visit_file(&file);
    collector.names
}

/// Restores every `*__failpoint_stash__` file found under `root`,
/// refusing (per-file) any pair whose failpoint name sets disagree.
pub fn restore_dir(root: &Path) -> Result<Vec<PathBuf>, RestoreError> {
    let mut restored = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let stash = entry.path();
        if !stash.file_name().is_some_and(|n| n.to_string_lossy().ends_with(STASH_SUFFIX)) {
            continue;
        }
        let Some(original) = original_path(stash) else {
            continue;
        };
        restore_one(stash, &original)?;
        restored.push(original);
    }
    Ok(restored)
}

fn restore_one(stash: &Path, original: &Path) -> Result<(), RestoreError> {
    let stash_src = std::fs::read_to_string(stash).map_err(|source| RestoreError::Io {
        path: stash.to_path_buf(),
        source,
    })?;
    if original.exists() {
        let rewritten_src = std::fs::read_to_string(original).map_err(|source| RestoreError::Io {
            path: original.to_path_buf(),
            source,
        })?;
        let expected = marker_names_in(&stash_src);
        let actual = curpkg_names_in(&rewritten_src);
        if let Some(name) = actual.symmetric_difference(&expected).next() {
            return Err(RestoreError::Unmergeable {
                file: original.to_path_buf(),
                name: name.clone(),
            });
        }
    }
    std::fs::rename(stash, original).map_err(|source| RestoreError::Io {
        path: original.to_path_buf(),
        source,
    })
}
