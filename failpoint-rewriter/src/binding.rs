//! Emits the per-crate `_curpkg_` helper that fully-qualifies a local
//! failpoint name. The upstream implementation reflects the current
//! package at runtime; Cargo already makes the crate name a compile-time
//! constant, so the Rust binding resolves it with `env!` instead.

use std::path::Path;

pub(crate) const BINDING_FILE_NAME: &str = "binding__failpoint_binding__.rs";

pub(crate) fn binding_source() -> String {
    "// Generated by failpoint-rewriter. Do not edit by hand.\n\
     #[doc(hidden)]\n\
     pub(crate) fn _curpkg_(name: &str) -> String {\n\
     \u{20}\u{20}\u{20}\u{20}format!(\"{}/{}\", env!(\"CARGO_PKG_NAME\"), name)\n\
     }\n"
        .to_string()
}

/// Writes the binding file into `crate_root` (the directory containing
/// the crate's `Cargo.toml`), alongside instructions for wiring it into
/// the crate's module tree (`include!` from `lib.rs`/`main.rs`).
pub(crate) fn write_binding(crate_root: &Path) -> std::io::Result<()> {
    let path = crate_root.join("src").join(BINDING_FILE_NAME);
    std::fs::write(path, binding_source())
}
