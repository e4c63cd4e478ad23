//! `GO_FAILPOINTS` / `GO_FAILPOINTS_HTTP` bootstrap.
//!
//! Names are kept exactly as the upstream contract uses them: scripts
//! and CI configuration that already export `GO_FAILPOINTS` keep
//! working against this port unmodified.

use tracing::{error, info};

use crate::registry::Registry;

const ENV_FAILPOINTS: &str = "GO_FAILPOINTS";
const ENV_HTTP: &str = "GO_FAILPOINTS_HTTP";

/// Parses `GO_FAILPOINTS` (`name=terms[;name=terms...]`) and installs
/// each entry on `registry`. Run once, lazily, the first time the
/// process-wide registry is touched (see [`Registry::global`]).
///
/// A malformed entry is logged and skipped rather than aborting the
/// whole process — unlike the upstream Go `init()`, which calls
/// `os.Exit` on a parse failure, a library has no business killing its
/// host process at import time.
pub(crate) fn bootstrap(registry: &Registry) {
    if let Ok(spec) = std::env::var(ENV_FAILPOINTS) {
        for entry in spec.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            match entry.split_once('=') {
                Some((name, terms)) => {
                    if let Err(e) = registry.enable(name, terms) {
                        error!(entry, error = %e, "could not parse GO_FAILPOINTS entry");
                    } else {
                        info!(failpoint = name, terms, "enabled from GO_FAILPOINTS");
                    }
                }
                None => error!(entry, "GO_FAILPOINTS entry missing `=`"),
            }
        }
    }

    #[cfg(feature = "http")]
    if let Ok(addr) = std::env::var(ENV_HTTP) {
        crate::http::spawn_admin_server(addr);
    }
    #[cfg(not(feature = "http"))]
    if std::env::var(ENV_HTTP).is_ok() {
        error!("GO_FAILPOINTS_HTTP is set but the `http` feature is not enabled");
    }
}
