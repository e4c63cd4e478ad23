//! The process-wide table of failpoints, keyed by name.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::FailpointError;
use crate::point::{Failpoint, Fired};
use crate::terms::Terms;
use crate::value::Value;

/// A table of failpoints. Most callers use the process-wide singleton
/// via the free functions re-exported at the crate root
/// ([`crate::enable`], [`crate::eval`], ...); a standalone `Registry`
/// is useful in tests that want isolation from other tests' failpoints.
#[derive(Default)]
pub struct Registry {
    points: RwLock<HashMap<String, Arc<Failpoint>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry {
            points: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide singleton, lazily bootstrapped from
    /// `GO_FAILPOINTS`/`GO_FAILPOINTS_HTTP` on first access.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let reg = Registry::new();
            crate::env::bootstrap(&reg);
            reg
        })
    }

    fn point(&self, name: &str) -> Option<Arc<Failpoint>> {
        self.points.read().get(name).cloned()
    }

    fn point_or_create(&self, name: &str) -> Arc<Failpoint> {
        if let Some(p) = self.point(name) {
            return p;
        }
        let mut points = self.points.write();
        points
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Failpoint::new(name)))
            .clone()
    }

    /// Parses `terms` and installs it on `name`, creating the
    /// failpoint if this is the first time it has been seen.
    pub fn enable(&self, name: &str, terms: &str) -> Result<(), FailpointError> {
        let parsed = Terms::parse(terms)?;
        debug!(failpoint = name, terms, "enabling failpoint");
        self.point_or_create(name).enable(parsed);
        Ok(())
    }

    /// Clears the terms on `name`. Errors with [`FailpointError::NotExist`]
    /// if `name` has never been enabled, or [`FailpointError::Disabled`]
    /// if it currently has no terms installed.
    pub fn disable(&self, name: &str) -> Result<(), FailpointError> {
        let point = self
            .point(name)
            .ok_or_else(|| FailpointError::NotExist(name.to_string()))?;
        debug!(failpoint = name, "disabling failpoint");
        point.disable()
    }

    /// The raw terms string currently installed on `name`.
    pub fn status(&self, name: &str) -> Result<String, FailpointError> {
        let point = self
            .point(name)
            .ok_or_else(|| FailpointError::NotExist(name.to_string()))?;
        point.status()
    }

    /// Lists the names of every failpoint that currently has terms
    /// installed (disabled failpoints that still exist as empty
    /// objects are not listed), in lexicographic order.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .points
            .read()
            .iter()
            .filter(|(_, p)| p.status().is_ok())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Evaluates `name`. Returns `Ok(None)` if the name has never been
    /// registered at all (matches callers that guard on an optional
    /// value rather than treating an un-enabled failpoint as an error
    /// at every call site); once a failpoint has existed and been
    /// disabled, further evaluation errors with [`FailpointError::Disabled`].
    pub fn eval(&self, name: &str) -> Result<Option<Value>, FailpointError> {
        let Some(point) = self.point(name) else {
            trace!(failpoint = name, "eval on unregistered failpoint");
            return Ok(None);
        };
        match point.eval()? {
            Fired::Value(v) => {
                trace!(failpoint = name, ?v, "failpoint fired");
                Ok(Some(v))
            }
            Fired::NotFired => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_lexicographically_sorted() {
        let registry = Registry::new();
        registry.enable("zebra", "return(1)").unwrap();
        registry.enable("apple", "return(1)").unwrap();
        registry.enable("mango", "return(1)").unwrap();
        assert_eq!(registry.list(), vec!["apple", "mango", "zebra"]);
    }
}
