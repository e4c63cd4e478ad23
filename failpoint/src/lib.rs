//! # failpoint
//!
//! Named fault-injection points controlled by a small runtime-evaluated
//! terms DSL (`"5*return(1)->pause"`), built to be driven either
//! programmatically (this crate) or by rewriting marker calls at build
//! time with `failpoint-rewriter`.
//!
//! ## Layout
//!
//! | Module | What it does |
//! |--------|---------------|
//! | [`terms`] | the `[count "*"] [probability "%"] action` grammar and its evaluator |
//! | [`point`] | a single named failpoint: its terms and its pause latch |
//! | [`registry`] | the name → failpoint table, process-wide or per-test |
//! | [`hook`] | per-call-site filtering |
//! | [`markers`] | no-op stand-ins for `Inject`, `Break`, `Goto`, ... |
//! | [`env`] | `GO_FAILPOINTS` / `GO_FAILPOINTS_HTTP` bootstrap |
//! | [`http`] | the optional admin HTTP surface (`http` feature) |
//!
//! ## Dependency notes
//!
//! `parking_lot` backs every lock here rather than `tokio::sync`,
//! because `pause` and `sleep` block the calling OS thread by design —
//! this crate models "parallel threads sharing memory", not
//! cooperative `async` tasks. The one place that genuinely needs an
//! async runtime is the optional HTTP admin surface, which runs its
//! own single-threaded Tokio runtime behind the `http` feature rather
//! than pulling the rest of the crate onto it.

#![deny(missing_docs)]

pub mod env;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod hook;
pub mod markers;
pub mod point;
pub mod registry;
pub mod terms;
pub mod value;

mod calls;

pub use error::FailpointError;
pub use hook::{Hook, with_hook};
pub use markers::*;
pub use registry::Registry;
pub use value::Value;

/// Forces `GO_FAILPOINTS`/`GO_FAILPOINTS_HTTP` bootstrap to run now,
/// if it hasn't already. Every other function in this module triggers
/// the same bootstrap lazily on first use, so calling this is never
/// required for correctness — it exists for callers (typically a
/// binary's `main`) that want the admin HTTP listener, if configured,
/// bound before the rest of the program starts rather than at some
/// later first-touch.
pub fn init_from_env() {
    Registry::global();
}

/// Installs `terms` on `name`, parsing it with the [`terms`] grammar.
/// Creates the failpoint if this is the first time `name` has been seen.
pub fn enable(name: &str, terms: &str) -> Result<(), FailpointError> {
    Registry::global().enable(name, terms)
}

/// Clears the terms installed on `name`.
pub fn disable(name: &str) -> Result<(), FailpointError> {
    Registry::global().disable(name)
}

/// The raw terms string currently installed on `name`.
pub fn status(name: &str) -> Result<String, FailpointError> {
    Registry::global().status(name)
}

/// The names of every currently-enabled failpoint.
pub fn list() -> Vec<String> {
    Registry::global().list()
}

/// Evaluates `name` against the process-wide registry.
///
/// Returns `Ok(None)` both when `name` has never been registered and
/// when its first eligible term's probability gate rejects this call
/// — neither is an error. Returns `Err(Disabled)` once a failpoint
/// that did exist has been disabled, and `Err(NotAllowed)` once every
/// term has exhausted its count.
pub fn eval(name: &str) -> Result<Option<Value>, FailpointError> {
    Registry::global().eval(name)
}

/// Like [`eval`], but `name` is only evaluated if the current thread's
/// installed [`Hook`] (see [`with_hook`]) allows it; otherwise this
/// behaves as though `name` were never registered.
pub fn eval_context(name: &str) -> Result<Option<Value>, FailpointError> {
    if !hook::current_allows(name) {
        return Ok(None);
    }
    eval(name)
}

/// Registers `f` to be invoked by `call`/`InjectCall` sites rewritten
/// against `name`.
pub fn enable_call<F>(name: &str, f: F)
where
    F: Fn(&[Box<dyn std::any::Any + Send + Sync>]) + Send + Sync + 'static,
{
    calls::register(name, f)
}

/// Invokes the closure registered on `name` via [`enable_call`] with
/// `args`, or does nothing if none is registered.
pub fn call(name: &str, args: Vec<Box<dyn std::any::Any + Send + Sync>>) {
    calls::invoke(name, &args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_enable_eval_disable() {
        let name = "failpoint::tests::end_to_end";
        enable(name, "return(42)").unwrap();
        assert_eq!(eval(name).unwrap(), Some(Value::Int(42)));
        disable(name).unwrap();
        assert!(matches!(eval(name), Err(FailpointError::Disabled(_))));
    }

    #[test]
    fn composed_terms_drain_in_order_then_not_allowed() {
        let name = "failpoint::tests::composed";
        enable(
            name,
            "50*return(5)->1*return(true)->1*return(false)->10*return(20)",
        )
        .unwrap();
        let mut fives = 0;
        for _ in 0..50 {
            assert_eq!(eval(name).unwrap(), Some(Value::Int(5)));
            fives += 1;
        }
        assert_eq!(fives, 50);
        assert_eq!(eval(name).unwrap(), Some(Value::Bool(true)));
        assert_eq!(eval(name).unwrap(), Some(Value::Bool(false)));
        for _ in 0..10 {
            assert_eq!(eval(name).unwrap(), Some(Value::Int(20)));
        }
        assert!(matches!(eval(name), Err(FailpointError::NotAllowed(_))));
        disable(name).unwrap();
    }

    #[test]
    fn list_reports_enabled_names() {
        let name = "failpoint::tests::listed";
        enable(name, "return(1)").unwrap();
        assert!(list().contains(&name.to_string()));
        disable(name).unwrap();
        assert!(!list().contains(&name.to_string()));
    }

    #[test]
    fn eval_context_respects_hook() {
        let name = "failpoint::tests::hooked";
        enable(name, "return(1)").unwrap();
        let result = with_hook(|n: &str| n != name, || eval_context(name));
        assert_eq!(result.unwrap(), None);
        assert_eq!(eval_context(name).unwrap(), Some(Value::Int(1)));
        disable(name).unwrap();
    }
}
