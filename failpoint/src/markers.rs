//! No-op marker functions. `failpoint-rewriter` recognizes calls to
//! these by name and replaces them with real evaluation logic; left
//! un-rewritten, every call here compiles away to nothing.
//!
//! Names match the upstream marker vocabulary exactly
//! (`Inject`, `Break`, `Goto`, ...) rather than Rust's usual snake_case,
//! because the rewriter's dispatch table matches on these names
//! verbatim. `Break`, `Continue`, and `Return` collide with keywords
//! and are spelled as raw identifiers.

#![allow(non_snake_case)]

use crate::value::Value;

/// Marks a fault-injection point. `body` receives the fired value (or
/// nothing, if the closure takes no parameter) and decides what the
/// call site does with it; un-rewritten, this never runs `body` at all.
pub fn Inject<F>(_name: &str, _body: F)
where
    F: FnOnce(Option<Value>),
{
}

/// Like [`Inject`], but carries an explicit [`crate::hook::Hook`] used
/// to decide whether this call site is allowed to fire.
pub fn InjectContext<F>(_name: &str, _hook: Option<&dyn crate::hook::Hook>, _body: F)
where
    F: FnOnce(Option<Value>),
{
}

/// Marks a call-style injection point: if `name` has been registered
/// with [`crate::enable_call`], the rewriter replaces this with an
/// invocation of the registered closure forwarding `args`.
pub fn InjectCall(_name: &str, _args: &[&dyn std::any::Any]) {}

/// Marks the following loop or labeled block as targetable by
/// [`r#break`]/[`r#continue`]/[`Goto`] under `label`.
pub fn Label(_label: &str) {}

/// Exits the loop or block labeled `label`, or the innermost enclosing
/// one if `label` is empty.
pub fn r#break(_label: &str) {}

/// Continues the loop labeled `label`, or the innermost enclosing one
/// if `label` is empty.
pub fn r#continue(_label: &str) {}

/// Exits the block or loop labeled `label`. Rust has no unstructured
/// jump; the rewriter turns this into a labeled `break`, so only
/// forward exits out of the labeled construct are supported.
pub fn Goto(_label: &str) {}

/// A no-op. Rust `match` arms cannot fall into one another, so the
/// rewriter erases calls to this rather than attempting to simulate
/// fallthrough.
pub fn Fallthrough() {}

/// Marks the enclosing function's return point.
pub fn r#return<T>(_value: T) {}
