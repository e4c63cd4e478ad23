//! Per-call-site filtering, the Rust counterpart of `InjectContext`'s
//! hook argument.

use std::cell::RefCell;

/// Decides, given a failpoint's name, whether it is allowed to
/// evaluate at all. Returning `false` makes the call behave as if the
/// failpoint were not registered (an `Ok(None)`, not an error).
pub trait Hook: Send + Sync {
    /// Returns whether `name` is allowed to fire in this context.
    fn allows(&self, name: &str) -> bool;
}

impl<F> Hook for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn allows(&self, name: &str) -> bool {
        self(name)
    }
}

thread_local! {
    static CURRENT_HOOK: RefCell<Option<Box<dyn Hook>>> = const { RefCell::new(None) };
}

/// Runs `f` with `hook` installed as the current thread's hook, for
/// call sites rewritten from `InjectContext` that did not have an
/// explicit context value available to thread through.
pub fn with_hook<R>(hook: impl Hook + 'static, f: impl FnOnce() -> R) -> R {
    CURRENT_HOOK.with(|cell| {
        let previous = cell.borrow_mut().replace(Box::new(hook));
        let result = f();
        *cell.borrow_mut() = previous;
        result
    })
}

/// Returns whether `name` is allowed to fire under the current
/// thread's installed hook. With no hook installed, everything is
/// allowed.
pub(crate) fn current_allows(name: &str) -> bool {
    CURRENT_HOOK.with(|cell| cell.borrow().as_ref().is_none_or(|h| h.allows(name)))
}
