//! Backing store for `InjectCall`: a registry of type-erased closures,
//! one per failpoint name, invoked with the rewritten call site's
//! arguments.
//!
//! A fully-typed per-site registration (§[DESIGN NOTES]'s safer
//! alternative) was considered and rejected: `InjectCall` call sites
//! vary in arity and argument types across a codebase, and a single
//! erased signature keeps the rewriter's generated call shape uniform.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

type Callable = Arc<dyn Fn(&[Box<dyn Any + Send + Sync>]) + Send + Sync>;

fn table() -> &'static RwLock<HashMap<String, Callable>> {
    static TABLE: OnceLock<RwLock<HashMap<String, Callable>>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

pub(crate) fn register<F>(name: &str, f: F)
where
    F: Fn(&[Box<dyn Any + Send + Sync>]) + Send + Sync + 'static,
{
    table().write().unwrap().insert(name.to_string(), Arc::new(f));
}

pub(crate) fn invoke(name: &str, args: &[Box<dyn Any + Send + Sync>]) {
    if let Some(f) = table().read().unwrap().get(name).cloned() {
        f(args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn registered_call_receives_forwarded_args() {
        let seen = Arc::new(AtomicI64::new(0));
        let seen2 = Arc::clone(&seen);
        register("failpoint::tests::call", move |args: &[Box<dyn Any + Send + Sync>]| {
            if let Some(n) = args.first().and_then(|a| a.downcast_ref::<i64>()) {
                seen2.store(*n, Ordering::SeqCst);
            }
        });
        invoke("failpoint::tests::call", &[Box::new(7_i64)]);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn invoking_unregistered_name_is_a_no_op() {
        invoke("failpoint::tests::never-registered", &[]);
    }
}
