//! A single named failpoint: its current terms (if enabled) and the
//! wakeup latch used by the `pause` action.

use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::FailpointError;
use crate::terms::{Action, TermOutcome, Terms};
use crate::value::Value;

/// A one-shot wakeup gate. `wait` blocks until `open` has been called;
/// `open` releases every current and future waiter. A failpoint gets a
/// fresh `Latch` each time it is disabled, so a later `enable` +
/// `pause` cycle gets its own gate rather than one left open by a
/// previous cycle.
struct Latch {
    opened: Mutex<bool>,
    cv: Condvar,
}

impl Latch {
    fn new() -> Self {
        Latch {
            opened: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut guard = self.opened.lock();
        while !*guard {
            self.cv.wait(&mut guard);
        }
    }

    fn open(&self) {
        *self.opened.lock() = true;
        self.cv.notify_all();
    }
}

struct Inner {
    terms: Option<Arc<Terms>>,
    latch: Arc<Latch>,
}

/// A single named failpoint. Holds its own lock; the [`crate::registry::Registry`]
/// only serializes lookups by name, never evaluation.
pub struct Failpoint {
    name: String,
    inner: RwLock<Inner>,
}

/// What happened when a failpoint was evaluated.
pub enum Fired {
    /// The failpoint fired and produced this value.
    Value(Value),
    /// No term was eligible to fire this time (probability gate
    /// rejected the call). Not an error.
    NotFired,
}

impl Failpoint {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Failpoint {
            name: name.into(),
            inner: RwLock::new(Inner {
                terms: None,
                latch: Arc::new(Latch::new()),
            }),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn enable(&self, terms: Terms) {
        let mut inner = self.inner.write();
        inner.terms = Some(Arc::new(terms));
    }

    /// Returns `Err(Disabled)` if this failpoint was never enabled or
    /// is currently disabled.
    pub(crate) fn disable(&self) -> Result<(), FailpointError> {
        let mut inner = self.inner.write();
        if inner.terms.take().is_none() {
            return Err(FailpointError::Disabled(self.name.clone()));
        }
        let old_latch = std::mem::replace(&mut inner.latch, Arc::new(Latch::new()));
        old_latch.open();
        Ok(())
    }

    /// The raw terms string currently installed, if any.
    pub(crate) fn status(&self) -> Result<String, FailpointError> {
        let inner = self.inner.read();
        inner
            .terms
            .as_ref()
            .map(|t| t.source().to_string())
            .ok_or_else(|| FailpointError::Disabled(self.name.clone()))
    }

    /// Evaluates this failpoint once, performing whichever action
    /// fires (including blocking for `pause`/`sleep`, panicking for
    /// `panic`, and printing for `print`).
    pub(crate) fn eval(&self) -> Result<Fired, FailpointError> {
        let (terms, latch) = {
            let inner = self.inner.read();
            let terms = inner
                .terms
                .clone()
                .ok_or_else(|| FailpointError::Disabled(self.name.clone()))?;
            (terms, inner.latch.clone())
        };
        // The read guard is dropped above; no lock is held across the
        // potentially-blocking action below.
        match terms.evaluate() {
            TermOutcome::AllExhausted => Err(FailpointError::NotAllowed(self.name.clone())),
            TermOutcome::NotFired => Ok(Fired::NotFired),
            TermOutcome::Fired(action) => self.perform(action, &latch),
        }
    }

    fn perform(&self, action: &Action, latch: &Arc<Latch>) -> Result<Fired, FailpointError> {
        match action {
            Action::Return(v) => Ok(Fired::Value(v.clone())),
            Action::Sleep(d) => {
                thread::sleep(*d);
                Ok(Fired::Value(Value::Unit))
            }
            Action::Pause => {
                latch.wait();
                Ok(Fired::Value(Value::Unit))
            }
            Action::Print(s) => {
                println!("failpoint print: {s}");
                Ok(Fired::Value(Value::Unit))
            }
            Action::Panic(s) => {
                panic!("failpoint panic: {s}");
            }
            Action::Off => Ok(Fired::NotFired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disable_wakes_a_paused_evaluator() {
        let fp = Arc::new(Failpoint::new("p"));
        fp.enable(Terms::parse("pause").unwrap());

        let waiter = Arc::clone(&fp);
        let handle = thread::spawn(move || waiter.eval().map(|_| ()));

        thread::sleep(std::time::Duration::from_millis(50));
        fp.disable().unwrap();

        // eval() returns Disabled because disable() cleared terms
        // before opening the latch that eval() is blocked on; either
        // outcome (woken with a value, or erroring because terms is
        // now None) demonstrates the thread is no longer blocked.
        handle.join().unwrap().ok();
    }

    #[test]
    fn disable_twice_errors() {
        let fp = Failpoint::new("q");
        fp.enable(Terms::parse("return(1)").unwrap());
        fp.disable().unwrap();
        assert!(matches!(fp.disable(), Err(FailpointError::Disabled(_))));
    }
}
