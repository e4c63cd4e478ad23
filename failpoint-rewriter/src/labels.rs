//! Label hoisting: `Label("x")` attaches to whatever follows it.
//!
//! Rust has no unrestricted `goto`, so a label followed by a loop
//! becomes that loop's native label (enabling `break`/`continue` to
//! target it structurally); a label followed by anything else becomes
//! a labeled block, which supports `break` (an early exit) but not
//! `continue` (Rust has no equivalent of re-entering an arbitrary
//! block, matching the upstream restriction that `Continue` only
//! targets loops).

use syn::{Expr, Stmt, parse_quote};

use crate::rewriters::lifetime_for;

pub(crate) fn attach_label(expr: &mut Expr, name: &str) {
    let lt = lifetime_for(name);
    let label = syn::Label {
        name: lt.clone(),
        colon_token: Default::default(),
    };
    match expr {
        Expr::While(e) => e.label = Some(label),
        Expr::ForLoop(e) => e.label = Some(label),
        Expr::Loop(e) => e.label = Some(label),
        Expr::Block(e) => e.label = Some(label),
        other => {
            let inner = other.clone();
            *other = parse_quote!(#lt: { #inner });
        }
    }
}

pub(crate) fn wrap_labeled_block(stmt: Stmt, name: &str) -> Stmt {
    let lt = lifetime_for(name);
    parse_quote!(#lt: { #stmt })
}
