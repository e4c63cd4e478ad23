//! Per-marker AST transforms: given a recognized marker call, produce
//! the real statement it becomes.

use std::path::Path;

use proc_macro2::Span;
use syn::{Expr, ExprCall, ExprClosure, Lifetime, Stmt, parse_quote};

use crate::error::RewriteError;

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub(crate) fn lifetime_for(label: &str) -> Lifetime {
    Lifetime::new(&format!("'{}_FP", sanitize(label)), Span::call_site())
}

fn literal_str(expr: &Expr, path: &Path, what: &str) -> Result<String, RewriteError> {
    if let Expr::Lit(lit) = expr {
        if let syn::Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(RewriteError::InvalidMarker {
        path: path.to_path_buf(),
        message: format!("{what} must be a string literal"),
    })
}

pub(crate) fn literal_str_arg(call: &ExprCall, idx: usize, path: &Path) -> Result<String, RewriteError> {
    let arg = call.args.iter().nth(idx).ok_or_else(|| RewriteError::InvalidMarker {
        path: path.to_path_buf(),
        message: format!("expected at least {} argument(s)", idx + 1),
    })?;
    literal_str(arg, path, "failpoint name")
}

pub(crate) fn optional_label_arg(call: &ExprCall, path: &Path) -> Result<Option<String>, RewriteError> {
    match call.args.iter().next() {
        None => Ok(None),
        Some(arg) => Ok(Some(literal_str(arg, path, "label")?)),
    }
}

pub(crate) fn break_stmt(label: Option<String>) -> Stmt {
    match label {
        Some(l) => {
            let lt = lifetime_for(&l);
            parse_quote!(break #lt;)
        }
        None => parse_quote!(break;),
    }
}

pub(crate) fn continue_stmt(label: Option<String>) -> Stmt {
    match label {
        Some(l) => {
            let lt = lifetime_for(&l);
            parse_quote!(continue #lt;)
        }
        None => parse_quote!(continue;),
    }
}

pub(crate) fn goto_stmt(label: &str) -> Stmt {
    let lt = lifetime_for(label);
    parse_quote!(break #lt;)
}

pub(crate) fn return_stmt(call: &ExprCall) -> Stmt {
    match call.args.len() {
        0 => parse_quote!(return;),
        1 => {
            let v = call.args.first().unwrap();
            parse_quote!(return #v;)
        }
        _ => {
            let vals = call.args.iter();
            parse_quote!(return (#(#vals),*);)
        }
    }
}

fn is_none_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Path(p) if p.path.is_ident("None"))
}

fn closure_call(closure: &ExprClosure) -> Expr {
    if closure.inputs.is_empty() {
        parse_quote!((#closure)())
    } else {
        parse_quote!((#closure)(__fp_val))
    }
}

fn as_closure(expr: &Expr, path: &Path) -> Result<ExprClosure, RewriteError> {
    if let Expr::Closure(c) = expr {
        Ok(c.clone())
    } else {
        Err(RewriteError::InvalidMarker {
            path: path.to_path_buf(),
            message: "expected a closure of arity 0 or 1".to_string(),
        })
    }
}

/// `Inject(name, |val| { ... })` → evaluate `name` and, if fired, run
/// the closure with the fired value.
pub(crate) fn inject_stmt(call: &ExprCall, path: &Path) -> Result<Stmt, RewriteError> {
    if call.args.len() != 2 {
        return Err(RewriteError::InvalidMarker {
            path: path.to_path_buf(),
            message: "Inject takes exactly 2 arguments: name, closure".to_string(),
        });
    }
    let name_expr = call.args.first().unwrap();
    let closure = as_closure(call.args.iter().nth(1).unwrap(), path)?;
    let body = closure_call(&closure);
    Ok(parse_quote! {
        match failpoint::eval(&crate::_curpkg_(#name_expr)) {
            Ok(Some(__fp_val)) => { #body; }
            _ => {}
        }
    })
}

/// `InjectContext(name, hook, |val| { ... })` → like [`inject_stmt`]
/// but gated by `hook` (or ungated if `hook` is the literal `None`).
pub(crate) fn inject_context_stmt(call: &ExprCall, path: &Path) -> Result<Stmt, RewriteError> {
    if call.args.len() != 3 {
        return Err(RewriteError::InvalidMarker {
            path: path.to_path_buf(),
            message: "InjectContext takes exactly 3 arguments: name, hook, closure".to_string(),
        });
    }
    let name_expr = call.args.first().unwrap();
    let hook_expr = call.args.iter().nth(1).unwrap();
    let closure = as_closure(call.args.iter().nth(2).unwrap(), path)?;
    let body = closure_call(&closure);
    let eval_call: Expr = parse_quote!(failpoint::eval_context(&crate::_curpkg_(#name_expr)));
    let gated: Expr = if is_none_literal(hook_expr) {
        eval_call
    } else {
        parse_quote!(failpoint::with_hook(#hook_expr, || #eval_call))
    };
    Ok(parse_quote! {
        match #gated {
            Ok(Some(__fp_val)) => { #body; }
            _ => {}
        }
    })
}

/// `InjectCall(name, a, b, ...)` → forward `a, b, ...` to whatever
/// closure was registered on `name` via `enable_call`.
pub(crate) fn inject_call_stmt(call: &ExprCall) -> Stmt {
    let mut args = call.args.iter();
    let Some(name_expr) = args.next() else {
        return parse_quote!({});
    };
    let boxed: Vec<Expr> = args
        .map(|a| -> Expr { parse_quote!(Box::new(#a) as Box<dyn std::any::Any + Send + Sync>) })
        .collect();
    parse_quote! {
        failpoint::call(&crate::_curpkg_(#name_expr), vec![#(#boxed),*]);
    }
}
