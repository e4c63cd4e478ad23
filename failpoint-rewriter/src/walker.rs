//! The statement/expression walker. Descends into every syntactic
//! container that could hold a marker call — function and closure
//! bodies, `if`/`match`/`while`/`for`/`loop`, assignment and `let`
//! right-hand sides, `return` expressions, and call/method-call/binary/
//! unary operands — then, at each block, rewrites the marker calls
//! that appear as that block's own statements.
//!
//! Macro invocations (`vec![...]`, `select!`, ...) are treated as
//! opaque leaves: their token streams are not re-parsed as Rust syntax,
//! so a marker call written inside one is not found. This mirrors the
//! boundary Rust's own macro hygiene draws and is a recorded Non-goal,
//! not an oversight.

use std::path::{Path, PathBuf};

use syn::{Block, Expr, ExprCall, Item, Stmt};

use crate::error::RewriteError;
use crate::imports::ImportMap;
use crate::labels;
use crate::rewriters;

fn ident_text(ident: &syn::Ident) -> String {
    let s = ident.to_string();
    s.strip_prefix("r#").unwrap_or(&s).to_string()
}

pub(crate) struct Walker<'a> {
    imports: &'a ImportMap,
    file_path: PathBuf,
    pub(crate) changed: bool,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(imports: &'a ImportMap, file_path: &Path) -> Self {
        Walker {
            imports,
            file_path: file_path.to_path_buf(),
            changed: false,
        }
    }

    pub(crate) fn walk_items(&mut self, items: &mut [Item]) -> Result<(), RewriteError> {
        for item in items {
            self.walk_item(item)?;
        }
        Ok(())
    }

    fn walk_item(&mut self, item: &mut Item) -> Result<(), RewriteError> {
        match item {
            Item::Fn(f) => self.walk_block(&mut f.block)?,
            Item::Impl(imp) => {
                for it in &mut imp.items {
                    if let syn::ImplItem::Fn(m) = it {
                        self.walk_block(&mut m.block)?;
                    }
                }
            }
            Item::Trait(t) => {
                for it in &mut t.items {
                    if let syn::TraitItem::Fn(m) = it {
                        if let Some(block) = &mut m.default {
                            self.walk_block(block)?;
                        }
                    }
                }
            }
            Item::Mod(m) => {
                if let Some((_, items)) = &mut m.content {
                    self.walk_items(items)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn walk_block(&mut self, block: &mut Block) -> Result<(), RewriteError> {
        for stmt in &mut block.stmts {
            self.walk_stmt_children(stmt)?;
        }
        self.rewrite_stmts(&mut block.stmts)?;
        Ok(())
    }

    fn walk_stmt_children(&mut self, stmt: &mut Stmt) -> Result<(), RewriteError> {
        match stmt {
            Stmt::Local(local) => {
                if let Some(init) = &mut local.init {
                    self.walk_expr(&mut init.expr)?;
                    if let Some((_, diverge)) = &mut init.diverge {
                        self.walk_expr(diverge)?;
                    }
                }
            }
            Stmt::Expr(expr, _) => self.walk_expr(expr)?,
            Stmt::Item(item) => self.walk_item(item)?,
            Stmt::Macro(_) => {}
        }
        Ok(())
    }

    fn walk_expr(&mut self, expr: &mut Expr) -> Result<(), RewriteError> {
        match expr {
            Expr::Block(e) => self.walk_block(&mut e.block)?,
            Expr::If(e) => {
                self.walk_expr(&mut e.cond)?;
                self.walk_block(&mut e.then_branch)?;
                if let Some((_, else_branch)) = &mut e.else_branch {
                    self.walk_expr(else_branch)?;
                }
            }
            Expr::Match(e) => {
                self.walk_expr(&mut e.expr)?;
                for arm in &mut e.arms {
                    if let Some((_, guard)) = &mut arm.guard {
                        self.walk_expr(guard)?;
                    }
                    self.walk_expr(&mut arm.body)?;
                }
            }
            Expr::While(e) => {
                self.walk_expr(&mut e.cond)?;
                self.walk_block(&mut e.body)?;
            }
            Expr::ForLoop(e) => {
                self.walk_expr(&mut e.expr)?;
                self.walk_block(&mut e.body)?;
            }
            Expr::Loop(e) => self.walk_block(&mut e.body)?,
            Expr::Closure(e) => self.walk_expr(&mut e.body)?,
            Expr::Async(e) => self.walk_block(&mut e.block)?,
            Expr::Unsafe(e) => self.walk_block(&mut e.block)?,
            Expr::Call(e) => {
                self.walk_expr(&mut e.func)?;
                for arg in &mut e.args {
                    self.walk_expr(arg)?;
                }
            }
            Expr::MethodCall(e) => {
                self.walk_expr(&mut e.receiver)?;
                for arg in &mut e.args {
                    self.walk_expr(arg)?;
                }
            }
            Expr::Binary(e) => {
                self.walk_expr(&mut e.left)?;
                self.walk_expr(&mut e.right)?;
            }
            Expr::Unary(e) => self.walk_expr(&mut e.expr)?,
            Expr::Paren(e) => self.walk_expr(&mut e.expr)?,
            Expr::Reference(e) => self.walk_expr(&mut e.expr)?,
            Expr::Assign(e) => {
                self.walk_expr(&mut e.left)?;
                self.walk_expr(&mut e.right)?;
            }
            Expr::Return(e) => {
                if let Some(v) = &mut e.expr {
                    self.walk_expr(v)?;
                }
            }
            Expr::Tuple(e) => {
                for el in &mut e.elems {
                    self.walk_expr(el)?;
                }
            }
            Expr::Array(e) => {
                for el in &mut e.elems {
                    self.walk_expr(el)?;
                }
            }
            Expr::Field(e) => self.walk_expr(&mut e.base)?,
            Expr::Index(e) => {
                self.walk_expr(&mut e.expr)?;
                self.walk_expr(&mut e.index)?;
            }
            Expr::Try(e) => self.walk_expr(&mut e.expr)?,
            Expr::Cast(e) => self.walk_expr(&mut e.expr)?,
            Expr::Let(e) => self.walk_expr(&mut e.expr)?,
            Expr::Range(e) => {
                if let Some(s) = &mut e.start {
                    self.walk_expr(s)?;
                }
                if let Some(end) = &mut e.end {
                    self.walk_expr(end)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn marker_call<'s>(&self, expr: &'s Expr) -> Option<(&'static str, &'s ExprCall)> {
        let Expr::Call(call) = expr else { return None };
        let Expr::Path(p) = &*call.func else { return None };
        if p.path.segments.is_empty() || p.path.segments.len() > 2 {
            return None;
        }
        let segs: Vec<String> = p.path.segments.iter().map(|s| ident_text(&s.ident)).collect();
        self.imports.resolve(&segs).map(|name| (name, call))
    }

    fn rewrite_stmts(&mut self, stmts: &mut Vec<Stmt>) -> Result<(), RewriteError> {
        let old = std::mem::take(stmts);
        let mut iter = old.into_iter().peekable();
        let mut out = Vec::with_capacity(iter.len());
        while let Some(stmt) = iter.next() {
            let marker = if let Stmt::Expr(expr, _) = &stmt {
                self.marker_call(expr).map(|(name, call)| (name, call.clone()))
            } else {
                None
            };
            let Some((name, call)) = marker else {
                out.push(stmt);
                continue;
            };
            match name {
                "Label" => {
                    let label_name = rewriters::literal_str_arg(&call, 0, &self.file_path)?;
                    self.changed = true;
                    match iter.next() {
                        Some(Stmt::Expr(mut next_expr, next_semi)) => {
                            labels::attach_label(&mut next_expr, &label_name);
                            out.push(Stmt::Expr(next_expr, next_semi));
                        }
                        Some(other) => out.push(labels::wrap_labeled_block(other, &label_name)),
                        None => {}
                    }
                }
                "Fallthrough" => self.changed = true,
                "break" => {
                    let label = rewriters::optional_label_arg(&call, &self.file_path)?;
                    self.changed = true;
                    out.push(rewriters::break_stmt(label));
                }
                "continue" => {
                    let label = rewriters::optional_label_arg(&call, &self.file_path)?;
                    self.changed = true;
                    out.push(rewriters::continue_stmt(label));
                }
                "Goto" => {
                    let label = rewriters::literal_str_arg(&call, 0, &self.file_path)?;
                    self.changed = true;
                    out.push(rewriters::goto_stmt(&label));
                }
                "return" => {
                    self.changed = true;
                    out.push(rewriters::return_stmt(&call));
                }
                "Inject" => {
                    self.changed = true;
                    out.push(rewriters::inject_stmt(&call, &self.file_path)?);
                }
                "InjectContext" => {
                    self.changed = true;
                    out.push(rewriters::inject_context_stmt(&call, &self.file_path)?);
                }
                "InjectCall" => {
                    self.changed = true;
                    out.push(rewriters::inject_call_stmt(&call));
                }
                _ => out.push(stmt),
            }
        }
        *stmts = out;
        Ok(())
    }
}
