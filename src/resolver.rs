//! Static resolver pass.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, read in own initializer, top‑level `return`).
//! 3. Record, for *each* variable occurrence, how many scopes out its
//!    declaration lives, so the interpreter never falls back to a dynamic
//!    lookup that would see a later shadowing local.
//!
//! Global scope is deliberately not tracked: names that are not found in any
//! local scope stay unannotated and are looked up in the global frame at run
//! time. That lets top‑level functions call each other regardless of the
//! order they are declared in, and makes global redeclaration legal.
//!
//! All errors of the pass are collected; the walk does not stop at the first.

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Identifier, Stmt};
use crate::error::{StaticError, StaticErrorKind};
use crate::token::Span;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Scope‑hop depth for every resolved variable reference and assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    depths: HashMap<ExprId, usize>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` means "global: look it up by name in the outermost frame".
    #[inline]
    pub fn depth(&self, id: ExprId) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExprId, usize)> + '_ {
        self.depths.iter().map(|(id, depth)| (*id, *depth))
    }

    /// Merge another program's bindings. Ids are process‑unique, so entries
    /// never clash.
    pub fn extend(&mut self, other: &Bindings) {
        self.depths.extend(other.iter());
    }

    fn record(&mut self, id: ExprId, depth: usize) {
        self.depths.insert(id, depth);
    }
}

/// Convenience entry point: resolve a whole program.
pub fn resolve(statements: &[Stmt]) -> Result<Bindings, Vec<StaticError>> {
    Resolver::new().resolve(statements)
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances for locals.
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    bindings: Bindings,
    errors: Vec<StaticError>,
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            bindings: Bindings::new(),
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Bindings, Vec<StaticError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            info!("Resolved {} local reference(s)", self.bindings.len());
            Ok(self.bindings)
        } else {
            info!("Resolve pass found {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define, so `var a = a;`
                // sees the outer `a` (or is rejected locally)
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // name is visible *inside* its own body, for recursion
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                // both branches, whichever one runs
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(StaticErrorKind::ReturnOutsideFunction, "return", *keyword);
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.name) == Some(&false) {
                        self.error(
                            StaticErrorKind::SelfReferencingInitializer,
                            &name.name,
                            name.span,
                        );
                    }
                }
                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body, nested under
    /// the *declaration* site.
    fn resolve_function(&mut self, decl: &FunctionDecl) {
        let enclosing = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Identifier) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.name) {
            self.error(StaticErrorKind::Redeclaration, &name.name, name.span);
            return;
        }

        scope.insert(name.name.clone(), false);
    }

    fn define(&mut self, name: &Identifier) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.name.clone(), true);
        }
    }

    /// Record this occurrence as a local at depth `d`, or leave it
    /// unannotated (global) if no local scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &Identifier) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.name) {
                debug!("Resolved '{}' #{} at depth {}", name.name, id.index(), depth);
                self.bindings.record(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.name);
    }

    fn error(&mut self, kind: StaticErrorKind, lexeme: &str, span: Span) {
        self.errors.push(StaticError::new(kind, lexeme, span));
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
