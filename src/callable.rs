//! Values that can be invoked with `(...)`.
//!
//! User functions and natives share one [`Callable`] enum so the interpreter
//! has a single call path: arity check, then dispatch on the variant.

use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::value::Value;

/// Host implementation of a built‑in. Errors are plain messages; the
/// interpreter attaches the call site.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

/// A user‑defined function paired with the frame active at its declaration.
#[derive(Debug)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Environment,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Environment) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn declaration(&self) -> &FunctionDecl {
        &self.declaration
    }

    /// Frame captured when the function was declared.
    pub fn closure(&self) -> &Environment {
        &self.closure
    }
}

/// A built‑in registered in the global frame before execution.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: NativeFn,
}

#[derive(Debug, Clone)]
pub enum Callable {
    Function(Rc<LoxFunction>),
    Native(Rc<NativeFunction>),
}

impl Callable {
    pub fn native(name: impl Into<String>, arity: usize, func: NativeFn) -> Self {
        Callable::Native(Rc::new(NativeFunction {
            name: name.into(),
            arity,
            func,
        }))
    }

    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(f) => f.declaration.params.len(),
            Callable::Native(n) => n.arity,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Callable::Function(f) => &f.declaration.name.name,
            Callable::Native(n) => &n.name,
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(func) => write!(f, "<fn {}>", func.declaration.name.name),
            Callable::Native(native) => write!(f, "<native fn {}>", native.name),
        }
    }
}
