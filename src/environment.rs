//! Runtime scope frames.
//!
//! An [`Environment`] is a shared handle to one frame. Frames link outward
//! through `enclosing` only, so the chain itself never forms a cycle and a
//! frame lives as long as the longest holder (the block executing in it, or
//! any closure that captured it).
//!
//! The exception: a function declared in a frame is stored in that same
//! frame and also holds it as its closure. That frame, and everything it
//! reaches, is never freed before the process exits. There is no cycle
//! collector.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::value::Value;

/// Lookup failures. Only [`EnvError::Undefined`] is a legitimate program
/// error; the other two mean the resolver and the interpreter disagree.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvError {
    #[error("Undefined variable '{0}'.")]
    Undefined(String),

    #[error("no scope {depth} level(s) above the current one while looking up '{name}'")]
    MissingFrame { depth: usize, name: String },

    #[error("'{name}' is not bound in the scope {depth} level(s) up")]
    MissingSlot { depth: usize, name: String },
}

impl EnvError {
    pub fn is_defect(&self) -> bool {
        !matches!(self, EnvError::Undefined(_))
    }
}

struct Frame {
    values: HashMap<String, Value>,
    enclosing: Option<Environment>,
}

#[derive(Clone)]
pub struct Environment(Rc<RefCell<Frame>>);

impl Environment {
    /// A fresh outermost (global) frame.
    pub fn new() -> Self {
        Environment(Rc::new(RefCell::new(Frame {
            values: HashMap::new(),
            enclosing: None,
        })))
    }

    /// A new frame whose enclosing link is `self`.
    pub fn child(&self) -> Self {
        Environment(Rc::new(RefCell::new(Frame {
            values: HashMap::new(),
            enclosing: Some(self.clone()),
        })))
    }

    pub fn enclosing(&self) -> Option<Environment> {
        self.0.borrow().enclosing.clone()
    }

    /// Inserts or overwrites `name` in this frame only.
    pub fn define(&self, name: &str, value: Value) {
        debug!("define '{}' = {}", name, value);

        self.0.borrow_mut().values.insert(name.to_string(), value);
    }

    /// Does this exact frame bind `name`?
    pub fn contains(&self, name: &str) -> bool {
        self.0.borrow().values.contains_key(name)
    }

    /// Walks `depth` enclosing links.
    pub fn ancestor(&self, depth: usize, name: &str) -> Result<Environment, EnvError> {
        let mut env = self.clone();

        for _ in 0..depth {
            env = env.enclosing().ok_or_else(|| EnvError::MissingFrame {
                depth,
                name: name.to_string(),
            })?;
        }

        Ok(env)
    }

    /// The outermost frame of this chain.
    pub fn global(&self) -> Environment {
        let mut env = self.clone();

        while let Some(parent) = env.enclosing() {
            env = parent;
        }

        env
    }

    /// Read `name` from the frame exactly `depth` links out.
    pub fn get_at(&self, depth: usize, name: &str) -> Result<Value, EnvError> {
        let frame = self.ancestor(depth, name)?;
        let value = frame.0.borrow().values.get(name).cloned();

        value.ok_or_else(|| EnvError::MissingSlot {
            depth,
            name: name.to_string(),
        })
    }

    /// Read `name` from the outermost frame.
    pub fn get_global(&self, name: &str) -> Result<Value, EnvError> {
        let global = self.global();
        let value = global.0.borrow().values.get(name).cloned();

        value.ok_or_else(|| EnvError::Undefined(name.to_string()))
    }

    /// Overwrite an existing binding exactly `depth` links out.
    pub fn assign_at(&self, depth: usize, name: &str, value: Value) -> Result<(), EnvError> {
        let frame = self.ancestor(depth, name)?;
        let mut frame = frame.0.borrow_mut();

        match frame.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EnvError::MissingSlot {
                depth,
                name: name.to_string(),
            }),
        }
    }

    /// Overwrite an existing global. Assignment never creates a binding.
    pub fn assign_global(&self, name: &str, value: Value) -> Result<(), EnvError> {
        let global = self.global();
        let mut frame = global.0.borrow_mut();

        match frame.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EnvError::Undefined(name.to_string())),
        }
    }

    /// Live handles to this frame: blocks running in it, child frames,
    /// and closures that captured it.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Same underlying frame?
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// Frames can hold closures that capture the frame itself, so the derived
// Debug would recurse forever. Print names only.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0.borrow();
        let mut names: Vec<&String> = frame.values.keys().collect();
        names.sort();

        f.debug_struct("Environment")
            .field("names", &names)
            .field("enclosing", &frame.enclosing.is_some())
            .finish()
    }
}
