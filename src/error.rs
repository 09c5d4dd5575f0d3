//! Centralised error hierarchy for the interpreter.
//!
//! The scanner and parser report through [`LoxError`] directly. The resolver
//! collects [`StaticError`]s and the evaluator raises [`RuntimeError`]s; both
//! are folded into [`LoxError`] at the driver boundary so callers get one
//! `Result<T>` alias and one exit‑code mapping.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;
use thiserror::Error;

use log::info;

use crate::token::Span;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error. `message` already names the offending
    /// token (`Error at 'x': …`).
    #[error("[line {line}] {message}")]
    Parse { message: String, line: usize },

    /// One or more static‑analysis failures. Execution never started.
    #[error("{0}")]
    Resolve(StaticErrors),

    /// Runtime evaluation error raised by the program.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Resolver/evaluator disagreement. Always a bug in the interpreter.
    #[error("Internal interpreter error: {0}")]
    Internal(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Process exit status the driver should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve(_) => 65,
            LoxError::Runtime(_) => 70,
            LoxError::Internal(_) => 71,
            LoxError::Io(_) | LoxError::Utf8(_) => 74,
        }
    }
}

impl From<Vec<StaticError>> for LoxError {
    fn from(errors: Vec<StaticError>) -> Self {
        LoxError::Resolve(StaticErrors(errors))
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

// ─────────────────────────────────────────────────────────────────────────────
// Static (resolver) errors
// ─────────────────────────────────────────────────────────────────────────────

/// What the resolver objected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticErrorKind {
    /// `var a = a;` inside a local scope.
    SelfReferencingInitializer,

    /// `return` at top level.
    ReturnOutsideFunction,

    /// Same name declared twice in one local scope.
    Redeclaration,
}

impl fmt::Display for StaticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            StaticErrorKind::SelfReferencingInitializer => {
                "Can't read local variable in its own initializer."
            }
            StaticErrorKind::ReturnOutsideFunction => "Can't return from top-level code.",
            StaticErrorKind::Redeclaration => "Already a variable with this name in this scope.",
        };

        f.write_str(msg)
    }
}

/// A scope rule violation found before execution.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("[line {}] Error at '{lexeme}': {kind}", .span.line)]
pub struct StaticError {
    pub kind: StaticErrorKind,

    /// Offending identifier or keyword.
    pub lexeme: String,

    pub span: Span,
}

impl StaticError {
    pub fn new(kind: StaticErrorKind, lexeme: impl Into<String>, span: Span) -> Self {
        let lexeme = lexeme.into();

        info!("Creating Resolve error: {}, kind={:?}, at {}", lexeme, kind, span);

        Self { kind, lexeme, span }
    }
}

/// Every static error of one resolve pass, reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticErrors(pub Vec<StaticError>);

impl fmt::Display for StaticErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime errors
// ─────────────────────────────────────────────────────────────────────────────

/// An error raised while executing a program. Not catchable by the program.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'.\n[line {}]", .span.line)]
    UndefinedVariable { name: String, span: Span },

    #[error("Operand of '{operator}' must be a number, got {found}.\n[line {}]", .span.line)]
    NumberOperand {
        operator: &'static str,
        found: &'static str,
        span: Span,
    },

    #[error("Operands of '{operator}' must be numbers, got {left} and {right}.\n[line {}]", .span.line)]
    NumberOperands {
        operator: &'static str,
        left: &'static str,
        right: &'static str,
        span: Span,
    },

    #[error("Operands of '+' must be two numbers or two strings, got {left} and {right}.\n[line {}]", .span.line)]
    AddOperands {
        left: &'static str,
        right: &'static str,
        span: Span,
    },

    #[error("Division by zero.\n[line {}]", .span.line)]
    DivisionByZero { span: Span },

    #[error("Can only call functions, got {found}.\n[line {}]", .span.line)]
    NotCallable { found: &'static str, span: Span },

    #[error("'{callee}' expected {expected} arguments but got {found}.\n[line {}]", .span.line)]
    Arity {
        callee: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("Stack overflow: more than {depth} nested calls.\n[line {}]", .span.line)]
    StackOverflow { depth: usize, span: Span },

    #[error("Native function '{name}' failed: {message}\n[line {}]", .span.line)]
    Native {
        name: String,
        message: String,
        span: Span,
    },
}

impl RuntimeError {
    /// Source position the error is attributed to.
    pub fn span(&self) -> Span {
        match self {
            RuntimeError::UndefinedVariable { span, .. }
            | RuntimeError::NumberOperand { span, .. }
            | RuntimeError::NumberOperands { span, .. }
            | RuntimeError::AddOperands { span, .. }
            | RuntimeError::DivisionByZero { span }
            | RuntimeError::NotCallable { span, .. }
            | RuntimeError::Arity { span, .. }
            | RuntimeError::StackOverflow { span, .. }
            | RuntimeError::Native { span, .. } => *span,
        }
    }
}
