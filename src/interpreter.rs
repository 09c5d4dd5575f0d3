use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::ast::{BinaryOp, Expr, ExprId, Identifier, LiteralValue, LogicalOp, Stmt, UnaryOp};
use crate::callable::{Callable, LoxFunction, NativeFn};
use crate::environment::{EnvError, Environment};
use crate::error::{LoxError, RuntimeError};
use crate::natives;
use crate::resolver::Bindings;
use crate::token::Span;
use crate::value::Value;

/// Everything that can abort execution. `return` is *not* in here: it
/// travels as [`Flow::Return`].
#[derive(Error, Debug)]
pub enum InterpretError {
    /// A legitimate program error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Resolver and environment disagree about a binding.
    #[error("Internal interpreter error: {0}")]
    Internal(String),

    /// The output sink failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<InterpretError> for LoxError {
    fn from(err: InterpretError) -> Self {
        match err {
            InterpretError::Runtime(e) => LoxError::Runtime(e),
            InterpretError::Internal(msg) => LoxError::Internal(msg),
            InterpretError::Io(e) => LoxError::Io(e),
        }
    }
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, InterpretError>;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,

    /// Unwinding towards the nearest call boundary.
    Return(Value),
}

/// Default nesting limit for user function calls.
///
/// Each call costs a handful of host stack frames; the driver runs programs
/// on a thread whose stack fits this many calls in a debug build.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Tree‑walking evaluator. `print` output goes to `W`.
pub struct Interpreter<W: Write = io::Stdout> {
    globals: Environment,
    environment: Environment,
    /// Depths of every program run so far; never pruned.
    bindings: Bindings,
    output: W,

    /// User function calls currently executing.
    depth: usize,
    max_depth: usize,
}

impl Interpreter<io::Stdout> {
    /// Interpreter printing to stdout, with the standard natives installed.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Creates an Interpreter writing to `output` and defines the standard
    /// natives such as `clock` and `str`.
    pub fn with_output(output: W) -> Self {
        let mut interpreter = Self::bare(output);

        for (name, arity, func) in natives::standard() {
            interpreter.define_native(name, arity, func);
        }

        interpreter
    }

    /// An interpreter with an empty global frame.
    pub fn bare(output: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Environment::new();

        Self {
            environment: globals.clone(),
            globals,
            bindings: Bindings::new(),
            output,
            depth: 0,
            max_depth: MAX_CALL_DEPTH,
        }
    }

    /// Replace the call nesting limit ([`MAX_CALL_DEPTH`] by default).
    pub fn with_max_call_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Install a built‑in in the global frame.
    pub fn define_native(&mut self, name: &str, arity: usize, func: NativeFn) {
        debug!("Defining native function '{}' / {}", name, arity);

        self.globals
            .define(name, Value::Callable(Callable::native(name, arity, func)));
    }

    /// Resolved depths accumulated across every `interpret` call.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs a resolved program. On a runtime error the remaining statements
    /// are skipped and the interpreter is left at global scope, ready for
    /// another program.
    ///
    /// `bindings` are merged into the interpreter's table and kept for its
    /// whole lifetime, since functions defined by this program may be called
    /// by later ones. The table only grows; a host running unrelated programs
    /// should use a fresh interpreter for each.
    pub fn interpret(&mut self, statements: &[Stmt], bindings: &Bindings) -> IResult<()> {
        info!("Interpreting {} statements", statements.len());

        self.bindings.extend(bindings);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}

                Ok(Flow::Return(value)) => {
                    warn!("Top-level return of {} stops the program", value);
                    break;
                }

                Err(e) => {
                    debug!("Execution aborted: {}", e);
                    self.environment = self.globals.clone();
                    self.depth = 0;
                    return Err(e);
                }
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(&name.name, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                debug!("Entering block with {} statements", statements.len());
                let frame = self.environment.child();
                self.execute_block(statements, frame)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.name);
                // Capture the frame of the *declaration*.
                let function = LoxFunction::new(Rc::clone(decl), self.environment.clone());
                self.environment.define(
                    &decl.name.name,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }
        }
    }

    /// Runs `statements` in `frame`, restoring the current frame on every
    /// exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], frame: Environment) -> IResult<Flow> {
        let previous = mem::replace(&mut self.environment, frame);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(literal(lit)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary {
                operator,
                span,
                right,
            } => {
                let right = self.evaluate(right)?;
                unary(*operator, *span, right)
            }

            Expr::Binary {
                left,
                operator,
                span,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(binary(*operator, *span, left, right)?)
            }

            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = match operator {
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::And => !left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                let result = match self.bindings.depth(*id) {
                    Some(depth) => self.environment.assign_at(depth, &name.name, value.clone()),
                    None => self.globals.assign_global(&name.name, value.clone()),
                };
                result.map_err(|e| lookup_error(e, name))?;
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callable = match self.evaluate(callee)? {
                    Value::Callable(callable) => callable,
                    other => {
                        return Err(RuntimeError::NotCallable {
                            found: other.kind(),
                            span: *paren,
                        }
                        .into());
                    }
                };

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call(&callable, args, *paren)
            }
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Identifier) -> IResult<Value> {
        let result = match self.bindings.depth(id) {
            Some(depth) => self.environment.get_at(depth, &name.name),
            None => self.globals.get_global(&name.name),
        };

        result.map_err(|e| lookup_error(e, name))
    }

    /// Invokes a callable (native or user-defined function).
    fn call(&mut self, callable: &Callable, args: Vec<Value>, paren: Span) -> IResult<Value> {
        if args.len() != callable.arity() {
            return Err(RuntimeError::Arity {
                callee: callable.name().to_string(),
                expected: callable.arity(),
                found: args.len(),
                span: paren,
            }
            .into());
        }

        match callable {
            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);
                let result = (native.func)(&args).map_err(|message| RuntimeError::Native {
                    name: native.name.clone(),
                    message,
                    span: paren,
                })?;
                debug!("Native function '{}' returned: {}", native.name, result);
                Ok(result)
            }

            Callable::Function(function) => {
                let decl = function.declaration();
                debug!(
                    "Calling user-defined function '{}' at depth {}",
                    decl.name.name, self.depth
                );

                if self.depth >= self.max_depth {
                    warn!("Call depth limit {} reached in '{}'", self.max_depth, decl.name.name);
                    return Err(RuntimeError::StackOverflow {
                        depth: self.max_depth,
                        span: paren,
                    }
                    .into());
                }

                // New frame chained to the closure, not to the caller.
                let frame = function.closure().child();
                for (param, arg) in decl.params.iter().zip(args) {
                    frame.define(&param.name, arg);
                }

                self.depth += 1;
                let result = self.execute_block(&decl.body, frame);
                self.depth -= 1;

                match result? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal => Ok(Value::Nil),
                }
            }
        }
    }
}

fn lookup_error(err: EnvError, name: &Identifier) -> InterpretError {
    if err.is_defect() {
        error!("Binding defect for '{}' at {}: {}", name.name, name.span, err);
        InterpretError::Internal(format!("{} (at {})", err, name.span))
    } else {
        RuntimeError::UndefinedVariable {
            name: name.name.clone(),
            span: name.span,
        }
        .into()
    }
}

fn literal(lit: &LiteralValue) -> Value {
    match lit {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

fn unary(operator: UnaryOp, span: Span, right: Value) -> IResult<Value> {
    match operator {
        UnaryOp::Negate => match right {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(RuntimeError::NumberOperand {
                operator: operator.symbol(),
                found: other.kind(),
                span,
            }
            .into()),
        },
        UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
    }
}

fn binary(operator: BinaryOp, span: Span, left: Value, right: Value) -> Result<Value, RuntimeError> {
    let numbers = |left: &Value, right: &Value| match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::NumberOperands {
            operator: operator.symbol(),
            left: left.kind(),
            right: right.kind(),
            span,
        }),
    };

    match operator {
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (left, right) => Err(RuntimeError::AddOperands {
                left: left.kind(),
                right: right.kind(),
                span,
            }),
        },
        BinaryOp::Subtract => numbers(&left, &right).map(|(a, b)| Value::Number(a - b)),
        BinaryOp::Multiply => numbers(&left, &right).map(|(a, b)| Value::Number(a * b)),
        BinaryOp::Divide => {
            let (a, b) = numbers(&left, &right)?;
            if b == 0.0 {
                Err(RuntimeError::DivisionByZero { span })
            } else {
                Ok(Value::Number(a / b))
            }
        }
        BinaryOp::Less => numbers(&left, &right).map(|(a, b)| Value::Bool(a < b)),
        BinaryOp::LessEqual => numbers(&left, &right).map(|(a, b)| Value::Bool(a <= b)),
        BinaryOp::Greater => numbers(&left, &right).map(|(a, b)| Value::Bool(a > b)),
        BinaryOp::GreaterEqual => numbers(&left, &right).map(|(a, b)| Value::Bool(a >= b)),
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
    }
}
