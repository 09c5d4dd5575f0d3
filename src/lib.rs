pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod natives;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::io::Write;

pub use error::{LoxError, Result};
pub use interpreter::Interpreter;
pub use resolver::resolve;

/// Scan the whole source, stopping at the first lexical error.
pub fn tokenize(source: &str) -> Result<Vec<token::Token<'_>>> {
    scanner::Scanner::new(source).collect()
}

/// Scan and parse a complete program.
pub fn parse_program(source: &str) -> Result<Vec<ast::Stmt>> {
    let tokens = tokenize(source)?;
    parser::Parser::new(&tokens).parse()
}

/// Scan, parse, resolve and run `source` on `interpreter`.
pub fn run<W: Write>(source: &str, interpreter: &mut Interpreter<W>) -> Result<()> {
    let statements = parse_program(source)?;
    let bindings = resolve(&statements)?;
    interpreter.interpret(&statements, &bindings)?;
    Ok(())
}
