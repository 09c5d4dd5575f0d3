use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::scanner::Scanner;

/// Stack for the thread that runs the command; room for
/// [`rox::interpreter::MAX_CALL_DEPTH`] nested calls in a debug build.
const STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable debug logging to a file
    #[arg(long, global = true)]
    log: bool,

    /// Where `--log` writes to
    #[arg(long, global = true, default_value = "app.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print each token as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Parses a program from a file and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a program
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file as UTF‑8 text.
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    match String::from_utf8(buf) {
        Ok(text) => Ok(text),
        Err(e) => fail(LoxError::from(e)),
    }
}

fn init_logger(path: &PathBuf) -> Result<()> {
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    // `[module:line] - message`, written to the log file
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

/// Report `err` on stderr and exit with its status code.
fn fail<T>(err: LoxError) -> Result<T> {
    debug!("Exiting on error: {:?}", err);
    eprintln!("{}", err);
    std::process::exit(err.exit_code());
}

fn no_input() {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger(&args.log_file)?;
    } else {
        // Silent unless RUST_LOG asks otherwise
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .parse_default_env()
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let worker = thread::Builder::new()
        .name("rox".into())
        .stack_size(STACK_SIZE)
        .spawn(move || execute(args.commands))
        .context("Failed to spawn interpreter thread")?;

    worker
        .join()
        .map_err(|_| anyhow!("Interpreter thread panicked"))?
}

fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else {
                no_input();
                return Ok(());
            };

            let source = read_file(filename)?;
            let mut tokenized = true;

            for token in Scanner::new(&source) {
                match token {
                    Ok(token) if json => println!("{}", serde_json::to_string(&token)?),

                    Ok(token) => println!("{}", token),

                    Err(e) => {
                        tokenized = false;
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else {
                no_input();
                return Ok(());
            };

            let source = read_file(filename)?;
            let statements = rox::parse_program(&source).or_else(fail)?;

            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else {
                no_input();
                return Ok(());
            };

            let source = read_file(filename)?;
            let tokens = rox::tokenize(&source).or_else(fail)?;
            let expr = Parser::new(&tokens).parse_expression().or_else(fail)?;

            let mut interpreter = Interpreter::new();
            match interpreter.evaluate(&expr) {
                Ok(value) => println!("{}", value),
                Err(e) => fail(LoxError::from(e))?,
            }
        }

        Commands::Run { filename } => {
            let Some(filename) = filename else {
                no_input();
                return Ok(());
            };

            let source = read_file(filename)?;
            let statements = rox::parse_program(&source).or_else(fail)?;
            let bindings = rox::resolve(&statements).or_else(|errs| fail(errs.into()))?;

            let mut interpreter = Interpreter::new();
            match interpreter.interpret(&statements, &bindings) {
                Ok(()) => info!("Program executed successfully"),
                Err(e) => fail(LoxError::from(e))?,
            }
        }
    }

    Ok(())
}
