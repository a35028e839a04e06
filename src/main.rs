mod ast;
mod callable;
mod config;
mod env;
mod error;
mod eval;
mod parser;
mod resolver;
mod scanner;
mod token;
mod value;

use ast::NodeId;
use clap::Parser as ClapParser;
use config::{VERSION, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use error::Reporter;
use eval::Interpreter;
use parser::Parser;
use resolver::{Locals, Resolver};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use scanner::Scanner;
use std::path::PathBuf;
use std::process::ExitCode;

/// Tree-walking interpreter for the Lox language
#[derive(ClapParser, Debug)]
#[command(name = "lox")]
#[command(version = VERSION)]
#[command(about = "A tree-walking interpreter for the Lox language")]
struct CliArgs {
    /// Script file to execute (omit to start the REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    match args.script {
        Some(path) => run_file(&path),
        None => run_prompt(),
    }
}

/// Reads the file, runs the pipeline once, and maps the reporter's flags to
/// the exit codes in §6 (0 / 65 / 70).
fn run_file(path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Cannot read script file {}: {}", path.display(), err);
            return ExitCode::from(74);
        }
    };

    let reporter = Reporter::new();
    run(&source, &reporter);

    if reporter.had_compile_error() {
        ExitCode::from(65)
    } else if reporter.had_runtime_error() {
        ExitCode::from(70)
    } else {
        ExitCode::SUCCESS
    }
}

/// Interactive `> ` prompt, one line at a time. A compile or runtime error
/// on one line is reported but does not end the session (§6). Unlike
/// `run_file`, a single `Interpreter` (and its `globals` environment)
/// persists across every line, so a variable or function declared on one
/// line stays visible to the next.
fn run_prompt() -> ExitCode {
    println!("{WELCOME_MESSAGE}");
    println!("{WELCOME_SUBTITLE}");

    let config = Config::builder().auto_add_history(true).build();
    let mut editor = match DefaultEditor::with_config(config) {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Failed to initialize REPL: {err}");
            return ExitCode::FAILURE;
        }
    };

    let history_file = ".lox_history";
    let _ = editor.load_history(history_file);

    let reporter = Reporter::new();
    let mut interpreter = Interpreter::new(Locals::new(), &reporter);
    let mut next_id: NodeId = 0;

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                reporter.reset();

                let tokens = Scanner::new(&line).scan_tokens(&reporter);
                let (statements, updated_next_id) =
                    Parser::with_start_id(tokens, &reporter, next_id).parse_and_next_id();
                next_id = updated_next_id;

                if reporter.had_compile_error() {
                    continue;
                }

                let locals = Resolver::new(&reporter).resolve(&statements);
                if reporter.had_compile_error() {
                    continue;
                }

                interpreter.extend_locals(locals);
                interpreter.run(&statements);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    let _ = editor.save_history(history_file);
    ExitCode::SUCCESS
}

/// Runs the scan → parse → resolve → interpret pipeline on one chunk of
/// source, halting before interpretation if scanning/parsing/resolving
/// produced any diagnostic (§2).
fn run(source: &str, reporter: &Reporter) {
    let tokens = Scanner::new(source).scan_tokens(reporter);
    let statements = Parser::new(tokens, reporter).parse();

    if reporter.had_compile_error() {
        return;
    }

    let locals = Resolver::new(reporter).resolve(&statements);

    if reporter.had_compile_error() {
        return;
    }

    let mut interpreter = Interpreter::new(locals, reporter);
    interpreter.run(&statements);
}
