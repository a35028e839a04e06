// ABOUTME: Diagnostic sink and error types for compile-time and runtime failures

use crate::token::{Token, TokenKind};
use std::cell::Cell;
use thiserror::Error;

/// Sentinel signaling that the parser failed to produce a node and the
/// caller should synchronize. The diagnostic text itself was already
/// handed to the `Reporter` at the point of failure.
#[derive(Debug, Clone, Copy)]
pub struct ParseError;

/// Runtime errors carry the offending token so the reporter can recover
/// a source line, and a message describing the specific violation.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("{message}")]
    TypeError { token: Token, message: String },

    #[error("Undefined variable '{name}'")]
    UndefinedVariable { token: Token, name: String },

    #[error("Undefined property '{name}'")]
    UndefinedProperty { token: Token, name: String },

    #[error("can only call functions and methods")]
    NotCallable { token: Token },

    #[error("Expected {expected} arguments but got {actual}")]
    ArityMismatch { token: Token, expected: usize, actual: usize },

    #[error("{message}")]
    Other { token: Token, message: String },
}

impl RuntimeError {
    pub fn token(&self) -> &Token {
        match self {
            RuntimeError::TypeError { token, .. }
            | RuntimeError::UndefinedVariable { token, .. }
            | RuntimeError::UndefinedProperty { token, .. }
            | RuntimeError::NotCallable { token }
            | RuntimeError::ArityMismatch { token, .. }
            | RuntimeError::Other { token, .. } => token,
        }
    }

    pub fn type_error(token: &Token, message: impl Into<String>) -> Self {
        RuntimeError::TypeError { token: token.clone(), message: message.into() }
    }

    pub fn undefined_variable(token: &Token) -> Self {
        RuntimeError::UndefinedVariable { token: token.clone(), name: token.lexeme.clone() }
    }

    pub fn undefined_property(token: &Token) -> Self {
        RuntimeError::UndefinedProperty { token: token.clone(), name: token.lexeme.clone() }
    }

    pub fn not_callable(token: &Token) -> Self {
        RuntimeError::NotCallable { token: token.clone() }
    }

    pub fn arity_mismatch(token: &Token, expected: usize, actual: usize) -> Self {
        RuntimeError::ArityMismatch { token: token.clone(), expected, actual }
    }

    pub fn other(token: &Token, message: impl Into<String>) -> Self {
        RuntimeError::Other { token: token.clone(), message: message.into() }
    }
}

/// Collects compile-time diagnostics and the single runtime error that
/// terminates a run, and exposes the flags the driver uses to pick an
/// exit code.
#[derive(Default)]
pub struct Reporter {
    had_compile_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    pub fn had_compile_error(&self) -> bool {
        self.had_compile_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Resets both flags between REPL lines.
    pub fn reset(&self) {
        self.had_compile_error.set(false);
        self.had_runtime_error.set(false);
    }

    /// Lexical error: no token context, just a source line.
    pub fn error(&self, line: usize, message: &str) {
        self.report(line, "", message);
    }

    /// Syntax or resolution error, attributed to a specific token.
    pub fn error_at_token(&self, token: &Token, message: &str) {
        if token.kind == TokenKind::Eof {
            self.report(token.line, " at end", message);
        } else {
            self.report(token.line, &format!(" at '{}'", token.lexeme), message);
        }
    }

    /// Like `error_at_token`, but also returns the `ParseError` sentinel
    /// so parser call sites can propagate it with `?`/`return`.
    pub fn syntax_error(&self, token: &Token, message: &str) -> ParseError {
        self.error_at_token(token, message);
        ParseError
    }

    pub fn runtime_error(&self, err: &RuntimeError) {
        eprintln!("[{}] RunTimeError: {}", err.token().line, err);
        self.had_runtime_error.set(true);
    }

    fn report(&self, line: usize, where_: &str, message: &str) {
        eprintln!("[{line}] Error{where_}: {message}");
        self.had_compile_error.set(true);
    }
}
