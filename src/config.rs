// ABOUTME: Version info and REPL welcome banner

#[allow(dead_code)]
pub const VERSION: &str = "1.0.0";
pub const WELCOME_MESSAGE: &str = "Lox Interpreter v1.0";
pub const WELCOME_SUBTITLE: &str = "A tree-walking interpreter for the Lox language";
