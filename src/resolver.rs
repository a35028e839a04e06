// ABOUTME: Static resolver computing lexical scope distances ahead of interpretation

use crate::ast::{Expr, FunctionDecl, NodeId, Stmt};
use crate::error::Reporter;
use crate::token::Token;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Scope-distance table the interpreter consults instead of walking the
/// environment chain by name at call time. Keyed by the `NodeId` the
/// parser stamped on each `Variable`/`Assign`/`This`/`Super` node.
pub type Locals = HashMap<NodeId, usize>;

pub struct Resolver<'a> {
    reporter: &'a Reporter,
    scopes: Vec<HashMap<String, bool>>,
    locals: Locals,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a> Resolver<'a> {
    pub fn new(reporter: &'a Reporter) -> Self {
        Resolver {
            reporter,
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> Locals {
        self.resolve_statements(statements);
        self.locals
    }

    fn resolve_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_statements(statements);
                self.end_scope();
            }
            Stmt::Class { name, superclass, methods } => {
                self.resolve_class(name, superclass.as_ref(), methods);
            }
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::If { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.reporter.error_at_token(keyword, "Can't return from top-level code");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.reporter.error_at_token(keyword, "Can't return a value from an initializer");
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Rc<FunctionDecl>]) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(Expr::Variable { name: super_name, .. }) = superclass {
            if super_name.lexeme == name.lexeme {
                self.reporter.error_at_token(super_name, "A class can't inherit from itself");
            }
            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass.unwrap());
        }

        if superclass.is_some() {
            self.begin_scope();
            self.scopes.last_mut().unwrap().insert("super".to_string(), true);
        }

        self.begin_scope();
        self.scopes.last_mut().unwrap().insert("this".to_string(), true);

        for method in methods {
            let declaration = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, declaration);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_statements(&decl.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.reporter.error_at_token(name, "Can't read local variable in its own initializer");
                    }
                }
                self.resolve_local(*id, &name.lexeme);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, &name.lexeme);
            }
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.reporter.error_at_token(keyword, "Can't use 'this' outside of a class");
                    return;
                }
                self.resolve_local(*id, "this");
            }
            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.reporter.error_at_token(keyword, "Can't use 'super' outside of a class");
                    }
                    ClassType::Class => {
                        self.reporter.error_at_token(keyword, "Can't use 'super' in a class with no superclass");
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, "super");
            }
            Expr::Literal(_) => {}
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.locals.insert(id, depth);
                return;
            }
        }
        // Not found in any scope: treated as global, resolved dynamically
        // at runtime (§4.3).
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.reporter.error_at_token(name, "Already a variable with this name in this scope");
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve(src: &str) -> (Locals, bool) {
        let reporter = Reporter::new();
        let tokens = Scanner::new(src).scan_tokens(&reporter);
        let stmts = Parser::new(tokens, &reporter).parse();
        let locals = Resolver::new(&reporter).resolve(&stmts);
        (locals, reporter.had_compile_error())
    }

    #[test]
    fn resolves_local_shadowing_distance() {
        let (locals, had_error) = resolve(
            "var a = 1; { var a = 2; print a; }",
        );
        assert!(!had_error);
        assert_eq!(locals.len(), 1);
        assert_eq!(*locals.values().next().unwrap(), 0);
    }

    #[test]
    fn closure_captures_variable_at_definition_time_scope() {
        let (locals, had_error) = resolve(
            "fun make() { var a = 1; fun show() { print a; } return show; }",
        );
        assert!(!had_error);
        assert_eq!(locals.len(), 1);
        assert_eq!(*locals.values().next().unwrap(), 1);
    }

    #[test]
    fn reading_own_initializer_is_an_error() {
        let (_, had_error) = resolve("var a = 1; { var a = a; }");
        assert!(had_error);
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        let (_, had_error) = resolve("return 1;");
        assert!(had_error);
    }

    #[test]
    fn return_value_from_initializer_is_an_error() {
        let (_, had_error) = resolve("class A { init() { return 1; } }");
        assert!(had_error);
    }

    #[test]
    fn this_outside_class_is_an_error() {
        let (_, had_error) = resolve("print this;");
        assert!(had_error);
    }

    #[test]
    fn super_without_superclass_is_an_error() {
        let (_, had_error) = resolve("class A { f() { super.f(); } }");
        assert!(had_error);
    }

    #[test]
    fn class_inheriting_itself_is_an_error() {
        let (_, had_error) = resolve("class A < A {}");
        assert!(had_error);
    }

    #[test]
    fn duplicate_local_declaration_is_an_error() {
        let (_, had_error) = resolve("{ var a = 1; var a = 2; }");
        assert!(had_error);
    }
}
