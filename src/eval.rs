// ABOUTME: Tree-walking interpreter executing resolved statements and expressions

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{Callable, LoxClass, LoxFunction, NativeFunction};
use crate::env::Environment;
use crate::error::{Reporter, RuntimeError};
use crate::resolver::Locals;
use crate::token::{Token, TokenKind};
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// What a statement did, as far as control flow above it is concerned.
/// Models non-local `return` as data instead of unwinding a panic.
pub enum ExecSignal {
    Normal,
    Return(Value),
}

impl ExecSignal {
    pub fn into_return_value(self) -> Value {
        match self {
            ExecSignal::Normal => Value::Nil,
            ExecSignal::Return(value) => value,
        }
    }
}

pub struct Interpreter<'a> {
    globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: Locals,
    reporter: &'a Reporter,
}

impl<'a> Interpreter<'a> {
    pub fn new(locals: Locals, reporter: &'a Reporter) -> Self {
        let globals = Environment::new();
        globals.define(
            "clock".to_string(),
            Value::Callable(Rc::new(NativeFunction { name: "clock", arity: 0, func: native_clock })),
        );

        Interpreter { environment: Rc::clone(&globals), globals, locals, reporter }
    }

    /// Merges another batch of resolver output into this interpreter's
    /// scope-distance table. Used by the REPL, which resolves each line
    /// independently but evaluates all of them against one persistent
    /// interpreter.
    pub fn extend_locals(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    pub fn run(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            if let Err(err) = self.execute(stmt) {
                self.reporter.runtime_error(&err);
                return;
            }
        }
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<ExecSignal, RuntimeError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(ExecSignal::Normal)
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                println!("{value}");
                Ok(ExecSignal::Normal)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(ExecSignal::Normal)
            }
            Stmt::Block(statements) => {
                let scope = Environment::with_parent(Rc::clone(&self.environment));
                self.execute_block(statements, scope)
            }
            Stmt::If { condition, then_branch, else_branch } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(ExecSignal::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        ExecSignal::Normal => {}
                        signal @ ExecSignal::Return(_) => return Ok(signal),
                    }
                }
                Ok(ExecSignal::Normal)
            }
            Stmt::Function(decl) => {
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment.define(decl.name.lexeme.clone(), Value::Callable(Rc::new(function)));
                Ok(ExecSignal::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(ExecSignal::Return(value))
            }
            Stmt::Class { name, superclass, methods } => {
                self.execute_class(name, superclass.as_ref(), methods)
            }
        }
    }

    /// Runs `statements` in `env`, restoring the previous environment
    /// afterward even if a statement fails or returns.
    pub fn execute_block(&mut self, statements: &[Stmt], env: Rc<Environment>) -> Result<ExecSignal, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, env);

        let mut result = Ok(ExecSignal::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(ExecSignal::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass_expr: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<ExecSignal, RuntimeError> {
        let superclass = match superclass_expr {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        let token = superclass_name_token(expr);
                        return Err(RuntimeError::other(token, "Superclass must be a class"));
                    }
                }
            }
            None => None,
        };

        self.environment.define(name.lexeme.clone(), Value::Nil);

        let previous_env = superclass.as_ref().map(|superclass| {
            let env = Environment::with_parent(Rc::clone(&self.environment));
            env.define("super".to_string(), Value::Class(Rc::clone(superclass)));
            std::mem::replace(&mut self.environment, env)
        });

        let mut method_table = HashMap::new();
        for method in methods {
            let function = LoxFunction::new(
                Rc::clone(method),
                Rc::clone(&self.environment),
                method.name.lexeme == "init",
            );
            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        if let Some(previous) = previous_env {
            self.environment = previous;
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass, method_table);
        self.environment.assign(name, Value::Class(Rc::new(class)))?;

        Ok(ExecSignal::Normal)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Unary { op, right } => self.evaluate_unary(op, right),
            Expr::Binary { left, op, right } => self.evaluate_binary(left, op, right),
            Expr::Logical { left, op, right } => self.evaluate_logical(left, op, right),
            Expr::Variable { id, name } => self.lookup_variable(*id, name),
            Expr::Assign { id, name, value } => self.evaluate_assign(*id, name, value),
            Expr::Call { callee, paren, args } => self.evaluate_call(callee, paren, args),
            Expr::Get { object, name } => self.evaluate_get(object, name),
            Expr::Set { object, name, value } => self.evaluate_set(object, name, value),
            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),
            Expr::Super { id, keyword, method } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let right = self.evaluate(right)?;
        match op.kind {
            TokenKind::Minus => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::type_error(op, "Operand must be a number")),
            },
            TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
            _ => unreachable!("parser only produces unary ops for - and !"),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match op.kind {
            TokenKind::Minus => numeric_op(op, &left, &right, |a, b| a - b),
            TokenKind::Slash => numeric_op(op, &left, &right, |a, b| a / b),
            TokenKind::Star => numeric_op(op, &left, &right, |a, b| a * b),
            TokenKind::Plus => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
                _ => Err(RuntimeError::type_error(op, "Operands must be two numbers or two strings")),
            },
            TokenKind::Greater => numeric_cmp(op, &left, &right, |a, b| a > b),
            TokenKind::GreaterEqual => numeric_cmp(op, &left, &right, |a, b| a >= b),
            TokenKind::Less => numeric_cmp(op, &left, &right, |a, b| a < b),
            TokenKind::LessEqual => numeric_cmp(op, &left, &right, |a, b| a <= b),
            TokenKind::BangEqual => Ok(Value::Bool(!left.is_equal(&right))),
            TokenKind::EqualEqual => Ok(Value::Bool(left.is_equal(&right))),
            _ => unreachable!("parser only produces binary ops for these kinds"),
        }
    }

    /// `and`/`or` short-circuit and yield the deciding operand's own value,
    /// not a coerced boolean (§4.2).
    fn evaluate_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let left = self.evaluate(left)?;

        if op.kind == TokenKind::Or {
            if left.is_truthy() {
                return Ok(left);
            }
        } else if !left.is_truthy() {
            return Ok(left);
        }

        self.evaluate(right)
    }

    fn lookup_variable(&self, id: u32, name: &Token) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(self.environment.get_at(distance, &name.lexeme)),
            None => self.globals.get(name),
        }
    }

    fn evaluate_assign(&mut self, id: u32, name: &Token, value: &Expr) -> Result<Value, RuntimeError> {
        let value = self.evaluate(value)?;

        match self.locals.get(&id) {
            Some(&distance) => self.environment.assign_at(distance, &name.lexeme, value.clone()),
            None => self.globals.assign(name, value.clone())?,
        }

        Ok(value)
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> Result<Value, RuntimeError> {
        let callee = self.evaluate(callee)?;

        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            arguments.push(self.evaluate(arg)?);
        }

        match callee {
            Value::Callable(callable) => {
                check_arity(paren, callable.arity(), arguments.len())?;
                callable.call(self, arguments)
            }
            Value::Class(class) => {
                check_arity(paren, class.arity(), arguments.len())?;
                class.construct(self, arguments)
            }
            _ => Err(RuntimeError::not_callable(paren)),
        }
    }

    fn evaluate_get(&mut self, object: &Expr, name: &Token) -> Result<Value, RuntimeError> {
        let object = self.evaluate(object)?;
        match object {
            Value::Instance(instance) => instance.get(name),
            _ => Err(RuntimeError::other(name, "Only instances have properties")),
        }
    }

    fn evaluate_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> Result<Value, RuntimeError> {
        let object = self.evaluate(object)?;
        let Value::Instance(instance) = object else {
            return Err(RuntimeError::other(name, "Only instances have fields"));
        };

        let value = self.evaluate(value)?;
        instance.set(name, value.clone());
        Ok(value)
    }

    fn evaluate_super(&mut self, id: u32, _keyword: &Token, method: &Token) -> Result<Value, RuntimeError> {
        let distance = *self.locals.get(&id).expect("resolver always resolves 'super'");
        let superclass = match self.environment.get_at(distance, "super") {
            Value::Class(class) => class,
            _ => unreachable!("resolver only binds 'super' to a class value"),
        };

        let instance = match self.environment.get_at(distance - 1, "this") {
            Value::Instance(instance) => instance,
            _ => unreachable!("'this' sits one scope inside 'super'"),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Callable(Rc::new(found.bind(instance)))),
            None => Err(RuntimeError::undefined_property(method)),
        }
    }
}

fn superclass_name_token(expr: &Expr) -> &Token {
    match expr {
        Expr::Variable { name, .. } => name,
        _ => unreachable!("parser only produces Variable nodes for a superclass clause"),
    }
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Nil => Value::Nil,
        LiteralValue::Bool(b) => Value::Bool(*b),
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::Str(s.clone()),
    }
}

fn numeric_op(
    op: &Token,
    left: &Value,
    right: &Value,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(RuntimeError::type_error(op, "Operands must be numbers")),
    }
}

fn numeric_cmp(
    op: &Token,
    left: &Value,
    right: &Value,
    f: impl Fn(f64, f64) -> bool,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(f(*a, *b))),
        _ => Err(RuntimeError::type_error(op, "Operands must be numbers")),
    }
}

fn check_arity(paren: &Token, expected: usize, actual: usize) -> Result<(), RuntimeError> {
    if expected != actual {
        return Err(RuntimeError::arity_mismatch(paren, expected, actual));
    }
    Ok(())
}

fn native_clock(_args: &[Value]) -> Result<Value, RuntimeError> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Ok(Value::Number(seconds))
}
