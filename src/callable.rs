// ABOUTME: Callable values — user functions, classes, instances, and native functions

use crate::ast::FunctionDecl;
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::eval::Interpreter;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Anything that can appear on the left of a call expression.
pub trait Callable: fmt::Debug + fmt::Display {
    fn arity(&self) -> usize;
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError>;
}

/// A host-provided function with no Lox-level declaration, e.g. `clock`.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, RuntimeError>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        (self.func)(&arguments)
    }
}

/// A user-declared function or method, closing over the environment it was
/// declared in. Bound methods are fresh `LoxFunction`s wrapping a one-off
/// scope that defines `this`.
#[derive(Debug, Clone)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<Environment>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<Environment>, is_initializer: bool) -> Self {
        LoxFunction { declaration, closure, is_initializer }
    }

    /// Produces a new function whose closure is a fresh scope, enclosing
    /// the original closure, with `this` bound to `instance`.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let env = Environment::with_parent(Rc::clone(&self.closure));
        env.define("this".to_string(), Value::Instance(instance));
        LoxFunction { declaration: Rc::clone(&self.declaration), closure: env, is_initializer: self.is_initializer }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        let env = Environment::with_parent(Rc::clone(&self.closure));
        for (param, arg) in self.declaration.params.iter().zip(arguments) {
            env.define(param.lexeme.clone(), arg);
        }

        let result = interpreter.execute_block(&self.declaration.body, env)?;

        if self.is_initializer {
            return Ok(self.closure.get_at(0, "this"));
        }

        Ok(result.into_return_value())
    }
}

/// A class value. Calling it constructs a new instance and, if an `init`
/// method is found (own or inherited), invokes it.
#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(name: String, superclass: Option<Rc<LoxClass>>, methods: HashMap<String, Rc<LoxFunction>>) -> Self {
        LoxClass { name, superclass, methods }
    }

    /// Walks the inheritance chain. Used for both `super.method` dispatch
    /// and the constructor's `init` lookup, so a subclass that doesn't
    /// declare its own `init` still runs its parent's.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass.as_ref().and_then(|super_class| super_class.find_method(name))
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Class {}>", self.name)
    }
}

impl LoxClass {
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Constructs a new instance of this class, running `init` (own or
    /// inherited) if one exists. Takes `Rc<Self>` so the new instance can
    /// hold a reference back to the class without the class needing to
    /// know its own `Rc` handle.
    pub fn construct(
        self: &Rc<Self>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let instance = Rc::new(LoxInstance::new(Rc::clone(self)));

        if let Some(initializer) = self.find_method("init") {
            initializer.bind(Rc::clone(&instance)).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// An instance of a Lox class: a class reference plus its own field table.
#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance { class, fields: RefCell::new(HashMap::new()) }
    }

    /// Fields shadow methods (§4.4): a field is checked first, then the
    /// method table, bound to this instance.
    pub fn get(self: &Rc<Self>, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = self.class.find_method(&name.lexeme) {
            return Ok(Value::Callable(Rc::new(method.bind(Rc::clone(self)))));
        }

        Err(RuntimeError::undefined_property(name))
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}
