// ABOUTME: Environment module for managing variable bindings and lexical scopes

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment { bindings: RefCell::new(HashMap::new()), parent: None })
    }

    /// Creates a new child environment with a parent.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment { bindings: RefCell::new(HashMap::new()), parent: Some(parent) })
    }

    /// Defines a binding in THIS scope. Redefining an existing name in the
    /// same scope is allowed at runtime (the resolver catches it lexically
    /// only for block-local declarations, per §4.3).
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Looks up a symbol in this scope and parent scopes recursively, for
    /// globals the resolver left unresolved.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.bindings.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(ref parent) = self.parent {
            return parent.get(name);
        }

        Err(RuntimeError::undefined_variable(name))
    }

    /// Looks up a symbol exactly `distance` scopes up, per the resolver's
    /// precomputed scope distance.
    pub fn get_at(self: &Rc<Self>, distance: usize, name: &str) -> Value {
        self.ancestor(distance)
            .bindings
            .borrow()
            .get(name)
            .cloned()
            .expect("resolver guarantees the binding exists at this distance")
    }

    /// Assigns a symbol exactly `distance` scopes up.
    pub fn assign_at(self: &Rc<Self>, distance: usize, name: &str, value: Value) {
        self.ancestor(distance).bindings.borrow_mut().insert(name.to_string(), value);
    }

    fn ancestor(self: &Rc<Self>, distance: usize) -> Rc<Environment> {
        let mut env = Rc::clone(self);
        for _ in 0..distance {
            let parent = env.parent.clone().expect("resolver guarantees this many ancestors");
            env = parent;
        }
        env
    }

    /// Updates an existing binding, walking the parent chain; used for
    /// unresolved (global) assignment targets.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if self.bindings.borrow().contains_key(&name.lexeme) {
            self.bindings.borrow_mut().insert(name.lexeme.clone(), value);
            return Ok(());
        }

        if let Some(ref parent) = self.parent {
            return parent.assign(name, value);
        }

        Err(RuntimeError::undefined_variable(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{TokenKind, TokenLiteral};

    fn ident(name: &str) -> Token {
        Token::new(TokenKind::Identifier, name, TokenLiteral::None, 1)
    }

    #[test]
    fn define_and_get() {
        let env = Environment::new();
        env.define("x".to_string(), Value::Number(42.0));
        assert!(matches!(env.get(&ident("x")), Ok(Value::Number(n)) if n == 42.0));
    }

    #[test]
    fn undefined_symbol_is_an_error() {
        let env = Environment::new();
        assert!(env.get(&ident("missing")).is_err());
    }

    #[test]
    fn child_shadows_parent() {
        let parent = Environment::new();
        parent.define("x".to_string(), Value::Number(1.0));
        let child = Environment::with_parent(parent);
        child.define("x".to_string(), Value::Number(2.0));
        assert!(matches!(child.get(&ident("x")), Ok(Value::Number(n)) if n == 2.0));
    }

    #[test]
    fn child_sees_parent_binding() {
        let parent = Environment::new();
        parent.define("x".to_string(), Value::Number(1.0));
        let child = Environment::with_parent(parent);
        assert!(matches!(child.get(&ident("x")), Ok(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn get_at_and_assign_at_use_precomputed_distance() {
        let grandparent = Environment::new();
        grandparent.define("a".to_string(), Value::Number(1.0));
        let parent = Environment::with_parent(grandparent);
        let child = Environment::with_parent(parent);

        assert!(matches!(child.get_at(2, "a"), Value::Number(n) if n == 1.0));
        child.assign_at(2, "a", Value::Number(9.0));
        assert!(matches!(child.get_at(2, "a"), Value::Number(n) if n == 9.0));
    }

    #[test]
    fn assign_to_undefined_global_is_an_error() {
        let env = Environment::new();
        assert!(env.assign(&ident("missing"), Value::Nil).is_err());
    }

    #[test]
    fn assign_walks_up_to_defining_scope() {
        let parent = Environment::new();
        parent.define("x".to_string(), Value::Number(1.0));
        let child = Environment::with_parent(parent);
        child.assign(&ident("x"), Value::Number(5.0)).unwrap();
        assert!(matches!(child.get(&ident("x")), Ok(Value::Number(n)) if n == 5.0));
    }
}
