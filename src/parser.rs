// ABOUTME: Recursive-descent parser turning tokens into statements with syntax diagnostics

use crate::ast::{Expr, FunctionDecl, LiteralValue, NodeId, Stmt};
use crate::error::{ParseError, Reporter};
use crate::token::{Token, TokenKind};
use std::rc::Rc;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    reporter: &'a Reporter,
    next_id: NodeId,
}

type PResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, reporter: &'a Reporter) -> Self {
        Parser::with_start_id(tokens, reporter, 0)
    }

    /// Like `new`, but seeds the node-id counter from a prior parse. The
    /// REPL carries the counter across lines so locally-resolved node ids
    /// stay unique across the whole session even though each line gets
    /// its own `Parser` (§6).
    pub fn with_start_id(tokens: Vec<Token>, reporter: &'a Reporter, start_id: NodeId) -> Self {
        Parser { tokens, current: 0, reporter, next_id: start_id }
    }

    pub fn parse(self) -> Vec<Stmt> {
        self.parse_and_next_id().0
    }

    pub fn parse_and_next_id(mut self) -> (Vec<Stmt>, NodeId) {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        (statements, self.next_id)
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ===== declarations =====

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_kinds(&[TokenKind::Class]) {
            self.class_declaration()
        } else if self.match_kinds(&[TokenKind::Fun]) {
            self.function("function").map(Stmt::Function)
        } else if self.match_kinds(&[TokenKind::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect class name")?;

        let superclass = if self.match_kinds(&[TokenKind::Less]) {
            let super_name = self.consume(TokenKind::Identifier, "Expect superclass name")?;
            Some(Expr::Variable { id: self.fresh_id(), name: super_name })
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body")?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after class body")?;

        Ok(Stmt::Class { name, superclass, methods })
    }

    fn function(&mut self, kind: &str) -> PResult<Rc<FunctionDecl>> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name"))?;

        self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name"))?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            params.push(self.consume(TokenKind::Identifier, "Expect parameter name")?);
            while self.match_kinds(&[TokenKind::Comma]) {
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name")?);
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters")?;

        self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body"))?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name")?;

        let initializer = if self.match_kinds(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration")?;
        Ok(Stmt::Var { name, initializer })
    }

    // ===== statements =====

    fn statement(&mut self) -> PResult<Stmt> {
        if self.match_kinds(&[TokenKind::For]) {
            return self.for_statement();
        }
        if self.match_kinds(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.match_kinds(&[TokenKind::Print]) {
            return self.print_statement();
        }
        if self.match_kinds(&[TokenKind::Return]) {
            return self.return_statement();
        }
        if self.match_kinds(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.match_kinds(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'")?;

        let initializer = if self.match_kinds(&[TokenKind::Semicolon]) {
            None
        } else if self.match_kinds(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal(LiteralValue::Bool(true)));
        body = Stmt::While { condition, body: Box::new(body) };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kinds(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();

        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expect ';' after return value")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression")?;
        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block")?;
        Ok(statements)
    }

    // ===== expressions, low to high precedence =====

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.or_expression()?;

        if self.match_kinds(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => {
                    Ok(Expr::Assign { id: self.fresh_id(), name, value: Box::new(value) })
                }
                Expr::Get { object, name } => Ok(Expr::Set { object, name, value: Box::new(value) }),
                _ => {
                    self.reporter.error_at_token(&equals, "Invalid assignment target");
                    Ok(expr)
                }
            };
        }

        Ok(expr)
    }

    fn or_expression(&mut self) -> PResult<Expr> {
        let mut expr = self.and_expression()?;
        while self.match_kinds(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = self.and_expression()?;
            expr = Expr::Logical { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn and_expression(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_kinds(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.comparison()?;
        while self.match_kinds(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.addition()?;
        while self.match_kinds(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.addition()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn addition(&mut self) -> PResult<Expr> {
        let mut expr = self.multiplication()?;
        while self.match_kinds(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.multiplication()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn multiplication(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        while self.match_kinds(&[TokenKind::Slash, TokenKind::Star]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.match_kinds(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary { op, right: Box::new(right) });
        }
        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_kinds(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_kinds(&[TokenKind::Dot]) {
                let name = self.consume(TokenKind::Identifier, "Expect property name after '.'")?;
                expr = Expr::Get { object: Box::new(expr), name };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            args.push(self.expression()?);
            while self.match_kinds(&[TokenKind::Comma]) {
                args.push(self.expression()?);
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments")?;

        Ok(Expr::Call { callee: Box::new(callee), paren, args })
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.match_kinds(&[TokenKind::False]) {
            return Ok(Expr::Literal(LiteralValue::Bool(false)));
        }
        if self.match_kinds(&[TokenKind::True]) {
            return Ok(Expr::Literal(LiteralValue::Bool(true)));
        }
        if self.match_kinds(&[TokenKind::Nil]) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }
        if self.match_kinds(&[TokenKind::Number]) {
            let value = match &self.previous().literal {
                crate::token::TokenLiteral::Number(n) => *n,
                _ => 0.0,
            };
            return Ok(Expr::Literal(LiteralValue::Number(value)));
        }
        if self.match_kinds(&[TokenKind::String]) {
            let value = match &self.previous().literal {
                crate::token::TokenLiteral::Str(s) => s.clone(),
                _ => String::new(),
            };
            return Ok(Expr::Literal(LiteralValue::Str(value)));
        }
        if self.match_kinds(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expect '.' after 'super'")?;
            let method = self.consume(TokenKind::Identifier, "Expect superclass method name")?;
            return Ok(Expr::Super { id: self.fresh_id(), keyword, method });
        }
        if self.match_kinds(&[TokenKind::This]) {
            let keyword = self.previous().clone();
            return Ok(Expr::This { id: self.fresh_id(), keyword });
        }
        if self.match_kinds(&[TokenKind::Identifier]) {
            let name = self.previous().clone();
            return Ok(Expr::Variable { id: self.fresh_id(), name });
        }
        if self.match_kinds(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        let token = self.peek().clone();
        Err(self.reporter.syntax_error(&token, "Expect expression"))
    }

    // ===== token-stream primitives =====

    fn match_kinds(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        let token = self.peek().clone();
        Err(self.reporter.syntax_error(&token, message))
    }

    /// Always advances at least once per loop pass (§9: the source's
    /// version can spin without consuming input).
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            if matches!(
                self.peek().kind,
                TokenKind::Class
                    | TokenKind::Fun
                    | TokenKind::Var
                    | TokenKind::For
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::Print
                    | TokenKind::Return
            ) {
                return;
            }

            self.advance();
        }
    }
}
