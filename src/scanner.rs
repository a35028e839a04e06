// ABOUTME: Scanner module turning Lox source text into a token sequence

use crate::error::Reporter;
use crate::token::{keyword, Token, TokenKind, TokenLiteral};

pub struct Scanner<'a> {
    source: &'a [u8],
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source: source.as_bytes(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_tokens(mut self, reporter: &Reporter) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token(reporter);
        }

        self.tokens.push(Token::eof(self.line));
        self.tokens
    }

    fn scan_token(&mut self, reporter: &Reporter) {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            '-' => self.add_token(TokenKind::Minus),
            '+' => self.add_token(TokenKind::Plus),
            ';' => self.add_token(TokenKind::Semicolon),
            '*' => self.add_token(TokenKind::Star),
            '!' => {
                let kind = if self.match_char('=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.add_token(kind);
            }
            '=' => {
                let kind = if self.match_char('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.match_char('=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.add_token(kind);
            }
            '>' => {
                let kind = if self.match_char('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.add_token(kind);
            }
            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.string(reporter),
            c if c.is_ascii_digit() => self.number(),
            c if is_alpha(c) => self.identifier(),
            c => reporter.error(self.line, &format!("Invalid character: {c}")),
        }
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current] as char;
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current] as char
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1] as char
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_token_literal(kind, TokenLiteral::None);
    }

    fn add_token_literal(&mut self, kind: TokenKind, literal: TokenLiteral) {
        let text = std::str::from_utf8(&self.source[self.start..self.current]).unwrap_or("");
        self.tokens.push(Token::new(kind, text, literal, self.line));
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] as char != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn string(&mut self, reporter: &Reporter) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            reporter.error(self.line, "Unterminated string");
            return;
        }

        self.advance();

        let value = std::str::from_utf8(&self.source[self.start + 1..self.current - 1])
            .unwrap_or("")
            .to_string();
        self.add_token_literal(TokenKind::String, TokenLiteral::Str(value));
    }

    /// A trailing `.` with no following digit is not consumed (§4.1, §9).
    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = std::str::from_utf8(&self.source[self.start..self.current]).unwrap_or("0");
        let value: f64 = text.parse().unwrap_or(0.0);
        self.add_token_literal(TokenKind::Number, TokenLiteral::Number(value));
    }

    fn identifier(&mut self) {
        while is_alphanumeric(self.peek()) {
            self.advance();
        }

        let text = std::str::from_utf8(&self.source[self.start..self.current]).unwrap_or("");
        let kind = keyword(text).unwrap_or(TokenKind::Identifier);
        self.add_token(kind);
    }
}

fn is_alpha(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_alphanumeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind::*;

    fn scan(src: &str) -> Vec<TokenKind> {
        let reporter = Reporter::new();
        Scanner::new(src)
            .scan_tokens(&reporter)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_punctuation_and_operators() {
        assert_eq!(scan("(){},.-+;*!!====<<=>>="), vec![
            LeftParen, RightParen, LeftBrace, RightBrace, Comma, Dot, Minus, Plus, Semicolon,
            Star, Bang, BangEqual, EqualEqual, Equal, Less, LessEqual, Greater, GreaterEqual, Eof
        ]);
    }

    #[test]
    fn skips_line_comments() {
        assert_eq!(scan("// a comment\n1"), vec![Number, Eof]);
    }

    #[test]
    fn scans_string_literal_with_embedded_newline() {
        let reporter = Reporter::new();
        let tokens = Scanner::new("\"a\nb\"").scan_tokens(&reporter);
        assert_eq!(tokens[0].kind, String);
        assert_eq!(tokens[0].literal, TokenLiteral::Str("a\nb".to_string()));
        assert_eq!(tokens[0].line, 1);
    }

    #[test]
    fn unterminated_string_reports_error_and_continues() {
        let reporter = Reporter::new();
        let tokens = Scanner::new("\"abc").scan_tokens(&reporter);
        assert!(reporter.had_compile_error());
        assert_eq!(tokens, vec![Token::eof(1)]);
    }

    #[test]
    fn number_with_trailing_dot_not_consumed() {
        let reporter = Reporter::new();
        let tokens = Scanner::new("1.").scan_tokens(&reporter);
        assert_eq!(tokens[0].kind, Number);
        assert_eq!(tokens[0].literal, TokenLiteral::Number(1.0));
        assert_eq!(tokens[1].kind, Dot);
    }

    #[test]
    fn number_with_fraction() {
        let reporter = Reporter::new();
        let tokens = Scanner::new("3.14").scan_tokens(&reporter);
        assert_eq!(tokens[0].literal, TokenLiteral::Number(3.14));
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(scan("fun class foo"), vec![Fun, Class, Identifier, Eof]);
    }

    #[test]
    fn invalid_character_reports_but_keeps_scanning() {
        let reporter = Reporter::new();
        let tokens = Scanner::new("1 @ 2").scan_tokens(&reporter);
        assert!(reporter.had_compile_error());
        assert_eq!(tokens.iter().map(|t| t.kind).collect::<Vec<_>>(), vec![Number, Number, Eof]);
    }
}
