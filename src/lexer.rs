//! Lexer for smart criteria.
//!
//! Quoted strings are opaque: everything between the quotes, including
//! operator characters, becomes a single [`TokenKind::String`].

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// Current byte offset into the input
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// Returns the character at the current position without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// Advances one character and returns it.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token {
            kind,
            span: Span::new(start, self.position),
        }
    }

    /// Reads a date or duration literal such as `7d`, `2020` or `4-1-2020`.
    /// The shape is validated by the parser.
    fn read_value(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' {
                self.bump();
            } else {
                break;
            }
        }
        self.token(TokenKind::Value(&self.input[start..self.position]), start)
    }

    /// Reads a double-quoted string. The opening quote has already been consumed.
    fn read_string(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == '"' {
                let content = &self.input[content_start..self.position];
                self.bump(); // closing quote
                return self.token(TokenKind::String(content), start);
            }
            self.bump();
        }
        self.token(TokenKind::UnterminatedString, start)
    }

    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(match_keyword(literal), start)
    }

    /// Consumes `second` if it follows, producing `kind`; otherwise `fallback`.
    fn pair(
        &mut self,
        start: usize,
        second: char,
        kind: TokenKind<'a>,
        fallback: TokenKind<'a>,
    ) -> Token<'a> {
        if self.peek() == Some(second) {
            self.bump();
            self.token(kind, start)
        } else {
            self.token(fallback, start)
        }
    }
}

fn match_keyword(s: &str) -> TokenKind {
    match s.to_ascii_lowercase().as_str() {
        "clean" => TokenKind::Clean,
        "explicit" => TokenKind::Explicit,
        "unlabeled" => TokenKind::Unlabeled,
        "name" => TokenKind::Name,
        "label" => TokenKind::Label,
        "album" => TokenKind::Album,
        "artist" => TokenKind::Artist,
        "added" => TokenKind::Added,
        "released" => TokenKind::Released,
        _ => TokenKind::Identifier(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let c = self.bump()?;

        let token = match c {
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            ':' => self.token(TokenKind::Colon, start),
            '=' => self.token(TokenKind::Eq, start),
            '!' => self.token(TokenKind::Not, start),
            '<' => self.pair(start, '=', TokenKind::Lte, TokenKind::Lt),
            '>' => self.pair(start, '=', TokenKind::Gte, TokenKind::Gt),
            '&' => self.pair(start, '&', TokenKind::And, TokenKind::Illegal('&')),
            '|' => self.pair(start, '|', TokenKind::Or, TokenKind::Illegal('|')),
            '"' => self.read_string(start),
            c if c.is_ascii_digit() => self.read_value(start),
            c if c.is_alphabetic() => self.read_identifier(start),
            c => self.token(TokenKind::Illegal(c), start),
        };
        Some(token)
    }
}
