//! Smart criteria parser
//!
//! ## Parse flow
//!
//! ```text
//! parse()
//!   ├─ tokenize, rejecting illegal characters and unterminated strings
//!   └─ Parser::parse()
//!        ├─ parse_or_expression()
//!        │    └─ parse_and_expression()
//!        │         └─ parse_not_expression()
//!        │              └─ parse_primary_expression()
//!        │                   ├─ "(" → parse_or_expression, then ")"
//!        │                   ├─ clean | explicit | unlabeled
//!        │                   ├─ name | label | album | artist → ':' string
//!        │                   └─ added | released → operator, date value
//!        └─ every token must be consumed
//! ```
//!
//! ## Precedence (highest to lowest)
//!
//! 1. **Grouping** `(expression)`
//! 2. **NOT** `!expression`
//! 3. **AND** `expr1 && expr2`, left-associative
//! 4. **OR** `expr1 || expr2`, left-associative
//!
//! ## Examples
//!
//! ```text
//! clean && label:"Road Trip"
//! !(artist:"Daft Punk" || album:"Discovery")
//! added<3m && released>=1-1-1990
//! added=2020 || unlabeled
//! ```

use crate::ast::{Atom, CompOp, DateField, DatePrecision, DateSpec, DurationUnit, Expr};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};
use chrono::NaiveDate;
use thiserror::Error;

/// Maximum nesting of `!` and parentheses.
pub const MAX_DEPTH: usize = 256;

/// Why a smart criteria string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("smart criteria is empty")]
    Empty,

    #[error("unterminated string starting at {span}")]
    UnterminatedString { span: Span },

    #[error("unexpected character '{ch}' at {span}")]
    IllegalCharacter { ch: char, span: Span },

    #[error("unknown keyword `{word}` at {span}")]
    UnknownKeyword { word: String, span: Span },

    #[error("expected {expected}, found {found} at {span}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        span: Span,
    },

    #[error("expected {expected}, but reached end of input")]
    UnexpectedEnd { expected: &'static str },

    #[error("unclosed '(' at {span}")]
    UnclosedParen { span: Span },

    #[error("unmatched ')' at {span}")]
    UnmatchedParen { span: Span },

    #[error("unexpected {found} after complete expression at {span}")]
    TrailingInput { found: String, span: Span },

    #[error("invalid date or duration `{literal}` at {span}")]
    InvalidDate { literal: String, span: Span },

    #[error("expression nested deeper than {max} levels at {span}", max = MAX_DEPTH)]
    NestingTooDeep { span: Span },
}

impl SyntaxError {
    /// Location of the offending input, if there is one.
    pub fn span(&self) -> Option<Span> {
        match self {
            SyntaxError::Empty | SyntaxError::UnexpectedEnd { .. } => None,
            SyntaxError::UnterminatedString { span }
            | SyntaxError::IllegalCharacter { span, .. }
            | SyntaxError::UnknownKeyword { span, .. }
            | SyntaxError::UnexpectedToken { span, .. }
            | SyntaxError::UnclosedParen { span }
            | SyntaxError::UnmatchedParen { span }
            | SyntaxError::TrailingInput { span, .. }
            | SyntaxError::InvalidDate { span, .. }
            | SyntaxError::NestingTooDeep { span } => Some(*span),
        }
    }

    fn unexpected(expected: &'static str, token: &Token<'_>) -> Self {
        SyntaxError::UnexpectedToken {
            expected,
            found: token.kind.to_string(),
            span: token.span,
        }
    }
}

/// Parses smart criteria into an expression tree.
pub fn parse(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(source)?;
    tracing::debug!(tokens = tokens.len(), "tokenized smart criteria");
    Parser::new(&tokens).parse()
}

/// Collects all tokens, failing on the first lexical error.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    Lexer::new(source)
        .map(|token| match token.kind {
            TokenKind::UnterminatedString => {
                Err(SyntaxError::UnterminatedString { span: token.span })
            }
            TokenKind::Illegal(ch) => Err(SyntaxError::IllegalCharacter {
                ch,
                span: token.span,
            }),
            _ => Ok(token),
        })
        .collect()
}

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    depth: usize,
    /// Currently open parentheses
    groups: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            groups: 0,
        }
    }

    /// Returns the current token without advancing.
    fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// Expects a token of the given kind and advances, otherwise errors.
    fn expect(
        &mut self,
        expected: TokenKind<'_>,
        description: &'static str,
    ) -> Result<&'a Token<'a>, SyntaxError> {
        match self.peek() {
            Some(token)
                if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) =>
            {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(SyntaxError::unexpected(description, token)),
            None => Err(SyntaxError::UnexpectedEnd {
                expected: description,
            }),
        }
    }

    /// Checks whether the current token has the given kind.
    fn match_token(&self, kind: &TokenKind<'_>) -> bool {
        self.peek().is_some_and(|token| {
            std::mem::discriminant(&token.kind) == std::mem::discriminant(kind)
        })
    }

    /// Parses the whole token stream. Every token must be consumed.
    pub fn parse(&mut self) -> Result<Expr, SyntaxError> {
        if self.tokens.is_empty() {
            return Err(SyntaxError::Empty);
        }

        let expr = self.parse_or_expression()?;

        match self.peek() {
            None => Ok(expr),
            Some(token) if token.kind == TokenKind::RParen => {
                Err(SyntaxError::UnmatchedParen { span: token.span })
            }
            Some(token) => Err(SyntaxError::TrailingInput {
                found: token.kind.to_string(),
                span: token.span,
            }),
        }
    }

    /// OR expression (lowest precedence)
    ///
    /// Grammar: `and_expr ("||" and_expr)*`
    fn parse_or_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and_expression()?;

        while self.match_token(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and_expression()?;
            left = Expr::or(left, right);
        }

        Ok(left)
    }

    /// AND expression
    ///
    /// Grammar: `not_expr ("&&" not_expr)*`
    fn parse_and_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not_expression()?;

        while self.match_token(&TokenKind::And) {
            self.advance();
            let right = self.parse_not_expression()?;
            left = Expr::and(left, right);
        }

        Ok(left)
    }

    /// NOT expression
    ///
    /// Grammar: `"!"* primary_expr`
    fn parse_not_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SyntaxError::NestingTooDeep {
                span: self.peek().map(|token| token.span).unwrap_or_default(),
            });
        }

        let expr = if self.match_token(&TokenKind::Not) {
            self.advance();
            Expr::not(self.parse_not_expression()?)
        } else {
            self.parse_primary_expression()?
        };

        self.depth -= 1;
        Ok(expr)
    }

    /// Grouped expression or a single atom.
    fn parse_primary_expression(&mut self) -> Result<Expr, SyntaxError> {
        let Some(token) = self.advance() else {
            return Err(SyntaxError::UnexpectedEnd {
                expected: "an expression",
            });
        };

        let atom = match &token.kind {
            TokenKind::LParen => {
                self.groups += 1;
                let expr = self.parse_or_expression()?;
                if self.peek().is_none() {
                    return Err(SyntaxError::UnclosedParen { span: token.span });
                }
                self.expect(TokenKind::RParen, "')'")?;
                self.groups -= 1;
                return Ok(expr);
            }
            TokenKind::Clean => Atom::Clean,
            TokenKind::Explicit => Atom::Explicit,
            TokenKind::Unlabeled => Atom::Unlabeled,
            TokenKind::Name => Atom::NameMatches(self.parse_field_text()?),
            TokenKind::Label => Atom::LabelMatches(self.parse_field_text()?),
            TokenKind::Album => Atom::AlbumMatches(self.parse_field_text()?),
            TokenKind::Artist => Atom::ArtistMatches(self.parse_field_text()?),
            TokenKind::Added => self.parse_date_compare(DateField::Added)?,
            TokenKind::Released => self.parse_date_compare(DateField::Released)?,
            TokenKind::Identifier(word) => {
                return Err(SyntaxError::UnknownKeyword {
                    word: word.to_string(),
                    span: token.span,
                });
            }
            // A ')' closing a group that holds no expression
            TokenKind::RParen if self.groups > 0 => {
                return Err(SyntaxError::unexpected("an expression", token));
            }
            TokenKind::RParen => return Err(SyntaxError::UnmatchedParen { span: token.span }),
            _ => return Err(SyntaxError::unexpected("an expression", token)),
        };

        Ok(Expr::Atom(atom))
    }

    /// `':' "TEXT"` after a field keyword. The text is taken verbatim.
    fn parse_field_text(&mut self) -> Result<String, SyntaxError> {
        self.expect(TokenKind::Colon, "':'")?;
        let token = self.expect(TokenKind::String(""), "a quoted string")?;
        match &token.kind {
            TokenKind::String(text) => Ok(text.to_string()),
            _ => Err(SyntaxError::unexpected("a quoted string", token)),
        }
    }

    /// Operator and value after `added` or `released`.
    fn parse_date_compare(&mut self, field: DateField) -> Result<Atom, SyntaxError> {
        let op = self.parse_comparison_operator()?;
        let token = self.expect(TokenKind::Value(""), "a date or duration")?;
        let TokenKind::Value(literal) = &token.kind else {
            return Err(SyntaxError::unexpected("a date or duration", token));
        };
        let value = parse_date_spec(literal).ok_or_else(|| SyntaxError::InvalidDate {
            literal: literal.to_string(),
            span: token.span,
        })?;
        Ok(Atom::DateCompare { field, op, value })
    }

    fn parse_comparison_operator(&mut self) -> Result<CompOp, SyntaxError> {
        let Some(token) = self.advance() else {
            return Err(SyntaxError::UnexpectedEnd {
                expected: "a comparison operator",
            });
        };
        match &token.kind {
            TokenKind::Eq => Ok(CompOp::Eq),
            TokenKind::Gt => Ok(CompOp::Gt),
            TokenKind::Lt => Ok(CompOp::Lt),
            TokenKind::Gte => Ok(CompOp::Gte),
            TokenKind::Lte => Ok(CompOp::Lte),
            _ => Err(SyntaxError::unexpected("a comparison operator", token)),
        }
    }
}

/// Decodes `<digits><d|m|y>`, `YYYY` or `M-D-YYYY`.
fn parse_date_spec(literal: &str) -> Option<DateSpec> {
    let last = literal.chars().last()?;
    if let Some(unit) = DurationUnit::from_suffix(last) {
        let digits = &literal[..literal.len() - last.len_utf8()];
        if !is_digits(digits, 1, usize::MAX) {
            return None;
        }
        let amount = digits.parse().ok()?;
        return Some(DateSpec::Relative { amount, unit });
    }

    let parts: Vec<&str> = literal.split('-').collect();
    let (year, month, day, precision) = match parts.as_slice() {
        [year] if is_digits(year, 4, 4) => (*year, "1", "1", DatePrecision::Year),
        [month, day, year]
            if is_digits(month, 1, 2) && is_digits(day, 1, 2) && is_digits(year, 4, 4) =>
        {
            (*year, *month, *day, DatePrecision::Day)
        }
        _ => return None,
    };
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    Some(DateSpec::Absolute { date, precision })
}

fn is_digits(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}
