//! The token definition for the smart criteria language.

use std::fmt;

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    Clean,     // "clean"
    Explicit,  // "explicit"
    Unlabeled, // "unlabeled"
    Name,      // "name"
    Label,     // "label"
    Album,     // "album"
    Artist,    // "artist"
    Added,     // "added"
    Released,  // "released"

    // Literals
    Identifier(&'a str),
    String(&'a str), // The quoted contents, without quotes
    Value(&'a str),  // A date or duration, e.g. "3m", "2020", "4-1-2020"

    // Punctuation
    LParen, // (
    RParen, // )
    Colon,  // :

    // Boolean operators
    Not, // !
    And, // &&
    Or,  // ||

    // Comparison operators
    Eq,  // =
    Gt,  // >
    Lt,  // <
    Gte, // >=
    Lte, // <=

    // Special
    Illegal(char),      // An illegal/unknown character
    UnterminatedString, // A '"' with no closing quote
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Clean => write!(f, "`clean`"),
            TokenKind::Explicit => write!(f, "`explicit`"),
            TokenKind::Unlabeled => write!(f, "`unlabeled`"),
            TokenKind::Name => write!(f, "`name`"),
            TokenKind::Label => write!(f, "`label`"),
            TokenKind::Album => write!(f, "`album`"),
            TokenKind::Artist => write!(f, "`artist`"),
            TokenKind::Added => write!(f, "`added`"),
            TokenKind::Released => write!(f, "`released`"),
            TokenKind::Identifier(s) => write!(f, "`{}`", s),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Value(s) => write!(f, "`{}`", s),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Not => write!(f, "'!'"),
            TokenKind::And => write!(f, "'&&'"),
            TokenKind::Or => write!(f, "'||'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Gte => write!(f, "'>='"),
            TokenKind::Lte => write!(f, "'<='"),
            TokenKind::Illegal(c) => write!(f, "'{}'", c),
            TokenKind::UnterminatedString => write!(f, "unterminated string"),
        }
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
