//! Abstract syntax of smart criteria.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Root of a parsed smart criteria expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A leaf predicate
    Atom(Atom),
    /// Logical negation (`!`)
    Not(Box<Expr>),
    /// Logical conjunction (`&&`)
    And(Box<Expr>, Box<Expr>),
    /// Logical disjunction (`||`)
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }
}

impl From<Atom> for Expr {
    fn from(atom: Atom) -> Self {
        Expr::Atom(atom)
    }
}

/// A test of a single track property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Clean,
    Explicit,
    Unlabeled,
    NameMatches(String),
    LabelMatches(String),
    AlbumMatches(String),
    ArtistMatches(String),
    DateCompare {
        field: DateField,
        op: CompOp,
        value: DateSpec,
    },
}

/// The track date a comparison targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    Added,
    Released,
}

impl DateField {
    pub fn keyword(self) -> &'static str {
        match self {
            DateField::Added => "added",
            DateField::Released => "released",
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,  // =
    Gt,  // >
    Lt,  // <
    Gte, // >=
    Lte, // <=
}

impl CompOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompOp::Eq => "=",
            CompOp::Gt => ">",
            CompOp::Lt => "<",
            CompOp::Gte => ">=",
            CompOp::Lte => "<=",
        }
    }
}

/// The right-hand side of a date comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpec {
    /// An age relative to now, e.g. `3m`
    Relative { amount: u32, unit: DurationUnit },
    /// A calendar date, e.g. `2020` or `4-1-2020`
    Absolute {
        date: NaiveDate,
        precision: DatePrecision,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Day,
    Month,
    Year,
}

impl DurationUnit {
    pub fn from_suffix(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'd' => Some(DurationUnit::Day),
            'm' => Some(DurationUnit::Month),
            'y' => Some(DurationUnit::Year),
            _ => None,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            DurationUnit::Day => 'd',
            DurationUnit::Month => 'm',
            DurationUnit::Year => 'y',
        }
    }
}

/// How an absolute date was written. A bare year is January 1 of that year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePrecision {
    Year,
    Day,
}

impl fmt::Display for DateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSpec::Relative { amount, unit } => write!(f, "{}{}", amount, unit.suffix()),
            DateSpec::Absolute {
                date,
                precision: DatePrecision::Year,
            } => write!(f, "{:04}", date.year()),
            DateSpec::Absolute {
                date,
                precision: DatePrecision::Day,
            } => write!(f, "{}-{}-{:04}", date.month(), date.day(), date.year()),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Clean => write!(f, "clean"),
            Atom::Explicit => write!(f, "explicit"),
            Atom::Unlabeled => write!(f, "unlabeled"),
            Atom::NameMatches(text) => write!(f, "name:\"{}\"", text),
            Atom::LabelMatches(text) => write!(f, "label:\"{}\"", text),
            Atom::AlbumMatches(text) => write!(f, "album:\"{}\"", text),
            Atom::ArtistMatches(text) => write!(f, "artist:\"{}\"", text),
            Atom::DateCompare { field, op, value } => {
                write!(f, "{}{}{}", field.keyword(), op.symbol(), value)
            }
        }
    }
}

/// Renders canonical criteria text. Compound operands are parenthesised so the
/// output parses back into the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Atom(atom) => write!(f, "{}", atom),
            Expr::Not(inner) => {
                write!(f, "!")?;
                write_operand(f, inner)
            }
            Expr::And(left, right) => {
                write_operand(f, left)?;
                write!(f, " && ")?;
                write_operand(f, right)
            }
            Expr::Or(left, right) => {
                write_operand(f, left)?;
                write!(f, " || ")?;
                write_operand(f, right)
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::And(..) | Expr::Or(..) => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}
