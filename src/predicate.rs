//! Compiled predicate tree handed to the query layer.
//!
//! A [`Predicate`] has the shape of the parsed expression, except that every
//! date comparison has been resolved into one concrete [`Bound`]. Windows are
//! expressed as an [`Predicate::And`] of two bounds.

use crate::ast::DateField;
use crate::track::Track;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Clean,
    Explicit,
    Unlabeled,
    Name(String),
    Label(String),
    Album(String),
    Artist(String),
    Date { field: DateField, bound: Bound },
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

/// A one-sided bound on an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    GreaterThan(DateTime<Utc>),
    GreaterOrEqual(DateTime<Utc>),
    LessThan(DateTime<Utc>),
    LessOrEqual(DateTime<Utc>),
}

impl Bound {
    pub fn contains(&self, value: DateTime<Utc>) -> bool {
        match *self {
            Bound::GreaterThan(t) => value > t,
            Bound::GreaterOrEqual(t) => value >= t,
            Bound::LessThan(t) => value < t,
            Bound::LessOrEqual(t) => value <= t,
        }
    }
}

impl Predicate {
    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    pub fn and(left: Predicate, right: Predicate) -> Self {
        Predicate::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Predicate, right: Predicate) -> Self {
        Predicate::Or(Box::new(left), Box::new(right))
    }

    pub fn date(field: DateField, bound: Bound) -> Self {
        Predicate::Date { field, bound }
    }

    /// Evaluates the predicate against a single track.
    pub fn matches(&self, track: &Track) -> bool {
        match self {
            Predicate::Clean => !track.explicit,
            Predicate::Explicit => track.explicit,
            Predicate::Unlabeled => track.labels.is_empty(),
            Predicate::Name(name) => track.name == *name,
            Predicate::Label(label) => track.labels.iter().any(|l| l == label),
            Predicate::Album(album) => track.album == *album,
            Predicate::Artist(artist) => track.artists.iter().any(|a| a == artist),
            Predicate::Date { field, bound } => bound.contains(track.date(*field)),
            Predicate::Not(inner) => !inner.matches(track),
            Predicate::And(left, right) => left.matches(track) && right.matches(track),
            Predicate::Or(left, right) => left.matches(track) || right.matches(track),
        }
    }
}
