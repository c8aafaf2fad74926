//! Live feedback for the smart criteria input: match summaries and example
//! queries built from the user's library.

use crate::compiler::compile_filter;
use crate::parser::SyntaxError;
use crate::track::Track;
use chrono::{DateTime, TimeZone};
use serde::Serialize;

/// Matches beyond this many are not counted.
pub const MATCH_LIMIT: usize = 500;

/// Number of matching track names returned as examples.
pub const EXAMPLE_COUNT: usize = 5;

/// Message shown to the user when criteria fail to parse.
pub const INVALID_CRITERIA: &str = "Invalid smart criteria";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    pub match_count: usize,
    pub match_examples: Vec<String>,
}

/// Counts the tracks matching `source`, up to [`MATCH_LIMIT`].
///
/// Blank criteria match every track.
pub fn search<'t, Tz: TimeZone>(
    source: &str,
    now: &DateTime<Tz>,
    tracks: impl IntoIterator<Item = &'t Track>,
) -> Result<SearchSummary, SyntaxError> {
    let filter = compile_filter(source, now)?;

    let matches: Vec<&Track> = tracks
        .into_iter()
        .filter(|track| filter.as_ref().map_or(true, |p| p.matches(track)))
        .take(MATCH_LIMIT)
        .collect();

    tracing::debug!(matches = matches.len(), "searched smart criteria");

    Ok(SearchSummary {
        match_count: matches.len(),
        match_examples: matches
            .iter()
            .take(EXAMPLE_COUNT)
            .map(|track| track.name.clone())
            .collect(),
    })
}

/// A suggested query shown while typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchExample {
    pub value: String,
    pub description: String,
}

impl SearchExample {
    fn new(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
        }
    }
}

const FIXED_EXAMPLES: &[(&str, &str)] = &[
    ("clean", "Clean"),
    ("explicit", "Explicit"),
    ("unlabeled", "Has no labels"),
];

const DATE_EXAMPLES: &[(&str, &str)] = &[
    ("=2020", "in 2020"),
    ("<=2020", "in or before 2020"),
    (">2020", "after 2020"),
    ("<4-1-2020", "before April 1, 2020"),
    (">=4-1-2020", "on or after April 1, 2020"),
    ("=7d", "7 days ago"),
    ("<3m", "less than 3 months ago"),
    (">=1y", "more than 1 year ago"),
];

/// Builds example queries: the fixed keyword and date examples, then one per
/// manual label, album and artist. Albums and artists are taken from the most
/// recently added tracks first, without duplicates.
///
/// Names containing `"` cannot be quoted and are skipped.
pub fn search_examples(labels: &[String], tracks: &[Track]) -> Vec<SearchExample> {
    let mut examples: Vec<SearchExample> = FIXED_EXAMPLES
        .iter()
        .map(|(value, description)| SearchExample::new(*value, *description))
        .collect();

    for (field, verb) in [("added", "Added"), ("released", "Released")] {
        examples.extend(DATE_EXAMPLES.iter().map(|(suffix, description)| {
            SearchExample::new(format!("{}{}", field, suffix), format!("{} {}", verb, description))
        }));
    }

    let mut recent: Vec<&Track> = tracks.iter().collect();
    recent.sort_by(|a, b| b.date_added.cmp(&a.date_added));

    let labels = unique(labels.iter().map(String::as_str));
    let albums = unique(recent.iter().map(|track| track.album.as_str()));
    let artists = unique(
        recent
            .iter()
            .flat_map(|track| track.artists.iter().map(String::as_str)),
    );

    let named: [(&str, Vec<&str>, fn(&str) -> String); 3] = [
        ("label", labels, |name| format!("Has label \"{}\"", name)),
        ("album", albums, |name| format!("Album is {}", name)),
        ("artist", artists, |name| format!("Artist is {}", name)),
    ];
    for (field, names, describe) in named {
        examples.extend(names.into_iter().filter(|name| is_quotable(name)).map(|name| {
            SearchExample::new(format!("{}:\"{}\"", field, name), describe(name))
        }));
    }

    examples
}

fn is_quotable(name: &str) -> bool {
    !name.contains('"')
}

/// Deduplicates while keeping first-seen order.
fn unique<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = std::collections::HashSet::new();
    names.filter(|name| seen.insert(*name)).collect()
}
