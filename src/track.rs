//! The track record smart criteria are evaluated against.

use crate::ast::DateField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's saved track, flattened with its album, artists and manual labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub explicit: bool,
    pub album: String,
    #[serde(default)]
    pub artists: Vec<String>,
    /// Names of the labels explicitly assigned to the track
    #[serde(default)]
    pub labels: Vec<String>,
    pub date_added: DateTime<Utc>,
    /// Release date of the track's album
    pub date_released: DateTime<Utc>,
}

impl Track {
    pub fn date(&self, field: DateField) -> DateTime<Utc> {
        match field {
            DateField::Added => self.date_added,
            DateField::Released => self.date_released,
        }
    }
}
