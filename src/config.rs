//! Schema configuration: where the track store keeps each field.
//!
//! Every table has a default. A JSON file only names the tables that differ;
//! within a named table only the table name (and a link table's `other_id`)
//! is required:
//!
//! ```json
//! { "tracks": { "table": "Track", "date_added": "dateAdded" } }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracksTable {
    pub table: String,
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub explicit: String,
    pub album_id: String,
    pub date_added: String,
}

impl Default for TracksTable {
    fn default() -> Self {
        Self {
            table: "tracks".to_string(),
            id: "id".to_string(),
            user_id: "user_id".to_string(),
            name: "name".to_string(),
            explicit: "explicit".to_string(),
            album_id: "album_id".to_string(),
            date_added: "date_added".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumsTable {
    pub table: String,
    pub id: String,
    pub name: String,
    pub release_date: String,
}

impl Default for AlbumsTable {
    fn default() -> Self {
        Self {
            table: "albums".to_string(),
            id: "id".to_string(),
            name: "name".to_string(),
            release_date: "release_date".to_string(),
        }
    }
}

/// A table with an id and a name: artists and labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedTable {
    pub table: String,
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
}

impl NamedTable {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            id: default_id(),
            name: default_name(),
        }
    }
}

/// A many-to-many link from tracks to artists or labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTable {
    pub table: String,
    #[serde(default = "default_track_id")]
    pub track_id: String,
    /// Column referencing the other side of the link
    pub other_id: String,
}

impl JoinTable {
    fn new(table: &str, other_id: &str) -> Self {
        Self {
            table: table.to_string(),
            track_id: default_track_id(),
            other_id: other_id.to_string(),
        }
    }
}

fn default_id() -> String {
    "id".to_string()
}

fn default_name() -> String {
    "name".to_string()
}

fn default_track_id() -> String {
    "track_id".to_string()
}

/// Table and column names used when translating predicates into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub tracks: TracksTable,
    pub albums: AlbumsTable,
    pub artists: NamedTable,
    pub track_artists: JoinTable,
    pub labels: NamedTable,
    pub track_labels: JoinTable,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            tracks: TracksTable::default(),
            albums: AlbumsTable::default(),
            artists: NamedTable::new("artists"),
            track_artists: JoinTable::new("track_artists", "artist_id"),
            labels: NamedTable::new("labels"),
            track_labels: JoinTable::new("track_labels", "label_id"),
        }
    }
}

impl SchemaConfig {
    /// Loads a schema mapping from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded schema config");
        Ok(config)
    }
}
