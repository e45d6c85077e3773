//! Core data types for the sightline batch analysis pipeline.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Name of the input column holding each row's image path.
pub const IMAGE_PATH_COLUMN: &str = "image_path";

/// Run-wide error-handling policy.
///
/// `Log` tolerates per-row failures and records them in the error columns;
/// `Fail` aborts the whole run on the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandling {
    #[default]
    Log,
    Fail,
}

/// One unit of input work plus its accumulated derived columns.
///
/// Columns are kept in insertion order so the output table has a stable,
/// human-readable layout, and serialize to a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from name/value pairs, keeping their order.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self {
            columns: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Convenience constructor for a single-column image-path row.
    pub fn from_image_path(path: &str) -> Self {
        Self::from_pairs([(IMAGE_PATH_COLUMN, Value::String(path.to_string()))])
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// String view of a column; non-string values yield `None`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Set a column value, replacing in place if the name exists or
    /// appending at the end if it does not.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.columns.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.columns.push((name.to_string(), value)),
        }
    }

    /// Remove a column, returning its value if present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.columns.iter().position(|(k, _)| k == name)?;
        Some(self.columns.remove(idx).1)
    }

    /// Move a column to the end of the row, preserving its value.
    /// No-op if the column does not exist.
    pub fn move_to_end(&mut self, name: &str) {
        if let Some(value) = self.remove(name) {
            self.columns.push((name.to_string(), value));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(k, _)| k == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Result of one API call, attached 1:1 to an input row index.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    /// Raw JSON response from the API
    Success(String),
    /// Structured record of a persistent failure
    Failure {
        /// Error class name (e.g. "RateLimited", "ApiCallError")
        error_type: String,
        /// Human-readable message
        error_message: String,
        /// Raw error representation
        error_raw: String,
    },
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }
}

/// A labeled rectangle locating a detected entity within an image.
///
/// Coordinates are normalized fractions of image width/height in [0, 1].
/// Derived transiently from a successful response and consumed immediately
/// by the annotator; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub label: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}
