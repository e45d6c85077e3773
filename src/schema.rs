//! Output column naming.
//!
//! Every column the pipeline adds to a row is namespaced with a caller
//! prefix and made unique against the input's existing column names, so API
//! output never silently overwrites a user column.

use std::collections::BTreeMap;

use crate::error::SchemaError;

/// Default namespace prefix for generated columns.
pub const DEFAULT_COLUMN_PREFIX: &str = "api";

/// Suffix attempts before name generation gives up. Exhausting this bound
/// indicates a caller defect, never bad input data.
const MAX_NAMING_ATTEMPTS: u32 = 1000;

/// Generate a unique name among existing ones by suffixing a number.
/// An optional prefix is joined with `_` first.
///
/// Candidates are tried in the deterministic order `prefix_name`, `name_1`,
/// `name_2`, ... so repeated calls against a growing set of existing names
/// produce a predictable sequence.
pub fn generate_unique(
    name: &str,
    existing_names: &[String],
    prefix: Option<&str>,
) -> Result<String, SchemaError> {
    let mut candidate = match prefix {
        Some(p) => format!("{p}_{name}"),
        None => name.to_string(),
    };
    for attempt in 1..=MAX_NAMING_ATTEMPTS {
        if !existing_names.iter().any(|n| n == &candidate) {
            return Ok(candidate);
        }
        candidate = format!("{name}_{attempt}");
    }
    Err(SchemaError::NamingExhausted {
        name: name.to_string(),
        attempts: MAX_NAMING_ATTEMPTS,
    })
}

/// The four generated diagnostic column names attached to every output row.
///
/// Built once per run from the input schema; the invariant is that none of
/// them collides with a pre-existing input column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiColumns {
    /// Raw response from the API in JSON format
    pub response: String,
    /// Error message from the API
    pub error_message: String,
    /// Error type (class name)
    pub error_type: String,
    /// Raw error from the API
    pub error_raw: String,
}

impl ApiColumns {
    /// Derive the four unique column names from the input's existing column
    /// names and a namespace prefix.
    pub fn build(existing_names: &[String], prefix: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            response: generate_unique("response", existing_names, Some(prefix))?,
            error_message: generate_unique("error_message", existing_names, Some(prefix))?,
            error_type: generate_unique("error_type", existing_names, Some(prefix))?,
            error_raw: generate_unique("error_raw", existing_names, Some(prefix))?,
        })
    }

    /// The generated names in their canonical order.
    pub fn names(&self) -> [&str; 4] {
        [
            &self.response,
            &self.error_message,
            &self.error_type,
            &self.error_raw,
        ]
    }

    /// Human-readable descriptions for the generated columns, keyed by the
    /// generated (unique) name.
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(
            self.response.clone(),
            "Raw response from the API in JSON format".to_string(),
        );
        map.insert(
            self.error_message.clone(),
            "Error message from the API".to_string(),
        );
        map.insert(
            self.error_type.clone(),
            "Error type (module and class name)".to_string(),
        );
        map.insert(
            self.error_raw.clone(),
            "Raw error from the API".to_string(),
        );
        map
    }
}
