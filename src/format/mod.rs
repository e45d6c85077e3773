//! Response formatting: raw per-row JSON into namespaced output columns.
//!
//! One formatter per response shape implements [`ResponseFormatter`]; the
//! shared batch pipeline applies `format_row` to every row and then moves
//! the diagnostic API columns behind all original and derived columns.

mod generic;
mod labels;
mod moderation;
mod sentiment;

pub use generic::GenericFormatter;
pub use labels::ObjectDetectionFormatter;
pub use moderation::{EntityCategory, ModerationSummary, UnsafeContentFormatter};
pub use sentiment::SentimentFormatter;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{FormatError, Result, SchemaError};
use crate::schema::ApiColumns;
use crate::types::{BoundingBox, ErrorHandling, Row};

/// Parse a response string, splitting behavior on the error-handling mode:
/// `Fail` propagates the parse error, `Log` substitutes an empty JSON object
/// so formatting can continue.
pub fn safe_json_loads(raw: &str, mode: ErrorHandling) -> std::result::Result<Value, FormatError> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(e) => match mode {
            ErrorHandling::Fail => Err(FormatError::InvalidJson(e)),
            ErrorHandling::Log => {
                tracing::warn!("Invalid JSON in response: '{raw}'");
                Ok(Value::Object(serde_json::Map::new()))
            }
        },
    }
}

/// State shared by every formatter: the generated API column names, the
/// error-handling mode, and the accumulated column descriptions.
#[derive(Debug, Clone)]
pub struct FormatterBase {
    pub api_columns: ApiColumns,
    pub mode: ErrorHandling,
    descriptions: BTreeMap<String, String>,
}

impl FormatterBase {
    pub fn new(
        existing_names: &[String],
        column_prefix: &str,
        mode: ErrorHandling,
    ) -> std::result::Result<Self, SchemaError> {
        let api_columns = ApiColumns::build(existing_names, column_prefix)?;
        let descriptions = api_columns.descriptions();
        Ok(Self {
            api_columns,
            mode,
            descriptions,
        })
    }

    /// Record a description for a derived column.
    pub fn describe(&mut self, column: &str, description: &str) {
        self.descriptions
            .insert(column.to_string(), description.to_string());
    }

    /// The parsed response for a row, per the error-handling mode.
    pub fn parse_response(&self, row: &Row) -> std::result::Result<Value, FormatError> {
        let raw = row.get_str(&self.api_columns.response).unwrap_or("");
        safe_json_loads(raw, self.mode)
    }
}

/// One response shape's mapping from raw JSON to output columns.
///
/// `format_row` must be a pure transformation of the row; everything
/// batch-wide (column reordering, error-column pruning) lives in
/// [`format_batch`].
pub trait ResponseFormatter: Send + Sync {
    fn base(&self) -> &FormatterBase;

    /// Add this formatter's derived columns to the row.
    fn format_row(&self, row: &mut Row) -> std::result::Result<(), FormatError>;

    /// Bounding boxes to draw for a parsed response. Formatters without a
    /// geometric payload return nothing.
    fn annotations(&self, _response: &Value) -> Vec<BoundingBox> {
        vec![]
    }

    /// Column name → human-readable description, for output schema
    /// annotation.
    fn column_descriptions(&self) -> &BTreeMap<String, String> {
        &self.base().descriptions
    }
}

/// Apply a formatter to a whole batch and finalize the column layout.
///
/// The diagnostic API columns move after all original and derived columns.
/// In fail-fast mode the `error_message`/`error_type` columns are dropped
/// entirely (no error rows can exist); `error_raw` is dropped unless at
/// least one row populated it.
pub fn format_batch(formatter: &dyn ResponseFormatter, mut rows: Vec<Row>) -> Result<Vec<Row>> {
    tracing::info!("Formatting {} API results", rows.len());
    for row in &mut rows {
        formatter.format_row(row)?;
    }

    let base = formatter.base();
    let api_columns = &base.api_columns;

    let error_raw_used = rows.iter().any(|row| {
        row.get_str(&api_columns.error_raw)
            .is_some_and(|v| !v.is_empty())
    });

    for row in &mut rows {
        row.move_to_end(&api_columns.response);
        if base.mode == ErrorHandling::Fail {
            row.remove(&api_columns.error_message);
            row.remove(&api_columns.error_type);
        } else {
            row.move_to_end(&api_columns.error_message);
            row.move_to_end(&api_columns.error_type);
        }
        if error_raw_used {
            row.move_to_end(&api_columns.error_raw);
        } else {
            row.remove(&api_columns.error_raw);
        }
    }

    tracing::info!("Formatting API results: done");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_json_loads_log_mode_swallows_errors() {
        let value = safe_json_loads("not json", ErrorHandling::Log).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_safe_json_loads_fail_mode_raises() {
        let err = safe_json_loads("not json", ErrorHandling::Fail).unwrap_err();
        assert!(matches!(err, FormatError::InvalidJson(_)));
    }

    #[test]
    fn test_safe_json_loads_valid_json_either_mode() {
        for mode in [ErrorHandling::Log, ErrorHandling::Fail] {
            let value = safe_json_loads("{\"a\":1}", mode).unwrap();
            assert_eq!(value, json!({"a": 1}));
        }
    }

    fn row_with_columns(api: &ApiColumns, error_raw: &str) -> Row {
        Row::from_pairs([
            ("image_path", json!("img.jpg")),
            (api.response.as_str(), json!("{}")),
            (api.error_message.as_str(), json!("")),
            (api.error_type.as_str(), json!("")),
            (api.error_raw.as_str(), json!(error_raw)),
        ])
    }

    #[test]
    fn test_format_batch_moves_api_columns_to_end() {
        let formatter =
            GenericFormatter::new(&["image_path".to_string()], "api", ErrorHandling::Log).unwrap();
        let api = formatter.base().api_columns.clone();

        let mut row = row_with_columns(&api, "");
        row.set("derived", json!(1));
        // Put a derived column after the API columns to prove reordering
        let rows = format_batch(&formatter, vec![row]).unwrap();

        let names: Vec<&str> = rows[0].column_names().collect();
        assert_eq!(
            names,
            vec![
                "image_path",
                "derived",
                "api_response",
                "api_error_message",
                "api_error_type"
            ]
        );
    }

    #[test]
    fn test_format_batch_drops_error_columns_in_fail_mode() {
        let formatter =
            GenericFormatter::new(&["image_path".to_string()], "api", ErrorHandling::Fail).unwrap();
        let api = formatter.base().api_columns.clone();

        let rows = format_batch(&formatter, vec![row_with_columns(&api, "")]).unwrap();
        assert!(!rows[0].contains(&api.error_message));
        assert!(!rows[0].contains(&api.error_type));
        assert!(!rows[0].contains(&api.error_raw));
        assert!(rows[0].contains(&api.response));
    }

    #[test]
    fn test_format_batch_keeps_error_raw_when_populated() {
        let formatter =
            GenericFormatter::new(&["image_path".to_string()], "api", ErrorHandling::Log).unwrap();
        let api = formatter.base().api_columns.clone();

        let rows = format_batch(
            &formatter,
            vec![
                row_with_columns(&api, ""),
                row_with_columns(&api, "SomeError"),
            ],
        )
        .unwrap();
        assert!(rows[0].contains(&api.error_raw));
        assert!(rows[1].contains(&api.error_raw));
    }
}
