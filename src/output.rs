//! Output table writing and schema annotation.
//!
//! The host's dataset writer is the real sink; this module provides the
//! pieces the pipeline owes it: a writer that serializes finalized rows in
//! JSON or JSON Lines format, and the column-description merge that keeps
//! pre-existing descriptions on columns carried over from the input.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::types::Row;

/// One column of an input or output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
        }
    }

    pub fn described(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
        }
    }
}

/// Annotate an output schema with generated column descriptions.
///
/// Columns whose name matches an input column keep the input's description
/// when one exists; all other columns take the generated description (or
/// none).
pub fn apply_column_descriptions(
    output_schema: &mut [ColumnMeta],
    descriptions: &BTreeMap<String, String>,
    input_schema: &[ColumnMeta],
) {
    for column in output_schema.iter_mut() {
        column.description = descriptions.get(&column.name).cloned();
        if let Some(input_column) = input_schema.iter().find(|c| c.name == column.name) {
            if input_column.description.is_some() {
                column.description = input_column.description.clone();
            }
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON array of row objects
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes finalized rows to JSON or JSONL, preserving column order.
pub struct TableWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    rows_written: usize,
}

impl<W: Write> TableWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            rows_written: 0,
        }
    }

    /// Write a whole batch of rows.
    ///
    /// For JSON format, writes a single array; for JSONL, one object per
    /// line.
    pub fn write_rows(&mut self, rows: &[Row]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, rows).map_err(io::Error::other)?;
                writeln!(self.writer)?;
                self.rows_written += rows.len();
            }
            OutputFormat::JsonLines => {
                for row in rows {
                    serde_json::to_writer(&mut self.writer, row).map_err(io::Error::other)?;
                    writeln!(self.writer)?;
                    self.rows_written += 1;
                }
            }
        }
        Ok(())
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("JSONL"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("ndjson"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("csv"), None);
    }

    #[test]
    fn test_jsonl_writes_one_row_per_line() {
        let rows = vec![
            Row::from_pairs([("a", json!(1))]),
            Row::from_pairs([("a", json!(2))]),
        ];
        let mut writer = TableWriter::new(Vec::new(), OutputFormat::JsonLines);
        writer.write_rows(&rows).unwrap();

        assert_eq!(writer.rows_written(), 2);
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn test_json_writes_array() {
        let rows = vec![Row::from_pairs([("a", json!(1))])];
        let mut writer = TableWriter::new(Vec::new(), OutputFormat::Json);
        writer.write_rows(&rows).unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text.trim(), "[{\"a\":1}]");
    }

    #[test]
    fn test_descriptions_applied_to_generated_columns() {
        let mut output = vec![ColumnMeta::new("image_path"), ColumnMeta::new("api_response")];
        let mut descriptions = BTreeMap::new();
        descriptions.insert(
            "api_response".to_string(),
            "Raw response from the API in JSON format".to_string(),
        );

        apply_column_descriptions(&mut output, &descriptions, &[ColumnMeta::new("image_path")]);

        assert_eq!(output[0].description, None);
        assert_eq!(
            output[1].description.as_deref(),
            Some("Raw response from the API in JSON format")
        );
    }

    #[test]
    fn test_input_description_takes_precedence() {
        let mut output = vec![ColumnMeta::new("image_path")];
        let mut descriptions = BTreeMap::new();
        descriptions.insert("image_path".to_string(), "generated".to_string());

        let input = vec![ColumnMeta::described("image_path", "Path to the source image")];
        apply_column_descriptions(&mut output, &descriptions, &input);

        assert_eq!(
            output[0].description.as_deref(),
            Some("Path to the source image")
        );
    }

    #[test]
    fn test_matching_input_column_without_description_uses_generated() {
        let mut output = vec![ColumnMeta::new("image_path")];
        let mut descriptions = BTreeMap::new();
        descriptions.insert("image_path".to_string(), "generated".to_string());

        apply_column_descriptions(&mut output, &descriptions, &[ColumnMeta::new("image_path")]);
        assert_eq!(output[0].description.as_deref(), Some("generated"));
    }
}
