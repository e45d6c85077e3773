//! Formatter for object detection / labeling responses.
//!
//! Emits a list column of all detected label names plus per-rank
//! name/score column pairs for the top `num_objects` labels, sorted by
//! descending confidence. Scores stay on the API's native 0-100 scale.
//! Detected object instances carry bounding boxes for the annotator.

use serde_json::Value;

use crate::error::{FormatError, SchemaError};
use crate::schema::generate_unique;
use crate::types::{BoundingBox, ErrorHandling, Row};

use super::{FormatterBase, ResponseFormatter};

pub struct ObjectDetectionFormatter {
    base: FormatterBase,
    num_objects: usize,
    label_list_column: String,
    name_columns: Vec<String>,
    score_columns: Vec<String>,
}

impl ObjectDetectionFormatter {
    pub fn new(
        existing_names: &[String],
        num_objects: u32,
        column_prefix: &str,
        mode: ErrorHandling,
    ) -> Result<Self, SchemaError> {
        let mut base = FormatterBase::new(existing_names, column_prefix, mode)?;
        let num_objects = num_objects as usize;

        // Derived names are made unique against the input schema, not
        // against each other
        let label_list_column = generate_unique("label_list", existing_names, Some(column_prefix))?;
        let mut name_columns = Vec::with_capacity(num_objects);
        let mut score_columns = Vec::with_capacity(num_objects);
        for n in 1..=num_objects {
            name_columns.push(generate_unique(
                &format!("label_{n}_name"),
                existing_names,
                Some(column_prefix),
            )?);
            score_columns.push(generate_unique(
                &format!("label_{n}_score"),
                existing_names,
                Some(column_prefix),
            )?);
        }

        base.describe(&label_list_column, "List of object labels from the API");
        for n in 1..=num_objects {
            base.describe(
                &name_columns[n - 1],
                &format!("Object label {n} extracted by the API"),
            );
            base.describe(
                &score_columns[n - 1],
                &format!("Confidence score in label {n} from 0 to 100"),
            );
        }

        Ok(Self {
            base,
            num_objects,
            label_list_column,
            name_columns,
            score_columns,
        })
    }

    /// Labels from a parsed response, sorted by descending confidence.
    fn sorted_labels(response: &Value) -> Vec<&Value> {
        let mut labels: Vec<&Value> = response
            .get("Labels")
            .and_then(Value::as_array)
            .map(|a| a.iter().collect())
            .unwrap_or_default();
        labels.sort_by(|a, b| {
            let ca = a.get("Confidence").and_then(Value::as_f64).unwrap_or(0.0);
            let cb = b.get("Confidence").and_then(Value::as_f64).unwrap_or(0.0);
            cb.total_cmp(&ca)
        });
        labels
    }
}

impl ResponseFormatter for ObjectDetectionFormatter {
    fn base(&self) -> &FormatterBase {
        &self.base
    }

    fn format_row(&self, row: &mut Row) -> Result<(), FormatError> {
        let response = self.base.parse_response(row)?;
        let labels = Self::sorted_labels(&response);

        let names: Vec<Value> = labels
            .iter()
            .map(|l| l.get("Name").cloned().unwrap_or(Value::Null))
            .collect();
        row.set(&self.label_list_column, Value::Array(names));

        for n in 0..self.num_objects {
            match labels.get(n) {
                Some(label) => {
                    row.set(
                        &self.name_columns[n],
                        label
                            .get("Name")
                            .cloned()
                            .unwrap_or_else(|| Value::String(String::new())),
                    );
                    row.set(
                        &self.score_columns[n],
                        label.get("Confidence").cloned().unwrap_or(Value::Null),
                    );
                }
                None => {
                    row.set(&self.name_columns[n], Value::String(String::new()));
                    row.set(&self.score_columns[n], Value::Null);
                }
            }
        }
        Ok(())
    }

    fn annotations(&self, response: &Value) -> Vec<BoundingBox> {
        let labels = response
            .get("Labels")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut boxes = vec![];
        for label in labels {
            let name = label.get("Name").and_then(Value::as_str).unwrap_or("");
            let instances = label
                .get("Instances")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for instance in instances {
                let Some(bbox) = instance.get("BoundingBox") else {
                    continue;
                };
                let coord = |key: &str| {
                    bbox.get(key).and_then(Value::as_f64).unwrap_or(0.0) as f32
                };
                let confidence =
                    instance.get("Confidence").and_then(Value::as_f64).unwrap_or(0.0) / 100.0;
                boxes.push(BoundingBox {
                    label: name.to_string(),
                    confidence: confidence as f32,
                    top: coord("Top"),
                    left: coord("Left"),
                    width: coord("Width"),
                    height: coord("Height"),
                });
            }
        }
        boxes
    }
}
