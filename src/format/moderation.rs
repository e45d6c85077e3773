//! Formatter for unsafe content / entity moderation responses.
//!
//! For each entity category selected by the caller, emits a column holding
//! the matched text values whose confidence meets the minimum threshold
//! (0-100 scale, matching the API). An empty match list is represented as
//! the empty string rather than an empty list; downstream consumers of this
//! variant depend on that.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FormatError, SchemaError};
use crate::schema::generate_unique;
use crate::types::{ErrorHandling, Row};

use super::{FormatterBase, ResponseFormatter};

/// Closed set of entity categories the moderation API reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityCategory {
    CommercialItem,
    Date,
    Event,
    Location,
    Organization,
    Other,
    Person,
    Quantity,
    Title,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 9] = [
        EntityCategory::CommercialItem,
        EntityCategory::Date,
        EntityCategory::Event,
        EntityCategory::Location,
        EntityCategory::Organization,
        EntityCategory::Other,
        EntityCategory::Person,
        EntityCategory::Quantity,
        EntityCategory::Title,
    ];

    /// The `Type` value the API reports for this category.
    pub fn api_name(&self) -> &'static str {
        match self {
            EntityCategory::CommercialItem => "COMMERCIAL_ITEM",
            EntityCategory::Date => "DATE",
            EntityCategory::Event => "EVENT",
            EntityCategory::Location => "LOCATION",
            EntityCategory::Organization => "ORGANIZATION",
            EntityCategory::Other => "OTHER",
            EntityCategory::Person => "PERSON",
            EntityCategory::Quantity => "QUANTITY",
            EntityCategory::Title => "TITLE",
        }
    }

    /// Human-readable label for column descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            EntityCategory::CommercialItem => "Commercial item",
            EntityCategory::Date => "Date",
            EntityCategory::Event => "Event",
            EntityCategory::Location => "Location",
            EntityCategory::Organization => "Organization",
            EntityCategory::Other => "Other",
            EntityCategory::Person => "Person",
            EntityCategory::Quantity => "Quantity",
            EntityCategory::Title => "Title",
        }
    }

    fn column_suffix(&self) -> String {
        format!("entity_type_{}", self.api_name().to_lowercase())
    }
}

pub struct UnsafeContentFormatter {
    base: FormatterBase,
    minimum_score: f64,
    /// (category, generated column name), sorted by category
    category_columns: Vec<(EntityCategory, String)>,
}

impl UnsafeContentFormatter {
    pub fn new(
        existing_names: &[String],
        categories: &[EntityCategory],
        minimum_score: f32,
        column_prefix: &str,
        mode: ErrorHandling,
    ) -> Result<Self, SchemaError> {
        let mut base = FormatterBase::new(existing_names, column_prefix, mode)?;

        let mut selected = categories.to_vec();
        selected.sort();
        selected.dedup();

        let mut category_columns = Vec::with_capacity(selected.len());
        for category in selected {
            let column =
                generate_unique(&category.column_suffix(), existing_names, Some(column_prefix))?;
            category_columns.push((category, column));
        }

        // Descriptions cover the full category set, selected or not, so the
        // output schema annotation is stable across runs
        for category in EntityCategory::ALL {
            let column =
                generate_unique(&category.column_suffix(), existing_names, Some(column_prefix))?;
            base.describe(
                &column,
                &format!("List of '{}' entities recognized by the API", category.label()),
            );
        }

        Ok(Self {
            base,
            minimum_score: minimum_score as f64,
            category_columns,
        })
    }
}

impl ResponseFormatter for UnsafeContentFormatter {
    fn base(&self) -> &FormatterBase {
        &self.base
    }

    fn format_row(&self, row: &mut Row) -> Result<(), FormatError> {
        let response = self.base.parse_response(row)?;
        let entities = response
            .get("Entities")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for (category, column) in &self.category_columns {
            let matches: Vec<Value> = entities
                .iter()
                .filter(|e| {
                    e.get("Type").and_then(Value::as_str) == Some(category.api_name())
                        && e.get("Score").and_then(Value::as_f64).unwrap_or(0.0)
                            >= self.minimum_score
                })
                .map(|e| e.get("Text").cloned().unwrap_or(Value::Null))
                .collect();

            if matches.is_empty() {
                // Empty string, not an empty list, for this variant
                row.set(column, Value::String(String::new()));
            } else {
                row.set(column, Value::Array(matches));
            }
        }
        Ok(())
    }
}

/// Maximum moderation confidence per content family, with flags against a
/// threshold on the API's native 0-100 scale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModerationSummary {
    pub adult_score: f64,
    pub suggestive_score: f64,
    pub violence_score: f64,
    pub is_adult_content: bool,
    pub is_suggestive_content: bool,
    pub is_violent_content: bool,
}

impl ModerationSummary {
    /// Summarize a moderation-labels response.
    ///
    /// A label counts toward a family when its `Name` or `ParentName`
    /// matches; the family score is the maximum confidence seen. Each flag
    /// compares its own family's score against the threshold.
    pub fn from_response(response: &Value, flag_threshold: f64) -> Self {
        let labels = response
            .get("ModerationLabels")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut summary = ModerationSummary::default();
        for label in labels {
            let name = label.get("Name").and_then(Value::as_str).unwrap_or("");
            let parent = label.get("ParentName").and_then(Value::as_str).unwrap_or("");
            let confidence = label.get("Confidence").and_then(Value::as_f64).unwrap_or(0.0);

            let is_family = |family: &str| name == family || parent == family;
            if is_family("Explicit Nudity") {
                summary.adult_score = summary.adult_score.max(confidence);
            }
            if is_family("Suggestive") {
                summary.suggestive_score = summary.suggestive_score.max(confidence);
            }
            if is_family("Violence") {
                summary.violence_score = summary.violence_score.max(confidence);
            }
        }

        summary.is_adult_content = summary.adult_score > flag_threshold;
        summary.is_suggestive_content = summary.suggestive_score > flag_threshold;
        summary.is_violent_content = summary.violence_score > flag_threshold;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formatter(categories: &[EntityCategory], minimum_score: f32) -> UnsafeContentFormatter {
        UnsafeContentFormatter::new(
            &["image_path".to_string()],
            categories,
            minimum_score,
            "entity_api",
            ErrorHandling::Log,
        )
        .unwrap()
    }

    fn response_row(fmt: &UnsafeContentFormatter, raw: &str) -> Row {
        Row::from_pairs([
            ("image_path", json!("img.jpg")),
            (fmt.base.api_columns.response.as_str(), json!(raw)),
        ])
    }

    #[test]
    fn test_no_matches_yields_empty_string_not_list() {
        let fmt = formatter(&[EntityCategory::Person], 50.0);
        // One Explicit Nudity entity at 80, but no PERSON matches
        let raw = r#"{"Entities":[{"Type":"EXPLICIT_NUDITY","Text":"x","Score":80.0}]}"#;
        let mut row = response_row(&fmt, raw);
        fmt.format_row(&mut row).unwrap();

        assert_eq!(row.get("entity_api_entity_type_person"), Some(&json!("")));
    }

    #[test]
    fn test_matches_above_threshold_listed() {
        let fmt = formatter(&[EntityCategory::Person], 50.0);
        let raw = r#"{"Entities":[
            {"Type":"PERSON","Text":"Ada","Score":93.0},
            {"Type":"PERSON","Text":"Bob","Score":40.0},
            {"Type":"LOCATION","Text":"Paris","Score":99.0}
        ]}"#;
        let mut row = response_row(&fmt, raw);
        fmt.format_row(&mut row).unwrap();

        assert_eq!(
            row.get("entity_api_entity_type_person"),
            Some(&json!(["Ada"]))
        );
    }

    #[test]
    fn test_unselected_categories_get_no_column() {
        let fmt = formatter(&[EntityCategory::Person], 50.0);
        let raw = r#"{"Entities":[{"Type":"LOCATION","Text":"Paris","Score":99.0}]}"#;
        let mut row = response_row(&fmt, raw);
        fmt.format_row(&mut row).unwrap();

        assert!(!row.contains("entity_api_entity_type_location"));
    }

    #[test]
    fn test_descriptions_cover_all_categories() {
        let fmt = formatter(&[EntityCategory::Person], 50.0);
        let descriptions = fmt.column_descriptions();
        // 4 API columns + 9 category columns
        assert_eq!(descriptions.len(), 13);
        assert!(descriptions.contains_key("entity_api_entity_type_quantity"));
    }

    #[test]
    fn test_summary_scores_per_family() {
        let response = json!({"ModerationLabels": [
            {"Name": "Graphic Violence", "ParentName": "Violence", "Confidence": 88.0},
            {"Name": "Violence", "ParentName": "", "Confidence": 70.0},
            {"Name": "Suggestive", "ParentName": "", "Confidence": 30.0}
        ]});
        let summary = ModerationSummary::from_response(&response, 50.0);

        assert_eq!(summary.violence_score, 88.0);
        assert_eq!(summary.suggestive_score, 30.0);
        assert_eq!(summary.adult_score, 0.0);
        // The violent flag follows the violence score, not the suggestive one
        assert!(summary.is_violent_content);
        assert!(!summary.is_suggestive_content);
        assert!(!summary.is_adult_content);
    }

    #[test]
    fn test_entity_category_deserializes_screaming_snake() {
        let category: EntityCategory = serde_json::from_str("\"COMMERCIAL_ITEM\"").unwrap();
        assert_eq!(category, EntityCategory::CommercialItem);
    }
}
