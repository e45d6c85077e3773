//! Formatter for text detection / sentiment responses.
//!
//! Emits one prediction column and four confidence score columns
//! (positive / neutral / negative / mixed), rounded to 3 decimal places.
//! Missing scores stay null, never zero.

use serde_json::Value;

use crate::error::{FormatError, SchemaError};
use crate::schema::generate_unique;
use crate::types::{ErrorHandling, Row};

use super::{FormatterBase, ResponseFormatter};

const SENTIMENTS: [&str; 4] = ["Positive", "Neutral", "Negative", "Mixed"];

pub struct SentimentFormatter {
    base: FormatterBase,
    prediction_column: String,
    /// (response field, generated column name) per sentiment
    score_columns: Vec<(&'static str, String)>,
}

impl SentimentFormatter {
    pub fn new(
        existing_names: &[String],
        column_prefix: &str,
        mode: ErrorHandling,
    ) -> Result<Self, SchemaError> {
        let mut base = FormatterBase::new(existing_names, column_prefix, mode)?;

        let prediction_column = generate_unique("prediction", existing_names, Some(column_prefix))?;
        let mut score_columns = Vec::with_capacity(SENTIMENTS.len());
        for sentiment in SENTIMENTS {
            let column = generate_unique(
                &format!("score_{}", sentiment.to_lowercase()),
                existing_names,
                Some(column_prefix),
            )?;
            score_columns.push((sentiment, column));
        }

        base.describe(
            &prediction_column,
            "Sentiment prediction from the API (POSITIVE/NEUTRAL/NEGATIVE/MIXED)",
        );
        for (sentiment, column) in &score_columns {
            base.describe(
                column,
                &format!(
                    "Confidence score in the {} prediction from 0 to 1",
                    sentiment.to_uppercase()
                ),
            );
        }

        Ok(Self {
            base,
            prediction_column,
            score_columns,
        })
    }
}

fn round3(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

impl ResponseFormatter for SentimentFormatter {
    fn base(&self) -> &FormatterBase {
        &self.base
    }

    fn format_row(&self, row: &mut Row) -> Result<(), FormatError> {
        let response = self.base.parse_response(row)?;

        let prediction = response
            .get("Sentiment")
            .and_then(Value::as_str)
            .unwrap_or("");
        row.set(&self.prediction_column, Value::String(prediction.to_string()));

        let scores = response.get("SentimentScore");
        for (sentiment, column) in &self.score_columns {
            let score = scores
                .and_then(|s| s.get(sentiment))
                .and_then(Value::as_f64);
            match score {
                Some(score) => row.set(column, Value::from(round3(score))),
                None => row.set(column, Value::Null),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RESPONSE: &str = r#"{"Sentiment":"POSITIVE","SentimentScore":{"Positive":0.987654,"Neutral":0.01,"Negative":0.002,"Mixed":0.000346}}"#;

    fn formatter() -> SentimentFormatter {
        SentimentFormatter::new(
            &["image_path".to_string()],
            "sentiment_api",
            ErrorHandling::Log,
        )
        .unwrap()
    }

    fn response_row(fmt: &SentimentFormatter, raw: &str) -> Row {
        Row::from_pairs([
            ("image_path", json!("doc.jpg")),
            (fmt.base.api_columns.response.as_str(), json!(raw)),
        ])
    }

    #[test]
    fn test_prediction_and_rounded_scores() {
        let fmt = formatter();
        let mut row = response_row(&fmt, RESPONSE);
        fmt.format_row(&mut row).unwrap();

        assert_eq!(row.get_str("sentiment_api_prediction"), Some("POSITIVE"));
        assert_eq!(row.get("sentiment_api_score_positive"), Some(&json!(0.988)));
        assert_eq!(row.get("sentiment_api_score_neutral"), Some(&json!(0.01)));
        assert_eq!(row.get("sentiment_api_score_negative"), Some(&json!(0.002)));
        assert_eq!(row.get("sentiment_api_score_mixed"), Some(&json!(0.0)));
    }

    #[test]
    fn test_missing_scores_become_null() {
        let fmt = formatter();
        let raw = r#"{"Sentiment":"NEUTRAL","SentimentScore":{"Neutral":0.9}}"#;
        let mut row = response_row(&fmt, raw);
        fmt.format_row(&mut row).unwrap();

        assert_eq!(row.get("sentiment_api_score_neutral"), Some(&json!(0.9)));
        assert_eq!(row.get("sentiment_api_score_positive"), Some(&Value::Null));
        assert_eq!(row.get("sentiment_api_score_mixed"), Some(&Value::Null));
    }

    #[test]
    fn test_empty_response_yields_empty_prediction() {
        let fmt = formatter();
        let mut row = response_row(&fmt, "{}");
        fmt.format_row(&mut row).unwrap();

        assert_eq!(row.get_str("sentiment_api_prediction"), Some(""));
        assert_eq!(row.get("sentiment_api_score_positive"), Some(&Value::Null));
    }
}
