//! Formatter for response shapes with no shape-specific extraction.
//!
//! Leaves rows untouched beyond the shared batch pipeline (column
//! reordering, error-column pruning).

use crate::error::{FormatError, SchemaError};
use crate::types::{ErrorHandling, Row};

use super::{FormatterBase, ResponseFormatter};

pub struct GenericFormatter {
    base: FormatterBase,
}

impl GenericFormatter {
    pub fn new(
        existing_names: &[String],
        column_prefix: &str,
        mode: ErrorHandling,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            base: FormatterBase::new(existing_names, column_prefix, mode)?,
        })
    }
}

impl ResponseFormatter for GenericFormatter {
    fn base(&self) -> &FormatterBase {
        &self.base
    }

    fn format_row(&self, _row: &mut Row) -> Result<(), FormatError> {
        Ok(())
    }
}
