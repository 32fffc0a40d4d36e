//! Last-resort guess from the invoice's file name.

use std::path::Path;

use tracing::debug;

use super::rules::patterns::FILENAME_NUMBER;
use super::rules::{DateExtractor, FieldExtractor, NumberExtractor};
use super::PartialRecord;
use crate::models::config::ExtractionConfig;
use crate::models::result::InvoiceFields;

/// Reads an invoice number and dates out of names like `crn_1845194408_2015-12-12.pdf`.
#[derive(Debug, Clone)]
pub struct FilenameGuesser {
    dates: DateExtractor,
    numbers: NumberExtractor,
}

impl FilenameGuesser {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            dates: DateExtractor::from_config(config),
            numbers: NumberExtractor::from_config(config),
        }
    }

    pub fn guess(&self, path: &Path) -> PartialRecord {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return PartialRecord::default();
        };
        // Underscores are word characters; treat them as separators.
        let name = stem.replace('_', " ");

        let invoice_number = FILENAME_NUMBER
            .captures_iter(&name)
            .filter_map(|caps| {
                let prefix = caps.get(1)?.as_str();
                let value = caps.get(2)?.as_str().to_uppercase();
                Some(if prefix.eq_ignore_ascii_case("crn") {
                    format!("CRN{}", value)
                } else {
                    value
                })
            })
            .find(|n| self.numbers.is_acceptable(n));

        let mut dates = Vec::new();
        for m in self.dates.extract_all(&name) {
            if !dates.contains(&m.value) {
                dates.push(m.value);
            }
        }
        dates.sort();

        let record = PartialRecord {
            fields: InvoiceFields {
                invoice_date: dates.first().copied(),
                invoice_number,
                amount: None,
                due_date: dates.get(1).copied(),
            },
            invoice_number_validated: false,
        };

        debug!("Filename guess for '{}': {:?}", stem, record.fields);
        record
    }
}

impl Default for FilenameGuesser {
    fn default() -> Self {
        Self::new()
    }
}
