//! Pattern-based field strategies.

use tracing::debug;

use super::rules::patterns::{SIMPLE_AMOUNT_PATTERNS, SIMPLE_NUMBER_PATTERNS};
use super::rules::{
    normalize_text, parse_amount, AmountExtractor, DateExtractor, FieldExtractor, NumberExtractor,
};
use super::{FieldStrategy, PartialRecord};
use crate::models::config::ExtractionConfig;
use crate::models::result::{ExtractionMethod, InvoiceFields};

/// Context-aware extraction: largest plausible amount, labeled dates,
/// labeled invoice number. The primary strategy.
#[derive(Debug, Clone)]
pub struct PatternStrategy {
    amounts: AmountExtractor,
    dates: DateExtractor,
    numbers: NumberExtractor,
}

impl PatternStrategy {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            amounts: AmountExtractor::from_config(config),
            dates: DateExtractor::from_config(config),
            numbers: NumberExtractor::from_config(config),
        }
    }

    pub fn numbers(&self) -> &NumberExtractor {
        &self.numbers
    }

    pub fn dates(&self) -> &DateExtractor {
        &self.dates
    }

    pub fn amounts(&self) -> &AmountExtractor {
        &self.amounts
    }

    /// Extract all four fields from raw text.
    pub fn extract_information(&self, text: &str) -> PartialRecord {
        let text = normalize_text(text);

        let amount = self.amounts.extract(&text).map(|m| m.value);
        let dates = self.dates.extract_dates(&text);
        let number = self.numbers.extract_number(&text);

        let record = PartialRecord {
            invoice_number_validated: number.as_ref().is_some_and(|n| n.validated),
            fields: InvoiceFields {
                invoice_date: dates.invoice_date,
                invoice_number: number.map(|n| n.value),
                amount,
                due_date: dates.due_date,
            },
        };

        debug!(
            fields = record.present_count(),
            "Pattern extraction: {:?}", record.fields
        );
        record
    }
}

impl Default for PatternStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldStrategy for PatternStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::IntelligentPatterns
    }

    fn attempt(&self, text: &str) -> PartialRecord {
        self.extract_information(text)
    }
}

/// First-match regular expressions with no context scoring.
///
/// Catches layouts where the pattern strategy's stricter filters reject
/// everything.
#[derive(Debug, Clone)]
pub struct RegexStrategy {
    amounts: AmountExtractor,
    dates: DateExtractor,
    numbers: NumberExtractor,
}

impl RegexStrategy {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            amounts: AmountExtractor::from_config(config),
            dates: DateExtractor::from_config(config),
            numbers: NumberExtractor::from_config(config),
        }
    }

    fn first_amount(&self, text: &str) -> Option<rust_decimal::Decimal> {
        SIMPLE_AMOUNT_PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures_iter(text)
                .filter_map(|caps| parse_amount(caps.get(1)?.as_str()))
                .find(|amount| self.amounts.is_plausible(*amount))
        })
    }

    fn first_number(&self, text: &str) -> Option<String> {
        SIMPLE_NUMBER_PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().trim_end_matches('-'))
                .find(|candidate| self.numbers.is_acceptable(candidate))
                .map(str::to_string)
        })
    }
}

impl Default for RegexStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldStrategy for RegexStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::RegexFallback
    }

    fn attempt(&self, text: &str) -> PartialRecord {
        // Dates in order of appearance: first is the invoice date, second the due date.
        let mut dates = Vec::new();
        for m in self.dates.extract_all(text) {
            if !dates.contains(&m.value) {
                dates.push(m.value);
            }
        }

        let number = self.first_number(text);
        let record = PartialRecord {
            invoice_number_validated: number.is_some(),
            fields: InvoiceFields {
                invoice_date: dates.first().copied(),
                invoice_number: number,
                amount: self.first_amount(text),
                due_date: dates.get(1).copied(),
            },
        };

        debug!(
            fields = record.present_count(),
            "Regex extraction: {:?}", record.fields
        );
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    const BILL: &str = "ACME Utilities\n\
        Invoice #1164006105\n\
        Service period 2015-12-12\n\
        Please pay $108.82\n\
        by 2016-01-12\n";

    #[test]
    fn test_full_invoice() {
        let record = PatternStrategy::new().extract_information(BILL);

        assert_eq!(
            record.fields,
            InvoiceFields {
                invoice_date: date(2015, 12, 12),
                invoice_number: Some("1164006105".to_string()),
                amount: Some(Decimal::from_str("108.82").unwrap()),
                due_date: date(2016, 1, 12),
            }
        );
        assert!(record.invoice_number_validated);
        assert_eq!(record.confidence(), 0.98);
    }

    #[test]
    fn test_single_date_synthesizes_due_date() {
        let record = PatternStrategy::new().extract_information("Invoice total $20.00 on 2015-12-12");
        assert_eq!(record.fields.invoice_date, date(2015, 12, 12));
        assert_eq!(record.fields.due_date, date(2016, 1, 11));
    }

    #[test]
    fn test_empty_text_floors_confidence() {
        for text in ["", "   \n\t  "] {
            let record = PatternStrategy::new().extract_information(text);
            assert!(record.is_empty());
            assert_eq!(record.confidence(), 0.1);
        }
    }

    #[test]
    fn test_labels_across_line_breaks() {
        let text = "Amount\nDue:\n$1,250.00\nInvoice\nDate: 03/01/2016\nDue\nDate: 03/31/2016";
        let record = PatternStrategy::new().extract_information(text);
        assert_eq!(record.fields.amount, Some(Decimal::from_str("1250.00").unwrap()));
        assert_eq!(record.fields.invoice_date, date(2016, 3, 1));
        assert_eq!(record.fields.due_date, date(2016, 3, 31));
    }

    #[test]
    fn test_dates_are_not_read_as_other_fields() {
        let record =
            PatternStrategy::new().extract_information("Statement Date January 12, 2016\nTotal $50.00");
        assert_eq!(record.fields.invoice_number, None);
        assert_eq!(record.fields.invoice_date, date(2016, 1, 12));
        assert_eq!(record.fields.amount, Some(Decimal::from_str("50.00").unwrap()));

        let record = PatternStrategy::new().extract_information("Invoice #A1001\nTotal Due 01.05.2016");
        assert_eq!(record.fields.invoice_number.as_deref(), Some("A1001"));
        assert_eq!(record.fields.amount, None);
        assert_eq!(record.fields.invoice_date, date(2016, 1, 5));
    }

    #[test]
    fn test_regex_strategy_takes_first_matches() {
        let text = "Invoice Number: ZX-881\n\
            Total Amount Due 75.10\n\
            Other $900.00\n\
            Issued 2016-02-01, due 2016-01-15";
        let record = RegexStrategy::new().attempt(text);

        assert_eq!(
            record.fields,
            InvoiceFields {
                invoice_date: date(2016, 2, 1),
                invoice_number: Some("ZX-881".to_string()),
                amount: Some(Decimal::from_str("75.10").unwrap()),
                due_date: date(2016, 1, 15),
            }
        );
    }

    #[test]
    fn test_regex_strategy_on_empty_text() {
        assert!(RegexStrategy::new().attempt("").is_empty());
    }

    #[test]
    fn test_strategy_methods() {
        assert_eq!(PatternStrategy::new().method(), ExtractionMethod::IntelligentPatterns);
        assert_eq!(RegexStrategy::new().method(), ExtractionMethod::RegexFallback);
    }
}
