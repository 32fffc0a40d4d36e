//! Amount extraction.
//!
//! Invoices list subtotals, taxes and fees before the grand total, and the
//! grand total is the largest of them. Every currency-tagged or labeled value
//! within the plausible range is a candidate and the maximum wins.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::trace;

use super::patterns::{CURRENCY_AMOUNT, LABELED_AMOUNT};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::config::ExtractionConfig;

/// Amount field extractor.
#[derive(Debug, Clone)]
pub struct AmountExtractor {
    min_amount: Decimal,
    max_amount: Decimal,
    label_window: usize,
}

impl AmountExtractor {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            min_amount: config.min_amount,
            max_amount: config.max_amount,
            label_window: config.amount_label_window,
        }
    }

    /// Set the plausible range.
    pub fn with_bounds(mut self, min_amount: Decimal, max_amount: Decimal) -> Self {
        self.min_amount = min_amount;
        self.max_amount = max_amount;
        self
    }

    pub fn is_plausible(&self, amount: Decimal) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }

    /// Labeled matches whose gap between label and value fits the window.
    fn labeled(&self, text: &str) -> Vec<ExtractionMatch<Decimal>> {
        let mut results = Vec::new();

        for caps in LABELED_AMOUNT.captures_iter(text) {
            let (Some(full), Some(label), Some(value)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            // A further `.digit` means the value is the head of a dotted date.
            if caps.get(3).is_some() {
                trace!("Skipping dotted date after '{}'", label.as_str());
                continue;
            }
            let gap = text[label.end()..value.start()].chars().count();
            if gap > self.label_window {
                trace!("Label '{}' too far from {}", label.as_str(), value.as_str());
                continue;
            }
            if let Some(amount) = parse_amount(value.as_str()) {
                results.push(
                    ExtractionMatch::new(amount, 0.95, full.as_str())
                        .with_position(full.start(), full.end()),
                );
            }
        }

        results
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    /// The largest plausible amount; on equal values the labeled match wins.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().max_by(|a, b| {
            a.value
                .cmp(&b.value)
                .then_with(|| a.confidence.total_cmp(&b.confidence))
        })
    }

    /// Every plausible candidate, currency matches first, then labeled ones.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in CURRENCY_AMOUNT.captures_iter(text) {
            let Some(full) = caps.get(0) else { continue };
            if let Some(amount) = parse_amount(full.as_str()) {
                results.push(
                    ExtractionMatch::new(amount, 0.8, full.as_str())
                        .with_position(full.start(), full.end()),
                );
            }
        }

        results.extend(self.labeled(text));

        results.retain(|m| {
            let keep = self.is_plausible(m.value);
            if !keep {
                trace!("Dropping implausible amount {} from '{}'", m.value, m.source);
            }
            keep
        });

        results
    }
}

/// Extract the canonical invoice amount with default bounds.
pub fn extract_amount(text: &str) -> Option<Decimal> {
    AmountExtractor::new().extract(text).map(|m| m.value)
}

/// Parse an amount such as `$1,234.56`, `Rs. 450` or `Total: 99.00`.
///
/// Currency tokens and labels before the first digit are dropped, as are
/// thousands separators.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let number: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();

    Decimal::from_str(number.trim_end_matches('.')).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("Rs. 450"), Some(dec("450")));
        assert_eq!(parse_amount("EUR 99.00"), Some(dec("99.00")));
        assert_eq!(parse_amount("Total Due: 12,000.10"), Some(dec("12000.10")));
        assert_eq!(parse_amount("no digits"), None);
    }

    #[test]
    fn test_largest_amount_wins() {
        let text = "Subtotal $95.00 Tax $13.82 Total Amount Due $108.82";
        assert_eq!(extract_amount(text), Some(dec("108.82")));
    }

    #[test]
    fn test_labeled_amount_without_currency() {
        assert_eq!(extract_amount("Balance Due: 1,250.00"), Some(dec("1250.00")));
    }

    #[test]
    fn test_out_of_range_values_dropped() {
        assert_eq!(extract_amount("Ref $0 and $5,000,000.00"), None);

        let capped = AmountExtractor::new().with_bounds(dec("0.01"), dec("2000"));
        assert_eq!(
            capped.extract("$1999.99 and $2500.00").map(|m| m.value),
            Some(dec("1999.99"))
        );
    }

    #[test]
    fn test_selection_is_monotonic() {
        let base = "Subtotal $40.00 Total $45.50";
        let before = extract_amount(base).unwrap();

        for extra in ["$10.00", "$45.50", "$46.00", "€999.99", "USD 120"] {
            let after = extract_amount(&format!("{} {}", base, extra)).unwrap();
            assert!(after >= before, "{} lowered the amount", extra);
        }
    }

    #[test]
    fn test_label_window_is_bounded() {
        let far = format!("Total {} 250.00", "x".repeat(120));
        assert_eq!(extract_amount(&far), None);

        let near = format!("Total {} 250.00", "x".repeat(20));
        assert_eq!(extract_amount(&near), Some(dec("250.00")));
    }

    #[test]
    fn test_dotted_date_after_label_is_not_amount() {
        assert_eq!(extract_amount("Invoice #A1001 Total Due 01.05.2016"), None);
        assert_eq!(
            extract_amount("Total Due 01.05.2016 Amount Due 75.20"),
            Some(dec("75.20"))
        );
        assert_eq!(extract_amount("Grand Total 310.40."), Some(dec("310.40")));
    }

    #[test]
    fn test_net_fare_label() {
        assert_eq!(extract_amount("Net Fare 1,420.00 INR"), Some(dec("1420.00")));
    }

    #[test]
    fn test_equal_values_prefer_labeled_match() {
        let best = AmountExtractor::new()
            .extract("Paid $45.50 Total Due 45.50")
            .unwrap();
        assert_eq!(best.value, dec("45.50"));
        assert!(best.source.starts_with("Total Due"));
    }

    #[test]
    fn test_empty_text_has_no_amount() {
        assert_eq!(extract_amount(""), None);
        assert!(AmountExtractor::new().extract_all("   ").is_empty());
    }
}
