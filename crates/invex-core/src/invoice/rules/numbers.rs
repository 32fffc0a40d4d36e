//! Invoice number extraction.

use tracing::trace;

use super::patterns::{
    BARE_NUMBER, DAY_MONTH_YEAR, INVOICE_NUMBER_PATTERNS, MONTH_DAY_YEAR, NUMBER_KEYWORD,
    NUMERIC_DATE,
};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::config::ExtractionConfig;

/// Words a careless label pattern tends to capture instead of a number.
const NOISE_WORDS: [&str; 12] = [
    "date", "amount", "total", "page", "number", "due", "invoice", "account", "bill", "balance",
    "ref", "customer",
];

/// Characters after a keyword searched for an unlabeled number.
const KEYWORD_WINDOW: usize = 50;

/// An invoice number and whether a labeled pattern produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceNumber {
    pub value: String,
    pub validated: bool,
}

/// Invoice number field extractor.
#[derive(Debug, Clone)]
pub struct NumberExtractor {
    min_len: usize,
}

impl NumberExtractor {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            min_len: config.invoice_number_min_len,
        }
    }

    /// Passes the length, digit and noise-word filters.
    pub fn is_acceptable(&self, candidate: &str) -> bool {
        candidate.chars().count() >= self.min_len
            && candidate.chars().any(|c| c.is_ascii_digit())
            && !NOISE_WORDS.contains(&candidate.to_lowercase().as_str())
    }

    /// Labeled patterns first; otherwise a bare number near an invoice keyword.
    pub fn extract_number(&self, text: &str) -> Option<InvoiceNumber> {
        if let Some(m) = self.extract(text) {
            return Some(InvoiceNumber {
                value: m.value,
                validated: true,
            });
        }

        self.near_keyword(text).map(|value| InvoiceNumber {
            value,
            validated: false,
        })
    }

    fn near_keyword(&self, text: &str) -> Option<String> {
        let date_spans: Vec<(usize, usize)> = [&*NUMERIC_DATE, &*DAY_MONTH_YEAR, &*MONTH_DAY_YEAR]
            .into_iter()
            .flat_map(|pattern| pattern.find_iter(text).map(|m| (m.start(), m.end())))
            .collect();
        let inside_date =
            |start: usize, end: usize| date_spans.iter().any(|&(s, e)| start >= s && end <= e);

        for keyword in NUMBER_KEYWORD.find_iter(text) {
            let window_end = text[keyword.end()..]
                .char_indices()
                .nth(KEYWORD_WINDOW)
                .map(|(i, _)| keyword.end() + i)
                .unwrap_or(text.len());
            let window = &text[keyword.end()..window_end];

            for m in BARE_NUMBER.find_iter(window) {
                // Skip pieces of dates and decimal amounts.
                let before = window[..m.start()].chars().next_back();
                let after = window[m.end()..].chars().next();
                let in_date = |c: Option<char>| matches!(c, Some('-' | '/' | '.' | ','));
                if in_date(before) || in_date(after) {
                    continue;
                }
                let start = keyword.end() + m.start();
                if inside_date(start, keyword.end() + m.end()) {
                    trace!("Skipping year {} of a date", m.as_str());
                    continue;
                }
                trace!("Unlabeled number {} after '{}'", m.as_str(), keyword.as_str());
                return Some(m.as_str().to_string());
            }
        }
        None
    }
}

impl Default for NumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for NumberExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// Acceptable labeled captures, in pattern priority order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for pattern in INVOICE_NUMBER_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let Some(value) = caps.get(1) else { continue };
                let candidate = value.as_str().trim_end_matches(['-', '/']);
                if !self.is_acceptable(candidate) {
                    trace!("Rejected invoice number candidate '{}'", candidate);
                    continue;
                }
                results.push(
                    ExtractionMatch::new(candidate.to_string(), 0.9, value.as_str())
                        .with_position(value.start(), value.end()),
                );
            }
        }

        results
    }
}

/// Extract an invoice number with default settings.
pub fn extract_invoice_number(text: &str) -> Option<InvoiceNumber> {
    NumberExtractor::new().extract_number(text)
}
