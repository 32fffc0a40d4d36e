//! Heuristic test that extracted text is a real invoice and not garbled noise.

use tracing::trace;

use crate::models::config::PdfConfig;

/// Keyword-count plausibility check applied to every text representation.
#[derive(Debug, Clone)]
pub struct PlausibilityCheck {
    min_text_chars: usize,
    min_keyword_hits: usize,
    keywords: Vec<String>,
}

impl PlausibilityCheck {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            min_text_chars: config.min_text_chars,
            min_keyword_hits: config.min_keyword_hits,
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Number of distinct keywords present in the text.
    pub fn keyword_hits(&self, text: &str) -> usize {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| !k.is_empty() && lower.contains(k.as_str()))
            .count()
    }

    pub fn is_plausible(&self, text: &str) -> bool {
        let trimmed = text.trim();
        let chars = trimmed.chars().count();
        if chars < self.min_text_chars {
            trace!(chars, "Text too short");
            return false;
        }

        let hits = self.keyword_hits(trimmed);
        trace!(chars, hits, "Plausibility check");
        hits >= self.min_keyword_hits
    }
}

impl Default for PlausibilityCheck {
    fn default() -> Self {
        Self::new(&PdfConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_text_is_plausible() {
        let check = PlausibilityCheck::default();
        assert!(check.is_plausible("INVOICE #1001\nTotal Amount Due: $108.82"));
    }

    #[test]
    fn test_single_keyword_is_not_enough() {
        let check = PlausibilityCheck::default();
        assert_eq!(check.keyword_hits("Total: x0x0x0x0x0x0x0"), 1);
        assert!(!check.is_plausible("Total: x0x0x0x0x0x0x0"));
    }

    #[test]
    fn test_short_or_blank_text_is_rejected() {
        let check = PlausibilityCheck::default();
        assert!(!check.is_plausible(""));
        assert!(!check.is_plausible("   \n  "));
        assert!(!check.is_plausible("bill due"));
    }

    #[test]
    fn test_repeated_keyword_counts_once() {
        let check = PlausibilityCheck::default();
        assert_eq!(check.keyword_hits("total total total total"), 1);
    }
}
