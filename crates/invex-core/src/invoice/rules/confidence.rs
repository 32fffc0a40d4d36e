//! Heuristic confidence score.

use crate::models::result::InvoiceFields;

const AMOUNT_WEIGHT: f64 = 0.4;
const NUMBER_WEIGHT: f64 = 0.3;
const VALIDATED_NUMBER_BONUS: f64 = 0.05;
const INVOICE_DATE_WEIGHT: f64 = 0.2;
const DUE_DATE_WEIGHT: f64 = 0.1;

/// Lowest score an extraction can report.
pub const MIN_CONFIDENCE: f64 = 0.1;
/// Highest score an extraction can report.
pub const MAX_CONFIDENCE: f64 = 0.98;

/// Weighted sum of the present fields, clamped to `[0.1, 0.98]`.
pub fn score(fields: &InvoiceFields, number_validated: bool) -> f64 {
    let mut total = 0.0;

    if fields.amount.is_some() {
        total += AMOUNT_WEIGHT;
    }
    if fields.invoice_number.as_deref().is_some_and(|n| !n.is_empty()) {
        total += NUMBER_WEIGHT;
        if number_validated {
            total += VALIDATED_NUMBER_BONUS;
        }
    }
    if fields.invoice_date.is_some() {
        total += INVOICE_DATE_WEIGHT;
    }
    if fields.due_date.is_some() {
        total += DUE_DATE_WEIGHT;
    }

    total.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_score_band() {
        let date = NaiveDate::from_ymd_opt(2016, 1, 12);
        let number = Some("1001".to_string());
        let amount = Some(Decimal::ONE);

        // Every combination of present fields and validation.
        for mask in 0u8..16 {
            for validated in [false, true] {
                let fields = InvoiceFields {
                    amount: if mask & 1 != 0 { amount } else { None },
                    invoice_number: if mask & 2 != 0 { number.clone() } else { None },
                    invoice_date: if mask & 4 != 0 { date } else { None },
                    due_date: if mask & 8 != 0 { date } else { None },
                };
                let s = score(&fields, validated);
                assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&s), "{}", s);
            }
        }
    }

    #[test]
    fn test_empty_is_floor_and_full_is_ceiling() {
        assert_eq!(score(&InvoiceFields::default(), false), MIN_CONFIDENCE);

        let full = InvoiceFields {
            amount: Some(Decimal::ONE),
            invoice_number: Some("1001".to_string()),
            invoice_date: NaiveDate::from_ymd_opt(2015, 12, 12),
            due_date: NaiveDate::from_ymd_opt(2016, 1, 12),
        };
        assert_eq!(score(&full, true), MAX_CONFIDENCE);
    }

    #[test]
    fn test_weights() {
        let amount_only = InvoiceFields {
            amount: Some(Decimal::ONE),
            ..Default::default()
        };
        assert!((score(&amount_only, false) - 0.4).abs() < 1e-9);

        let number_only = InvoiceFields {
            invoice_number: Some("1001".to_string()),
            ..Default::default()
        };
        assert!((score(&number_only, true) - 0.35).abs() < 1e-9);
        assert!((score(&number_only, false) - 0.3).abs() < 1e-9);
    }
}
