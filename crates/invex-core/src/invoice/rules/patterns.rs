//! Common regex patterns for invoice field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Currency amounts: symbol or code followed by the number
    pub static ref CURRENCY_AMOUNT: Regex = Regex::new(
        r"(?:\$|€|£|¥|₹|\bUSD|\bEUR|\bGBP|\bJPY|\bINR|\bCAD|\bAUD|\bCHF|\bRs\.?)\s?((?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{2})?)"
    ).unwrap();

    // Labeled totals; the amount must carry two decimals. Group 1 is the label,
    // group 3 is set when the value continues as a dotted date.
    pub static ref LABELED_AMOUNT: Regex = Regex::new(
        r"(?i)\b(Total Amount Due|Amount Due|Balance Due|Total Due|Total New Charges|Grand Total|Total Amount|Net Amount|Net Fare|Total)\b[^\d]*?((?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})(?:(\.\d)|\b)"
    ).unwrap();

    // Date candidates
    pub static ref NUMERIC_DATE: Regex = Regex::new(
        r"\b\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}\b"
    ).unwrap();

    pub static ref DAY_MONTH_YEAR: Regex = Regex::new(
        r"(?i)\b\d{1,2}\s+(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?,?\s+\d{2,4}\b"
    ).unwrap();

    pub static ref MONTH_DAY_YEAR: Regex = Regex::new(
        r"(?i)\b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+\d{1,2},?\s+\d{4}\b"
    ).unwrap();

    // Date labels, invoice side
    pub static ref INVOICE_DATE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:Invoice Date|Bill Date|Billing Date|Date Issued|Issue Date|Statement Date)\b"
    ).unwrap();

    // Date labels, due side
    pub static ref DUE_DATE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:Due Date|Payment Due|Pay By|Due On|Due By|Auto Pay)\b"
    ).unwrap();

    pub static ref GENERIC_DATE_LABEL: Regex = Regex::new(
        r"(?i)\bDate\b"
    ).unwrap();

    // Invoice numbers, in priority order
    pub static ref INVOICE_NUMBER_PATTERNS: Vec<Regex> = [
        r"(?i)\bInvoice\s*Number\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bInvoice\s*No\b\.?\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bInvoice\s*#\s*[:]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bInvoice\s*ID\b\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\b(INV-[A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bBill\s*Number\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bBill\s*No\b\.?\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bBill\s*#\s*[:]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bAccount\s*Number\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bAccount\s*No\b\.?\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bAccount\s*#\s*[:]?\s*([A-Z0-9][A-Z0-9\-/]*)",
        r"(?i)\bRef(?:erence)?\b\.?(?:\s*(?:No\b\.?|Number|#))?\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]*)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    // Keywords that may precede an unlabeled invoice number
    pub static ref NUMBER_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:invoice|inv|bill|account|ref|statement)\b"
    ).unwrap();

    pub static ref BARE_NUMBER: Regex = Regex::new(
        r"\b\d{4,10}\b"
    ).unwrap();

    // Simple first-match patterns for the regex fallback
    pub static ref SIMPLE_AMOUNT_PATTERNS: Vec<Regex> = [
        r"(?i)Total Amount Due\s*[:$]?\s*(\d[\d,]*(?:\.\d{1,2})?)",
        r"(?i)Amount Due\s*[:$]?\s*(\d[\d,]*(?:\.\d{1,2})?)",
        r"(?i)Total\s*[:$]?\s*(\d[\d,]*(?:\.\d{1,2})?)",
        r"\$\s?(\d[\d,]*(?:\.\d{1,2})?)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    pub static ref SIMPLE_NUMBER_PATTERNS: Vec<Regex> = [
        r"(?i)Invoice Number\s*:?\s*([A-Z0-9-]+)",
        r"(?i)Invoice #\s*([A-Z0-9-]+)",
        r"(?i)INV-\s*([A-Z0-9-]+)",
        r"(?i)Bill Number\s*:?\s*([A-Z0-9-]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    // Invoice number embedded in a file name
    pub static ref FILENAME_NUMBER: Regex = Regex::new(
        r"(?i)\b(crn|invoice|inv|bill|ref)[\s#-]*([A-Z0-9]*\d[A-Z0-9]*)"
    ).unwrap();

    pub static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_amount_pattern() {
        let caps: Vec<&str> = CURRENCY_AMOUNT
            .captures_iter("Paid $1,234.56 and EUR 99 and Rs. 450.00")
            .map(|c| c.get(1).unwrap().as_str())
            .collect();
        assert_eq!(caps, vec!["1,234.56", "99", "450.00"]);
    }

    #[test]
    fn test_labeled_amount_requires_decimals() {
        assert!(LABELED_AMOUNT.is_match("Total Amount Due: $108.82"));
        assert!(!LABELED_AMOUNT.is_match("Total items 12"));
    }

    #[test]
    fn test_date_candidates() {
        assert!(NUMERIC_DATE.is_match("on 2015-12-12"));
        assert!(DAY_MONTH_YEAR.is_match("12 Dec 2015"));
        assert!(DAY_MONTH_YEAR.is_match("1 September 15"));
        assert!(MONTH_DAY_YEAR.is_match("January 12, 2016"));
    }
}
