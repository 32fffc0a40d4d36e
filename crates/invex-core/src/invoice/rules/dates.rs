//! Date extraction and invoice/due date assignment.

use std::collections::BTreeSet;
use std::ops::Range;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use tracing::{debug, trace};

use super::patterns::{
    DAY_MONTH_YEAR, DUE_DATE_LABEL, GENERIC_DATE_LABEL, INVOICE_DATE_LABEL, MONTH_DAY_YEAR,
    NUMERIC_DATE,
};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::config::ExtractionConfig;

/// Supported date layouts, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `2015-12-12`
    YearMonthDay,
    /// `12/31/2015`
    MonthDayYear,
    /// `12/31/15`
    MonthDayShortYear,
    /// `31/12/2015`
    DayMonthYear,
    /// `12 Dec 2015`
    DayAbbrevMonthYear,
    /// `12 December 2015`
    DayMonthNameYear,
    /// `12 Dec 15`
    DayAbbrevMonthShortYear,
    /// `Dec 12, 2015`
    AbbrevMonthDayYear,
    /// `December 12, 2015`
    MonthNameDayYear,
}

impl DateFormat {
    pub const ALL: [DateFormat; 9] = [
        Self::YearMonthDay,
        Self::MonthDayYear,
        Self::MonthDayShortYear,
        Self::DayMonthYear,
        Self::DayAbbrevMonthYear,
        Self::DayMonthNameYear,
        Self::DayAbbrevMonthShortYear,
        Self::AbbrevMonthDayYear,
        Self::MonthNameDayYear,
    ];

    fn chrono_pattern(&self) -> &'static str {
        match self {
            Self::YearMonthDay => "%Y-%m-%d",
            Self::MonthDayYear => "%m/%d/%Y",
            Self::MonthDayShortYear => "%m/%d/%y",
            Self::DayMonthYear => "%d/%m/%Y",
            Self::DayAbbrevMonthYear => "%d %b %Y",
            Self::DayMonthNameYear => "%d %B %Y",
            Self::DayAbbrevMonthShortYear => "%d %b %y",
            Self::AbbrevMonthDayYear => "%b %d, %Y",
            Self::MonthNameDayYear => "%B %d, %Y",
        }
    }

    /// Render a date in this layout.
    pub fn format(&self, date: NaiveDate) -> String {
        date.format(self.chrono_pattern()).to_string()
    }

    /// Parse `s` strictly in this layout.
    ///
    /// Numeric layouts accept `-`, `/` or `.` as separator. A four-digit year
    /// slot takes exactly four digits and a two-digit slot exactly two.
    pub fn parse(&self, s: &str, pivot: i32) -> Option<NaiveDate> {
        let s = s.trim();
        match self {
            Self::YearMonthDay => {
                let [y, m, d] = numeric_parts(s)?;
                ymd(four_digit_year(y)?, m, d)
            }
            Self::MonthDayYear => {
                let [m, d, y] = numeric_parts(s)?;
                ymd(four_digit_year(y)?, m, d)
            }
            Self::MonthDayShortYear => {
                let [m, d, y] = numeric_parts(s)?;
                ymd(two_digit_year(y, pivot)?, m, d)
            }
            Self::DayMonthYear => {
                let [d, m, y] = numeric_parts(s)?;
                ymd(four_digit_year(y)?, m, d)
            }
            Self::DayAbbrevMonthYear => {
                let [d, mon, y] = word_parts(s)?;
                ymd_month(four_digit_year(y)?, abbrev_month(mon)?, d)
            }
            Self::DayMonthNameYear => {
                let [d, mon, y] = word_parts(s)?;
                ymd_month(four_digit_year(y)?, full_month(mon)?, d)
            }
            Self::DayAbbrevMonthShortYear => {
                let [d, mon, y] = word_parts(s)?;
                ymd_month(two_digit_year(y, pivot)?, abbrev_month(mon)?, d)
            }
            Self::AbbrevMonthDayYear => {
                let [mon, d, y] = word_parts(s)?;
                ymd_month(four_digit_year(y)?, abbrev_month(mon)?, d)
            }
            Self::MonthNameDayYear => {
                let [mon, d, y] = word_parts(s)?;
                ymd_month(four_digit_year(y)?, full_month(mon)?, d)
            }
        }
    }
}

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn numeric_parts(s: &str) -> Option<[&str; 3]> {
    let parts: Vec<&str> = s.split(['-', '/', '.']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    let all_digits = [a, b, c]
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    all_digits.then_some([*a, *b, *c])
}

fn word_parts(s: &str) -> Option<[&str; 3]> {
    let parts: Vec<&str> = s
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [a, b, c] => Some([*a, *b, *c]),
        _ => None,
    }
}

fn four_digit_year(s: &str) -> Option<i32> {
    (s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()))
        .then(|| s.parse().ok())
        .flatten()
}

/// `2000 + yy`, moved back a century when that lands after the pivot year.
fn two_digit_year(s: &str, pivot: i32) -> Option<i32> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = 2000 + s.parse::<i32>().ok()?;
    Some(if year > pivot { year - 100 } else { year })
}

fn abbrev_month(s: &str) -> Option<u32> {
    let s = s.trim_end_matches('.').to_lowercase();
    if s.len() != 3 && s != "sept" {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(&s))
        .map(|i| i as u32 + 1)
}

fn full_month(s: &str) -> Option<u32> {
    let s = s.to_lowercase();
    MONTHS.iter().position(|m| *m == s).map(|i| i as u32 + 1)
}

fn ymd(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    if month.len() > 2 {
        return None;
    }
    ymd_month(year, month.parse().ok()?, day)
}

fn ymd_month(year: i32, month: u32, day: &str) -> Option<NaiveDate> {
    if day.len() > 2 || !day.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day.parse().ok()?)
}

/// Tries every [`DateFormat`] in order; the first that parses wins.
#[derive(Debug, Clone, Copy)]
pub struct DateParser {
    pivot: i32,
}

impl DateParser {
    pub fn new(pivot: i32) -> Self {
        Self { pivot }
    }

    pub fn parse(&self, s: &str) -> Option<NaiveDate> {
        DateFormat::ALL.iter().find_map(|f| f.parse(s, self.pivot))
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(ExtractionConfig::default().two_digit_year_pivot)
    }
}

/// Parse a date string with the default two-digit year pivot.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    DateParser::default().parse(s)
}

/// Invoice and due dates found in a text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceDates {
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    Invoice,
    Due,
}

/// Date field extractor.
#[derive(Debug, Clone)]
pub struct DateExtractor {
    parser: DateParser,
    lookahead: usize,
    net_days: i64,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            parser: DateParser::new(config.two_digit_year_pivot),
            lookahead: config.label_lookahead,
            net_days: config.net_days,
        }
    }

    pub fn parser(&self) -> &DateParser {
        &self.parser
    }

    /// Assign invoice and due dates.
    ///
    /// Labeled dates are claimed first; the remaining dates are assigned by
    /// position in time. A lone date gets a due date `net_days` later.
    pub fn extract_dates(&self, text: &str) -> InvoiceDates {
        let matches = self.extract_all(text);
        let mut pool: BTreeSet<NaiveDate> = matches.iter().map(|m| m.value).collect();
        let distinct = pool.len();
        let mut result = InvoiceDates::default();

        if pool.is_empty() {
            return result;
        }

        let specific_spans: Vec<Range<usize>> = INVOICE_DATE_LABEL
            .find_iter(text)
            .chain(DUE_DATE_LABEL.find_iter(text))
            .map(|m| m.range())
            .collect();

        // (label, field, generic)
        let labels: [(&Regex, DateField, bool); 3] = [
            (&INVOICE_DATE_LABEL, DateField::Invoice, false),
            (&DUE_DATE_LABEL, DateField::Due, false),
            (&GENERIC_DATE_LABEL, DateField::Invoice, true),
        ];

        for (label, field, generic) in labels {
            for found in label.find_iter(text) {
                let slot = match field {
                    DateField::Invoice => &mut result.invoice_date,
                    DateField::Due => &mut result.due_date,
                };
                if slot.is_some() {
                    break;
                }
                // "Date" inside "Invoice Date" or "Due Date" belongs to that label.
                if generic
                    && specific_spans
                        .iter()
                        .any(|s| s.start <= found.start() && found.end() <= s.end)
                {
                    continue;
                }

                let window_end = char_offset(text, found.end(), self.lookahead);
                let claimed = matches.iter().find(|m| {
                    m.position
                        .is_some_and(|(start, _)| start >= found.end() && start < window_end)
                        && pool.contains(&m.value)
                });

                if let Some(m) = claimed {
                    trace!("'{}' labels {}", found.as_str(), m.value);
                    *slot = Some(m.value);
                    pool.remove(&m.value);
                }
            }
        }

        if result.invoice_date.is_none() {
            result.invoice_date = pool.pop_first();
        }
        if result.due_date.is_none() {
            result.due_date = match result.invoice_date {
                Some(invoice) => pool.iter().find(|d| **d > invoice).copied(),
                None => pool.first().copied(),
            };
        }

        if distinct == 1 && result.due_date.is_none() {
            result.due_date = result
                .invoice_date
                .and_then(|d| d.checked_add_signed(Duration::days(self.net_days)));
            debug!("Single date found, due date assumed net {}", self.net_days);
        }

        result
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// Every parseable date in order of appearance.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = [&*NUMERIC_DATE, &*DAY_MONTH_YEAR, &*MONTH_DAY_YEAR]
            .into_iter()
            .flat_map(|re| re.find_iter(text))
            .filter_map(|m| {
                let date = self.parser.parse(m.as_str())?;
                Some(ExtractionMatch::new(date, 0.9, m.as_str()).with_position(m.start(), m.end()))
            })
            .collect();

        results.sort_by_key(|m| m.position.map(|(start, _)| start));
        results
    }
}

/// Byte offset `chars` characters after `start`, clamped to the text.
fn char_offset(text: &str, start: usize, chars: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(chars)
        .map(|(i, _)| start + i)
        .unwrap_or(text.len())
}

/// Extract invoice and due dates with default settings.
pub fn extract_dates(text: &str) -> InvoiceDates {
    DateExtractor::new().extract_dates(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_order() {
        assert_eq!(parse_date("2015-12-12"), Some(date(2015, 12, 12)));
        assert_eq!(parse_date("01/12/2016"), Some(date(2016, 1, 12)));
        assert_eq!(parse_date("25/12/2016"), Some(date(2016, 12, 25)));
        assert_eq!(parse_date("12 Dec 2015"), Some(date(2015, 12, 12)));
        assert_eq!(parse_date("12 December 2015"), Some(date(2015, 12, 12)));
        assert_eq!(parse_date("12 Dec 15"), Some(date(2015, 12, 12)));
        assert_eq!(parse_date("Jan 12, 2016"), Some(date(2016, 1, 12)));
        assert_eq!(parse_date("January 12, 2016"), Some(date(2016, 1, 12)));
        assert_eq!(parse_date("2015.12.12"), Some(date(2015, 12, 12)));
    }

    #[test]
    fn test_year_slots_are_strict() {
        assert_eq!(parse_date("12/12/201"), None);
        assert_eq!(parse_date("123-12-12"), None);
        assert_eq!(parse_date("13/13/2015"), None);
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(parse_date("05/01/30"), Some(date(1930, 5, 1)));
        assert_eq!(parse_date("05/01/25"), Some(date(2025, 5, 1)));
        assert_eq!(DateParser::new(2040).parse("05/01/30"), Some(date(2030, 5, 1)));
    }

    #[test]
    fn test_round_trip_every_format() {
        let dates = [date(2015, 12, 12), date(2016, 1, 31), date(1999, 7, 4), date(2024, 2, 29)];
        for format in DateFormat::ALL {
            for d in dates {
                let rendered = format.format(d);
                assert_eq!(format.parse(&rendered, 2025), Some(d), "{:?} {}", format, rendered);
            }
        }
    }

    #[test]
    fn test_round_trip_through_parser() {
        // Day above 12 keeps day-first layouts unambiguous.
        let d = date(2016, 1, 31);
        for format in DateFormat::ALL {
            assert_eq!(parse_date(&format.format(d)), Some(d), "{:?}", format);
        }
    }

    #[test]
    fn test_positional_assignment() {
        let dates = extract_dates("Statement 2016-01-12 issued, see 2015-12-12");
        assert_eq!(dates.invoice_date, Some(date(2015, 12, 12)));
        assert_eq!(dates.due_date, Some(date(2016, 1, 12)));
    }

    #[test]
    fn test_single_date_gets_net_30() {
        let dates = extract_dates("Invoice 1001 printed 2015-12-12");
        assert_eq!(dates.invoice_date, Some(date(2015, 12, 12)));
        assert_eq!(dates.due_date, Some(date(2016, 1, 11)));
    }

    #[test]
    fn test_labels_take_precedence() {
        let text = "Due Date: 01/05/2016 Invoice Date: 12/20/2015 Service 12/01/2015";
        let dates = extract_dates(text);
        assert_eq!(dates.invoice_date, Some(date(2015, 12, 20)));
        assert_eq!(dates.due_date, Some(date(2016, 1, 5)));
    }

    #[test]
    fn test_generic_date_label_is_invoice_side() {
        let text = "Paid 2016-02-01. Date: 2016-01-15";
        let dates = extract_dates(text);
        assert_eq!(dates.invoice_date, Some(date(2016, 1, 15)));
        assert_eq!(dates.due_date, Some(date(2016, 2, 1)));
    }

    #[test]
    fn test_due_label_not_taken_as_generic_date() {
        let dates = extract_dates("Due Date: 2016-01-12");
        assert_eq!(dates.invoice_date, None);
        assert_eq!(dates.due_date, Some(date(2016, 1, 12)));
    }

    #[test]
    fn test_auto_pay_is_due_side() {
        let dates = extract_dates("Auto Pay on 01/20/2016. Bill Date 12/21/2015");
        assert_eq!(dates.invoice_date, Some(date(2015, 12, 21)));
        assert_eq!(dates.due_date, Some(date(2016, 1, 20)));
    }

    #[test]
    fn test_label_lookahead_is_bounded() {
        let text = format!("Due Date {} 2016-01-12", "x".repeat(60));
        let dates = extract_dates(&text);
        assert_eq!(dates.due_date, Some(date(2016, 2, 11)));
        assert_eq!(dates.invoice_date, Some(date(2016, 1, 12)));
    }

    #[test]
    fn test_no_dates() {
        assert_eq!(extract_dates(""), InvoiceDates::default());
    }
}
