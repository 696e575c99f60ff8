use std::sync::LazyLock;

use chrono::{Duration, Local, NaiveDate};
use regex::Regex;

use crate::scraper::location::clean_location;
use crate::scraper::platforms::PlatformParser;

static DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"posted\s+(\d+)\s+days?\s+ago").expect("valid regex"));
static PLUS_DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"posted\s*(\d+)\+\s*days?\s*ago").expect("valid regex"));
static JOB_ID_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^job\s*id\s*:?\s*").expect("valid regex"));
static REQ_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^req-?").expect("valid regex"));

/// Absolute formats seen on Workday boards, tried in order. Month-first
/// slash dates win over day-first, matching how the boards themselves
/// render US-style dates; day-first only matches when month-first cannot.
const ABSOLUTE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Field normalization for Workday job boards: relative and absolute
/// posted dates, "Locations:"-prefixed location strings, and "REQ-"-style
/// job identifiers.
#[derive(Debug, Default)]
pub struct WorkdayParser;

impl WorkdayParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_date_with_today(&self, raw: &str, today: NaiveDate) -> Option<NaiveDate> {
        if raw.trim().is_empty() {
            return None;
        }

        let date_str = raw.to_lowercase().replace("posted on", "");
        let date_str = date_str.trim();

        if date_str.contains("posted today") || date_str.contains("just posted") {
            return Some(today);
        }
        if date_str.contains("posted yesterday") {
            return today.checked_sub_signed(Duration::days(1));
        }

        for pattern in [&*DAYS_AGO, &*PLUS_DAYS_AGO] {
            if let Some(caps) = pattern.captures(date_str) {
                let days: i64 = caps[1].parse().ok()?;
                return today.checked_sub_signed(Duration::days(days));
            }
        }

        let cleaned = date_str.replace("posted ", "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return None;
        }
        ABSOLUTE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(cleaned, format).ok())
    }
}

impl PlatformParser for WorkdayParser {
    fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        self.parse_date_with_today(raw, Local::now().date_naive())
    }

    fn parse_location(&self, raw: &str) -> String {
        clean_location(raw)
    }

    fn parse_job_id(&self, raw: &str) -> String {
        let id = raw.trim();
        let id = JOB_ID_PREFIX.replace(id, "");
        let id = REQ_PREFIX.replace(&id, "");
        id.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn parse(raw: &str) -> Option<NaiveDate> {
        WorkdayParser::new().parse_date_with_today(raw, today())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn blank_input_yields_none() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
    }

    #[test]
    fn relative_dates() {
        assert_eq!(parse("Posted Today"), Some(today()));
        assert_eq!(parse("Just Posted"), Some(today()));
        assert_eq!(parse("Posted Yesterday"), Some(ymd(2026, 3, 14)));
        assert_eq!(parse("Posted 5 Days Ago"), Some(ymd(2026, 3, 10)));
        assert_eq!(parse("posted 1 day ago"), Some(ymd(2026, 3, 14)));
        assert_eq!(parse("Posted 30+ Days Ago"), Some(ymd(2026, 2, 13)));
    }

    #[test]
    fn absolute_dates() {
        assert_eq!(parse("2024-01-10"), Some(ymd(2024, 1, 10)));
        assert_eq!(parse("Posted Jan 10, 2024"), Some(ymd(2024, 1, 10)));
        assert_eq!(parse("Posted January 10, 2024"), Some(ymd(2024, 1, 10)));
        assert_eq!(parse("posted 10 Mar 2024"), Some(ymd(2024, 3, 10)));
        assert_eq!(parse("10 March 2024"), Some(ymd(2024, 3, 10)));
        assert_eq!(parse("Posted on Jan 10, 2024"), Some(ymd(2024, 1, 10)));
    }

    #[test]
    fn slash_dates_prefer_month_first() {
        assert_eq!(parse("01/10/2024"), Some(ymd(2024, 1, 10)));
        // Month-first cannot match a 13th month, so day-first applies.
        assert_eq!(parse("13/10/2024"), Some(ymd(2024, 10, 13)));
    }

    #[test]
    fn unparseable_text_yields_none() {
        assert_eq!(parse("soon"), None);
        assert_eq!(parse("Posted whenever"), None);
        assert_eq!(parse("3 days ago"), None);
    }

    #[test]
    fn parsing_is_deterministic() {
        for raw in ["Posted 7 days ago", "Posted Jan 10, 2024", "garbage"] {
            assert_eq!(parse(raw), parse(raw));
        }
    }

    #[test]
    fn parsed_dates_round_trip_through_iso() {
        for raw in ["2024-01-10", "Posted Jan 10, 2024", "Posted 3 days ago"] {
            if let Some(date) = parse(raw) {
                let iso = date.format("%Y-%m-%d").to_string();
                assert_eq!(NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok(), Some(date));
            }
        }
    }

    #[test]
    fn location_strips_prefix() {
        let parser = WorkdayParser::new();
        assert_eq!(parser.parse_location("Locations: London, UK"), "London, UK");
        assert_eq!(parser.parse_location("LOCATIONS   Remote"), "Remote");
        assert_eq!(parser.parse_location("Berlin, Germany"), "Berlin, Germany");
        assert_eq!(parser.parse_location(""), "");
    }

    #[test]
    fn location_cleaning_is_idempotent() {
        let parser = WorkdayParser::new();
        for raw in ["Locations: London, UK", "  Remote ", "", "locations:Paris"] {
            let once = parser.parse_location(raw);
            assert_eq!(parser.parse_location(&once), once);
        }
    }

    #[test]
    fn job_id_strips_prefixes() {
        let parser = WorkdayParser::new();
        assert_eq!(parser.parse_job_id("Job ID: 12345"), "12345");
        assert_eq!(parser.parse_job_id("REQ-2024-001"), "2024-001");
        assert_eq!(parser.parse_job_id("req98765"), "98765");
        assert_eq!(parser.parse_job_id("  42  "), "42");
        assert_eq!(parser.parse_job_id(""), "");
    }
}
