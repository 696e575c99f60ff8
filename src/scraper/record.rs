use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The coarse region buckets a parsed location may land in.
const REGIONS: &[&str] = &[
    "Americas", "Europe", "Asia", "Oceania", "Africa", "Remote", "Unknown",
];

/// What a listing page yields for one job, before its detail page is
/// visited. Lives only for the duration of one board's crawl.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobSummary {
    pub title: String,
    pub detail_url: String,
    pub location_raw: String,
    pub location_parsed: String,
    pub date_posted_raw: String,
    pub date_posted_parsed: Option<NaiveDate>,
    pub job_board_url: String,
}

/// Fields obtained by visiting a specific job's page. Extraction failures
/// degrade to `"N/A"` placeholders instead of erroring.
#[derive(Debug, Clone, Serialize)]
pub struct JobDetails {
    pub url: String,
    pub description: String,
    pub job_id: String,
    pub detail_page_title: String,
    /// Platform-specific extras with no standardized slot.
    pub extras: HashMap<String, String>,
}

impl JobDetails {
    pub fn placeholder(url: &str) -> Self {
        Self {
            url: url.to_string(),
            description: "N/A".to_string(),
            job_id: "N/A".to_string(),
            detail_page_title: "N/A".to_string(),
            extras: HashMap::new(),
        }
    }
}

/// Structured location produced by the enrichment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLocation {
    pub city: String,
    pub country: String,
    pub region: String,
    pub confidence: f64,
}

impl ParsedLocation {
    pub fn unknown() -> Self {
        Self {
            city: "Unknown".to_string(),
            country: "Unknown".to_string(),
            region: "Unknown".to_string(),
            confidence: 0.0,
        }
    }

    /// Low-confidence stand-in used when the LLM is unavailable or not
    /// confident enough: the cleaned location string rides in `city`.
    pub fn fallback(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: "Unknown".to_string(),
            region: "Unknown".to_string(),
            confidence: 0.1,
        }
    }

    /// Clamp free-form region answers onto the coarse buckets and fill
    /// blank fields with `Unknown`.
    pub fn normalized(mut self) -> Self {
        if self.city.trim().is_empty() {
            self.city = "Unknown".to_string();
        }
        if self.country.trim().is_empty() {
            self.country = "Unknown".to_string();
        }
        self.region = canonical_region(&self.region);
        self
    }
}

fn canonical_region(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let bucket = match lower.as_str() {
        "americas" | "north america" | "south america" | "latin america" => "Americas",
        "europe" | "emea" => "Europe",
        "asia" | "apac" | "asia-pacific" | "asia pacific" => "Asia",
        "oceania" | "oceanea" | "australia" => "Oceania",
        "africa" => "Africa",
        "remote" => "Remote",
        _ => "Unknown",
    };
    debug_assert!(REGIONS.contains(&bucket));
    bucket.to_string()
}

/// A summary merged with its detail page: the unit the filter and the
/// store operate on.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub title: String,
    pub company_name: String,
    /// Detail-page URL; the listing's identity.
    pub url: String,
    pub location_raw: String,
    pub location_parsed: String,
    pub location_enriched: ParsedLocation,
    pub date_posted_raw: String,
    pub date_posted_parsed: Option<NaiveDate>,
    pub description: String,
    pub job_id: String,
    pub detail_page_title: String,
    pub job_board_url: String,
    pub extras: HashMap<String, String>,
}

impl JobRecord {
    pub fn assemble(
        summary: JobSummary,
        details: JobDetails,
        company_name: &str,
        location_enriched: ParsedLocation,
    ) -> Self {
        Self {
            title: summary.title,
            company_name: company_name.to_string(),
            url: details.url,
            location_raw: summary.location_raw,
            location_parsed: summary.location_parsed,
            location_enriched,
            date_posted_raw: summary.date_posted_raw,
            date_posted_parsed: summary.date_posted_parsed,
            description: details.description,
            job_id: details.job_id,
            detail_page_title: details.detail_page_title,
            job_board_url: summary.job_board_url,
            extras: details.extras,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_maps_region_aliases_onto_buckets() {
        for (raw, expect) in [
            ("Europe", "Europe"),
            ("north america", "Americas"),
            ("APAC", "Asia"),
            ("Oceanea", "Oceania"),
            ("remote", "Remote"),
            ("the moon", "Unknown"),
            ("", "Unknown"),
        ] {
            let parsed = ParsedLocation {
                city: "X".into(),
                country: "Y".into(),
                region: raw.into(),
                confidence: 0.9,
            };
            assert_eq!(parsed.normalized().region, expect, "region '{raw}'");
        }
    }

    #[test]
    fn normalized_fills_blank_fields() {
        let parsed = ParsedLocation {
            city: "  ".into(),
            country: String::new(),
            region: "Europe".into(),
            confidence: 0.8,
        };
        let parsed = parsed.normalized();
        assert_eq!(parsed.city, "Unknown");
        assert_eq!(parsed.country, "Unknown");
    }

    #[test]
    fn fallback_carries_cleaned_city_and_low_confidence() {
        let fallback = ParsedLocation::fallback("London, UK");
        assert_eq!(fallback.city, "London, UK");
        assert_eq!(fallback.country, "Unknown");
        assert_eq!(fallback.region, "Unknown");
        assert!((fallback.confidence - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn assemble_merges_summary_and_details() {
        let summary = JobSummary {
            title: "Rust Engineer".into(),
            detail_url: "https://jobs.example.com/rust-1".into(),
            location_raw: "Locations: Berlin".into(),
            location_parsed: "Berlin".into(),
            date_posted_raw: "Posted Today".into(),
            date_posted_parsed: NaiveDate::from_ymd_opt(2026, 7, 1),
            job_board_url: "https://jobs.example.com".into(),
        };
        let details = JobDetails {
            url: summary.detail_url.clone(),
            description: "Build scrapers".into(),
            job_id: "12345".into(),
            detail_page_title: "Rust Engineer".into(),
            extras: HashMap::new(),
        };
        let record =
            JobRecord::assemble(summary, details, "Example Corp", ParsedLocation::unknown());
        assert_eq!(record.company_name, "Example Corp");
        assert_eq!(record.url, "https://jobs.example.com/rust-1");
        assert_eq!(record.job_id, "12345");
        assert_eq!(record.job_board_url, "https://jobs.example.com");
    }
}
