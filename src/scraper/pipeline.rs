use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Semaphore;

use crate::error::AppError;
use crate::scraper::Progress;
use crate::scraper::browser::BrowserDriver;
use crate::scraper::factory::{ConfigOverrides, PlatformRegistry};
use crate::scraper::location::{LocationIntelligence, clean_location};
use crate::scraper::platforms::PlatformScraper;
use crate::scraper::record::{JobRecord, JobSummary, ParsedLocation};

const DETAIL_ATTEMPTS: u32 = 3;
const DETAIL_BACKOFF_BASE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_pages: Option<u32>,
    pub detail_concurrency: usize,
    pub show_progress: bool,
}

/// Crawl one board end to end: resolve the platform scraper, collect
/// summaries, batch-enrich locations, fetch details under bounded
/// concurrency, and filter. The browser lives exactly as long as the
/// crawl; it is torn down on every exit path.
pub async fn run_board(
    registry: &PlatformRegistry,
    location: &LocationIntelligence,
    company: &str,
    board_url: &str,
    platform: &str,
    options: &PipelineOptions,
) -> Result<Vec<JobRecord>, AppError> {
    let overrides = ConfigOverrides {
        detail_concurrency: Some(options.detail_concurrency),
        selectors: HashMap::new(),
    };
    let scraper = registry.create_scraper(platform, &overrides)?;

    let driver = BrowserDriver::launch().await?;
    let result = crawl_board(&driver, scraper.as_ref(), location, company, board_url, options).await;
    driver.shutdown().await;
    result
}

async fn crawl_board(
    driver: &BrowserDriver,
    scraper: &dyn PlatformScraper,
    location: &LocationIntelligence,
    company: &str,
    board_url: &str,
    options: &PipelineOptions,
) -> Result<Vec<JobRecord>, AppError> {
    let progress = Progress::new(company, options.show_progress);

    let page = driver.open_session(board_url).await?;
    let mut summaries = scraper
        .paginate(&page, company, board_url, options.max_pages, &progress)
        .await;
    for summary in &mut summaries {
        summary.job_board_url = board_url.to_string();
    }
    tracing::info!("Collected {} summaries for {company}", summaries.len());

    // One batch call covers every unique location on the board.
    let unique = unique_locations(&summaries);
    let parsed = location.parse_batch(&unique).await;
    let enrichment: HashMap<String, ParsedLocation> = unique.into_iter().zip(parsed).collect();

    let semaphore = Semaphore::new(options.detail_concurrency.max(1));
    let valid: Vec<JobSummary> = summaries
        .into_iter()
        .filter(|s| !s.detail_url.trim().is_empty() && s.detail_url != "N/A")
        .collect();
    let total = valid.len();

    let mut tasks: FuturesUnordered<_> = valid
        .into_iter()
        .map(|summary| process_single_job(driver, scraper, summary, company, &enrichment, &semaphore))
        .collect();

    let mut records = Vec::with_capacity(total);
    let mut done = 0usize;
    while let Some(result) = tasks.next().await {
        done += 1;
        progress.details(done, total);
        if let Some(record) = result {
            records.push(record);
        }
    }
    drop(tasks);

    Ok(filter_records(records))
}

/// Fetch one job's detail page in its own browsing context, with retries.
/// Timeouts and transient errors are retried with doubling backoff; a
/// closed target aborts the task immediately. Exhausted retries drop the
/// job without affecting its siblings.
async fn process_single_job(
    driver: &BrowserDriver,
    scraper: &dyn PlatformScraper,
    summary: JobSummary,
    company: &str,
    enrichment: &HashMap<String, ParsedLocation>,
    semaphore: &Semaphore,
) -> Option<JobRecord> {
    let Ok(_permit) = semaphore.acquire().await else {
        return None;
    };

    let mut backoff = DETAIL_BACKOFF_BASE;
    for attempt in 1..=DETAIL_ATTEMPTS {
        let isolated = match driver.open_isolated_page().await {
            Ok(isolated) => isolated,
            Err(error) if error.is_target_closed() => {
                tracing::error!(
                    "Target closed opening context for {}; not retrying",
                    summary.detail_url
                );
                return None;
            }
            Err(error) => {
                tracing::warn!(
                    "Attempt {attempt}/{DETAIL_ATTEMPTS}: could not open context for {}: {error}",
                    summary.detail_url
                );
                if attempt == DETAIL_ATTEMPTS {
                    return None;
                }
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }
        };

        let outcome = scraper.fetch_details(&isolated.page, &summary.detail_url).await;
        driver.close_isolated_page(isolated).await;

        match outcome {
            Ok(details) => {
                let enriched = enriched_location(enrichment, &summary);
                return Some(JobRecord::assemble(summary, details, company, enriched));
            }
            Err(error) if error.is_target_closed() => {
                tracing::error!("Target closed for {}; not retrying", summary.detail_url);
                return None;
            }
            Err(error) => {
                tracing::warn!(
                    "Attempt {attempt}/{DETAIL_ATTEMPTS} failed for {}: {error}",
                    summary.detail_url
                );
                if attempt == DETAIL_ATTEMPTS {
                    tracing::error!(
                        "Dropping {} after {DETAIL_ATTEMPTS} failed attempts",
                        summary.detail_url
                    );
                    return None;
                }
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }
    None
}

/// Unique non-empty location strings in first-seen order.
fn unique_locations(summaries: &[JobSummary]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for summary in summaries {
        let raw = summary.location_raw.trim();
        if raw.is_empty() || raw == "N/A" {
            continue;
        }
        if seen.insert(summary.location_raw.clone()) {
            unique.push(summary.location_raw.clone());
        }
    }
    unique
}

/// Every record gets a structured location, whatever the LLM did: the
/// batch result when present, otherwise the cleaned-string fallback.
fn enriched_location(
    enrichment: &HashMap<String, ParsedLocation>,
    summary: &JobSummary,
) -> ParsedLocation {
    if summary.location_raw.trim().is_empty() {
        return ParsedLocation::unknown();
    }
    enrichment
        .get(&summary.location_raw)
        .cloned()
        .unwrap_or_else(|| ParsedLocation::fallback(clean_location(&summary.location_raw)))
}

/// Drop stale postings and collapse duplicate detail URLs, first
/// occurrence winning.
pub fn filter_records(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen_urls = HashSet::new();
    let mut removed_duplicates = 0usize;
    let mut removed_stale = 0usize;

    let mut filtered = Vec::with_capacity(records.len());
    for record in records {
        if !seen_urls.insert(record.url.clone()) {
            tracing::debug!("Duplicate detail URL skipped: {}", record.url);
            removed_duplicates += 1;
            continue;
        }
        if record
            .date_posted_raw
            .to_lowercase()
            .contains("posted 30+ days ago")
        {
            removed_stale += 1;
            continue;
        }
        filtered.push(record);
    }

    tracing::info!(
        "Removed {removed_duplicates} duplicate jobs and {removed_stale} jobs posted 30+ days ago"
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::record::JobDetails;

    fn record(url: &str, date_raw: &str) -> JobRecord {
        let summary = JobSummary {
            title: format!("Job at {url}"),
            detail_url: url.to_string(),
            date_posted_raw: date_raw.to_string(),
            ..Default::default()
        };
        let details = JobDetails::placeholder(url);
        JobRecord::assemble(summary, details, "Example Corp", ParsedLocation::unknown())
    }

    #[test]
    fn filter_collapses_duplicate_urls_keeping_first() {
        let records = vec![
            record("https://x/1", "Posted Today"),
            record("https://x/2", "Posted Today"),
            record("https://x/1", "Posted Yesterday"),
            record("https://x/3", "Posted Today"),
        ];
        let filtered = filter_records(records);
        let urls: Vec<&str> = filtered.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["https://x/1", "https://x/2", "https://x/3"]);
        assert_eq!(filtered[0].date_posted_raw, "Posted Today");
    }

    #[test]
    fn filter_drops_postings_older_than_thirty_days() {
        let records = vec![
            record("https://x/1", "Posted 30+ Days Ago"),
            record("https://x/2", "posted 30+ days ago"),
            record("https://x/3", "Posted 29 days ago"),
        ];
        let filtered = filter_records(records);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].url, "https://x/3");
    }

    #[test]
    fn filter_preserves_first_seen_order() {
        let urls = ["a", "b", "a", "c", "b", "d"];
        let records: Vec<JobRecord> = urls.iter().map(|u| record(u, "")).collect();
        let filtered = filter_records(records);
        let kept: Vec<&str> = filtered.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(kept, ["a", "b", "c", "d"]);
    }

    #[test]
    fn unique_locations_skips_blanks_and_duplicates() {
        let mut summaries = vec![JobSummary::default(); 4];
        summaries[0].location_raw = "London".to_string();
        summaries[1].location_raw = "".to_string();
        summaries[2].location_raw = "London".to_string();
        summaries[3].location_raw = "N/A".to_string();
        assert_eq!(unique_locations(&summaries), ["London"]);
    }

    #[test]
    fn enriched_location_always_yields_a_complete_value() {
        let enrichment = HashMap::from([(
            "Locations: London, UK".to_string(),
            ParsedLocation {
                city: "London".into(),
                country: "United Kingdom".into(),
                region: "Europe".into(),
                confidence: 0.9,
            },
        )]);

        let mut summary = JobSummary {
            location_raw: "Locations: London, UK".to_string(),
            ..Default::default()
        };
        assert_eq!(enriched_location(&enrichment, &summary).city, "London");

        // Not in the batch result: cleaned-string fallback.
        summary.location_raw = "Locations: Paris, France".to_string();
        let fallback = enriched_location(&enrichment, &summary);
        assert_eq!(fallback.city, "Paris, France");
        assert_eq!(fallback.country, "Unknown");

        // No location at all: explicit unknown.
        summary.location_raw = String::new();
        assert_eq!(
            enriched_location(&enrichment, &summary),
            ParsedLocation::unknown()
        );
    }
}
