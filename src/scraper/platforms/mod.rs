// Platform plug-in contracts. Each supported platform contributes a pure
// parser, a scraper bound to its selectors, and a base configuration; the
// registry in `factory.rs` wires them together at build time.

pub mod workday;

use async_trait::async_trait;
use chromiumoxide::Page;
use chrono::NaiveDate;

use crate::error::AppError;
use crate::scraper::Progress;
use crate::scraper::record::{JobDetails, JobSummary};

/// Pure, per-platform field normalization. Total functions: any input maps
/// to a value, never a panic or an error.
pub trait PlatformParser: Send + Sync {
    /// Relative ("Posted 3 days ago") or absolute ("Posted Jan 10, 2024")
    /// date text to a calendar date. `None` when nothing parseable remains.
    fn parse_date(&self, raw: &str) -> Option<NaiveDate>;

    /// Strip platform boilerplate ("Locations: ...") from a location string.
    fn parse_location(&self, raw: &str) -> String;

    /// Strip platform prefixes ("Job ID:", "REQ-") from a job identifier.
    fn parse_job_id(&self, raw: &str) -> String;
}

/// Platform-specific crawling. Hides every selector and pagination quirk
/// from the orchestrator.
#[async_trait]
pub trait PlatformScraper: Send + Sync {
    fn platform(&self) -> &str;

    /// Walk the listing page(s) and collect job summaries in list order.
    /// Tolerates per-page failures; returns whatever was collected.
    async fn paginate(
        &self,
        page: &Page,
        company: &str,
        target_url: &str,
        max_pages: Option<u32>,
        progress: &Progress,
    ) -> Vec<JobSummary>;

    /// Extract summaries from the currently loaded listing page. Items
    /// missing a title or detail URL are dropped; order is preserved.
    async fn extract_summaries(
        &self,
        page: &Page,
        target_url: &str,
    ) -> Result<Vec<JobSummary>, AppError>;

    /// Navigate to one job's detail page and extract its fields. Navigation
    /// failures surface as errors so the caller can apply its retry policy;
    /// extraction failures degrade to placeholder values.
    async fn fetch_details(&self, page: &Page, job_url: &str) -> Result<JobDetails, AppError>;
}

/// CSS selectors a platform scraper drives the page with.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub job_list: String,
    pub job_item: String,
    pub job_title: String,
    pub job_location: String,
    pub job_posted_date: String,
    pub pagination_container: String,
    pub next_page_button: String,
    pub description: String,
    pub job_id_detail: String,
    /// Label text used by the sibling-text fallback when the job-id span
    /// is absent.
    pub job_id_label: String,
    pub detail_title: String,
}

/// Merged platform configuration a scraper is constructed with.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub platform: String,
    pub detail_concurrency: usize,
    pub selectors: Selectors,
}

impl PlatformConfig {
    /// Apply a caller-provided selector override by key. Unknown keys are a
    /// configuration error, caught before any I/O happens.
    pub fn set_selector(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        let slot = match key {
            "job_list" => &mut self.selectors.job_list,
            "job_item" => &mut self.selectors.job_item,
            "job_title" => &mut self.selectors.job_title,
            "job_location" => &mut self.selectors.job_location,
            "job_posted_date" => &mut self.selectors.job_posted_date,
            "pagination_container" => &mut self.selectors.pagination_container,
            "next_page_button" => &mut self.selectors.next_page_button,
            "description" => &mut self.selectors.description,
            "job_id_detail" => &mut self.selectors.job_id_detail,
            "job_id_label" => &mut self.selectors.job_id_label,
            "detail_title" => &mut self.selectors.detail_title,
            _ => {
                return Err(AppError::Config(format!(
                    "unknown selector override '{key}'"
                )));
            }
        };
        *slot = value.to_string();
        Ok(())
    }
}
