use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Element, Page};
use url::Url;

use super::parser::WorkdayParser;
use crate::error::AppError;
use crate::scraper::Progress;
use crate::scraper::browser;
use crate::scraper::platforms::{PlatformConfig, PlatformParser, PlatformScraper};
use crate::scraper::record::{JobDetails, JobSummary};

const LIST_WAIT_TIMEOUT: Duration = Duration::from_secs(30);
const DESCRIPTION_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_TURN_SETTLE: Duration = Duration::from_secs(2);

/// Scraper for Workday-hosted boards. Workday serves either classic
/// pagination or infinite scroll depending on tenant configuration, so
/// `paginate` probes for controls and branches.
pub struct WorkdayScraper {
    config: PlatformConfig,
    parser: WorkdayParser,
}

impl WorkdayScraper {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            config,
            parser: WorkdayParser::new(),
        }
    }
}

#[async_trait]
impl PlatformScraper for WorkdayScraper {
    fn platform(&self) -> &str {
        &self.config.platform
    }

    async fn paginate(
        &self,
        page: &Page,
        company: &str,
        target_url: &str,
        max_pages: Option<u32>,
        progress: &Progress,
    ) -> Vec<JobSummary> {
        let sel = &self.config.selectors;
        let mut all_summaries = Vec::new();

        tracing::info!("Starting pagination for {company} at {target_url}");
        if let Err(error) = browser::wait_for_selector(page, &sel.job_list, LIST_WAIT_TIMEOUT).await
        {
            tracing::warn!("Job list never appeared on {target_url}: {error}");
            return all_summaries;
        }

        if browser::has_pagination(page, &sel.pagination_container).await {
            let mut page_num: u32 = 0;
            loop {
                page_num += 1;
                if let Some(max) = max_pages {
                    if page_num > max {
                        tracing::info!("Reached maximum page limit: {max}");
                        break;
                    }
                }

                match self.extract_summaries(page, target_url).await {
                    Ok(summaries) if summaries.is_empty() => {
                        tracing::warn!("No jobs found on page {page_num}");
                    }
                    Ok(summaries) => all_summaries.extend(summaries),
                    Err(error) => {
                        tracing::warn!("Error extracting jobs from page {page_num}: {error}");
                    }
                }
                progress.pages(page_num, all_summaries.len());

                match browser::click_next(page, &sel.next_page_button).await {
                    Ok(true) => tokio::time::sleep(PAGE_TURN_SETTLE).await,
                    Ok(false) => {
                        tracing::info!("No more pages available");
                        break;
                    }
                    Err(error) => {
                        tracing::warn!("Error navigating to the next page: {error}");
                        break;
                    }
                }
            }
        } else {
            if let Err(error) = browser::scroll_to_exhaust(page, &sel.job_item).await {
                tracing::warn!("Error while scrolling {target_url}: {error}");
            }
            match self.extract_summaries(page, target_url).await {
                Ok(summaries) => all_summaries.extend(summaries),
                Err(error) => tracing::warn!("Error extracting jobs after scroll: {error}"),
            }
            progress.pages(1, all_summaries.len());
        }

        tracing::info!(
            "Pagination complete for {company}: {} jobs collected",
            all_summaries.len()
        );
        all_summaries
    }

    async fn extract_summaries(
        &self,
        page: &Page,
        target_url: &str,
    ) -> Result<Vec<JobSummary>, AppError> {
        let sel = &self.config.selectors;
        let base = Url::parse(target_url)
            .map_err(|e| AppError::Config(format!("invalid board URL '{target_url}': {e}")))?;

        let items = page.find_elements(&sel.job_item).await.unwrap_or_default();
        let mut summaries = Vec::with_capacity(items.len());

        for item in &items {
            let Ok(title_element) = item.find_element(&sel.job_title).await else {
                continue;
            };
            let Some(title) = element_text(&title_element).await else {
                continue;
            };
            let href = title_element.attribute("href").await.ok().flatten();
            let Some(detail_url) = href.as_deref().and_then(|h| resolve_href(&base, h)) else {
                continue;
            };

            let location_raw = child_text(item, &sel.job_location).await;
            let date_posted_raw = child_text(item, &sel.job_posted_date).await;

            summaries.push(JobSummary {
                title,
                detail_url,
                location_parsed: self.parser.parse_location(&location_raw),
                date_posted_parsed: self.parser.parse_date(&date_posted_raw),
                location_raw,
                date_posted_raw,
                job_board_url: String::new(),
            });
        }

        tracing::debug!("Extracted {} job summaries", summaries.len());
        Ok(summaries)
    }

    async fn fetch_details(&self, page: &Page, job_url: &str) -> Result<JobDetails, AppError> {
        let sel = &self.config.selectors;
        browser::navigate(page, job_url, browser::DETAIL_NAV_TIMEOUT).await?;

        let mut details = JobDetails::placeholder(job_url);

        if let Err(error) =
            browser::wait_for_selector(page, &sel.description, DESCRIPTION_WAIT_TIMEOUT).await
        {
            tracing::warn!("Description never appeared on {job_url}: {error}");
            return Ok(details);
        }

        if let Ok(element) = page.find_element(&sel.detail_title).await
            && let Some(text) = element_text(&element).await
        {
            details.detail_page_title = text;
        }
        if let Ok(element) = page.find_element(&sel.description).await
            && let Some(text) = element_text(&element).await
        {
            details.description = text;
        }

        let job_id_raw = match page.find_element(&sel.job_id_detail).await {
            Ok(element) => element_text(&element).await,
            Err(_) => sibling_text_after_label(page, &sel.job_id_label).await,
        };
        if let Some(raw) = job_id_raw {
            details.job_id = self.parser.parse_job_id(&raw);
        }

        Ok(details)
    }
}

async fn element_text(element: &Element) -> Option<String> {
    element
        .inner_text()
        .await
        .ok()
        .flatten()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

async fn child_text(item: &Element, selector: &str) -> String {
    match item.find_element(selector).await {
        Ok(element) => element_text(&element).await.unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Fallback for tenants that render the job id as a labeled text pair
/// instead of the automation-id span: find the label, read its sibling.
async fn sibling_text_after_label(page: &Page, label: &str) -> Option<String> {
    let label_literal = serde_json::to_string(label).ok()?;
    let script = format!(
        r#"(() => {{
            const label = {label_literal};
            for (const span of document.querySelectorAll('span')) {{
                const text = (span.textContent || '').trim();
                if (text.startsWith(label)) {{
                    const next = span.nextElementSibling;
                    if (next && next.textContent) return next.textContent.trim();
                }}
            }}
            return null;
        }})()"#
    );
    page.evaluate(script)
        .await
        .ok()?
        .into_value::<Option<String>>()
        .ok()
        .flatten()
        .filter(|text| !text.is_empty())
}

/// Resolve a title link against the board's scheme and host. Absolute
/// links pass through untouched.
fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let origin = base.origin().ascii_serialization();
    if href.starts_with('/') {
        Some(format!("{origin}{href}"))
    } else {
        Some(format!("{origin}/{href}"))
    }
}
