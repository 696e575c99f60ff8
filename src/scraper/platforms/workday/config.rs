use crate::scraper::platforms::{PlatformConfig, Selectors};

// Workday renders stable data-automation-id attributes; prefer those over
// generated class names wherever one exists.
pub const JOB_LIST_SELECTOR: &str = "ul[data-automation-id='jobResults']";
pub const JOB_ITEM_SELECTOR: &str = "li[class='css-1q2dra3']";
pub const JOB_TITLE_SELECTOR: &str = "a[data-automation-id='jobTitle']";
pub const JOB_LOCATION_SELECTOR: &str = "dd[data-automation-id='locations']";
pub const JOB_POSTED_DATE_SELECTOR: &str = "dd[data-automation-id='postedOn']";

pub const PAGINATION_CONTAINER_SELECTOR: &str = "nav[aria-label='pagination']";
pub const NEXT_PAGE_BUTTON_SELECTOR: &str = "button[aria-label='next']";

// Detail page
pub const JOB_DESCRIPTION_SELECTOR: &str = "div[data-automation-id='jobPostingDescription']";
pub const JOB_ID_DETAIL_SELECTOR: &str = "span[data-automation-id='jobPostingJobId']";
pub const JOB_ID_FALLBACK_LABEL: &str = "Job Id:";
pub const DETAIL_TITLE_SELECTOR: &str = "h1[data-automation-id='jobPostingHeader']";

pub const DETAIL_CONCURRENCY: usize = 10;

pub fn base_config() -> PlatformConfig {
    PlatformConfig {
        platform: "workday".to_string(),
        detail_concurrency: DETAIL_CONCURRENCY,
        selectors: Selectors {
            job_list: JOB_LIST_SELECTOR.to_string(),
            job_item: JOB_ITEM_SELECTOR.to_string(),
            job_title: JOB_TITLE_SELECTOR.to_string(),
            job_location: JOB_LOCATION_SELECTOR.to_string(),
            job_posted_date: JOB_POSTED_DATE_SELECTOR.to_string(),
            pagination_container: PAGINATION_CONTAINER_SELECTOR.to_string(),
            next_page_button: NEXT_PAGE_BUTTON_SELECTOR.to_string(),
            description: JOB_DESCRIPTION_SELECTOR.to_string(),
            job_id_detail: JOB_ID_DETAIL_SELECTOR.to_string(),
            job_id_label: JOB_ID_FALLBACK_LABEL.to_string(),
            detail_title: DETAIL_TITLE_SELECTOR.to_string(),
        },
    }
}
