use std::collections::HashMap;

use crate::error::AppError;
use crate::scraper::platforms::workday;
use crate::scraper::platforms::workday::crawler::WorkdayScraper;
use crate::scraper::platforms::workday::parser::WorkdayParser;
use crate::scraper::platforms::{PlatformConfig, PlatformParser, PlatformScraper};

/// One registered platform: its base configuration plus constructors for
/// its scraper and parser. Populated at build time; adding a platform
/// means adding a module under `platforms/` and one entry here.
struct PlatformEntry {
    name: &'static str,
    base_config: fn() -> PlatformConfig,
    make_scraper: fn(PlatformConfig) -> Box<dyn PlatformScraper>,
    make_parser: fn() -> Box<dyn PlatformParser>,
}

const PLATFORMS: &[PlatformEntry] = &[PlatformEntry {
    name: "workday",
    base_config: workday::config::base_config,
    make_scraper: |config| Box::new(WorkdayScraper::new(config)),
    make_parser: || Box::new(WorkdayParser::new()),
}];

/// Caller-side configuration applied on top of a platform's defaults.
/// Caller values win.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub detail_concurrency: Option<usize>,
    pub selectors: HashMap<String, String>,
}

/// Hands out platform scrapers and parsers by name. Unknown platforms are
/// a configuration error raised before any browser or network I/O.
#[derive(Debug, Default)]
pub struct PlatformRegistry;

impl PlatformRegistry {
    pub fn new() -> Self {
        Self
    }

    fn entry(platform: &str) -> Option<&'static PlatformEntry> {
        let name = platform.to_lowercase();
        PLATFORMS.iter().find(|entry| entry.name == name)
    }

    pub fn supported_platforms(&self) -> Vec<&'static str> {
        PLATFORMS.iter().map(|entry| entry.name).collect()
    }

    pub fn is_supported(&self, platform: &str) -> bool {
        Self::entry(platform).is_some()
    }

    /// Merge a platform's base configuration with caller overrides.
    pub fn merged_config(
        &self,
        platform: &str,
        overrides: &ConfigOverrides,
    ) -> Result<PlatformConfig, AppError> {
        let entry = Self::entry(platform)
            .ok_or_else(|| AppError::Config(format!("unsupported platform '{platform}'")))?;
        let mut config = (entry.base_config)();
        if let Some(concurrency) = overrides.detail_concurrency {
            config.detail_concurrency = concurrency;
        }
        for (key, value) in &overrides.selectors {
            config.set_selector(key, value)?;
        }
        Ok(config)
    }

    pub fn create_scraper(
        &self,
        platform: &str,
        overrides: &ConfigOverrides,
    ) -> Result<Box<dyn PlatformScraper>, AppError> {
        let entry = Self::entry(platform)
            .ok_or_else(|| AppError::Config(format!("unsupported platform '{platform}'")))?;
        let config = self.merged_config(platform, overrides)?;
        tracing::debug!("Creating {} scraper", entry.name);
        Ok((entry.make_scraper)(config))
    }

    #[allow(dead_code)]
    pub fn create_parser(&self, platform: &str) -> Result<Box<dyn PlatformParser>, AppError> {
        let entry = Self::entry(platform)
            .ok_or_else(|| AppError::Config(format!("unsupported platform '{platform}'")))?;
        Ok((entry.make_parser)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_platform_is_a_config_error() {
        let registry = PlatformRegistry::new();
        let result = registry.create_scraper("greenhouse", &ConfigOverrides::default());
        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(registry.create_parser("greenhouse").is_err());
    }

    #[test]
    fn platform_lookup_is_case_insensitive() {
        let registry = PlatformRegistry::new();
        assert!(registry.is_supported("Workday"));
        assert!(registry.is_supported("workday"));
        assert!(!registry.is_supported("lever"));
    }

    #[test]
    fn caller_overrides_win_over_platform_defaults() {
        let registry = PlatformRegistry::new();
        let overrides = ConfigOverrides {
            detail_concurrency: Some(3),
            selectors: HashMap::from([(
                "job_title".to_string(),
                "a.custom-title".to_string(),
            )]),
        };
        let config = registry.merged_config("workday", &overrides).unwrap();
        assert_eq!(config.detail_concurrency, 3);
        assert_eq!(config.selectors.job_title, "a.custom-title");
        // Untouched slots keep the platform defaults.
        assert_eq!(
            config.selectors.job_list,
            workday::config::JOB_LIST_SELECTOR
        );
    }

    #[test]
    fn unknown_selector_override_is_rejected() {
        let registry = PlatformRegistry::new();
        let overrides = ConfigOverrides {
            detail_concurrency: None,
            selectors: HashMap::from([("job_titel".to_string(), "a".to_string())]),
        };
        assert!(matches!(
            registry.merged_config("workday", &overrides),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn created_scraper_reports_its_platform() {
        let registry = PlatformRegistry::new();
        let scraper = registry
            .create_scraper("workday", &ConfigOverrides::default())
            .unwrap();
        assert_eq!(scraper.platform(), "workday");
    }
}
