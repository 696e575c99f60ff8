// Scraper core: browser driver, platform plug-ins, location enrichment,
// and the per-board pipeline orchestrator.

pub mod browser;
pub mod factory;
pub mod location;
pub mod pipeline;
pub mod platforms;
pub mod record;

/// Purely observational progress reporting. Emits nothing unless enabled;
/// has no effect on what gets scraped.
#[derive(Debug, Clone)]
pub struct Progress {
    label: String,
    enabled: bool,
}

impl Progress {
    pub fn new(label: impl Into<String>, enabled: bool) -> Self {
        Self {
            label: label.into(),
            enabled,
        }
    }

    pub fn pages(&self, pages: u32, jobs: usize) {
        if self.enabled {
            tracing::info!("{}: {pages} pages scraped, {jobs} jobs collected", self.label);
        }
    }

    pub fn details(&self, done: usize, total: usize) {
        if self.enabled {
            tracing::info!("{}: {done}/{total} jobs processed", self.label);
        }
    }
}
