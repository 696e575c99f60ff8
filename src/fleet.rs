use std::collections::BTreeMap;

use sqlx::PgPool;
use url::Url;

use crate::config::Config;
use crate::error::AppError;
use crate::export;
use crate::models::job_board::{BoardTarget, JobBoard};
use crate::scraper::factory::PlatformRegistry;
use crate::scraper::location::LocationIntelligence;
use crate::scraper::pipeline::{self, PipelineOptions};
use crate::store;

#[derive(Debug, Clone)]
pub struct FleetOptions {
    pub max_pages: Option<u32>,
    pub detail_concurrency: usize,
    pub platform: Option<String>,
    pub to_csv: bool,
    pub output_filename: String,
    pub show_progress: bool,
}

impl FleetOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_pages: config.max_pages,
            detail_concurrency: config.detail_concurrency,
            platform: config.platform.clone(),
            to_csv: config.to_csv,
            output_filename: config.output_filename.clone(),
            show_progress: config.show_progress,
        }
    }
}

#[derive(Debug, Default)]
pub struct FleetSummary {
    pub boards_scraped: usize,
    pub boards_failed: usize,
    pub listings_saved: usize,
    pub cancelled: bool,
    pub failures: Vec<String>,
}

/// Drive every configured board, one at a time, grouped by platform. A
/// failed board is recorded and the fleet moves on; ctrl-c stops between
/// boards and cancels the in-flight one, which tears its browser down
/// without committing a partial batch.
pub async fn run(
    pool: &PgPool,
    registry: &PlatformRegistry,
    location: &LocationIntelligence,
    options: &FleetOptions,
) -> Result<FleetSummary, AppError> {
    let targets = JobBoard::list_targets(pool).await?;
    if targets.is_empty() {
        tracing::warn!("No job boards configured; nothing to scrape");
        return Ok(FleetSummary::default());
    }

    let mut groups: BTreeMap<String, Vec<BoardTarget>> = BTreeMap::new();
    for target in targets {
        if let Some(only) = &options.platform
            && !target.platform.eq_ignore_ascii_case(only)
        {
            continue;
        }
        groups
            .entry(target.platform.to_lowercase())
            .or_default()
            .push(target);
    }

    let mut summary = FleetSummary::default();
    for (platform, boards) in &groups {
        if !registry.is_supported(platform) {
            tracing::warn!(
                "Skipping {} board(s) on unsupported platform '{platform}'",
                boards.len()
            );
            summary.boards_failed += boards.len();
            summary
                .failures
                .push(format!("unsupported platform '{platform}'"));
            continue;
        }

        for board in boards {
            let company = company_label(board);
            tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping fleet");
                    summary.cancelled = true;
                    return Ok(summary);
                }
                result = process_board(pool, registry, location, &company, board, options) => {
                    match result {
                        Ok(saved) => {
                            summary.boards_scraped += 1;
                            summary.listings_saved += saved;
                        }
                        Err(error) => {
                            tracing::error!("Board {} failed: {error}", board.link);
                            summary.boards_failed += 1;
                            summary.failures.push(format!("{}: {error}", board.link));
                        }
                    }
                }
            }
        }
    }

    Ok(summary)
}

async fn process_board(
    pool: &PgPool,
    registry: &PlatformRegistry,
    location: &LocationIntelligence,
    company: &str,
    board: &BoardTarget,
    options: &FleetOptions,
) -> Result<usize, AppError> {
    tracing::info!(
        "Scraping {company} at {} ({} board)",
        board.link,
        board.board_type
    );

    let pipeline_options = PipelineOptions {
        max_pages: options.max_pages,
        detail_concurrency: options.detail_concurrency,
        show_progress: options.show_progress,
    };
    let records = pipeline::run_board(
        registry,
        location,
        company,
        &board.link,
        &board.platform,
        &pipeline_options,
    )
    .await?;

    if records.is_empty() {
        tracing::info!("No records collected from {}", board.link);
        return Ok(0);
    }

    if options.to_csv {
        let written = export::append_records(&options.output_filename, &records)?;
        tracing::info!("Wrote {written} records to {}", options.output_filename);
        Ok(written)
    } else {
        let report = store::persist_records(pool, &records).await?;
        Ok(report.saved)
    }
}

/// Records need a company name. Company boards carry one; aggregate boards
/// do not, so their records are labeled by the board's host.
fn company_label(board: &BoardTarget) -> String {
    if let Some(name) = &board.company_name {
        return name.clone();
    }
    Url::parse(&board.link)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| board.platform.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(company_name: Option<&str>, link: &str) -> BoardTarget {
        BoardTarget {
            link: link.to_string(),
            platform: "workday".to_string(),
            board_type: if company_name.is_some() {
                "Company".to_string()
            } else {
                "Aggregate".to_string()
            },
            company_name: company_name.map(str::to_string),
        }
    }

    #[test]
    fn company_boards_use_their_company_name() {
        let board = board(Some("Example Corp"), "https://example.wd3.myworkdayjobs.com/jobs");
        assert_eq!(company_label(&board), "Example Corp");
    }

    #[test]
    fn aggregate_boards_fall_back_to_the_host() {
        let board = board(None, "https://boards.example.com/all");
        assert_eq!(company_label(&board), "boards.example.com");
    }

    #[test]
    fn unparseable_links_fall_back_to_the_platform() {
        let board = board(None, "not a url");
        assert_eq!(company_label(&board), "workday");
    }
}
