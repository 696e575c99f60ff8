use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::company::Company;
use crate::models::job_board::JobBoard;
use crate::models::listing::{Listing, NewListing};
use crate::scraper::record::JobRecord;

/// Outcome of one batch persist. `failures` holds one message per record
/// that could not be saved; duplicates are expected and counted apart.
#[derive(Debug, Default)]
pub struct StoreReport {
    pub saved: usize,
    pub duplicates: usize,
    pub failures: Vec<String>,
}

enum Persisted {
    Inserted,
    Duplicate,
}

/// Persist a batch of records. Each record runs in its own transaction so
/// one bad record never poisons the rest; the batch is durable when this
/// returns.
pub async fn persist_records(
    pool: &PgPool,
    records: &[JobRecord],
) -> Result<StoreReport, AppError> {
    let mut report = StoreReport::default();

    for record in records {
        match persist_one(pool, record).await {
            Ok(Persisted::Inserted) => report.saved += 1,
            Ok(Persisted::Duplicate) => report.duplicates += 1,
            Err(message) => {
                tracing::warn!("{message}");
                report.failures.push(message);
            }
        }
    }

    tracing::info!(
        "Persisted {} listings ({} duplicates skipped, {} failures)",
        report.saved,
        report.duplicates,
        report.failures.len()
    );
    Ok(report)
}

async fn persist_one(pool: &PgPool, record: &JobRecord) -> Result<Persisted, String> {
    validate(record)?;

    let company = Company::find_or_create(pool, &record.company_name)
        .await
        .map_err(|e| {
            format!(
                "failed to resolve company '{}' for job '{}': {e}",
                record.company_name, record.title
            )
        })?;

    // Boards are provisioned externally; an unknown board is a record
    // failure, not an invitation to create one.
    let board = JobBoard::get_by_link(pool, &record.job_board_url)
        .await
        .map_err(|e| format!("failed to look up job board '{}': {e}", record.job_board_url))?
        .ok_or_else(|| {
            format!(
                "job board '{}' not provisioned for job '{}'",
                record.job_board_url, record.title
            )
        })?;

    let input = NewListing {
        company_id: company.id,
        job_board_id: board.id,
        title: record.title.clone(),
        location: non_empty(&record.location_parsed),
        city: known(&record.location_enriched.city),
        country: known(&record.location_enriched.country),
        region: known(&record.location_enriched.region),
        description: non_empty(&record.description),
        link: record.url.clone(),
        date_posted: to_timestamp(record.date_posted_parsed),
    };

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| format!("failed to open transaction for '{}': {e}", record.title))?;
    match Listing::insert(&mut tx, input).await {
        Ok(_) => {
            tx.commit()
                .await
                .map_err(|e| format!("failed to commit listing '{}': {e}", record.title))?;
            tracing::debug!("Saved listing: {}", record.title);
            Ok(Persisted::Inserted)
        }
        Err(error) if error.is_unique_violation() => {
            let _ = tx.rollback().await;
            tracing::warn!(
                "Duplicate listing skipped: '{}' ({})",
                record.title,
                record.url
            );
            Ok(Persisted::Duplicate)
        }
        Err(error) => {
            let _ = tx.rollback().await;
            Err(format!("error saving job '{}': {error}", record.title))
        }
    }
}

fn validate(record: &JobRecord) -> Result<(), String> {
    let required = [
        ("title", &record.title),
        ("company name", &record.company_name),
        ("detail URL", &record.url),
        ("job board URL", &record.job_board_url),
    ];
    let label = if record.title.trim().is_empty() {
        "Unknown"
    } else {
        record.title.as_str()
    };
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(format!("missing {field} for job '{label}'"));
        }
    }
    Ok(())
}

/// NULL is the sentinel for an unknown date in the schema.
fn to_timestamp(date: Option<NaiveDate>) -> Option<DateTime<Utc>> {
    date.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Enrichment uses "Unknown" in-band; the store normalizes it to NULL.
fn known(value: &str) -> Option<String> {
    non_empty(value).filter(|v| v != "Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::record::{JobDetails, JobSummary, ParsedLocation};

    fn record() -> JobRecord {
        let summary = JobSummary {
            title: "Engineer".into(),
            detail_url: "https://x/1".into(),
            job_board_url: "https://x".into(),
            ..Default::default()
        };
        JobRecord::assemble(
            summary,
            JobDetails::placeholder("https://x/1"),
            "Example Corp",
            ParsedLocation::unknown(),
        )
    }

    #[test]
    fn validate_requires_core_fields() {
        assert!(validate(&record()).is_ok());

        let mut missing_title = record();
        missing_title.title = "  ".into();
        assert!(validate(&missing_title).is_err());

        let mut missing_board = record();
        missing_board.job_board_url = String::new();
        assert!(validate(&missing_board).is_err());
    }

    #[test]
    fn unknown_enrichment_values_become_null() {
        assert_eq!(known("Unknown"), None);
        assert_eq!(known(""), None);
        assert_eq!(known("  "), None);
        assert_eq!(known("London"), Some("London".to_string()));
    }

    #[test]
    fn timestamps_are_midnight_utc_or_null() {
        assert_eq!(to_timestamp(None), None);
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let ts = to_timestamp(Some(date)).unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-02T00:00:00+00:00");
    }
}
