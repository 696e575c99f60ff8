use std::fs::OpenOptions;
use std::path::Path;

use crate::error::AppError;
use crate::scraper::record::JobRecord;

const HEADER: &[&str] = &[
    "title",
    "company_name",
    "url",
    "location_raw",
    "location_parsed",
    "city",
    "country",
    "region",
    "date_posted",
    "job_id",
    "detail_page_title",
    "job_board_url",
    "description",
];

/// Append records to a CSV file, writing the header only when the file is
/// new or empty. Repeated fleet runs accumulate into one file.
pub fn append_records(path: impl AsRef<Path>, records: &[JobRecord]) -> Result<usize, AppError> {
    if records.is_empty() {
        tracing::info!("No job data to write");
        return Ok(0);
    }

    let path = path.as_ref();
    let write_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if write_header {
        writer.write_record(HEADER)?;
    }
    for record in records {
        let date_posted = record
            .date_posted_parsed
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        writer.write_record([
            record.title.as_str(),
            record.company_name.as_str(),
            record.url.as_str(),
            record.location_raw.as_str(),
            record.location_parsed.as_str(),
            record.location_enriched.city.as_str(),
            record.location_enriched.country.as_str(),
            record.location_enriched.region.as_str(),
            date_posted.as_str(),
            record.job_id.as_str(),
            record.detail_page_title.as_str(),
            record.job_board_url.as_str(),
            record.description.as_str(),
        ])?;
    }
    writer.flush()?;

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::record::{JobDetails, JobSummary, ParsedLocation};

    fn record(url: &str) -> JobRecord {
        let summary = JobSummary {
            title: "Engineer".into(),
            detail_url: url.to_string(),
            job_board_url: "https://x".into(),
            ..Default::default()
        };
        JobRecord::assemble(
            summary,
            JobDetails::placeholder(url),
            "Example Corp",
            ParsedLocation::unknown(),
        )
    }

    #[test]
    fn header_is_written_once_across_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");

        append_records(&path, &[record("https://x/1"), record("https://x/2")]).unwrap();
        append_records(&path, &[record("https://x/3")]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("title,company_name,url"));
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("title,")).count(),
            1
        );
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        assert_eq!(append_records(&path, &[]).unwrap(), 0);
        assert!(!path.exists());
    }
}
