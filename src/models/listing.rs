use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::AppError;

/// A persisted job listing. Append-only from the scraper's perspective:
/// the unique link and (title, company_id, link) constraints turn
/// re-scrapes of the same posting into benign duplicates.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Listing {
    pub id: i32,
    pub company_id: i32,
    pub job_board_id: i32,
    pub title: String,
    pub location: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub link: String,
    pub date_posted: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewListing {
    pub company_id: i32,
    pub job_board_id: i32,
    pub title: String,
    pub location: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub link: String,
    pub date_posted: Option<DateTime<Utc>>,
}

impl Listing {
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        input: NewListing,
    ) -> Result<Listing, AppError> {
        let listing = sqlx::query_as::<_, Listing>(
            "INSERT INTO listings (company_id, job_board_id, title, location, city, country, region, description, link, date_posted)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(input.company_id)
        .bind(input.job_board_id)
        .bind(&input.title)
        .bind(&input.location)
        .bind(&input.city)
        .bind(&input.country)
        .bind(&input.region)
        .bind(&input.description)
        .bind(&input.link)
        .bind(input.date_posted)
        .fetch_one(&mut **tx)
        .await?;
        Ok(listing)
    }

    #[allow(dead_code)]
    pub async fn count(pool: &PgPool) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM listings")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
