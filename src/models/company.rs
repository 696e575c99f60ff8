use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Company {
    pub id: i32,
    pub name: String,
    pub sector: Option<String>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub async fn get_by_name(pool: &PgPool, name: &str) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        Ok(company)
    }

    /// Lazy upsert by name. Safe against concurrent creators: the insert is
    /// a no-op on conflict and the winner's row is re-queried.
    pub async fn find_or_create(pool: &PgPool, name: &str) -> Result<Company, AppError> {
        if let Some(company) = Self::get_by_name(pool, name).await? {
            return Ok(company);
        }

        let inserted = sqlx::query_as::<_, Company>(
            "INSERT INTO companies (name) VALUES ($1) ON CONFLICT (name) DO NOTHING RETURNING *",
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        match inserted {
            Some(company) => Ok(company),
            None => Self::get_by_name(pool, name)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Company '{name}' not found"))),
        }
    }
}
