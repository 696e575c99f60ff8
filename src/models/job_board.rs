use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

/// A crawlable source, provisioned by the external CSV loader. The core
/// only ever reads these rows.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct JobBoard {
    pub id: i32,
    pub company_id: Option<i32>,
    #[sqlx(rename = "type")]
    pub board_type: String,
    pub platform: String,
    pub link: String,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A board joined with its owning company, as the fleet consumes it.
#[derive(Debug, sqlx::FromRow)]
pub struct BoardTarget {
    pub link: String,
    pub platform: String,
    pub board_type: String,
    pub company_name: Option<String>,
}

impl JobBoard {
    pub async fn get_by_link(pool: &PgPool, link: &str) -> Result<Option<JobBoard>, AppError> {
        let board = sqlx::query_as::<_, JobBoard>("SELECT * FROM job_boards WHERE link = $1")
            .bind(link)
            .fetch_optional(pool)
            .await?;
        Ok(board)
    }

    pub async fn list_targets(pool: &PgPool) -> Result<Vec<BoardTarget>, AppError> {
        let targets = sqlx::query_as::<_, BoardTarget>(
            "SELECT jb.link, jb.platform, jb.type AS board_type, c.name AS company_name
             FROM job_boards jb
             LEFT JOIN companies c ON c.id = jb.company_id
             ORDER BY jb.platform, jb.link",
        )
        .fetch_all(pool)
        .await?;
        Ok(targets)
    }
}
