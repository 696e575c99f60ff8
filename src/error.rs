use chromiumoxide::error::CdpError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Browser error: {0}")]
    Browser(#[from] CdpError),

    #[error("Navigation to {url} timed out")]
    NavigationTimeout { url: String },

    #[error("Selector '{selector}' did not appear within {waited_ms}ms")]
    SelectorTimeout { selector: String, waited_ms: u64 },

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Unique-key violations are expected during idempotent inserts and are
    /// handled as benign duplicates rather than failures.
    pub fn is_unique_violation(&self) -> bool {
        if let AppError::Database(sqlx::Error::Database(db_err)) = self {
            return db_err.is_unique_violation();
        }
        false
    }

    /// A closed target, context, or browser means the task's world is gone;
    /// retrying against it cannot succeed.
    pub fn is_target_closed(&self) -> bool {
        match self {
            AppError::Browser(e) => {
                let msg = e.to_string();
                msg.contains("Target closed")
                    || msg.contains("Session closed")
                    || msg.contains("browser has been closed")
            }
            _ => false,
        }
    }

    /// Timeouts are transient: the page may load on the next attempt.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AppError::NavigationTimeout { .. } | AppError::SelectorTimeout { .. }
        ) || matches!(self, AppError::Browser(CdpError::Timeout))
    }
}
