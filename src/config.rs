use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobharvest", about = "Multi-source job listing aggregation engine")]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// Maximum listing pages per board (all pages when omitted)
    #[arg(long, env = "MAX_PAGES")]
    pub max_pages: Option<u32>,

    /// Concurrent detail-page fetches per board
    #[arg(long, env = "DETAIL_CONCURRENCY", default_value = "10")]
    pub detail_concurrency: usize,

    /// Only scrape boards hosted on this platform
    #[arg(long, env = "PLATFORM")]
    pub platform: Option<String>,

    /// Write results to a CSV file instead of the database
    #[arg(long, env = "TO_CSV", default_value = "false")]
    pub to_csv: bool,

    /// Output path for --to-csv
    #[arg(long, env = "OUTPUT_FILENAME", default_value = "listings.csv")]
    pub output_filename: String,

    /// Emit page/job progress while scraping
    #[arg(long, env = "SHOW_PROGRESS", default_value = "false")]
    pub show_progress: bool,

    /// Enrich location strings through the LLM endpoint
    #[arg(long, env = "ENABLE_LOCATION_INTELLIGENCE", default_value = "false")]
    pub enable_location_intelligence: bool,

    /// API key for the OpenAI-compatible LLM endpoint
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Base URL of the LLM endpoint
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://openrouter.ai/api/v1")]
    pub llm_base_url: String,

    /// Model identifier for location parsing
    #[arg(long, env = "LLM_MODEL", default_value = "google/gemini-2.5-flash")]
    pub llm_model: String,
}
