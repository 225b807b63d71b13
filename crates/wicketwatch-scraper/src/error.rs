use thiserror::Error;
use wicketwatch_core::MatchId;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("scraping already running for {0}")]
    AlreadyRunning(MatchId),

    #[error("no scraping task found for {0}")]
    NotFound(MatchId),

    #[error("browser error: {0}")]
    Browser(#[from] wicketwatch_browser::BrowserError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("collector error: {0}")]
    Collector(#[from] wicketwatch_collector::CollectorError),
}
