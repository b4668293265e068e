use std::env;

/// Ledger engine configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Equity account code the closing entry offsets into
    pub retained_earnings_code: String,
    /// Trial balance rows below this absolute balance are omitted from the
    /// listing (never from totals)
    pub negligible_threshold_minor: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let retained_earnings_code = env::var("RETAINED_EARNINGS_CODE")
            .unwrap_or_else(|_| "3900".to_string());

        let negligible_threshold_minor: i64 = env::var("GL_NEGLIGIBLE_THRESHOLD_MINOR")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .map_err(|_| "GL_NEGLIGIBLE_THRESHOLD_MINOR must be a valid i64".to_string())?;

        Ok(Config {
            database_url,
            retained_earnings_code,
            negligible_threshold_minor,
        })
    }
}
