use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Scheduler
    pub sync_interval_minutes: u64,

    // Flat-file exports
    pub export_dir: String,

    // NocoDB targets
    pub nocodb_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            sync_interval_minutes: env::var("SYNC_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("SYNC_INTERVAL_MINUTES must be a number"),
            export_dir: env::var("EXPORT_DIR").unwrap_or_else(|_| "outputs".to_string()),
            nocodb_token: env::var("NOCODB_API_TOKEN").ok(),
        }
    }

    /// Log the configuration without secrets (the database URL carries
    /// credentials).
    pub fn log_redacted(&self) {
        tracing::info!(
            sync_interval_minutes = self.sync_interval_minutes,
            export_dir = %self.export_dir,
            nocodb_token_set = self.nocodb_token.is_some(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
