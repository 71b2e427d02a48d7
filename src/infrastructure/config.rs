use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.example.com";
pub const DEFAULT_DWELL_MS: u64 = 2000;

/// Command-line and environment configuration for the console.
#[derive(Debug, Clone, Parser)]
#[command(name = "bizdesk", version, about = "Terminal business-management console")]
pub struct Config {
    /// Base URL of the remote API
    #[arg(long, env = "BIZDESK_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// File holding the persisted session tokens
    #[arg(long, env = "BIZDESK_TOKEN_STORE", default_value = "bizdesk-session.json")]
    pub token_store: PathBuf,

    /// Employee whose assigned tasks are shown
    #[arg(long, env = "BIZDESK_EMPLOYEE_ID")]
    pub employee_id: Option<String>,

    /// Bearer token to store before starting
    #[arg(long, env = "BIZDESK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// How long a notification stays visible, in milliseconds
    #[arg(long, default_value_t = DEFAULT_DWELL_MS)]
    pub notification_dwell_ms: u64,

    /// Timeout for each remote call, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log file (the terminal is owned by the UI)
    #[arg(long, env = "BIZDESK_LOG_FILE", default_value = "bizdesk.log")]
    pub log_file: PathBuf,

    /// Log filter directive, overrides RUST_LOG
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl Config {
    pub fn notification_dwell(&self) -> Duration {
        Duration::from_millis(self.notification_dwell_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["bizdesk"]).unwrap();
        assert_eq!(config.notification_dwell(), Duration::from_millis(2000));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.token_store, PathBuf::from("bizdesk-session.json"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "bizdesk",
            "--base-url",
            "http://localhost:8080",
            "--employee-id",
            "e-42",
            "--notification-dwell-ms",
            "500",
        ])
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.employee_id.as_deref(), Some("e-42"));
        assert_eq!(config.notification_dwell(), Duration::from_millis(500));
    }
}
