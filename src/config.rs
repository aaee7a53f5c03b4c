//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "focus-session")]
#[command(about = "Pomodoro focus timer daemon with ambient sound and session sync")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory holding the persisted settings, preferences and preset
    #[arg(long, env = "FOCUS_DATA_DIR", default_value = ".focus-session")]
    pub data_dir: PathBuf,

    /// Product name shown after the countdown in the title
    #[arg(long, default_value = "StudyDash")]
    pub product_name: String,

    /// Base URL of the remote session service; sync is disabled when absent
    #[arg(long, env = "FOCUS_SESSION_API")]
    pub session_api: Option<String>,

    /// Bearer token for the remote session service
    #[arg(long, env = "FOCUS_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Seconds between active-session polls
    #[arg(long, default_value = "5")]
    pub poll_interval: u64,

    /// Remote request timeout in seconds
    #[arg(long, default_value = "10")]
    pub request_timeout: u64,

    /// Completed focus countdowns between long breaks
    #[arg(long, default_value = "4")]
    pub long_break_every: u32,

    /// Directory holding the ambient loops and the chime
    #[arg(long, env = "FOCUS_ASSETS_DIR", default_value = "assets/sounds")]
    pub assets_dir: PathBuf,

    /// Command-line audio player used for playback
    #[arg(long, default_value = "mpv")]
    pub audio_player: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_interval.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    /// Session service base URL, ignoring blank values
    pub fn session_api_url(&self) -> Option<&str> {
        self.session_api
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_without_arguments() {
        let config = Config::try_parse_from(["focus-session"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.poll_period(), Duration::from_secs(5));
        assert_eq!(config.long_break_every, 4);
    }

    #[test]
    fn blank_session_api_disables_sync() {
        let config =
            Config::try_parse_from(["focus-session", "--session-api", "  ", "-v"]).unwrap();
        assert!(config.session_api_url().is_none());
        assert_eq!(config.log_level(), "debug");
    }
}
