use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use crate::api::DEFAULT_API_URL;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base URL of the chat backend (e.g., http://localhost:8080)
    #[arg(long, env = "CHAT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Per-request timeout in seconds. 0 disables the timeout.
    #[arg(long, env = "CHAT_REQUEST_TIMEOUT_SECS", default_value = "60")]
    pub request_timeout_secs: u64,

    /// Start the chat even when the backend health check reports it offline.
    #[arg(long, env = "CHAT_SKIP_HEALTH_CHECK", default_value = "false")]
    pub skip_health_check: bool,

    // --- History Args ---
    /// File holding the saved conversation. Defaults to the platform data directory.
    #[arg(long, env = "CHAT_HISTORY_PATH")]
    pub history_path: Option<PathBuf>,

    /// Keep the conversation in memory only.
    #[arg(long, env = "CHAT_NO_PERSIST", default_value = "false")]
    pub no_persist: bool,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

impl Args {
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["rag-chat"]).unwrap();
        assert_eq!(args.request_timeout(), Some(Duration::from_secs(60)));
        assert!(args.history_path.is_none());
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "rag-chat",
            "--api-url",
            "https://rag.example.com",
            "--request-timeout-secs",
            "0",
            "--no-persist",
            "--history-path",
            "/tmp/chat.json",
        ]).unwrap();

        assert_eq!(args.api_url, "https://rag.example.com");
        assert_eq!(args.request_timeout(), None);
        assert!(args.no_persist);
        assert_eq!(args.history_path, Some(PathBuf::from("/tmp/chat.json")));
    }
}
