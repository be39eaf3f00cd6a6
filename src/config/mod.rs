use std::env;
use std::path::PathBuf;

/// Runtime configuration for the relay service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Telegram bot token for the standard upload channel
    pub bot_token: String,

    /// Destination chat/channel id for stored objects
    pub chat_id: String,

    /// Base URL of the Bot API (default: "https://api.telegram.org")
    pub telegram_api_base: String,

    /// Base URL of the MTProto bridge for oversized uploads (optional)
    pub client_api_url: Option<String>,

    /// Bearer token for the MTProto bridge (optional)
    pub client_api_token: Option<String>,

    /// Maximum accepted upload size in bytes (default: 6 GiB)
    pub max_file_size: u64,

    /// Largest payload sent as one direct write (default: 2000 MiB)
    pub single_upload_limit: u64,

    /// Chunk size for manually split uploads in bytes (default: 2000 MiB)
    pub chunk_size: u64,

    /// Directory for staged uploads and chunk temporaries
    pub upload_dir: PathBuf,

    /// Connect/response timeout for URL-sourced ingestion in seconds (default: 30)
    pub url_fetch_timeout_secs: u64,

    /// Listen port (default: 3000)
    pub port: u16,

    /// Include error details in responses (development only)
    pub expose_error_details: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            telegram_api_base: "https://api.telegram.org".to_string(),
            client_api_url: None,
            client_api_token: None,
            max_file_size: 6 * 1024 * 1024 * 1024, // 6 GiB
            single_upload_limit: 2000 * 1024 * 1024, // Bot API write ceiling
            chunk_size: 2000 * 1024 * 1024,
            upload_dir: env::temp_dir(),
            url_fetch_timeout_secs: 30,
            port: 3000,
            expose_error_details: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bot_token: env::var("BOT_TOKEN").unwrap_or(default.bot_token),

            chat_id: env::var("CHAT_ID").unwrap_or(default.chat_id),

            telegram_api_base: env::var("TELEGRAM_API_BASE").unwrap_or(default.telegram_api_base),

            client_api_url: env::var("CLIENT_API_URL").ok().filter(|v| !v.is_empty()),

            client_api_token: env::var("CLIENT_API_TOKEN").ok().filter(|v| !v.is_empty()),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            single_upload_limit: env::var("SINGLE_UPLOAD_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.single_upload_limit),

            chunk_size: env::var("CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.chunk_size),

            upload_dir: env::var("UPLOAD_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            url_fetch_timeout_secs: env::var("URL_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.url_fetch_timeout_secs),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            expose_error_details: env::var("APP_ENV")
                .map(|v| v.to_lowercase() == "development")
                .unwrap_or(default.expose_error_details),
        }
    }

    /// Create config for development (verbose errors, library defaults otherwise)
    pub fn development() -> Self {
        Self {
            expose_error_details: true,
            ..Self::default()
        }
    }

    /// Create config for production (strict: channel credentials required)
    pub fn production() -> Self {
        Self {
            bot_token: env::var("BOT_TOKEN").expect("CRITICAL: BOT_TOKEN must be set"),
            chat_id: env::var("CHAT_ID").expect("CRITICAL: CHAT_ID must be set"),
            expose_error_details: false,
            ..Self::from_env()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_file_size, 6 * 1024 * 1024 * 1024);
        assert_eq!(config.single_upload_limit, 2000 * 1024 * 1024);
        assert_eq!(config.chunk_size, 2000 * 1024 * 1024);
        assert_eq!(config.telegram_api_base, "https://api.telegram.org");
        assert_eq!(config.url_fetch_timeout_secs, 30);
        assert!(!config.expose_error_details);
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development();
        assert!(config.expose_error_details);
        assert!(config.client_api_url.is_none());
    }

    #[test]
    fn test_from_env_overrides() {
        unsafe { env::set_var("SINGLE_UPLOAD_LIMIT", "1048576") };
        unsafe { env::set_var("APP_ENV", "development") };
        let config = AppConfig::from_env();
        unsafe { env::remove_var("SINGLE_UPLOAD_LIMIT") };
        unsafe { env::remove_var("APP_ENV") };
        assert_eq!(config.single_upload_limit, 1024 * 1024);
        assert!(config.expose_error_details);
    }
}
