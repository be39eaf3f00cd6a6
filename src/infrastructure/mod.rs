pub mod gateway;
pub mod telegram;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::infrastructure::gateway::TelegramClientGateway;
use crate::infrastructure::telegram::TelegramBotApi;
use crate::services::storage::UploadChannel;

/// Construct the upload channels from configuration. The bot channel always
/// exists (it is also the only fetch path); the client gateway joins only
/// when a bridge URL is configured.
pub fn setup_channels(
    config: &AppConfig,
) -> anyhow::Result<(Arc<TelegramBotApi>, Option<Arc<dyn UploadChannel>>)> {
    // Relay legs move multi-gigabyte bodies; only the connect phase is bounded.
    let relay_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()?;

    info!("☁️  Bot API: {}", config.telegram_api_base);
    let bot = Arc::new(TelegramBotApi::new(
        relay_client.clone(),
        config.telegram_api_base.clone(),
        config.bot_token.clone(),
        config.single_upload_limit,
    ));
    if !bot.is_configured() {
        warn!("⚠️  BOT_TOKEN is not set, storage writes will fail");
    }
    let caps = bot.caps();
    debug!(
        "Standard channel ceiling {} bytes, range fetches {}",
        caps.max_object_size,
        if caps.supports_range_get {
            "supported"
        } else {
            "unsupported"
        }
    );

    let gateway = match &config.client_api_url {
        Some(url) => {
            info!("🔌 Client bridge: {}", url);
            Some(Arc::new(TelegramClientGateway::new(
                relay_client,
                url.clone(),
                config.client_api_token.clone(),
                config.max_file_size,
            )) as Arc<dyn UploadChannel>)
        }
        None => {
            info!("✂️  No client bridge configured, oversized uploads will be chunked");
            None
        }
    };

    Ok((bot, gateway))
}

/// HTTP client for URL-sourced ingestion. Unlike the relay legs this one is
/// bounded: a slow or silent source must not hold a staging slot open.
pub fn setup_ingest_client(config: &AppConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.url_fetch_timeout_secs))
        .read_timeout(Duration::from_secs(config.url_fetch_timeout_secs))
        .build()?;
    Ok(client)
}
