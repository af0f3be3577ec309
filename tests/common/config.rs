//! Test configuration helpers for loading .env settings and creating test managers

use media_dl::engine::Engine;
use media_dl::{Config, Database, QueueManager};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Settings for tests that run the real yt-dlp against the network
#[derive(Debug, Clone)]
pub struct LiveSettings {
    /// URL of a short, freely downloadable video
    pub url: String,
    /// Explicit yt-dlp binary, if not on PATH
    pub ytdlp_path: Option<PathBuf>,
}

/// Load live-test settings from environment variables
///
/// Required environment variables:
/// - `MEDIA_DL_LIVE_URL` - URL of a short video to download
///
/// Optional environment variables:
/// - `YTDLP_PATH` - yt-dlp binary (default: PATH search)
pub fn load_live_settings() -> Result<LiveSettings, ConfigError> {
    dotenvy::dotenv().ok();

    let url = std::env::var("MEDIA_DL_LIVE_URL")
        .map_err(|_| ConfigError("MEDIA_DL_LIVE_URL not set in environment".to_string()))?;

    let ytdlp_path = std::env::var("YTDLP_PATH").ok().map(PathBuf::from);

    Ok(LiveSettings { url, ytdlp_path })
}

/// Whether live settings are available
pub fn has_live_settings() -> bool {
    load_live_settings().is_ok()
}

/// Configuration rooted in a temp dir
pub fn temp_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.save_path = temp_dir.path().join("downloads");
    config.persistence.database_path = temp_dir.path().join("history.db");
    config
}

/// Create a QueueManager over the given engine
///
/// Returns the manager and temp directory (keep temp_dir alive for test duration)
pub async fn create_manager_with_engine(
    engine: Arc<dyn Engine>,
    configure: impl FnOnce(&mut Config),
) -> Result<(QueueManager, TempDir), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let mut config = temp_config(&temp_dir);
    configure(&mut config);

    let db = Database::new(&config.persistence.database_path).await?;
    let manager = QueueManager::with_components(config, engine, Arc::new(db));

    Ok((manager, temp_dir))
}

/// Create a QueueManager driving the real yt-dlp
///
/// Side files and post-processing are turned off to keep the download small.
pub async fn create_live_manager() -> Result<(QueueManager, TempDir), Box<dyn std::error::Error>> {
    let settings = load_live_settings()?;
    let temp_dir = TempDir::new()?;

    let mut config = temp_config(&temp_dir);
    config.engine.ytdlp_path = settings.ytdlp_path;
    config.output.write_thumbnail = false;
    config.subtitles.write_subtitles = false;
    config.metadata.embed_thumbnail = false;
    config.post_processing.use_sponsorblock = false;

    let manager = QueueManager::new(config).await?;
    Ok((manager, temp_dir))
}
