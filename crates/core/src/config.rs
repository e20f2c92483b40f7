/// Configuration module for Bing Wallpaper.
///
/// This module provides functionality for managing application configuration,
/// including:
/// - Where the daily image archive is fetched from and for which market
/// - How often the background loop changes the wallpaper
/// - Where the downloaded image is stored
/// - Persisting configuration to disk as JSON
///
/// The configuration is saved to and loaded from a `config.json` file located
/// in the platform-specific application data directory
/// (%APPDATA%/BingWallpaper/ on Windows).
use anyhow::{anyhow, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// The archive endpoint never returns more than this many images per request.
pub const MAX_CANDIDATES: usize = 8;

/// Application configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the image archive; relative image URLs are joined onto it
    pub feed_base_url: String,
    /// Bing market code such as "en-US" (None = server default)
    pub market: Option<String>,
    /// Number of candidates requested per change
    pub candidate_count: usize,
    /// Hours between automatic changes
    pub refresh_interval_hours: u64,
    /// Apply the newest image once right after startup
    pub apply_on_startup: bool,
    /// File name of the image inside the Pictures folder
    pub image_file_name: String,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            feed_base_url: "https://www.bing.com".to_string(),
            market: None,
            candidate_count: MAX_CANDIDATES,
            refresh_interval_hours: 24,
            apply_on_startup: false,
            image_file_name: "bing_wallpaper.jpg".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Interval between automatic changes, never shorter than one hour
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_hours.max(1) * 60 * 60)
    }

    /// Candidate count clamped to what the archive can return
    pub fn candidate_count(&self) -> usize {
        self.candidate_count.clamp(1, MAX_CANDIDATES)
    }

    /// Fixed location the applied wallpaper is written to
    pub fn image_path(&self) -> Result<PathBuf> {
        Ok(pictures_directory()?.join(&self.image_file_name))
    }
}

/// Get the application's data directory
/// Returns %APPDATA%/BingWallpaper/ on Windows
/// Creates directory if it doesn't exist
pub fn get_data_directory() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "BingWallpaper")
        .ok_or_else(|| anyhow!("Failed to determine user data directory"))?;

    let data_dir = project_dirs.data_dir();

    fs::create_dir_all(data_dir)
        .map_err(|e| anyhow!("Failed to create data directory: {}", e))?;

    Ok(data_dir.to_path_buf())
}

/// The user's Pictures folder, falling back to ~/Pictures
pub fn pictures_directory() -> Result<PathBuf> {
    let user_dirs =
        UserDirs::new().ok_or_else(|| anyhow!("Failed to determine home directory"))?;

    Ok(user_dirs
        .picture_dir()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| user_dirs.home_dir().join("Pictures")))
}

fn config_path() -> Result<PathBuf> {
    Ok(get_data_directory()?.join("config.json"))
}

/// Whether a config.json has been written yet
pub fn config_exists() -> bool {
    config_path().map(|p| p.exists()).unwrap_or(false)
}

/// Load application configuration from config.json
/// Returns default config if file doesn't exist or on error
pub fn load_config() -> AppConfig {
    let Ok(config_path) = config_path() else {
        return AppConfig::default();
    };

    if !config_path.exists() {
        return AppConfig::default();
    }

    let Ok(contents) = fs::read_to_string(&config_path) else {
        return AppConfig::default();
    };

    parse_config(&contents)
}

/// Parse config JSON; unknown or missing fields fall back to defaults
pub fn parse_config(contents: &str) -> AppConfig {
    match serde_json::from_str(contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "config.json is invalid, using defaults");
            AppConfig::default()
        }
    }
}

/// Save application configuration to config.json
pub fn save_config(config: &AppConfig) -> Result<()> {
    let config_path = config_path()?;

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

    fs::write(&config_path, json)
        .map_err(|e| anyhow!("Failed to write config.json: {}", e))?;

    Ok(())
}
