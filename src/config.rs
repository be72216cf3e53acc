use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ReaderError;

const CONFIG_ENV: &str = "HN_STREAM_CONFIG";
const APP_DIR: &str = "hn-stream-reader";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Base of the Firebase API, without a trailing slash.
    pub api_base: String,
    /// How many story cards one lazy load creates.
    pub batch_size: usize,
    /// Distance from the bottom of the list, in points, that triggers a load.
    pub lazy_load_threshold: f32,
    /// Show "3 hours ago" style times. Turning this off strips the relative
    /// time out of every template.
    pub relative_time: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub dark_mode: bool,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://hacker-news.firebaseio.com/v0".to_string(),
            batch_size: 100,
            lazy_load_threshold: 300.0,
            relative_time: true,
            request_timeout_secs: 30,
            user_agent: concat!("hn_stream_reader/", env!("CARGO_PKG_VERSION")).to_string(),
            dark_mode: true,
            window_width: 900.0,
            window_height: 800.0,
        }
    }
}

impl ReaderConfig {
    /// Loads the config from `$HN_STREAM_CONFIG`, or the per-user config
    /// directory. A missing file is not an error.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReaderError> {
        if self.batch_size == 0 {
            return Err(ReaderError::Config("batch_size must be at least 1".into()));
        }
        if self.lazy_load_threshold.is_nan() || self.lazy_load_threshold < 0.0 {
            return Err(ReaderError::Config(
                "lazy_load_threshold must be a non-negative number".into(),
            ));
        }
        if self.api_base.trim().is_empty() {
            return Err(ReaderError::Config("api_base is empty".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs_next::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ReaderConfig::from_toml("").unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.lazy_load_threshold, 300.0);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config = ReaderConfig::from_toml(
            r#"
            batch_size = 25
            relative_time = false
            api_base = "http://localhost:8080/v0/"
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_size, 25);
        assert!(!config.relative_time);
        assert_eq!(config.api_base(), "http://localhost:8080/v0");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = ReaderConfig::from_toml("batch_size = 0").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(ReaderConfig::from_toml("batch_size = \"lots\"").is_err());
    }

    #[test]
    fn load_from_reads_a_file() {
        let path = std::env::temp_dir().join(format!(
            "hn_stream_reader_config_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "dark_mode = false\nbatch_size = 3\n").unwrap();

        let config = ReaderConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(!config.dark_mode);
        assert_eq!(config.batch_size, 3);
    }
}
