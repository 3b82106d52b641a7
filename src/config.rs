//! Settings for Trend Radar
//!
//! Settings come from an optional TOML file (`--config PATH` or the XDG config
//! directory) with every field defaulted. Credentials may also live in the
//! file but environment variables (optionally from `.env`) take precedence.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::data::Credentials;

/// Environment variable holding the Bluesky handle
pub const ENV_BLUESKY_HANDLE: &str = "BLUESKY_HANDLE";
/// Environment variable holding the Bluesky app password
pub const ENV_BLUESKY_PASSWORD: &str = "BLUESKY_APP_PASSWORD";
/// Environment variable holding the OpenAI API key
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Errors that can occur when loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for `Settings`
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Provider locale parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocaleSettings {
    pub trends_hl: String,
    pub trends_geo: String,
    /// Timezone offset in minutes
    pub trends_tz: i32,
    pub trends_timeframe: String,
    pub news_hl: String,
    pub news_gl: String,
    pub news_ceid: String,
    pub wiki_project: String,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            trends_hl: "de-DE".to_string(),
            trends_geo: "DE".to_string(),
            trends_tz: 60,
            trends_timeframe: "today 1-m".to_string(),
            news_hl: "de".to_string(),
            news_gl: "DE".to_string(),
            news_ceid: "DE:de".to_string(),
            wiki_project: "de.wikipedia".to_string(),
        }
    }
}

/// Cache lifetimes per source, in seconds (0 disables caching)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    pub trends: u64,
    pub news: u64,
    pub pageviews: u64,
    pub social: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            trends: 3600,
            news: 0,
            pageviews: 3600,
            social: 0,
        }
    }
}

impl CacheTtls {
    pub fn trends(&self) -> Duration {
        Duration::from_secs(self.trends)
    }

    pub fn news(&self) -> Duration {
        Duration::from_secs(self.news)
    }

    pub fn pageviews(&self) -> Duration {
        Duration::from_secs(self.pageviews)
    }

    pub fn social(&self) -> Duration {
        Duration::from_secs(self.social)
    }
}

/// Credentials as written in the settings file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileCredentials {
    pub bluesky_handle: Option<String>,
    pub bluesky_app_password: Option<String>,
    pub openai_api_key: Option<String>,
}

/// All runtime settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub locale: LocaleSettings,
    pub ttl: CacheTtls,
    pub news_limit: usize,
    pub social_limit: usize,
    pub window_days: u32,
    pub request_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub export_dir: Option<PathBuf>,
    pub credentials: FileCredentials,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            locale: LocaleSettings::default(),
            ttl: CacheTtls::default(),
            news_limit: 10,
            social_limit: 20,
            window_days: 30,
            request_timeout_secs: 15,
            refresh_interval_secs: 300,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: None,
            export_dir: None,
            credentials: FileCredentials::default(),
        }
    }
}

impl Settings {
    /// Loads settings from an explicit path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads settings from `explicit`, else the default location, else defaults
    ///
    /// A missing default file is not an error; an explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Interval of the background refresh, `None` when disabled
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    /// Bluesky credentials from the environment, falling back to the file
    pub fn bluesky_credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(
            env_or(ENV_BLUESKY_HANDLE, self.credentials.bluesky_handle.clone()),
            env_or(
                ENV_BLUESKY_PASSWORD,
                self.credentials.bluesky_app_password.clone(),
            ),
        )
    }

    /// OpenAI key from the environment, falling back to the file
    pub fn openai_api_key(&self) -> Option<String> {
        env_or(ENV_OPENAI_API_KEY, self.credentials.openai_api_key.clone())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Where exports go when no directory is given on the command line
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn env_or(name: &str, fallback: Option<String>) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or(fallback)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "trendradar")
}

/// `~/.config/trendradar/config.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Directory for the dashboard log file
pub fn log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_observed_deployment() {
        let settings = Settings::default();
        assert_eq!(settings.ttl.trends(), Duration::from_secs(3600));
        assert_eq!(settings.ttl.pageviews(), Duration::from_secs(3600));
        assert_eq!(settings.ttl.news(), Duration::ZERO);
        assert_eq!(settings.ttl.social(), Duration::ZERO);
        assert_eq!(settings.news_limit, 10);
        assert_eq!(settings.social_limit, 20);
        assert_eq!(settings.refresh_interval(), Some(Duration::from_secs(300)));
        assert_eq!(settings.locale.trends_geo, "DE");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            news_limit = 5

            [ttl]
            news = 120

            [locale]
            trends_geo = "AT"
            "#,
        )
        .unwrap();

        assert_eq!(settings.news_limit, 5);
        assert_eq!(settings.ttl.news, 120);
        assert_eq!(settings.ttl.trends, 3600);
        assert_eq!(settings.locale.trends_geo, "AT");
        assert_eq!(settings.locale.trends_hl, "de-DE");
    }

    #[test]
    fn test_zero_refresh_disables_interval() {
        let settings = Settings::from_toml("refresh_interval_secs = 0").unwrap();
        assert!(settings.refresh_interval().is_none());
    }

    #[test]
    fn test_from_path_reports_parse_errors() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("config.toml");
        fs::write(&path, "news_limit = \"many\"").unwrap();

        let err = Settings::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let result = Settings::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_file_credentials_are_used_when_env_is_unset() {
        let settings = Settings::from_toml(
            r#"
            [credentials]
            openai_api_key = "  sk-from-file  "
            "#,
        )
        .unwrap();

        if std::env::var(ENV_OPENAI_API_KEY).is_err() {
            assert_eq!(settings.openai_api_key().as_deref(), Some("sk-from-file"));
        }
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let settings = Settings::from_toml(
            r#"
            [credentials]
            openai_api_key = "   "
            "#,
        )
        .unwrap();

        if std::env::var(ENV_OPENAI_API_KEY).is_err() {
            assert!(settings.openai_api_key().is_none());
        }
    }
}
