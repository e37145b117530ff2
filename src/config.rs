//! Engine configuration and its TOML-backed store.
//!
//! The config file lives at `<config dir>/barbell/config.toml`.  Every key
//! is optional; anything missing takes the default below, so an empty or
//! absent file is a valid configuration.
//!
//! ```toml
//! rotation_interval_secs = 120
//! max_label_chars = 20
//!
//! [sources]
//! hacker_news = true
//! reddit = true
//! social_feed = true
//!
//! [identities]
//! reddit = ["rust", "programming"]
//! social_feed = ["Gargron"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::label::{DEFAULT_LABEL_CHARS, MIN_LABEL_CHARS};
use crate::source::Source;

pub const DEFAULT_ROTATION_INTERVAL_SECS: u64 = 120;
const HACKER_NEWS_PERIOD_SECS: u64 = 40 * 60;
const SOCIAL_FEED_PERIOD_SECS: u64 = 2 * 60;
const SOCIAL_WINDOW_SECS: u64 = 5 * 60;
const DEFAULT_INSTANCE: &str = "https://mastodon.social";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectedSources {
    pub hacker_news: bool,
    pub reddit: bool,
    pub social_feed: bool,
}

impl Default for SelectedSources {
    fn default() -> Self {
        Self {
            hacker_news: true,
            reddit: true,
            social_feed: true,
        }
    }
}

/// Handles polled per source: social feed user names and subreddit names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identities {
    pub social_feed: Vec<String>,
    pub reddit: Vec<String>,
}

/// Fetch and trim periods.  The asymmetry (Reddit on the Hacker News
/// period, social feed much faster) is intentional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub hacker_news_secs: u64,
    pub reddit_secs: u64,
    pub social_feed_secs: u64,
    pub history_trim_secs: u64,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            hacker_news_secs: HACKER_NEWS_PERIOD_SECS,
            reddit_secs: HACKER_NEWS_PERIOD_SECS,
            social_feed_secs: SOCIAL_FEED_PERIOD_SECS,
            history_trim_secs: HACKER_NEWS_PERIOD_SECS,
        }
    }
}

impl Schedule {
    pub fn fetch_period(&self, source: Source) -> Duration {
        let secs = match source {
            Source::HackerNews => self.hacker_news_secs,
            Source::Reddit => self.reddit_secs,
            Source::SocialFeed => self.social_feed_secs,
        };
        Duration::from_secs(secs.max(1))
    }

    pub fn history_trim_period(&self) -> Duration {
        Duration::from_secs(self.history_trim_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialSettings {
    /// Base URL of the instance serving `/@{user}.rss`.
    pub instance: String,
    /// Only posts newer than this are shown.
    pub window_secs: u64,
}

impl Default for SocialSettings {
    fn default() -> Self {
        Self {
            instance: DEFAULT_INSTANCE.to_string(),
            window_secs: SOCIAL_WINDOW_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sources: SelectedSources,
    pub identities: Identities,
    pub rotation_interval_secs: u64,
    pub max_label_chars: usize,
    pub schedule: Schedule,
    pub social: SocialSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sources: SelectedSources::default(),
            identities: Identities::default(),
            rotation_interval_secs: DEFAULT_ROTATION_INTERVAL_SECS,
            max_label_chars: DEFAULT_LABEL_CHARS,
            schedule: Schedule::default(),
            social: SocialSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn is_selected(&self, source: Source) -> bool {
        match source {
            Source::HackerNews => self.sources.hacker_news,
            Source::Reddit => self.sources.reddit,
            Source::SocialFeed => self.sources.social_feed,
        }
    }

    pub fn identities_for(&self, source: Source) -> &[String] {
        match source {
            Source::HackerNews => &[],
            Source::Reddit => &self.identities.reddit,
            Source::SocialFeed => &self.identities.social_feed,
        }
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval_secs.max(1))
    }

    /// Label width with the floor applied.
    pub fn label_chars(&self) -> usize {
        self.max_label_chars.max(MIN_LABEL_CHARS)
    }

    /// Reject any handle that would not survive [`parse_identities`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for source in [Source::SocialFeed, Source::Reddit] {
            for handle in self.identities_for(source) {
                if handle.is_empty() || !handle.chars().all(is_identity_char) {
                    return Err(ConfigError::InvalidIdentity {
                        source_name: source.to_string(),
                        handle: handle.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn is_identity_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Turn free-form input like `" rust, r/golang ,,"` into clean handles.
///
/// Every character other than letters, digits, `_` and `,` is dropped
/// before splitting, so the example yields `["rust", "rgolang"]`.
pub fn parse_identities(raw: &str) -> Vec<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|&c| is_identity_char(c) || c == ',')
        .collect();
    cleaned
        .split(',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Where the engine reads its config at startup and writes it on apply.
pub trait ConfigStore: Send {
    fn load(&self) -> Result<EngineConfig, ConfigError>;
    fn save(&self, config: &EngineConfig) -> Result<(), ConfigError>;
}

pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("barbell")
            .join("config.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<EngineConfig, ConfigError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(EngineConfig::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn save(&self, config: &EngineConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(config)?)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// In-memory store for engine tests.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        pub saved: Arc<Mutex<Vec<EngineConfig>>>,
    }

    impl ConfigStore for MemoryStore {
        fn load(&self) -> Result<EngineConfig, ConfigError> {
            Ok(self.saved.lock().unwrap().last().cloned().unwrap_or_default())
        }

        fn save(&self, config: &EngineConfig) -> Result<(), ConfigError> {
            self.saved.lock().unwrap().push(config.clone());
            Ok(())
        }
    }

    #[test]
    fn defaults_match_reference_configuration() {
        let config = EngineConfig::default();
        assert_eq!(config.rotation_interval(), Duration::from_secs(120));
        assert_eq!(config.max_label_chars, 20);
        assert!(config.is_selected(Source::HackerNews));
        assert!(config.is_selected(Source::Reddit));
        assert_eq!(config.schedule.fetch_period(Source::HackerNews), Duration::from_secs(2400));
        assert_eq!(config.schedule.fetch_period(Source::Reddit), Duration::from_secs(2400));
        assert_eq!(config.schedule.fetch_period(Source::SocialFeed), Duration::from_secs(120));
        assert_eq!(config.schedule.history_trim_period(), Duration::from_secs(2400));
    }

    #[test]
    fn label_chars_has_floor() {
        let config = EngineConfig {
            max_label_chars: 2,
            ..Default::default()
        };
        assert_eq!(config.label_chars(), MIN_LABEL_CHARS);
    }

    #[test]
    fn parse_identities_cleans_input() {
        assert_eq!(parse_identities(" rust, r/golang ,,"), ["rust", "rgolang"]);
        assert_eq!(parse_identities("a_b,c-d,  "), ["a_b", "cd"]);
        assert!(parse_identities(" , ,").is_empty());
    }

    #[test]
    fn validate_rejects_bad_handles() {
        let mut config = EngineConfig::default();
        config.identities.reddit = vec!["rust".into(), "bad name".into()];
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdentity { ref handle, .. } if handle == "bad name"));

        config.identities.reddit = vec!["rust".into()];
        config.identities.social_feed = vec!["".into()];
        assert!(config.validate().is_err());

        config.identities.social_feed = vec!["alice_01".into()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn hacker_news_has_no_identities() {
        let mut config = EngineConfig::default();
        config.identities.reddit = vec!["rust".into()];
        assert!(config.identities_for(Source::HackerNews).is_empty());
        assert_eq!(config.identities_for(Source::Reddit), ["rust".to_string()]);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            max_label_chars = 42
            [sources]
            reddit = false
            [identities]
            reddit = ["rust"]
            "#,
        )
        .unwrap();
        assert_eq!(config.max_label_chars, 42);
        assert!(!config.sources.reddit);
        assert!(config.sources.hacker_news);
        assert_eq!(config.identities.reddit, ["rust"]);
        assert_eq!(config.rotation_interval_secs, DEFAULT_ROTATION_INTERVAL_SECS);
    }

    #[test]
    fn toml_store_round_trips_and_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlConfigStore::new(dir.path().join("nested").join("config.toml"));

        assert_eq!(store.load().unwrap(), EngineConfig::default());

        let mut config = EngineConfig::default();
        config.identities.social_feed = vec!["alice".into()];
        config.rotation_interval_secs = 30;
        store.save(&config).unwrap();

        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn toml_store_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_label_chars = \"wide\"").unwrap();

        let err = TomlConfigStore::new(path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
