use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::registry::{CategoryFeeds, FeedRegistry};

const SECS_PER_HOUR: u64 = 60 * 60;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Hours between scheduled aggregation runs
    #[serde(default = "default_refresh_interval_hours")]
    pub refresh_interval_hours: u64,
    /// Pause after each feed fetch, in milliseconds
    #[serde(default = "default_feed_delay_ms")]
    pub feed_delay_ms: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Replaces the built-in feed list when present
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryFeeds>,
}

fn default_refresh_interval_hours() -> u64 {
    6
}

fn default_feed_delay_ms() -> u64 {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_categories() -> Vec<CategoryFeeds> {
    FeedRegistry::builtin().categories().to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_hours: default_refresh_interval_hours(),
            feed_delay_ms: default_feed_delay_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            listen_addr: default_listen_addr(),
            categories: default_categories(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.refresh_interval_hours == 0 {
            anyhow::bail!("refresh_interval_hours must be positive");
        }
        if config.refresh_interval_hours.checked_mul(SECS_PER_HOUR).is_none() {
            anyhow::bail!(
                "refresh_interval_hours is too large: {}",
                config.refresh_interval_hours
            );
        }
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to the built-in feed list.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn registry(&self) -> anyhow::Result<FeedRegistry> {
        FeedRegistry::new(self.categories.clone())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_hours.saturating_mul(SECS_PER_HOUR))
    }

    pub fn feed_delay(&self) -> Duration {
        Duration::from_millis(self.feed_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        assert_eq!(default_refresh_interval_hours(), 6);
        assert_eq!(default_feed_delay_ms(), 1000);
        assert_eq!(default_fetch_timeout_secs(), 30);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            refresh_interval_hours = 2
            feed_delay_ms = 250
            fetch_timeout_secs = 10
            listen_addr = "127.0.0.1:8080"

            [[categories]]
            slug = "technology"
            name = "Technology"
            feeds = ["https://example.com/feed.xml", "https://example.org/rss"]

            [[categories]]
            slug = "food"
            name = "Food"
            feeds = ["https://food.example.com/rss"]
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.refresh_interval(), Duration::from_secs(2 * 3600));
        assert_eq!(config.feed_delay(), Duration::from_millis(250));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[0].slug, "technology");
        assert_eq!(config.categories[0].feeds.len(), 2);
        assert_eq!(config.categories[1].name, "Food");
    }

    #[test]
    fn test_load_config_with_defaults() {
        let content = r#"
            [[categories]]
            slug = "science"
            name = "Science"
            feeds = ["https://example.com/feed.xml"]
        "#;

        let config = Config::from_str(content).unwrap();

        assert_eq!(config.refresh_interval_hours, 6);
        assert_eq!(config.feed_delay_ms, 1000);
        assert_eq!(config.listen_addr, "0.0.0.0:5000");
        assert_eq!(config.categories.len(), 1);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config.categories.len(), 8);
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_required_fields() {
        let content = r#"
            [[categories]]
            name = "Science"
            # Missing slug field
        "#;

        let result = Config::from_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let content = r#"
            refresh_interval_hours = 0
            categories = []
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_oversized_refresh_interval_rejected() {
        let content = r#"
            refresh_interval_hours = 9223372036854775807
        "#;

        let err = Config::from_str(content).unwrap_err();
        assert!(err.to_string().contains("too large"));

        let content = r#"
            refresh_interval_hours = 5124095576030431
        "#;
        assert!(Config::from_str(content).is_ok());
    }

    #[test]
    fn test_categories_default_to_builtin() {
        let content = r#"
            refresh_interval_hours = 12
            feed_delay_ms = 0
        "#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(12 * 3600));
        assert_eq!(config.categories.len(), 8);
        assert_eq!(config.registry().unwrap().feed_count(), 17);
    }

    #[test]
    fn test_category_feeds_default_empty() {
        let content = r#"
            [[categories]]
            slug = "travel"
            name = "Travel"
        "#;

        let config = Config::from_str(content).unwrap();
        assert!(config.categories[0].feeds.is_empty());
    }

    #[test]
    fn test_registry_rejects_duplicate_slugs() {
        let content = r#"
            [[categories]]
            slug = "sports"
            name = "Sports"
            feeds = ["https://a.example.com/rss"]

            [[categories]]
            slug = "sports"
            name = "More Sports"
            feeds = ["https://b.example.com/rss"]
        "#;

        let config = Config::from_str(content).unwrap();
        assert!(config.registry().is_err());
    }
}
