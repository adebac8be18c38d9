use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::card::CardConfig;
use crate::error::{BirthdayError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "birthday-progress.toml";
pub const DEFAULT_STORAGE_PATH: &str = "birthday_progress.json";
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cards: Vec<CardConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"birthday_progress=debug"`. `RUST_LOG`
    /// still takes precedence.
    pub level: Option<String>,
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_PATH)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl SchedulerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

impl Config {
    /// Loads `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.update_interval_secs == 0 {
            return Err(BirthdayError::InvalidInput(
                "scheduler.update_interval_secs must be at least 1".into(),
            ));
        }
        for card in &self.cards {
            card.validate()?;
        }
        Ok(())
    }

    pub fn card(&self, entity: &str) -> Option<&CardConfig> {
        self.cards.iter().find(|c| c.entity == entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Layout, ProgressType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.scheduler.period(), Duration::from_secs(1));
        assert_eq!(config.storage.path, PathBuf::from(DEFAULT_STORAGE_PATH));
        assert!(config.logging.level.is_none());
        assert!(config.cards.is_empty());
    }

    #[test]
    fn parses_full_config() {
        let toml_content = r#"
[scheduler]
update_interval_secs = 5

[storage]
path = "/var/lib/birthdays.json"

[logging]
level = "birthday_progress=debug"

[[cards]]
entity = "sensor.anna_birthday_progress"
name = "Anna"
progress_type = "horizontal"
next_birthday_title = "Party in"

[[cards]]
entity = "sensor.ben_birthday_progress"
layout = "panels"
theme = "light"
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.scheduler.update_interval_secs, 5);
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/birthdays.json"));
        assert_eq!(config.logging.level.as_deref(), Some("birthday_progress=debug"));

        let anna = config.card("sensor.anna_birthday_progress").unwrap();
        assert_eq!(anna.progress_type, ProgressType::Horizontal);
        assert_eq!(anna.next_birthday_title.as_deref(), Some("Party in"));

        let ben = config.card("sensor.ben_birthday_progress").unwrap();
        assert_eq!(ben.layout, Layout::Panels);
        assert_eq!(ben.progress_type, ProgressType::Circular);
    }

    #[test]
    fn rejects_zero_interval_and_cards_without_entity() {
        let err = Config::from_toml_str("[scheduler]\nupdate_interval_secs = 0\n").unwrap_err();
        assert!(matches!(err, BirthdayError::InvalidInput(_)));

        let err = Config::from_toml_str("[[cards]]\nentity = \"\"\n").unwrap_err();
        assert!(matches!(err, BirthdayError::InvalidInput(_)));

        let err = Config::from_toml_str("[[cards]]\nname = \"no entity\"\n").unwrap_err();
        assert!(matches!(err, BirthdayError::Config(_)));
    }

    #[test]
    fn loads_from_file_or_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler]\nupdate_interval_secs = 2").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.scheduler.update_interval_secs, 2);

        let missing = file.path().with_extension("missing.toml");
        let config = Config::load(missing).unwrap();
        assert_eq!(config.scheduler.update_interval_secs, 1);
    }
}
