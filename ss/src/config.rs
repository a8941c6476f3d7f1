//! slotsched configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerConfig;

/// Main slotsched configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Scheduler actor settings
    pub scheduler: SchedulerConfig,

    /// Demo scenario tuning
    pub demo: DemoConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.channel_buffer == 0 {
            return Err(eyre::eyre!("scheduler.channel-buffer must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidates() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::candidates().into_iter().find(|p| p.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    /// Project-local config, then user config
    fn candidates() -> Vec<PathBuf> {
        // Project-local config: .slotsched.yml
        let mut paths = vec![PathBuf::from(".slotsched.yml")];
        // User config: ~/.config/slotsched/slotsched.yml
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("slotsched").join("slotsched.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Demo scenario configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DemoConfig {
    /// Number of posts the slow list produces
    pub slow_items: usize,

    /// Simulated busy time per post in microseconds
    pub item_cost_us: u64,

    /// Pause between simulated keystrokes in milliseconds
    pub keystroke_delay_ms: u64,

    /// Urgent toggles fired while the slow list renders
    pub toggles: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            slow_items: 250,
            item_cost_us: 200,
            keystroke_delay_ms: 15,
            toggles: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.scheduler.channel_buffer, 256);
        assert_eq!(config.demo.slow_items, 250);
        assert_eq!(config.demo.toggles, 5);
        assert!(config.log_level.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
scheduler:
  channel-buffer: 32

demo:
  slow-items: 10
  item-cost-us: 50
  keystroke-delay-ms: 1
  toggles: 2

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.scheduler.channel_buffer, 32);
        assert_eq!(config.demo.slow_items, 10);
        assert_eq!(config.demo.item_cost_us, 50);
        assert_eq!(config.demo.keystroke_delay_ms, 1);
        assert_eq!(config.demo.toggles, 2);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
demo:
  toggles: 9
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.demo.toggles, 9);

        // Defaults for unspecified
        assert_eq!(config.demo.slow_items, 250);
        assert_eq!(config.scheduler.channel_buffer, 256);
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let mut config = Config::default();
        config.scheduler.channel_buffer = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("channel-buffer"));
    }

    #[test]
    fn test_validate_accepts_empty_slow_list() {
        let mut config = Config::default();
        config.demo.slow_items = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scheduler:\n  channel-buffer: 4\nlog-level: trace").unwrap();
        let path = file.path().to_path_buf();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.scheduler.channel_buffer, 4);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("trace"));
    }

    #[test]
    fn test_load_explicit_path_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_load_explicit_path_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scheduler: [not, a, map]").unwrap();
        let path = file.path().to_path_buf();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
