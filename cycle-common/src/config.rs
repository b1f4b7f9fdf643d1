//! Configuration loading and config file resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CYCLE_PLAYER_CONFIG";

/// Playback engine tuning
///
/// Every field has a default, so a partial (or absent) config file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Stall watchdog sample cadence
    pub stall_check_interval_ms: u64,
    /// Absolute ceiling for a single audio segment
    pub safety_timeout_ms: u64,
    /// Bound of the recent-history list used to avoid immediate repeats
    pub recent_avoid_count: usize,
    /// Admit an uncached scheduled cycle while online (streamed playback)
    pub stream_uncached_when_online: bool,
    /// Broadcast capacity of the event bus
    pub event_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            stall_check_interval_ms: 1500,
            safety_timeout_ms: 15_000,
            recent_avoid_count: 10,
            stream_uncached_when_online: false,
            event_capacity: 100,
        }
    }
}

impl PlayerConfig {
    pub fn stall_check_interval(&self) -> Duration {
        Duration::from_millis(self.stall_check_interval_ms)
    }

    pub fn safety_timeout(&self) -> Duration {
        Duration::from_millis(self.safety_timeout_ms)
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlayerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration following the resolution priority order
    ///
    /// 1. Command-line argument (highest priority, must exist)
    /// 2. Environment variable (must exist)
    /// 3. User config file (optional)
    /// 4. Compiled defaults (fallback)
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg, CONFIG_ENV_VAR)? {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values that would disable the watchdogs
    pub fn validate(&self) -> Result<()> {
        if self.stall_check_interval_ms == 0 {
            return Err(Error::Config(
                "stall_check_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.safety_timeout_ms == 0 {
            return Err(Error::Config(
                "safety_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.safety_timeout_ms < self.stall_check_interval_ms {
            return Err(Error::Config(format!(
                "safety_timeout_ms ({}) must not be shorter than stall_check_interval_ms ({})",
                self.safety_timeout_ms, self.stall_check_interval_ms
            )));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Config file resolution
///
/// Explicit paths (CLI, environment) must exist; the user config file is
/// only used when present. Returns None when defaults should apply.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return existing(path.to_path_buf()).map(Some);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return existing(PathBuf::from(path)).map(Some);
        }
    }

    // Priority 3: User config file
    Ok(default_config_file().filter(|p| p.exists()))
}

fn existing(path: PathBuf) -> Result<PathBuf> {
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {}", path.display())))
    }
}

/// Platform config location (`~/.config/cycle-player/config.toml` on Linux)
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cycle-player").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.stall_check_interval(), Duration::from_millis(1500));
        assert_eq!(config.safety_timeout(), Duration::from_secs(15));
        assert_eq!(config.recent_avoid_count, 10);
        assert!(!config.stream_uncached_when_online);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PlayerConfig::from_toml_str("recent_avoid_count = 4\n").unwrap();
        assert_eq!(config.recent_avoid_count, 4);
        assert_eq!(config.safety_timeout_ms, 15_000);
    }

    #[test]
    fn test_validation_rejects_bad_timing() {
        assert!(matches!(
            PlayerConfig::from_toml_str("stall_check_interval_ms = 0\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            PlayerConfig::from_toml_str("safety_timeout_ms = 1000\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_malformed_toml_is_error() {
        assert!(matches!(
            PlayerConfig::from_toml_str("recent_avoid_count = \"ten\"\n"),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    #[serial]
    fn test_cli_path_takes_priority() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "safety_timeout_ms = 20000").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, "/nonexistent/config.toml");
        let config = PlayerConfig::load(Some(file.path())).unwrap();
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(config.safety_timeout_ms, 20_000);
    }

    #[test]
    #[serial]
    fn test_env_var_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "event_capacity = 7").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, file.path());
        let config = PlayerConfig::load(None).unwrap();
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(config.event_capacity, 7);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_path_is_error() {
        std::env::remove_var(CONFIG_ENV_VAR);
        let result = PlayerConfig::load(Some(Path::new("/nonexistent/cycle.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
