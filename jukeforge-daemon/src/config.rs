//! Configuration file loading and management
//!
//! This module handles loading and parsing the daemon configuration from
//! `$XDG_CONFIG_HOME/jukeforge/config.toml`. If the configuration file doesn't
//! exist, a default configuration is created with documented comments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Daemon-specific configuration
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Plugin lifecycle configuration
    #[serde(default)]
    pub plugins: PluginsConfig,
    /// Provider-specific configurations, keyed by provider ID
    #[serde(default)]
    pub providers: HashMap<String, PluginConfig>,
    /// Suggester-specific configurations, keyed by suggester ID
    #[serde(default)]
    pub suggesters: HashMap<String, PluginConfig>,
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Default: "info"
    pub log_level: String,
}

/// Plugin lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginsConfig {
    /// Maximum time a single plugin may take to initialize
    /// Default: 30
    pub init_timeout_secs: u64,
}

/// Per-plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginConfig {
    /// Whether this plugin is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Plugin-specific settings as arbitrary TOML value
    #[serde(default = "default_settings")]
    pub settings: toml::Value,
}

fn default_enabled() -> bool {
    true
}

fn default_settings() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            init_timeout_secs: 30,
        }
    }
}

impl PluginsConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: default_settings(),
        }
    }
}

impl PluginConfig {
    /// Settings converted to JSON, the format plugins receive them in.
    pub fn settings_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.settings).context("Failed to convert plugin settings")
    }
}

impl Config {
    /// Load configuration from the specified path
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// The parsed configuration or an error if loading/parsing fails
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default XDG config location
    ///
    /// If the configuration file doesn't exist, creates a default configuration
    /// file with documented comments.
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_file(&config_path)?;
        }

        Self::load(&config_path)
    }

    /// Get the default configuration file path
    ///
    /// Returns `$XDG_CONFIG_HOME/jukeforge/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "raibid-labs", "jukeforge")
            .context("Failed to determine project directories")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Create a default configuration file with documented comments
    fn create_default_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

        tracing::info!("Created default configuration file at: {}", path.display());
        Ok(())
    }

    /// Generate the default configuration file content with comments
    fn default_config_content() -> String {
        r#"# Jukeforge Daemon Configuration
# This file configures the jukeforge daemon behavior.

[daemon]
# Log level: trace, debug, info, warn, error
# RUST_LOG takes precedence when set.
# Default: "info"
log_level = "info"

[plugins]
# Maximum time in seconds a single plugin may take to initialize.
# Plugins exceeding it are reported as failed.
# Default: 30
init_timeout_secs = 30

# Provider and suggester configurations
# Each plugin can be configured with:
# - enabled: Whether the plugin is enabled (default: true)
# - settings: Plugin-specific settings (varies by plugin)
#
# Plugins without an entry are enabled with empty settings.

# Example: Dummy provider configuration
[providers.dummy]
enabled = true

[providers.dummy.settings]
# Playback factory used for dummy songs
playback_factory = "dummy-playback"

# Example: Dummy suggester configuration
[suggesters.dummy-suggester]
enabled = true
"#
        .to_string()
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are valid and within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.daemon.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log_level: {}. Must be one of: {}",
                self.daemon.log_level,
                valid_log_levels.join(", ")
            );
        }

        if self.plugins.init_timeout_secs == 0 {
            anyhow::bail!("plugins.init_timeout_secs must be greater than 0");
        }

        for (kind, entries) in [("providers", &self.providers), ("suggesters", &self.suggesters)] {
            for (id, plugin_config) in entries {
                if !plugin_config.settings.is_table() {
                    anyhow::bail!("{}.{}: settings must be a table", kind, id);
                }
            }
        }

        Ok(())
    }

    /// Configuration of a provider. Missing entries fall back to the default.
    pub fn provider(&self, id: &str) -> PluginConfig {
        self.providers.get(id).cloned().unwrap_or_default()
    }

    /// Configuration of a suggester. Missing entries fall back to the default.
    pub fn suggester(&self, id: &str) -> PluginConfig {
        self.suggesters.get(id).cloned().unwrap_or_default()
    }
}
