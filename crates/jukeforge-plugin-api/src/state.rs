//! Plugin lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a wrapped plugin.
///
/// Transitions only ever go `Inactive -> Config -> Active`, and back from
/// `Active` to `Config` when the plugin is closed. Nothing returns a plugin
/// to `Inactive`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Registered, but not configured yet.
    #[default]
    Inactive,
    /// Configured and waiting for initialization.
    Config,
    /// Initialized and usable.
    Active,
}

impl PluginState {
    /// Convert state to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginState::Inactive => "inactive",
            PluginState::Config => "config",
            PluginState::Active => "active",
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_inactive() {
        assert_eq!(PluginState::default(), PluginState::Inactive);
    }

    #[test]
    fn test_display() {
        assert_eq!(PluginState::Config.to_string(), "config");
        assert_eq!(PluginState::Active.to_string(), "active");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PluginState::Active).unwrap();
        assert_eq!(json, "\"active\"");
    }
}
