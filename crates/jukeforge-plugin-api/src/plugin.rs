//! Plugin capability traits.
//!
//! A plugin is created without doing any work. The host then hands it its
//! configuration through [`Plugin::configure`], calls [`Plugin::initialize`]
//! once configuration is done, and finally [`Plugin::close`] to release
//! everything the plugin allocated. The plugin instance is never used again
//! after it has been closed.

use crate::error::{PluginError, Result};
use crate::init::InitStateWriter;
use crate::playback::PlaybackFactoryManager;
use crate::song::Song;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Everything a plugin receives during configuration.
#[derive(Clone)]
pub struct ConfigContext {
    /// Plugin-specific settings from the config file. Always a JSON object.
    pub settings: serde_json::Value,

    /// Playback factories the plugin may depend on.
    pub playback_factories: Arc<PlaybackFactoryManager>,
}

impl ConfigContext {
    /// Create a context with the given settings.
    ///
    /// Anything but an object is replaced by an empty object.
    pub fn new(settings: serde_json::Value, playback_factories: Arc<PlaybackFactoryManager>) -> Self {
        let settings = if settings.is_object() {
            settings
        } else {
            serde_json::Value::Object(serde_json::Map::new())
        };
        Self {
            settings,
            playback_factories,
        }
    }

    /// Create a context without settings.
    pub fn empty(playback_factories: Arc<PlaybackFactoryManager>) -> Self {
        Self::new(serde_json::Value::Null, playback_factories)
    }

    /// Read a typed setting. Returns `Ok(None)` if the key is absent.
    pub fn setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.settings.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| PluginError::Configuration(format!("setting '{key}': {e}"))),
        }
    }

    /// Read a setting that has to be present.
    pub fn required_setting<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.setting(key)?
            .ok_or_else(|| PluginError::Configuration(format!("missing setting '{key}'")))
    }
}

impl std::fmt::Debug for ConfigContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigContext")
            .field("settings", &self.settings)
            .field("playback_factories", &self.playback_factories.ids())
            .finish()
    }
}

/// Base trait for all plugins.
///
/// Not meant to be implemented on its own; implement [`Provider`] or
/// [`Suggester`] as well.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique identifier, stable across restarts.
    fn id(&self) -> &str;

    /// A short, descriptive name. Doesn't repeat the plugin kind.
    fn name(&self) -> &str;

    /// A one or two sentence description.
    fn description(&self) -> &str {
        ""
    }

    /// Receive configuration. May be called any number of times before
    /// [`initialize`](Plugin::initialize).
    fn configure(&self, _context: &ConfigContext) -> Result<()> {
        Ok(())
    }

    /// Allocate resources and get ready for use.
    async fn initialize(&self, writer: &dyn InitStateWriter) -> Result<()>;

    /// Release all resources.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A plugin supplying playable songs.
#[async_trait]
pub trait Provider: Plugin {
    /// User-facing subject of the content, e.g. "Spotify" or "YouTube".
    fn subject(&self) -> String;

    /// Search for songs. `offset` skips that many results.
    async fn search(&self, query: &str, offset: usize) -> Result<Vec<Song>>;

    /// Look up a song by its provider-local ID.
    async fn lookup(&self, song_id: &str) -> Result<Song>;
}

/// A plugin recommending songs.
#[async_trait]
pub trait Suggester: Plugin {
    /// User-facing subject, e.g. a playlist name or "Based on last played song".
    fn subject(&self) -> String;

    /// IDs of the providers this suggester draws its songs from.
    fn provider_ids(&self) -> Vec<String>;

    /// The next song to play. Removes it from the upcoming suggestions.
    async fn suggest_next(&self) -> Result<Song>;

    /// Upcoming suggestions without removing them. At most `max` entries.
    async fn next_suggestions(&self, max: usize) -> Result<Vec<Song>>;

    /// Told about every song that has been played, suggested or not.
    async fn notify_played(&self, _song: &Song) {}

    /// Remove a song from the upcoming suggestions.
    async fn remove_suggestion(&self, _song: &Song) {}
}
