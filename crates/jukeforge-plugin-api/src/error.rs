//! Error types shared by plugins and their wrappers.

use thiserror::Error;

/// Errors raised by plugins or by the lifecycle around them.
#[derive(Error, Debug)]
pub enum PluginError {
    /// Plugin failed to initialize.
    #[error("Plugin initialization failed: {0}")]
    Initialization(String),

    /// Plugin is misconfigured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A lifecycle operation was requested in the wrong state.
    #[error("Invalid plugin state: {0}")]
    InvalidState(String),

    /// A song could not be built from the given fields.
    #[error("Invalid song: {0}")]
    InvalidSong(String),

    /// The provider has no song with the requested ID.
    #[error("Song not found: {0}")]
    SongNotFound(String),

    /// A playback factory the plugin depends on is not registered.
    #[error("Missing playback factory: {0}")]
    MissingPlaybackFactory(String),

    /// Playback could not be created or controlled.
    #[error("Playback error: {0}")]
    Playback(String),
}

/// Result type for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;
