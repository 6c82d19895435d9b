//! # jukeforge-plugin-api
//!
//! Plugin contracts for the jukeforge music bot.
//!
//! This crate defines what a plugin has to implement and how the host keeps
//! track of it:
//!
//! - [`Provider`] - a plugin supplying playable songs (Spotify, YouTube, local files, ...)
//! - [`Suggester`] - a plugin recommending songs drawn from one or more providers
//! - [`PlaybackFactory`] / [`Playback`] - media-specific playback objects
//! - [`ProviderWrapper`] / [`SuggesterWrapper`] - lifecycle tracking around a plugin
//! - [`InitStateWriter`] - progress sink used while plugins initialize
//! - [`PlayerStateListener`] - player state change notifications
//!
//! ## Lifecycle
//!
//! Every plugin moves through [`PluginState::Inactive`], [`PluginState::Config`]
//! and [`PluginState::Active`]. The state lives on the wrapper, never on the plugin
//! itself, so plugin implementations stay free of bookkeeping.

pub mod error;
pub mod init;
pub mod playback;
pub mod player;
pub mod plugin;
pub mod song;
pub mod state;
pub mod wrapper;

pub use error::{PluginError, Result};
pub use init::{CollectingInitStateWriter, InitMessage, InitStateWriter, NullInitStateWriter};
pub use playback::{
    Playback, PlaybackCompletion, PlaybackFactory, PlaybackFactoryManager, PlaybackState,
    PlaybackStateListener,
};
pub use player::{PlayerState, PlayerStateListener, PlayerStateListeners, WeakPlayerStateListener};
pub use plugin::{ConfigContext, Plugin, Provider, Suggester};
pub use song::{NamedPlugin, Song, SongBuilder, LOCAL_ALBUM_ART_PATH, REMOTE_ALBUM_ART_PATH};
pub use state::PluginState;
pub use wrapper::{
    DefaultProviderWrapper, DefaultSuggesterWrapper, PluginRef, PluginWrapper, ProviderRef,
    ProviderWrapper, ProviderWrapperFactory, SuggesterRef, SuggesterWrapper,
    SuggesterWrapperFactory, WrapperFactories,
};

/// Re-exports of the types most plugin crates need.
pub mod prelude {
    pub use crate::error::{PluginError, Result};
    pub use crate::init::InitStateWriter;
    pub use crate::playback::{Playback, PlaybackFactory, PlaybackFactoryManager, PlaybackState};
    pub use crate::player::{PlayerState, PlayerStateListener};
    pub use crate::plugin::{ConfigContext, Plugin, Provider, Suggester};
    pub use crate::song::{NamedPlugin, Song};
    pub use crate::state::PluginState;
}
