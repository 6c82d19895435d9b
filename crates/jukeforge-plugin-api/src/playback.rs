//! Playback contracts.
//!
//! A [`PlaybackFactory`] creates [`Playback`] objects for one kind of media.
//! Providers look up the factories they need in the [`PlaybackFactoryManager`]
//! they receive during configuration.

use crate::error::{PluginError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::debug;

/// Playback state reported by a playback outside of the player's control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// The playback is playing.
    Play,
    /// The playback is paused, but not stopped, finished, or broken.
    Pause,
    /// The playback won't be able to continue. The player moves on to the next song.
    Broken,
}

/// Feedback channel from a playback to the player.
///
/// May be called with an unchanged state. Not called for finished playbacks;
/// those resolve [`Playback::wait_for_finish`] instead.
pub type PlaybackStateListener = Arc<dyn Fn(PlaybackState) + Send + Sync>;

/// Playback for a single song. Must not start before [`play`](Playback::play)
/// is called the first time.
#[async_trait]
pub trait Playback: Send + Sync {
    /// Provide a listener for external pause/resume events.
    fn set_state_listener(&self, _listener: PlaybackStateListener) {}

    /// Start or resume. May be called while already playing.
    async fn play(&self) -> Result<()>;

    /// Pause. May be called while already paused.
    async fn pause(&self) -> Result<()>;

    /// Resolve once the song has finished or the playback was closed.
    async fn wait_for_finish(&self);

    /// Stop and release the playback.
    async fn close(&self) -> Result<()>;
}

/// Finish signal and listener slot most [`Playback`] implementations need.
///
/// Embed it in a playback and delegate `set_state_listener` and
/// `wait_for_finish` to it. `close` should end with [`mark_done`](Self::mark_done)
/// so waiters are released.
pub struct PlaybackCompletion {
    done: watch::Sender<bool>,
    listener: Mutex<Option<PlaybackStateListener>>,
}

impl PlaybackCompletion {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            done,
            listener: Mutex::new(None),
        }
    }

    /// Store the listener, replacing a previous one.
    pub fn set_listener(&self, listener: PlaybackStateListener) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(listener);
    }

    /// Report a state change to the listener, if there is one.
    pub fn notify(&self, state: PlaybackState) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(listener) = listener {
            listener(state);
        }
    }

    /// Release everyone waiting in [`wait_for_finish`](Self::wait_for_finish).
    pub fn mark_done(&self) {
        self.done.send_replace(true);
    }

    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// Resolve once [`mark_done`](Self::mark_done) was called.
    pub async fn wait_for_finish(&self) {
        let mut done = self.done.subscribe();
        // The sender lives in `self`, so the channel can't close while we wait.
        let _ = done.wait_for(|done| *done).await;
    }
}

impl Default for PlaybackCompletion {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates playbacks for one kind of media.
#[async_trait]
pub trait PlaybackFactory: Send + Sync {
    /// Unique identifier.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Create a playback for the resource at `location` (a path or URL).
    async fn create_playback(&self, location: &str) -> Result<Box<dyn Playback>>;
}

/// Collection of the available playback factories, keyed by ID.
#[derive(Default)]
pub struct PlaybackFactoryManager {
    factories: HashMap<String, Arc<dyn PlaybackFactory>>,
}

impl PlaybackFactoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. A factory with the same ID is replaced.
    pub fn register<F>(&mut self, factory: F)
    where
        F: PlaybackFactory + 'static,
    {
        let id = factory.id().to_string();
        debug!("Registering playback factory: {}", id);
        self.factories.insert(id, Arc::new(factory));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn PlaybackFactory>> {
        self.factories.get(id).cloned()
    }

    /// Get a factory a plugin cannot work without.
    pub fn require(&self, id: &str) -> Result<Arc<dyn PlaybackFactory>> {
        self.get(id)
            .ok_or_else(|| PluginError::MissingPlaybackFactory(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
