//! # provider-dummy
//!
//! Dummy plugins for testing and development.
//!
//! Everything here works on a small static catalog and never touches the network:
//!
//! - [`DummyProvider`] searches and looks up songs from the catalog
//! - [`DummySuggester`] cycles through the catalog of a dummy provider
//! - [`DummyPlaybackFactory`] creates playbacks that only pretend to play

use async_trait::async_trait;
use jukeforge_plugin_api::prelude::*;
use jukeforge_plugin_api::{PlaybackCompletion, PlaybackStateListener, SongBuilder};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

/// ID of the playback factory dummy providers use unless configured otherwise.
pub const DUMMY_PLAYBACK_FACTORY: &str = "dummy-playback";

/// Static catalog: (id, title, artist, duration in seconds).
const CATALOG: &[(&str, &str, &str, u32)] = &[
    ("song-1", "Welcome to Jukeforge", "The Test Suite", 183),
    ("song-2", "Static Fixtures", "Mock Orchestra", 241),
    ("song-3", "Offline Blues", "The Test Suite", 197),
    ("song-4", "Null Pointer Waltz", "Mock Orchestra", 322),
    ("song-5", "Green Build", "Continuous Integration", 156),
];

fn catalog_song(provider: &NamedPlugin, entry: &(&str, &str, &str, u32)) -> Result<Song> {
    let (id, title, artist, duration) = *entry;
    SongBuilder::new(id, provider.clone())
        .title(title)
        .description(artist)
        .duration(duration)
        .serve_local_image()
        .build()
}

fn catalog_songs(provider: &NamedPlugin) -> Result<Vec<Song>> {
    CATALOG.iter().map(|e| catalog_song(provider, e)).collect()
}

// ============================================================================
// Provider
// ============================================================================

/// A provider serving the static catalog.
///
/// Settings:
/// - `playback_factory`: ID of the playback factory to use (default: `dummy-playback`)
pub struct DummyProvider {
    id: String,
    fail_init: bool,
    playback: RwLock<Option<Arc<dyn PlaybackFactory>>>,
}

impl DummyProvider {
    /// Create a new dummy provider with the ID `dummy`.
    pub fn new() -> Self {
        Self::with_id("dummy")
    }

    /// Create a dummy provider with a custom ID.
    pub fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            fail_init: false,
            playback: RwLock::new(None),
        }
    }

    /// Create a dummy provider whose initialization always fails.
    pub fn failing(id: &str) -> Self {
        Self {
            fail_init: true,
            ..Self::with_id(id)
        }
    }

    fn named(&self) -> NamedPlugin {
        NamedPlugin::new(&self.id, self.subject())
    }

    /// Create a playback for a song of this provider.
    pub async fn playback(&self, song: &Song) -> Result<Box<dyn Playback>> {
        let factory = self
            .playback
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| PluginError::InvalidState(format!("{} is not configured", self.id)))?;

        factory.create_playback(&format!("dummy://{}", song.id)).await
    }
}

impl Default for DummyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for DummyProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Dummy"
    }

    fn description(&self) -> &str {
        "Serves a small static catalog of fake songs"
    }

    fn configure(&self, context: &ConfigContext) -> Result<()> {
        let factory_id = context
            .setting::<String>("playback_factory")?
            .unwrap_or_else(|| DUMMY_PLAYBACK_FACTORY.to_string());
        let factory = context.playback_factories.require(&factory_id)?;

        *self.playback.write().unwrap_or_else(|e| e.into_inner()) = Some(factory);
        Ok(())
    }

    async fn initialize(&self, writer: &dyn InitStateWriter) -> Result<()> {
        writer.state("Loading dummy catalog");
        if self.fail_init {
            return Err(PluginError::Initialization(format!(
                "{} is configured to fail",
                self.id
            )));
        }
        debug!("{} serving {} songs", self.id, CATALOG.len());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.playback.write().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}

#[async_trait]
impl Provider for DummyProvider {
    fn subject(&self) -> String {
        "Dummy Songs".to_string()
    }

    async fn search(&self, query: &str, offset: usize) -> Result<Vec<Song>> {
        let query = query.to_lowercase();
        let named = self.named();

        CATALOG
            .iter()
            .filter(|(_, title, artist, _)| {
                title.to_lowercase().contains(&query) || artist.to_lowercase().contains(&query)
            })
            .skip(offset)
            .map(|e| catalog_song(&named, e))
            .collect()
    }

    async fn lookup(&self, song_id: &str) -> Result<Song> {
        let entry = CATALOG
            .iter()
            .find(|(id, ..)| *id == song_id)
            .ok_or_else(|| PluginError::SongNotFound(song_id.to_string()))?;
        catalog_song(&self.named(), entry)
    }
}

// ============================================================================
// Suggester
// ============================================================================

/// A suggester cycling through the catalog of one dummy provider.
pub struct DummySuggester {
    id: String,
    provider: NamedPlugin,
    queue: Mutex<VecDeque<Song>>,
}

impl DummySuggester {
    /// Create a suggester for the provider with the given ID.
    pub fn new(provider_id: &str) -> Self {
        Self {
            id: format!("{provider_id}-suggester"),
            provider: NamedPlugin::new(provider_id, "Dummy Songs"),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Song>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn refill(&self, queue: &mut VecDeque<Song>) -> Result<()> {
        if queue.is_empty() {
            queue.extend(catalog_songs(&self.provider)?);
        }
        Ok(())
    }
}

#[async_trait]
impl Plugin for DummySuggester {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Dummy Rotation"
    }

    async fn initialize(&self, writer: &dyn InitStateWriter) -> Result<()> {
        writer.state("Filling suggestion queue");
        let mut queue = self.queue();
        self.refill(&mut queue)
    }

    async fn close(&self) -> Result<()> {
        self.queue().clear();
        Ok(())
    }
}

#[async_trait]
impl Suggester for DummySuggester {
    fn subject(&self) -> String {
        format!("Rotation of {}", self.provider.name)
    }

    fn provider_ids(&self) -> Vec<String> {
        vec![self.provider.id.clone()]
    }

    async fn suggest_next(&self) -> Result<Song> {
        let mut queue = self.queue();
        self.refill(&mut queue)?;
        queue
            .pop_front()
            .ok_or_else(|| PluginError::SongNotFound("suggestion queue is empty".to_string()))
    }

    async fn next_suggestions(&self, max: usize) -> Result<Vec<Song>> {
        let mut queue = self.queue();
        self.refill(&mut queue)?;
        Ok(queue.iter().take(max).cloned().collect())
    }

    async fn notify_played(&self, song: &Song) {
        self.queue().retain(|s| s != song);
    }

    async fn remove_suggestion(&self, song: &Song) {
        self.queue().retain(|s| s != song);
    }
}

// ============================================================================
// Playback
// ============================================================================

/// Creates [`DummyPlayback`]s.
pub struct DummyPlaybackFactory;

#[async_trait]
impl PlaybackFactory for DummyPlaybackFactory {
    fn id(&self) -> &str {
        DUMMY_PLAYBACK_FACTORY
    }

    fn name(&self) -> &str {
        "Dummy Playback"
    }

    async fn create_playback(&self, location: &str) -> Result<Box<dyn Playback>> {
        if !location.starts_with("dummy://") {
            return Err(PluginError::Playback(format!("unsupported location: {location}")));
        }
        Ok(Box::new(DummyPlayback::new()))
    }
}

/// A playback that only tracks whether it is playing.
pub struct DummyPlayback {
    playing: Mutex<bool>,
    completion: PlaybackCompletion,
}

impl DummyPlayback {
    pub fn new() -> Self {
        Self {
            playing: Mutex::new(false),
            completion: PlaybackCompletion::new(),
        }
    }

    pub fn is_playing(&self) -> bool {
        *self.playing.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulate the song ending on its own.
    pub fn finish(&self) {
        self.completion.mark_done();
    }

    /// Simulate an external pause, e.g. from a hardware media key.
    pub fn external_pause(&self) {
        *self.playing.lock().unwrap_or_else(|e| e.into_inner()) = false;
        self.completion.notify(PlaybackState::Pause);
    }

    fn set_playing(&self, playing: bool) -> Result<()> {
        if self.completion.is_done() {
            return Err(PluginError::Playback("playback already finished".to_string()));
        }
        *self.playing.lock().unwrap_or_else(|e| e.into_inner()) = playing;
        Ok(())
    }
}

impl Default for DummyPlayback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Playback for DummyPlayback {
    fn set_state_listener(&self, listener: PlaybackStateListener) {
        self.completion.set_listener(listener);
    }

    async fn play(&self) -> Result<()> {
        self.set_playing(true)
    }

    async fn pause(&self) -> Result<()> {
        self.set_playing(false)
    }

    async fn wait_for_finish(&self) {
        self.completion.wait_for_finish().await;
    }

    async fn close(&self) -> Result<()> {
        *self.playing.lock().unwrap_or_else(|e| e.into_inner()) = false;
        self.completion.mark_done();
        Ok(())
    }
}
