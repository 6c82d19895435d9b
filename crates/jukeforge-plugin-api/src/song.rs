//! Song metadata.

use crate::error::{PluginError, Result};
use crate::plugin::Provider;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// URL path under which the bot serves album art supplied by providers.
pub const LOCAL_ALBUM_ART_PATH: &str = "/image/local";

/// URL path under which the bot proxies remote album art.
pub const REMOTE_ALBUM_ART_PATH: &str = "/image/remote";

fn encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Static, serializable reference to a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedPlugin {
    /// The plugin ID.
    pub id: String,
    /// The plugin's user-facing subject.
    pub name: String,
}

impl NamedPlugin {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Describe a provider by its ID and current subject.
    pub fn of_provider(provider: &dyn Provider) -> Self {
        Self::new(provider.id(), provider.subject())
    }
}

/// Information about a song, usually created by a [`Provider`].
///
/// Two songs are equal if they have the same ID and come from the same provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    /// ID, unique within the provider.
    pub id: String,
    /// The provider this song originated from.
    pub provider: NamedPlugin,
    pub title: String,
    /// Further information, usually the artist.
    pub description: String,
    /// Duration in seconds.
    pub duration: Option<u32>,
    /// Path to the album art, relative to the bot's base URL.
    pub album_art_path: Option<String>,
}

impl Song {
    /// Start building a song for the given provider.
    pub fn builder(id: impl Into<String>, provider: &dyn Provider) -> SongBuilder {
        SongBuilder::new(id, NamedPlugin::of_provider(provider))
    }
}

impl PartialEq for Song {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.provider == other.provider
    }
}

impl Eq for Song {}

impl Hash for Song {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.provider.hash(state);
    }
}

/// Builder for [`Song`]. Title and description are required.
#[derive(Debug, Clone)]
pub struct SongBuilder {
    id: String,
    provider: NamedPlugin,
    title: Option<String>,
    description: Option<String>,
    duration: Option<u32>,
    album_art_path: Option<String>,
}

impl SongBuilder {
    pub fn new(id: impl Into<String>, provider: NamedPlugin) -> Self {
        Self {
            id: id.into(),
            provider,
            title: None,
            description: None,
            duration: None,
            album_art_path: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn duration(mut self, seconds: u32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn album_art_path(mut self, path: impl Into<String>) -> Self {
        self.album_art_path = Some(path.into());
        self
    }

    /// Serve the album art from the song's provider.
    ///
    /// The path is `/image/local/<base64 provider id>/<base64 song id>`.
    pub fn serve_local_image(mut self) -> Self {
        self.album_art_path = Some(format!(
            "{}/{}/{}",
            LOCAL_ALBUM_ART_PATH,
            encode(&self.provider.id),
            encode(&self.id)
        ));
        self
    }

    /// Serve the album art by loading the image at `url`.
    pub fn serve_remote_image(mut self, url: &str) -> Self {
        self.album_art_path = Some(format!("{}/{}", REMOTE_ALBUM_ART_PATH, encode(url)));
        self
    }

    pub fn build(self) -> Result<Song> {
        let title = self
            .title
            .ok_or_else(|| PluginError::InvalidSong(format!("{}: title not set", self.id)))?;
        let description = self
            .description
            .ok_or_else(|| PluginError::InvalidSong(format!("{}: description not set", self.id)))?;

        Ok(Song {
            id: self.id,
            provider: self.provider,
            title,
            description,
            duration: self.duration,
            album_art_path: self.album_art_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn provider() -> NamedPlugin {
        NamedPlugin::new("dummy", "Dummy Songs")
    }

    #[test]
    fn test_build_song() {
        let song = SongBuilder::new("song-1", provider())
            .title("Intro")
            .description("The Band")
            .duration(215)
            .build()
            .unwrap();

        assert_eq!(song.title, "Intro");
        assert_eq!(song.duration, Some(215));
        assert!(song.album_art_path.is_none());
    }

    #[test]
    fn test_serve_local_image() {
        let song = SongBuilder::new("song-1", provider())
            .title("Intro")
            .description("The Band")
            .serve_local_image()
            .build()
            .unwrap();

        assert_eq!(
            song.album_art_path.as_deref(),
            Some("/image/local/ZHVtbXk=/c29uZy0x")
        );
    }

    #[test]
    fn test_serve_remote_image() {
        let song = SongBuilder::new("song-1", provider())
            .title("Intro")
            .description("The Band")
            .serve_remote_image("https://example.com/a.png")
            .build()
            .unwrap();

        assert_eq!(
            song.album_art_path.as_deref(),
            Some("/image/remote/aHR0cHM6Ly9leGFtcGxlLmNvbS9hLnBuZw==")
        );
    }

    #[test]
    fn test_missing_title() {
        let err = SongBuilder::new("song-1", provider())
            .description("The Band")
            .build()
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidSong(_)));
    }

    #[test]
    fn test_missing_description() {
        let result = SongBuilder::new("song-1", provider()).title("Intro").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_equality_ignores_metadata() {
        let a = SongBuilder::new("song-1", provider())
            .title("Intro")
            .description("The Band")
            .build()
            .unwrap();
        let b = SongBuilder::new("song-1", provider())
            .title("Intro (Remastered)")
            .description("The Band")
            .duration(200)
            .build()
            .unwrap();
        let other_provider = SongBuilder::new("song-1", NamedPlugin::new("other", "Other"))
            .title("Intro")
            .description("The Band")
            .build()
            .unwrap();

        assert_eq!(a, b);
        assert_ne!(a, other_provider);

        let set: HashSet<Song> = [a, b, other_provider].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
