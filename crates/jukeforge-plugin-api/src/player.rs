//! Player state notifications.

use crate::song::Song;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

/// State of the music player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlayerState {
    Play { song: Song },
    Pause { song: Song },
    Stop,
    Error,
}

impl PlayerState {
    /// The current song, if any.
    pub fn song(&self) -> Option<&Song> {
        match self {
            PlayerState::Play { song } | PlayerState::Pause { song } => Some(song),
            PlayerState::Stop | PlayerState::Error => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlayerState::Play { .. })
    }
}

/// Receives player state changes.
pub trait PlayerStateListener: Send + Sync {
    fn on_changed(&self, state: &PlayerState);
}

impl<F> PlayerStateListener for F
where
    F: Fn(&PlayerState) + Send + Sync,
{
    fn on_changed(&self, state: &PlayerState) {
        self(state)
    }
}

/// Forwards state changes to a listener without keeping it alive.
///
/// Events are passed on unchanged and synchronously while the target exists,
/// and silently dropped afterwards. A panic in the target propagates to the
/// caller of [`on_changed`](PlayerStateListener::on_changed).
#[derive(Clone)]
pub struct WeakPlayerStateListener {
    listener: Weak<dyn PlayerStateListener>,
}

impl WeakPlayerStateListener {
    pub fn new(listener: &Arc<dyn PlayerStateListener>) -> Self {
        Self {
            listener: Arc::downgrade(listener),
        }
    }

    /// Whether the target listener still exists.
    pub fn is_alive(&self) -> bool {
        self.listener.strong_count() > 0
    }
}

impl PlayerStateListener for WeakPlayerStateListener {
    fn on_changed(&self, state: &PlayerState) {
        if let Some(listener) = self.listener.upgrade() {
            listener.on_changed(state);
        }
    }
}

impl std::fmt::Debug for WeakPlayerStateListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakPlayerStateListener")
            .field("alive", &self.is_alive())
            .finish()
    }
}

enum Registration {
    Owned(Box<dyn PlayerStateListener>),
    Weak(WeakPlayerStateListener),
}

/// The listeners a player publishes its state changes to.
#[derive(Default)]
pub struct PlayerStateListeners {
    listeners: Vec<Registration>,
}

impl PlayerStateListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener owned by this list.
    pub fn add<L>(&mut self, listener: L)
    where
        L: PlayerStateListener + 'static,
    {
        self.listeners.push(Registration::Owned(Box::new(listener)));
    }

    /// Add a listener the caller keeps ownership of.
    pub fn add_weak(&mut self, listener: &Arc<dyn PlayerStateListener>) {
        self.listeners
            .push(Registration::Weak(WeakPlayerStateListener::new(listener)));
    }

    /// Forward a state change to every listener, in registration order.
    pub fn notify(&self, state: &PlayerState) {
        for registration in &self.listeners {
            match registration {
                Registration::Owned(listener) => listener.on_changed(state),
                Registration::Weak(listener) => listener.on_changed(state),
            }
        }
    }

    /// Drop weak listeners whose target is gone. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|r| match r {
            Registration::Owned(_) => true,
            Registration::Weak(listener) => listener.is_alive(),
        });
        before - self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{NamedPlugin, SongBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn song() -> Song {
        SongBuilder::new("song-1", NamedPlugin::new("dummy", "Dummy"))
            .title("Intro")
            .description("The Band")
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<PlayerState>>,
    }

    impl PlayerStateListener for Recorder {
        fn on_changed(&self, state: &PlayerState) {
            self.seen.lock().unwrap().push(state.clone());
        }
    }

    #[test]
    fn test_weak_listener_forwards_unchanged() {
        let recorder = Arc::new(Recorder::default());
        let target: Arc<dyn PlayerStateListener> = recorder.clone();
        let weak = WeakPlayerStateListener::new(&target);

        let state = PlayerState::Play { song: song() };
        weak.on_changed(&state);
        weak.on_changed(&PlayerState::Stop);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(*seen, vec![state, PlayerState::Stop]);
    }

    #[test]
    fn test_weak_listener_does_not_keep_target_alive() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let target: Arc<dyn PlayerStateListener> = Arc::new(move |_: &PlayerState| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let weak = WeakPlayerStateListener::new(&target);
        weak.on_changed(&PlayerState::Stop);
        assert!(weak.is_alive());

        drop(target);
        assert!(!weak.is_alive());
        weak.on_changed(&PlayerState::Stop);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_list_notifies_and_prunes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut listeners = PlayerStateListeners::new();

        let owned_counter = Arc::clone(&calls);
        listeners.add(move |_: &PlayerState| {
            owned_counter.fetch_add(1, Ordering::SeqCst);
        });

        let weak_counter = Arc::clone(&calls);
        let target: Arc<dyn PlayerStateListener> = Arc::new(move |_: &PlayerState| {
            weak_counter.fetch_add(10, Ordering::SeqCst);
        });
        listeners.add_weak(&target);
        assert_eq!(listeners.len(), 2);

        listeners.notify(&PlayerState::Pause { song: song() });
        assert_eq!(calls.load(Ordering::SeqCst), 11);

        drop(target);
        assert_eq!(listeners.prune(), 1);
        assert_eq!(listeners.len(), 1);

        listeners.notify(&PlayerState::Error);
        assert_eq!(calls.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_state_song() {
        assert_eq!(PlayerState::Play { song: song() }.song(), Some(&song()));
        assert!(PlayerState::Stop.song().is_none());
        assert!(!PlayerState::Error.is_playing());
    }
}
