//! Initialization progress reporting.
//!
//! Plugins get an [`InitStateWriter`] while they initialize and use it to tell
//! the user what they are doing ("Logging in...", "Loading playlist...").
//! The host also reports failures through it.

use std::sync::Mutex;

/// Sink for human-readable initialization progress.
pub trait InitStateWriter: Send + Sync {
    /// Called by the host before a plugin starts initializing.
    fn begin(&self, plugin_name: &str);

    /// Report the current initialization step.
    fn state(&self, message: &str);

    /// Report a non-fatal problem or a failed initialization.
    fn warning(&self, message: &str);
}

/// Writer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullInitStateWriter;

impl InitStateWriter for NullInitStateWriter {
    fn begin(&self, _plugin_name: &str) {}

    fn state(&self, _message: &str) {}

    fn warning(&self, _message: &str) {}
}

/// One line recorded by a [`CollectingInitStateWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitMessage {
    Begin(String),
    State(String),
    Warning(String),
}

/// Writer that keeps every message in memory.
#[derive(Debug, Default)]
pub struct CollectingInitStateWriter {
    messages: Mutex<Vec<InitMessage>>,
}

impl CollectingInitStateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages written so far, oldest first.
    pub fn messages(&self) -> Vec<InitMessage> {
        self.lock().clone()
    }

    /// Only the warnings written so far.
    pub fn warnings(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|m| match m {
                InitMessage::Warning(w) => Some(w.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, message: InitMessage) {
        self.lock().push(message);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<InitMessage>> {
        // Pushes never leave the Vec half-written, so a poisoned lock is still usable.
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl InitStateWriter for CollectingInitStateWriter {
    fn begin(&self, plugin_name: &str) {
        self.push(InitMessage::Begin(plugin_name.to_string()));
    }

    fn state(&self, message: &str) {
        self.push(InitMessage::State(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.push(InitMessage::Warning(message.to_string()));
    }
}
