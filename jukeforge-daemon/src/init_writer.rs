//! Initialization progress written to the log.

use jukeforge_plugin_api::InitStateWriter;
use std::sync::Mutex;
use tracing::{info, warn};

/// [`InitStateWriter`] that turns progress messages into log lines, prefixed
/// with the plugin currently initializing.
#[derive(Debug, Default)]
pub struct TracingInitStateWriter {
    current: Mutex<Option<String>>,
}

impl TracingInitStateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn prefix(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| "jukeforge".to_string())
    }
}

impl InitStateWriter for TracingInitStateWriter {
    fn begin(&self, plugin_name: &str) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(plugin_name.to_string());
        info!("Initializing {}", plugin_name);
    }

    fn state(&self, message: &str) {
        info!("[{}] {}", self.prefix(), message);
    }

    fn warning(&self, message: &str) {
        warn!("[{}] {}", self.prefix(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_follows_begin() {
        let writer = TracingInitStateWriter::new();
        assert_eq!(writer.prefix(), "jukeforge");

        writer.begin("Dummy");
        writer.state("Loading");
        assert_eq!(writer.prefix(), "Dummy");
    }
}
