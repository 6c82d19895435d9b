//! Lifecycle wrappers around plugins.
//!
//! The host never talks to a plugin directly. Every plugin is wrapped once,
//! when it is registered, and the wrapper tracks its [`PluginState`]. A wrapper
//! is itself a [`Provider`] or [`Suggester`], so it can be handed to any code
//! that expects the plain plugin.
//!
//! Alternative wrapper implementations are plugged in through
//! [`WrapperFactories`], which the host receives at construction time.

use crate::error::{PluginError, Result};
use crate::init::InitStateWriter;
use crate::plugin::{ConfigContext, Plugin, Provider, Suggester};
use crate::song::Song;
use crate::state::PluginState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Lifecycle bookkeeping shared by all wrappers.
pub trait PluginWrapper: Plugin {
    /// Current lifecycle state.
    fn state(&self) -> PluginState;

    fn is_active(&self) -> bool {
        self.state() == PluginState::Active
    }

    /// Message of the last failed lifecycle operation. Cleared by a successful one.
    fn last_error(&self) -> Option<String>;

    /// When the state last changed.
    fn last_transition(&self) -> Option<DateTime<Utc>>;

    /// Record a failure the host detected outside the plugin's own calls,
    /// e.g. an initialization that timed out. The state is left unchanged.
    fn record_failure(&self, reason: &str);
}

/// A wrapper around exactly one [`Provider`].
pub trait ProviderWrapper: PluginWrapper + Provider {
    /// The wrapped provider.
    fn provider(&self) -> &Arc<dyn Provider>;
}

/// A wrapper around exactly one [`Suggester`].
pub trait SuggesterWrapper: PluginWrapper + Suggester {
    /// The wrapped suggester.
    fn suggester(&self) -> &Arc<dyn Suggester>;
}

/// Either a plain plugin or a plugin that is already wrapped.
pub enum PluginRef<P: ?Sized, W: ?Sized> {
    Plugin(Arc<P>),
    Wrapper(Arc<W>),
}

pub type ProviderRef = PluginRef<dyn Provider, dyn ProviderWrapper>;
pub type SuggesterRef = PluginRef<dyn Suggester, dyn SuggesterWrapper>;

impl<P, W> PluginRef<P, W>
where
    P: Plugin + ?Sized,
    W: Plugin + ?Sized,
{
    /// ID of the referenced plugin.
    pub fn id(&self) -> &str {
        match self {
            PluginRef::Plugin(plugin) => plugin.id(),
            PluginRef::Wrapper(wrapper) => wrapper.id(),
        }
    }

    pub fn is_wrapper(&self) -> bool {
        matches!(self, PluginRef::Wrapper(_))
    }
}

impl<P: ?Sized, W: ?Sized> Clone for PluginRef<P, W> {
    fn clone(&self) -> Self {
        match self {
            PluginRef::Plugin(plugin) => PluginRef::Plugin(Arc::clone(plugin)),
            PluginRef::Wrapper(wrapper) => PluginRef::Wrapper(Arc::clone(wrapper)),
        }
    }
}

impl ProviderRef {
    /// Reference a provider that isn't wrapped yet.
    pub fn raw<T: Provider + 'static>(provider: T) -> Self {
        PluginRef::Plugin(Arc::new(provider))
    }
}

impl SuggesterRef {
    /// Reference a suggester that isn't wrapped yet.
    pub fn raw<T: Suggester + 'static>(suggester: T) -> Self {
        PluginRef::Plugin(Arc::new(suggester))
    }
}

impl From<Arc<dyn Provider>> for ProviderRef {
    fn from(provider: Arc<dyn Provider>) -> Self {
        PluginRef::Plugin(provider)
    }
}

impl From<Arc<dyn ProviderWrapper>> for ProviderRef {
    fn from(wrapper: Arc<dyn ProviderWrapper>) -> Self {
        PluginRef::Wrapper(wrapper)
    }
}

impl From<Arc<dyn Suggester>> for SuggesterRef {
    fn from(suggester: Arc<dyn Suggester>) -> Self {
        PluginRef::Plugin(suggester)
    }
}

impl From<Arc<dyn SuggesterWrapper>> for SuggesterRef {
    fn from(wrapper: Arc<dyn SuggesterWrapper>) -> Self {
        PluginRef::Wrapper(wrapper)
    }
}

// ============================================================================
// Factories
// ============================================================================

/// Turns a provider into its wrapper.
pub trait ProviderWrapperFactory: Send + Sync {
    fn wrap(&self, provider: Arc<dyn Provider>) -> Arc<dyn ProviderWrapper>;
}

impl<F> ProviderWrapperFactory for F
where
    F: Fn(Arc<dyn Provider>) -> Arc<dyn ProviderWrapper> + Send + Sync,
{
    fn wrap(&self, provider: Arc<dyn Provider>) -> Arc<dyn ProviderWrapper> {
        self(provider)
    }
}

/// Turns a suggester into its wrapper.
pub trait SuggesterWrapperFactory: Send + Sync {
    fn wrap(&self, suggester: Arc<dyn Suggester>) -> Arc<dyn SuggesterWrapper>;
}

impl<F> SuggesterWrapperFactory for F
where
    F: Fn(Arc<dyn Suggester>) -> Arc<dyn SuggesterWrapper> + Send + Sync,
{
    fn wrap(&self, suggester: Arc<dyn Suggester>) -> Arc<dyn SuggesterWrapper> {
        self(suggester)
    }
}

fn default_provider_wrapper(provider: Arc<dyn Provider>) -> Arc<dyn ProviderWrapper> {
    Arc::new(DefaultProviderWrapper::new(provider))
}

fn default_suggester_wrapper(suggester: Arc<dyn Suggester>) -> Arc<dyn SuggesterWrapper> {
    Arc::new(DefaultSuggesterWrapper::new(suggester))
}

/// The factories a host uses to wrap newly registered plugins.
#[derive(Clone)]
pub struct WrapperFactories {
    provider: Arc<dyn ProviderWrapperFactory>,
    suggester: Arc<dyn SuggesterWrapperFactory>,
}

impl WrapperFactories {
    /// Replace the provider wrapper factory.
    pub fn with_provider_factory<F>(mut self, factory: F) -> Self
    where
        F: ProviderWrapperFactory + 'static,
    {
        self.provider = Arc::new(factory);
        self
    }

    /// Replace the suggester wrapper factory.
    pub fn with_suggester_factory<F>(mut self, factory: F) -> Self
    where
        F: SuggesterWrapperFactory + 'static,
    {
        self.suggester = Arc::new(factory);
        self
    }

    /// Resolve a provider reference to a wrapper. Wrappers pass through unchanged.
    pub fn wrap_provider(&self, provider: ProviderRef) -> Arc<dyn ProviderWrapper> {
        match provider {
            PluginRef::Wrapper(wrapper) => wrapper,
            PluginRef::Plugin(plugin) => self.provider.wrap(plugin),
        }
    }

    /// Resolve a suggester reference to a wrapper. Wrappers pass through unchanged.
    pub fn wrap_suggester(&self, suggester: SuggesterRef) -> Arc<dyn SuggesterWrapper> {
        match suggester {
            PluginRef::Wrapper(wrapper) => wrapper,
            PluginRef::Plugin(plugin) => self.suggester.wrap(plugin),
        }
    }
}

impl Default for WrapperFactories {
    fn default() -> Self {
        Self {
            provider: Arc::new(default_provider_wrapper),
            suggester: Arc::new(default_suggester_wrapper),
        }
    }
}

// ============================================================================
// Default wrappers
// ============================================================================

#[derive(Debug, Default)]
struct LifecycleState {
    state: PluginState,
    last_error: Option<String>,
    changed_at: Option<DateTime<Utc>>,
    /// `initialize` was entered and `close` hasn't run since. Set even when
    /// the attempt failed or was cancelled half-way.
    needs_close: bool,
}

/// State machine driving one plugin through its lifecycle.
struct Lifecycle<P: ?Sized> {
    plugin: Arc<P>,
    inner: RwLock<LifecycleState>,
}

impl<P: Plugin + ?Sized> Lifecycle<P> {
    fn new(plugin: Arc<P>) -> Self {
        Self {
            plugin,
            inner: RwLock::new(LifecycleState::default()),
        }
    }

    // State updates are single assignments, so a poisoned lock holds consistent data.
    fn read(&self) -> RwLockReadGuard<'_, LifecycleState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LifecycleState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn state(&self) -> PluginState {
        self.read().state
    }

    fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    fn last_transition(&self) -> Option<DateTime<Utc>> {
        self.read().changed_at
    }

    fn transition(&self, to: PluginState) {
        let mut inner = self.write();
        debug!("Plugin {}: {} -> {}", self.plugin.id(), inner.state, to);
        inner.state = to;
        inner.last_error = None;
        inner.changed_at = Some(Utc::now());
    }

    fn record_error(&self, error: &PluginError) {
        self.record_failure(&error.to_string());
    }

    fn record_failure(&self, reason: &str) {
        self.write().last_error = Some(reason.to_string());
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state() {
            PluginState::Active => Ok(()),
            other => Err(PluginError::InvalidState(format!(
                "{} is {}, not active",
                self.plugin.id(),
                other
            ))),
        }
    }

    fn configure(&self, context: &ConfigContext) -> Result<()> {
        let current = self.state();
        if current == PluginState::Active {
            return Err(PluginError::InvalidState(format!(
                "{} is active and can't be reconfigured",
                self.plugin.id()
            )));
        }

        match self.plugin.configure(context) {
            Ok(()) => {
                self.transition(PluginState::Config);
                Ok(())
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    async fn initialize(&self, writer: &dyn InitStateWriter) -> Result<()> {
        let current = self.state();
        if current != PluginState::Config {
            return Err(PluginError::InvalidState(format!(
                "{} is {}, only configured plugins can be initialized",
                self.plugin.id(),
                current
            )));
        }

        let retry = std::mem::replace(&mut self.write().needs_close, true);
        if retry {
            debug!("Releasing {} before retrying initialization", self.plugin.id());
            if let Err(e) = self.plugin.close().await {
                warn!("Error releasing {}: {}", self.plugin.id(), e);
            }
        }

        match self.plugin.initialize(writer).await {
            Ok(()) => {
                self.transition(PluginState::Active);
                Ok(())
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    async fn close(&self) -> Result<()> {
        if !self.read().needs_close {
            return Ok(());
        }

        let result = self.plugin.close().await;
        self.write().needs_close = false;
        if self.state() == PluginState::Active {
            self.transition(PluginState::Config);
        }
        if let Err(e) = &result {
            self.record_error(e);
        }
        result
    }
}

/// Default [`ProviderWrapper`].
///
/// Search and lookup fail with [`PluginError::InvalidState`] unless the
/// provider is active. Closing releases the provider whenever `initialize`
/// was entered, including attempts that failed or were cancelled.
pub struct DefaultProviderWrapper {
    provider: Arc<dyn Provider>,
    lifecycle: Lifecycle<dyn Provider>,
}

impl DefaultProviderWrapper {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            lifecycle: Lifecycle::new(Arc::clone(&provider)),
            provider,
        }
    }
}

#[async_trait]
impl Plugin for DefaultProviderWrapper {
    fn id(&self) -> &str {
        self.provider.id()
    }

    fn name(&self) -> &str {
        self.provider.name()
    }

    fn description(&self) -> &str {
        self.provider.description()
    }

    fn configure(&self, context: &ConfigContext) -> Result<()> {
        self.lifecycle.configure(context)
    }

    async fn initialize(&self, writer: &dyn InitStateWriter) -> Result<()> {
        self.lifecycle.initialize(writer).await
    }

    async fn close(&self) -> Result<()> {
        self.lifecycle.close().await
    }
}

#[async_trait]
impl Provider for DefaultProviderWrapper {
    fn subject(&self) -> String {
        self.provider.subject()
    }

    async fn search(&self, query: &str, offset: usize) -> Result<Vec<Song>> {
        self.lifecycle.ensure_active()?;
        self.provider.search(query, offset).await
    }

    async fn lookup(&self, song_id: &str) -> Result<Song> {
        self.lifecycle.ensure_active()?;
        self.provider.lookup(song_id).await
    }
}

impl PluginWrapper for DefaultProviderWrapper {
    fn state(&self) -> PluginState {
        self.lifecycle.state()
    }

    fn last_error(&self) -> Option<String> {
        self.lifecycle.last_error()
    }

    fn last_transition(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.last_transition()
    }

    fn record_failure(&self, reason: &str) {
        self.lifecycle.record_failure(reason);
    }
}

impl ProviderWrapper for DefaultProviderWrapper {
    fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
}

/// Default [`SuggesterWrapper`].
///
/// Suggestions fail with [`PluginError::InvalidState`] unless the suggester is
/// active; notifications to an inactive suggester are dropped.
pub struct DefaultSuggesterWrapper {
    suggester: Arc<dyn Suggester>,
    lifecycle: Lifecycle<dyn Suggester>,
}

impl DefaultSuggesterWrapper {
    pub fn new(suggester: Arc<dyn Suggester>) -> Self {
        Self {
            lifecycle: Lifecycle::new(Arc::clone(&suggester)),
            suggester,
        }
    }
}

#[async_trait]
impl Plugin for DefaultSuggesterWrapper {
    fn id(&self) -> &str {
        self.suggester.id()
    }

    fn name(&self) -> &str {
        self.suggester.name()
    }

    fn description(&self) -> &str {
        self.suggester.description()
    }

    fn configure(&self, context: &ConfigContext) -> Result<()> {
        self.lifecycle.configure(context)
    }

    async fn initialize(&self, writer: &dyn InitStateWriter) -> Result<()> {
        self.lifecycle.initialize(writer).await
    }

    async fn close(&self) -> Result<()> {
        self.lifecycle.close().await
    }
}

#[async_trait]
impl Suggester for DefaultSuggesterWrapper {
    fn subject(&self) -> String {
        self.suggester.subject()
    }

    fn provider_ids(&self) -> Vec<String> {
        self.suggester.provider_ids()
    }

    async fn suggest_next(&self) -> Result<Song> {
        self.lifecycle.ensure_active()?;
        self.suggester.suggest_next().await
    }

    async fn next_suggestions(&self, max: usize) -> Result<Vec<Song>> {
        self.lifecycle.ensure_active()?;
        self.suggester.next_suggestions(max).await
    }

    async fn notify_played(&self, song: &Song) {
        if self.lifecycle.ensure_active().is_ok() {
            self.suggester.notify_played(song).await;
        }
    }

    async fn remove_suggestion(&self, song: &Song) {
        if self.lifecycle.ensure_active().is_ok() {
            self.suggester.remove_suggestion(song).await;
        }
    }
}

impl PluginWrapper for DefaultSuggesterWrapper {
    fn state(&self) -> PluginState {
        self.lifecycle.state()
    }

    fn last_error(&self) -> Option<String> {
        self.lifecycle.last_error()
    }

    fn last_transition(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.last_transition()
    }

    fn record_failure(&self, reason: &str) {
        self.lifecycle.record_failure(reason);
    }
}

impl SuggesterWrapper for DefaultSuggesterWrapper {
    fn suggester(&self) -> &Arc<dyn Suggester> {
        &self.suggester
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::{CollectingInitStateWriter, NullInitStateWriter};
    use crate::playback::PlaybackFactoryManager;
    use crate::song::{NamedPlugin, SongBuilder};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    // Mock provider for testing
    struct MockProvider {
        id: String,
        fail_init: AtomicBool,
        fail_close: AtomicBool,
        closed: AtomicUsize,
    }

    impl MockProvider {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                fail_init: AtomicBool::new(false),
                fail_close: AtomicBool::new(false),
                closed: AtomicUsize::new(0),
            }
        }

        fn failing(id: &str) -> Self {
            let provider = Self::new(id);
            provider.fail_init.store(true, Ordering::SeqCst);
            provider
        }
    }

    #[async_trait]
    impl Plugin for MockProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            "Mock Provider"
        }

        fn configure(&self, context: &ConfigContext) -> Result<()> {
            if context.setting::<bool>("broken")?.unwrap_or(false) {
                return Err(PluginError::Configuration("broken on purpose".to_string()));
            }
            Ok(())
        }

        async fn initialize(&self, writer: &dyn InitStateWriter) -> Result<()> {
            writer.state("Connecting");
            if self.fail_init.load(Ordering::SeqCst) {
                return Err(PluginError::Initialization("no connection".to_string()));
            }
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            if self.fail_close.load(Ordering::SeqCst) {
                return Err(PluginError::Playback("device busy".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn subject(&self) -> String {
            "Mock".to_string()
        }

        async fn search(&self, query: &str, _offset: usize) -> Result<Vec<Song>> {
            Ok(vec![SongBuilder::new(query, NamedPlugin::new(&self.id, "Mock"))
                .title(query)
                .description("Mock Artist")
                .build()?])
        }

        async fn lookup(&self, song_id: &str) -> Result<Song> {
            Err(PluginError::SongNotFound(song_id.to_string()))
        }
    }

    struct MockSuggester;

    #[async_trait]
    impl Plugin for MockSuggester {
        fn id(&self) -> &str {
            "mock-suggester"
        }

        fn name(&self) -> &str {
            "Mock Suggester"
        }

        async fn initialize(&self, _writer: &dyn InitStateWriter) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Suggester for MockSuggester {
        fn subject(&self) -> String {
            "Random".to_string()
        }

        fn provider_ids(&self) -> Vec<String> {
            vec!["mock".to_string()]
        }

        async fn suggest_next(&self) -> Result<Song> {
            SongBuilder::new("next", NamedPlugin::new("mock", "Mock"))
                .title("Next")
                .description("Mock Artist")
                .build()
        }

        async fn next_suggestions(&self, _max: usize) -> Result<Vec<Song>> {
            Ok(vec![])
        }
    }

    fn context(settings: serde_json::Value) -> ConfigContext {
        ConfigContext::new(settings, Arc::new(PlaybackFactoryManager::new()))
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let provider = Arc::new(MockProvider::new("mock"));
        let wrapper = DefaultProviderWrapper::new(provider.clone());
        assert_eq!(wrapper.state(), PluginState::Inactive);
        assert!(wrapper.last_transition().is_none());

        wrapper.configure(&context(serde_json::json!({}))).unwrap();
        assert_eq!(wrapper.state(), PluginState::Config);

        let writer = CollectingInitStateWriter::new();
        wrapper.initialize(&writer).await.unwrap();
        assert!(wrapper.is_active());
        assert!(wrapper.last_transition().is_some());
        assert_eq!(writer.messages().len(), 1);

        wrapper.close().await.unwrap();
        assert_eq!(wrapper.state(), PluginState::Config);
        assert_eq!(provider.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialize_requires_config() {
        let wrapper = DefaultProviderWrapper::new(Arc::new(MockProvider::new("mock")));
        let err = wrapper.initialize(&NullInitStateWriter).await.unwrap_err();
        assert!(matches!(err, PluginError::InvalidState(_)));
        assert_eq!(wrapper.state(), PluginState::Inactive);
    }

    #[tokio::test]
    async fn test_failed_initialize_stays_config() {
        let wrapper = DefaultProviderWrapper::new(Arc::new(MockProvider::failing("mock")));
        wrapper.configure(&context(serde_json::json!({}))).unwrap();

        assert!(wrapper.initialize(&NullInitStateWriter).await.is_err());
        assert_eq!(wrapper.state(), PluginState::Config);
        assert!(wrapper.last_error().unwrap().contains("no connection"));
    }

    #[tokio::test]
    async fn test_failed_initialize_is_released_on_close() {
        let provider = Arc::new(MockProvider::failing("mock"));
        let wrapper = DefaultProviderWrapper::new(provider.clone());
        wrapper.configure(&context(serde_json::json!({}))).unwrap();
        assert!(wrapper.initialize(&NullInitStateWriter).await.is_err());

        wrapper.close().await.unwrap();
        assert_eq!(provider.closed.load(Ordering::SeqCst), 1);
        assert_eq!(wrapper.state(), PluginState::Config);

        // Nothing left to release
        wrapper.close().await.unwrap();
        assert_eq!(provider.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_releases_previous_attempt() {
        let provider = Arc::new(MockProvider::failing("mock"));
        let wrapper = DefaultProviderWrapper::new(provider.clone());
        wrapper.configure(&context(serde_json::json!({}))).unwrap();
        assert!(wrapper.initialize(&NullInitStateWriter).await.is_err());
        assert_eq!(provider.closed.load(Ordering::SeqCst), 0);

        provider.fail_init.store(false, Ordering::SeqCst);
        wrapper.initialize(&NullInitStateWriter).await.unwrap();
        assert_eq!(provider.closed.load(Ordering::SeqCst), 1);
        assert!(wrapper.is_active());
        assert!(wrapper.last_error().is_none());
    }

    #[tokio::test]
    async fn test_failing_close_still_moves_to_config() {
        let provider = Arc::new(MockProvider::new("mock"));
        provider.fail_close.store(true, Ordering::SeqCst);
        let wrapper = DefaultProviderWrapper::new(provider.clone());
        wrapper.configure(&context(serde_json::json!({}))).unwrap();
        wrapper.initialize(&NullInitStateWriter).await.unwrap();

        let err = wrapper.close().await.unwrap_err();
        assert!(matches!(err, PluginError::Playback(_)));
        assert_eq!(wrapper.state(), PluginState::Config);
        assert!(wrapper.last_error().unwrap().contains("device busy"));
        assert_eq!(provider.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_configure_stays_inactive() {
        let wrapper = DefaultProviderWrapper::new(Arc::new(MockProvider::new("mock")));
        let result = wrapper.configure(&context(serde_json::json!({ "broken": true })));

        assert!(result.is_err());
        assert_eq!(wrapper.state(), PluginState::Inactive);
        assert!(wrapper.last_error().is_some());
    }

    #[tokio::test]
    async fn test_active_wrapper_cannot_be_reconfigured() {
        let wrapper = DefaultProviderWrapper::new(Arc::new(MockProvider::new("mock")));
        wrapper.configure(&context(serde_json::json!({}))).unwrap();
        wrapper.initialize(&NullInitStateWriter).await.unwrap();

        let err = wrapper.configure(&context(serde_json::json!({}))).unwrap_err();
        assert!(matches!(err, PluginError::InvalidState(_)));
        assert!(wrapper.is_active());
    }

    #[tokio::test]
    async fn test_close_inactive_is_noop() {
        let provider = Arc::new(MockProvider::new("mock"));
        let wrapper = DefaultProviderWrapper::new(provider.clone());
        wrapper.close().await.unwrap();
        assert_eq!(provider.closed.load(Ordering::SeqCst), 0);
        assert_eq!(wrapper.state(), PluginState::Inactive);
    }

    #[tokio::test]
    async fn test_search_gated_on_active() {
        let wrapper = DefaultProviderWrapper::new(Arc::new(MockProvider::new("mock")));
        assert!(matches!(
            wrapper.search("intro", 0).await,
            Err(PluginError::InvalidState(_))
        ));

        wrapper.configure(&context(serde_json::json!({}))).unwrap();
        wrapper.initialize(&NullInitStateWriter).await.unwrap();

        let songs = wrapper.search("intro", 0).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].provider.id, "mock");
    }

    #[tokio::test]
    async fn test_suggester_wrapper_delegates() {
        let wrapper = DefaultSuggesterWrapper::new(Arc::new(MockSuggester));
        assert_eq!(wrapper.id(), "mock-suggester");
        assert_eq!(wrapper.provider_ids(), vec!["mock".to_string()]);
        assert!(wrapper.suggest_next().await.is_err());

        wrapper.configure(&context(serde_json::json!({}))).unwrap();
        wrapper.initialize(&NullInitStateWriter).await.unwrap();
        assert_eq!(wrapper.suggest_next().await.unwrap().id, "next");
    }

    #[test]
    fn test_factories_pass_wrappers_through() {
        let factories = WrapperFactories::default();
        let wrapper = factories.wrap_provider(ProviderRef::raw(MockProvider::new("mock")));
        let again = factories.wrap_provider(PluginRef::Wrapper(Arc::clone(&wrapper)));
        assert!(Arc::ptr_eq(&wrapper, &again));
    }

    #[test]
    fn test_custom_factory_is_used() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let factories = WrapperFactories::default().with_provider_factory(
            move |provider: Arc<dyn Provider>| -> Arc<dyn ProviderWrapper> {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(DefaultProviderWrapper::new(provider))
            },
        );

        let wrapper = factories.wrap_provider(ProviderRef::raw(MockProvider::new("mock")));
        assert_eq!(wrapper.id(), "mock");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plugin_ref_id() {
        let raw = SuggesterRef::raw(MockSuggester);
        assert_eq!(raw.id(), "mock-suggester");
        assert!(!raw.is_wrapper());

        let wrapped: SuggesterRef = PluginRef::Wrapper(WrapperFactories::default().wrap_suggester(raw));
        assert!(wrapped.is_wrapper());
        assert_eq!(wrapped.id(), "mock-suggester");
    }

    #[test]
    fn test_record_failure_keeps_state() {
        let wrapper = DefaultProviderWrapper::new(Arc::new(MockProvider::new("mock")));
        wrapper.configure(&context(serde_json::json!({}))).unwrap();

        wrapper.record_failure("timed out");
        assert_eq!(wrapper.state(), PluginState::Config);
        assert_eq!(wrapper.last_error().as_deref(), Some("timed out"));
    }
}
