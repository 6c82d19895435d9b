//! # Provider Manager
//!
//! Keeps track of all provider and suggester plugins and drives their lifecycle.
//!
//! Plugins are stored by their ID in two independent registries, one for
//! providers and one for suggesters. Each plugin is wrapped exactly once, when it
//! is registered, using the [`WrapperFactories`] the manager was created with.
//! Most lookups only see plugins whose wrapper is [`PluginState::Active`].
//!
//! The manager itself goes through three phases: plugins are registered, then
//! [`initialize`](ProviderManager::initialize) configures them, and finally
//! [`close`](ProviderManager::close) releases everything. Calls made in the wrong
//! phase fail with [`ManagerError::NotInitialized`], [`ManagerError::AlreadyInitialized`]
//! or [`ManagerError::Closed`].

use crate::config::{Config, PluginConfig};
use crate::error::{ManagerError, ManagerResult, PluginKind};
use chrono::{DateTime, Utc};
use jukeforge_plugin_api::{
    ConfigContext, InitStateWriter, PlaybackFactoryManager, PluginState, PluginWrapper, Provider,
    ProviderRef, ProviderWrapper, SuggesterRef, SuggesterWrapper, WrapperFactories,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    Closed,
}

/// Outcome of a bulk initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// IDs of the plugins that became active.
    pub activated: Vec<String>,
    /// Plugins that failed, with the reason.
    pub failed: Vec<InitFailure>,
}

impl InitReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A plugin that failed to initialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitFailure {
    pub id: String,
    pub reason: String,
}

/// Snapshot of one plugin's lifecycle for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginStatusReport {
    pub kind: PluginKind,
    pub id: String,
    pub name: String,
    pub state: PluginState,
    pub last_error: Option<String>,
    pub changed_at: Option<DateTime<Utc>>,
}

impl PluginStatusReport {
    fn of<W: PluginWrapper + ?Sized>(kind: PluginKind, wrapper: &W) -> Self {
        Self {
            kind,
            id: wrapper.id().to_string(),
            name: wrapper.name().to_string(),
            state: wrapper.state(),
            last_error: wrapper.last_error(),
            changed_at: wrapper.last_transition(),
        }
    }
}

/// Registry of provider and suggester plugins.
///
/// # Example
///
/// ```no_run
/// use jukeforge_daemon::config::Config;
/// use jukeforge_daemon::manager::ProviderManager;
/// use jukeforge_plugin_api::{NullInitStateWriter, PlaybackFactoryManager, Provider, ProviderRef};
/// use provider_dummy::{DummyPlaybackFactory, DummyProvider};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let mut playback = PlaybackFactoryManager::new();
/// playback.register(DummyPlaybackFactory);
///
/// let mut manager = ProviderManager::new();
/// manager.register_provider(ProviderRef::raw(DummyProvider::new()))?;
/// manager.initialize(&Config::default(), Arc::new(playback))?;
/// manager.initialize_providers(&NullInitStateWriter).await?;
///
/// let provider = manager.provider("dummy")?.unwrap();
/// println!("Active provider: {}", provider.subject());
/// manager.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct ProviderManager {
    factories: WrapperFactories,
    providers: HashMap<String, Arc<dyn ProviderWrapper>>,
    suggesters: HashMap<String, Arc<dyn SuggesterWrapper>>,
    init_timeout: Duration,
    phase: Phase,
}

impl ProviderManager {
    /// Create a manager using the default wrappers.
    pub fn new() -> Self {
        Self::with_factories(WrapperFactories::default())
    }

    /// Create a manager that wraps plugins with the given factories.
    pub fn with_factories(factories: WrapperFactories) -> Self {
        Self {
            factories,
            providers: HashMap::new(),
            suggesters: HashMap::new(),
            init_timeout: Duration::from_secs(30),
            phase: Phase::Created,
        }
    }

    fn ensure_created(&self) -> ManagerResult<()> {
        match self.phase {
            Phase::Created => Ok(()),
            Phase::Running => Err(ManagerError::AlreadyInitialized),
            Phase::Closed => Err(ManagerError::Closed),
        }
    }

    fn ensure_running(&self) -> ManagerResult<()> {
        match self.phase {
            Phase::Running => Ok(()),
            Phase::Created => Err(ManagerError::NotInitialized),
            Phase::Closed => Err(ManagerError::Closed),
        }
    }

    /// Register a provider. Only allowed before [`initialize`](Self::initialize).
    ///
    /// A plain provider is wrapped by the provider wrapper factory, a wrapper is
    /// kept as it is. The wrapper must report the same ID as the provider.
    pub fn register_provider(&mut self, provider: impl Into<ProviderRef>) -> ManagerResult<()> {
        self.ensure_created()?;
        let provider = provider.into();
        let id = provider.id().to_string();

        if self.providers.contains_key(&id) {
            return Err(ManagerError::DuplicateId {
                kind: PluginKind::Provider,
                id,
            });
        }

        let wrapper = self.factories.wrap_provider(provider);
        if wrapper.id() != id {
            return Err(ManagerError::InvalidArgument(format!(
                "Wrapper for provider {} reports ID {}",
                id,
                wrapper.id()
            )));
        }
        debug!("Registered provider: {} ({})", id, wrapper.name());
        self.providers.insert(id, wrapper);
        Ok(())
    }

    /// Register a suggester. Only allowed before [`initialize`](Self::initialize).
    pub fn register_suggester(&mut self, suggester: impl Into<SuggesterRef>) -> ManagerResult<()> {
        self.ensure_created()?;
        let suggester = suggester.into();
        let id = suggester.id().to_string();

        if self.suggesters.contains_key(&id) {
            return Err(ManagerError::DuplicateId {
                kind: PluginKind::Suggester,
                id,
            });
        }

        let wrapper = self.factories.wrap_suggester(suggester);
        if wrapper.id() != id {
            return Err(ManagerError::InvalidArgument(format!(
                "Wrapper for suggester {} reports ID {}",
                id,
                wrapper.id()
            )));
        }
        debug!("Registered suggester: {} ({})", id, wrapper.name());
        self.suggesters.insert(id, wrapper);
        Ok(())
    }

    /// One-time setup. Configures every enabled plugin, moving it to
    /// [`PluginState::Config`]. Plugins that fail to configure stay inactive.
    pub fn initialize(
        &mut self,
        config: &Config,
        playback_factories: Arc<PlaybackFactoryManager>,
    ) -> ManagerResult<()> {
        self.ensure_created()?;
        self.init_timeout = config.plugins.init_timeout();

        let providers = configure_all(
            PluginKind::Provider,
            &self.providers,
            |id| config.provider(id),
            &playback_factories,
        );
        let suggesters = configure_all(
            PluginKind::Suggester,
            &self.suggesters,
            |id| config.suggester(id),
            &playback_factories,
        );

        self.phase = Phase::Running;
        info!(
            "Provider manager initialized: {}/{} providers and {}/{} suggesters configured",
            providers,
            self.providers.len(),
            suggesters,
            self.suggesters.len()
        );
        Ok(())
    }

    /// All providers, regardless of state.
    pub fn all_providers(&self) -> ManagerResult<&HashMap<String, Arc<dyn ProviderWrapper>>> {
        self.ensure_running()?;
        Ok(&self.providers)
    }

    /// All suggesters, regardless of state.
    pub fn all_suggesters(&self) -> ManagerResult<&HashMap<String, Arc<dyn SuggesterWrapper>>> {
        self.ensure_running()?;
        Ok(&self.suggesters)
    }

    /// All active providers, in no particular order.
    ///
    /// The iterator is lazy and can be cloned to iterate again.
    pub fn providers(
        &self,
    ) -> ManagerResult<impl Iterator<Item = &Arc<dyn ProviderWrapper>> + Clone + '_> {
        self.ensure_running()?;
        Ok(self.providers.values().filter(|w| w.is_active()))
    }

    /// All active suggesters, in no particular order.
    pub fn suggesters(
        &self,
    ) -> ManagerResult<impl Iterator<Item = &Arc<dyn SuggesterWrapper>> + Clone + '_> {
        self.ensure_running()?;
        Ok(self.suggesters.values().filter(|w| w.is_active()))
    }

    /// Active suggesters drawing their songs from the given provider.
    pub fn suggesters_for<P>(&self, provider: &P) -> ManagerResult<Vec<Arc<dyn SuggesterWrapper>>>
    where
        P: Provider + ?Sized,
    {
        let provider_id = provider.id();
        Ok(self
            .suggesters()?
            .filter(|s| s.provider_ids().iter().any(|id| id == provider_id))
            .cloned()
            .collect())
    }

    /// Initialize every provider that is currently configured.
    ///
    /// Failures are reported through `writer` and in the returned report; they
    /// never stop the remaining providers from initializing.
    pub async fn initialize_providers(
        &mut self,
        writer: &dyn InitStateWriter,
    ) -> ManagerResult<InitReport> {
        self.ensure_running()?;
        let pending = pending(&self.providers);

        let report = initialize_all(
            PluginKind::Provider,
            pending,
            writer,
            self.init_timeout,
            |_| Ok(()),
        )
        .await;
        Ok(report)
    }

    /// Initialize every suggester that is currently configured.
    ///
    /// A suggester fails without being initialized if one of the providers it
    /// draws from isn't active, so providers should be initialized first.
    pub async fn initialize_suggesters(
        &mut self,
        writer: &dyn InitStateWriter,
    ) -> ManagerResult<InitReport> {
        self.ensure_running()?;
        let pending = pending(&self.suggesters);
        let providers = &self.providers;

        let report = initialize_all(
            PluginKind::Suggester,
            pending,
            writer,
            self.init_timeout,
            |suggester| {
                let missing: Vec<String> = suggester
                    .provider_ids()
                    .into_iter()
                    .filter(|id| !providers.get(id).is_some_and(|p| p.is_active()))
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(format!("required providers not active: {}", missing.join(", ")))
                }
            },
        )
        .await;
        Ok(report)
    }

    /// Get an active provider by ID. Returns `None` if there is no such
    /// provider or it isn't active.
    pub fn provider(&self, id: &str) -> ManagerResult<Option<Arc<dyn ProviderWrapper>>> {
        self.ensure_running()?;
        Ok(self.providers.get(id).filter(|w| w.is_active()).cloned())
    }

    /// Get an active suggester by ID. Returns `None` if there is no such
    /// suggester or it isn't active.
    pub fn suggester(&self, id: &str) -> ManagerResult<Option<Arc<dyn SuggesterWrapper>>> {
        self.ensure_running()?;
        Ok(self.suggesters.get(id).filter(|w| w.is_active()).cloned())
    }

    /// Resolve a provider to its wrapper.
    ///
    /// Wrappers are returned unchanged. A plain provider is looked up by its ID
    /// among the active providers.
    pub fn provider_wrapper(
        &self,
        provider: impl Into<ProviderRef>,
    ) -> ManagerResult<Arc<dyn ProviderWrapper>> {
        self.ensure_running()?;
        match provider.into() {
            ProviderRef::Wrapper(wrapper) => Ok(wrapper),
            ProviderRef::Plugin(plugin) => self.provider(plugin.id())?.ok_or_else(|| {
                ManagerError::InvalidArgument(format!("Provider not found: {}", plugin.id()))
            }),
        }
    }

    /// Resolve a suggester to its wrapper.
    ///
    /// Wrappers are returned unchanged. A plain suggester is looked up by its ID
    /// among the active suggesters.
    pub fn suggester_wrapper(
        &self,
        suggester: impl Into<SuggesterRef>,
    ) -> ManagerResult<Arc<dyn SuggesterWrapper>> {
        self.ensure_running()?;
        match suggester.into() {
            SuggesterRef::Wrapper(wrapper) => Ok(wrapper),
            SuggesterRef::Plugin(plugin) => self.suggester(plugin.id())?.ok_or_else(|| {
                ManagerError::InvalidArgument(format!("Suggester not found: {}", plugin.id()))
            }),
        }
    }

    /// Lifecycle snapshot of every plugin, providers first, each sorted by ID.
    pub fn status(&self) -> ManagerResult<Vec<PluginStatusReport>> {
        self.ensure_running()?;
        let mut reports: Vec<PluginStatusReport> = self
            .providers
            .values()
            .map(|w| PluginStatusReport::of(PluginKind::Provider, w.as_ref()))
            .chain(
                self.suggesters
                    .values()
                    .map(|w| PluginStatusReport::of(PluginKind::Suggester, w.as_ref())),
            )
            .collect();
        reports.sort_by(|a, b| (a.kind, &a.id).cmp(&(b.kind, &b.id)));
        Ok(reports)
    }

    /// Close all plugins and release the registries.
    ///
    /// Every plugin that entered initialization is closed, whether it became
    /// active or not. Suggesters are closed before the providers they depend on. Errors from
    /// individual plugins are logged. The manager can't be used afterwards.
    pub async fn close(&mut self) -> ManagerResult<()> {
        if self.phase == Phase::Closed {
            return Err(ManagerError::Closed);
        }

        close_all(PluginKind::Suggester, &self.suggesters).await;
        close_all(PluginKind::Provider, &self.providers).await;

        self.suggesters.clear();
        self.providers.clear();
        self.phase = Phase::Closed;
        info!("Provider manager closed");
        Ok(())
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }
}

impl Default for ProviderManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Configure every enabled plugin. Returns how many ended up configured.
fn configure_all<W, F>(
    kind: PluginKind,
    wrappers: &HashMap<String, Arc<W>>,
    config_for: F,
    playback_factories: &Arc<PlaybackFactoryManager>,
) -> usize
where
    W: PluginWrapper + ?Sized,
    F: Fn(&str) -> PluginConfig,
{
    let mut configured = 0;
    for (id, wrapper) in wrappers {
        let plugin_config = config_for(id);
        if !plugin_config.enabled {
            debug!("Skipping disabled {}: {}", kind, id);
            continue;
        }

        let settings = match plugin_config.settings_json() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Invalid settings for {} {}: {:#}", kind, id, e);
                continue;
            }
        };

        let context = ConfigContext::new(settings, Arc::clone(playback_factories));
        match wrapper.configure(&context) {
            Ok(()) => configured += 1,
            Err(e) => warn!("Failed to configure {} {}: {}", kind, id, e),
        }
    }
    configured
}

/// Wrappers waiting for initialization, sorted by ID.
fn pending<W: PluginWrapper + ?Sized>(wrappers: &HashMap<String, Arc<W>>) -> Vec<Arc<W>> {
    let mut pending: Vec<Arc<W>> = wrappers
        .values()
        .filter(|w| w.state() == PluginState::Config)
        .cloned()
        .collect();
    pending.sort_by(|a, b| a.id().cmp(b.id()));
    pending
}

async fn initialize_all<W, F>(
    kind: PluginKind,
    pending: Vec<Arc<W>>,
    writer: &dyn InitStateWriter,
    init_timeout: Duration,
    precheck: F,
) -> InitReport
where
    W: PluginWrapper + ?Sized,
    F: Fn(&W) -> Result<(), String>,
{
    let mut report = InitReport::default();

    for wrapper in pending {
        let id = wrapper.id().to_string();
        writer.begin(wrapper.name());

        let outcome = match precheck(wrapper.as_ref()) {
            Err(reason) => Err(reason),
            Ok(()) => match timeout(init_timeout, wrapper.initialize(writer)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("timed out after {}s", init_timeout.as_secs())),
            },
        };

        match outcome {
            Ok(()) => {
                info!("Activated {}: {}", kind, id);
                report.activated.push(id);
            }
            Err(reason) => {
                wrapper.record_failure(&reason);
                writer.warning(&format!("{} {} failed to initialize: {}", kind, id, reason));
                warn!("Failed to initialize {} {}: {}", kind, id, reason);
                report.failed.push(InitFailure { id, reason });
            }
        }
    }

    report
}

async fn close_all<W: PluginWrapper + ?Sized>(kind: PluginKind, wrappers: &HashMap<String, Arc<W>>) {
    for (id, wrapper) in wrappers {
        // Configured plugins may hold resources from a failed or timed out
        // initialization.
        if wrapper.state() == PluginState::Inactive {
            continue;
        }
        match wrapper.close().await {
            Ok(()) => debug!("Closed {}: {}", kind, id),
            Err(e) => warn!("Error closing {} {}: {}", kind, id, e),
        }
    }
}
