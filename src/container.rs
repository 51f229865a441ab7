//! Containers: the registry, plan cache and root context of one application.
//!
//! A [`Container`] resolves in both modes and runs async and sync lifespans;
//! a [`SyncContainer`] is the same container restricted to synchronous
//! lifespans. Both are built by a [`ContainerBuilder`].

use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::context::{self, Context, ContextSeed, ScopeState};
use crate::descriptors::ProviderDescriptor;
use crate::error::DiResult;
use crate::extensions::{default_extensions, Extension, Extensions};
use crate::key::TypeKey;
use crate::plan::{ExecutionPlan, Mode, PlanCache};
use crate::providers::Provider;
use crate::registration::{Registry, TypeDecl};
use crate::scope::Scopes;

/// State shared by a container and every context it hands out.
pub(crate) struct ContainerCore {
    pub(crate) scopes: Scopes,
    pub(crate) extensions: Extensions,
    registry: RwLock<Registry>,
    plans: PlanCache,
    root: Mutex<Option<Arc<ScopeState>>>,
}

impl ContainerCore {
    fn new(scopes: Scopes, extensions: Extensions) -> Self {
        Self {
            registry: RwLock::new(Registry::new(scopes.clone(), extensions.providers.clone())),
            plans: PlanCache::default(),
            root: Mutex::new(None),
            scopes,
            extensions,
        }
    }

    /// Compiled plan for `key`; registration waits for in-flight compiles.
    pub(crate) fn plan(&self, key: &TypeKey, mode: Mode) -> DiResult<Arc<ExecutionPlan>> {
        let registry = self.registry.read();
        self.plans.get_or_compile(key, mode, &registry, &self.extensions)
    }

    fn root_state(&self) -> Arc<ScopeState> {
        self.root
            .lock()
            .get_or_insert_with(|| Arc::new(ScopeState::new(self.scopes.first(), ContextSeed::default())))
            .clone()
    }

    fn take_root(&self) -> Option<Arc<ScopeState>> {
        self.root.lock().take()
    }
}

fn lifespan_key() -> TypeKey {
    TypeKey::named("lifespan")
}

/// Dependency injection container.
///
/// Cloning is cheap; clones share registrations, compiled plans and the
/// root context.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, Resource, Singleton};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_inject::DiResult<()> {
/// let container = Container::new();
/// container.register(Singleton::resource_async(|_| async {
///     Ok(Resource::new(42_i32, |_| Ok(())))
/// }))?;
///
/// container
///     .run(|container| async move {
///         let answer = container.context()?.get::<i32>().await?;
///         assert_eq!(*answer, 42);
///         Ok(())
///     })
///     .await
/// # }
/// ```
#[derive(Clone)]
pub struct Container {
    core: Arc<ContainerCore>,
}

impl Container {
    /// Container with the default scopes and provider extensions.
    pub fn new() -> Self {
        Self::from_parts(Scopes::default(), Extensions::new([], default_extensions()))
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    fn from_parts(scopes: Scopes, extensions: Extensions) -> Self {
        Self {
            core: Arc::new(ContainerCore::new(scopes, extensions)),
        }
    }

    /// Registers a provider.
    ///
    /// Compiled plans are discarded, so the provider takes part in every
    /// later resolution.
    pub fn register<P: Provider>(&self, provider: P) -> DiResult<()> {
        self.register_arc(Arc::new(provider))
    }

    pub fn register_arc(&self, provider: Arc<dyn Provider>) -> DiResult<()> {
        let mut registry = self.core.registry.write();
        registry.register(provider)?;
        self.core.plans.clear();
        Ok(())
    }

    /// Records a generic type declaration used to bind type parameters.
    pub fn declare_generic(&self, decl: TypeDecl) {
        let mut registry = self.core.registry.write();
        registry.declare(decl);
        self.core.plans.clear();
    }

    pub fn scopes(&self) -> &Scopes {
        &self.core.scopes
    }

    pub fn is_registered(&self, key: &TypeKey) -> bool {
        self.core.registry.read().contains(key)
    }

    /// The root context, at the outermost tier.
    ///
    /// Created on first use; [`exit`](Container::exit) discards it.
    pub fn root(&self) -> Context {
        Context::root(self.core.clone(), self.core.root_state())
    }

    /// A fresh context one tier below the root.
    pub fn context(&self) -> DiResult<Context> {
        self.root().child()
    }

    pub fn context_with(&self, seed: ContextSeed) -> DiResult<Context> {
        self.root().child_with(seed)
    }

    /// Runs every lifespan extension, async ones first.
    ///
    /// Releases land on the root context's cleanup stack. If an acquisition
    /// fails, what was acquired so far is released before the error is
    /// returned.
    pub async fn enter(&self) -> DiResult<()> {
        let acquired = self.acquire_lifespans().await;
        if acquired.is_err() {
            return context::finish(acquired, self.exit().await);
        }
        debug!(scope = %self.core.scopes.first(), "container entered");
        Ok(())
    }

    async fn acquire_lifespans(&self) -> DiResult<()> {
        let root = self.root();
        for extension in &self.core.extensions.lifespan {
            if let Some(release) = extension.lifespan(self).await? {
                root.state().push_release(lifespan_key(), release);
            }
        }
        self.acquire_sync_lifespans(&root)
    }

    fn acquire_sync_lifespans(&self, root: &Context) -> DiResult<()> {
        for extension in &self.core.extensions.lifespan_sync {
            if let Some(release) = extension.lifespan(self)? {
                root.state().push_release(lifespan_key(), release);
            }
        }
        Ok(())
    }

    /// Unwinds and discards the root context.
    ///
    /// The next resolution starts from an empty outermost cache.
    pub async fn exit(&self) -> DiResult<()> {
        match self.core.take_root() {
            Some(state) => {
                trace!(scope = %state.scope(), "container exiting");
                state.take_exit_stack().unwind().await
            }
            None => Ok(()),
        }
    }

    fn exit_sync(&self) -> DiResult<()> {
        match self.core.take_root() {
            Some(state) => {
                trace!(scope = %state.scope(), "container exiting");
                state.take_exit_stack().unwind_sync()
            }
            None => Ok(()),
        }
    }

    /// Enters, runs `body`, then exits.
    ///
    /// An error from `body` takes precedence over cleanup errors.
    pub async fn run<F, Fut, R>(&self, body: F) -> DiResult<R>
    where
        F: FnOnce(Container) -> Fut,
        Fut: Future<Output = DiResult<R>>,
    {
        self.enter().await?;
        let result = body(self.clone()).await;
        context::finish(result, self.exit().await)
    }

    /// Registered providers, in registration order.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.core
            .registry
            .read()
            .records()
            .iter()
            .map(|record| ProviderDescriptor::from_record(record))
            .collect()
    }

    /// Dependency graph of `key`, dependencies first.
    #[cfg(feature = "graph-export")]
    pub fn dependency_graph(&self, key: &TypeKey) -> DiResult<crate::graph_export::DependencyGraph> {
        let registry = self.core.registry.read();
        let graph = crate::graph::build(key, &registry)?;
        Ok(crate::graph_export::DependencyGraph::from_graph(&graph))
    }

    #[cfg(test)]
    pub(crate) fn compiled_plans(&self) -> usize {
        self.core.plans.len()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// A container that never suspends.
///
/// Runs only synchronous lifespans and unwinds with synchronous releases;
/// contexts obtained from it still offer async resolution.
#[derive(Clone, Default)]
pub struct SyncContainer {
    inner: Container,
}

impl SyncContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn register<P: Provider>(&self, provider: P) -> DiResult<()> {
        self.inner.register(provider)
    }

    pub fn register_arc(&self, provider: Arc<dyn Provider>) -> DiResult<()> {
        self.inner.register_arc(provider)
    }

    pub fn declare_generic(&self, decl: TypeDecl) {
        self.inner.declare_generic(decl)
    }

    pub fn scopes(&self) -> &Scopes {
        self.inner.scopes()
    }

    pub fn is_registered(&self, key: &TypeKey) -> bool {
        self.inner.is_registered(key)
    }

    pub fn root(&self) -> Context {
        self.inner.root()
    }

    pub fn context(&self) -> DiResult<Context> {
        self.inner.context()
    }

    pub fn context_with(&self, seed: ContextSeed) -> DiResult<Context> {
        self.inner.context_with(seed)
    }

    /// Runs the sync lifespan extensions.
    pub fn enter(&self) -> DiResult<()> {
        let acquired = self.inner.acquire_sync_lifespans(&self.inner.root());
        if acquired.is_err() {
            return context::finish(acquired, self.exit());
        }
        debug!(scope = %self.inner.core.scopes.first(), "container entered");
        Ok(())
    }

    /// Unwinds and discards the root context; async releases fail.
    pub fn exit(&self) -> DiResult<()> {
        self.inner.exit_sync()
    }

    pub fn run<F, R>(&self, body: F) -> DiResult<R>
    where
        F: FnOnce(&SyncContainer) -> DiResult<R>,
    {
        self.enter()?;
        let result = body(self);
        context::finish(result, self.exit())
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.inner.descriptors()
    }

    #[cfg(feature = "graph-export")]
    pub fn dependency_graph(&self, key: &TypeKey) -> DiResult<crate::graph_export::DependencyGraph> {
        self.inner.dependency_graph(key)
    }

    /// The underlying container, for extensions that take one.
    pub fn as_container(&self) -> &Container {
        &self.inner
    }
}

/// Configures scopes and extensions of a container.
///
/// ```rust
/// use ferrous_inject::{Container, Extension, Scopes, TracingObserver};
///
/// let container = Container::builder()
///     .scopes(Scopes::new(["app", "session", "request"]))
///     .extension(Extension::on_resolve_sync(TracingObserver::new()))
///     .build()
///     .unwrap();
/// assert_eq!(container.scopes().len(), 3);
/// ```
pub struct ContainerBuilder {
    scopes: Scopes,
    extensions: Vec<Extension>,
    defaults: Vec<Extension>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            scopes: Scopes::default(),
            extensions: Vec::new(),
            defaults: default_extensions(),
        }
    }

    pub fn scopes(mut self, scopes: Scopes) -> Self {
        self.scopes = scopes;
        self
    }

    /// Adds an extension; user provider extensions are consulted before the
    /// defaults.
    pub fn extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn extensions<I: IntoIterator<Item = Extension>>(mut self, extensions: I) -> Self {
        self.extensions.extend(extensions);
        self
    }

    /// Replaces the built-in provider extensions.
    pub fn default_extensions<I: IntoIterator<Item = Extension>>(mut self, defaults: I) -> Self {
        self.defaults = defaults.into_iter().collect();
        self
    }

    /// Builds the container and runs the on-init extensions.
    pub fn build(self) -> DiResult<Container> {
        let container = Container::from_parts(self.scopes, Extensions::new(self.extensions, self.defaults));
        for extension in &container.core.extensions.on_init {
            extension.on_init(&container)?;
        }
        debug!(
            scopes = container.core.scopes.len(),
            provider_extensions = container.core.extensions.providers.len(),
            "container built"
        );
        Ok(container)
    }

    pub fn build_sync(self) -> DiResult<SyncContainer> {
        self.build().map(|inner| SyncContainer { inner })
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
