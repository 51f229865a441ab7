//! Extension points of the container.
//!
//! Extensions are registered on a [`ContainerBuilder`](crate::ContainerBuilder)
//! as [`Extension`] values and partitioned by capability:
//!
//! - [`ProviderExtension`]: recognizes a provider kind and extracts its info
//! - [`OnInitExtension`]: runs once when the container is built
//! - [`LifespanExtension`] / [`SyncLifespanExtension`]: acquire on container
//!   entry, release on container exit
//! - [`OnResolveExtension`] / [`SyncOnResolveExtension`]: observe every
//!   construction (not cache hits)

use std::sync::Arc;

use async_trait::async_trait;

use crate::container::Container;
use crate::context::Context;
use crate::error::DiResult;
use crate::providers::{ContextExtension, ObjectExtension, Provider, Release, ScopedExtension};
use crate::registration::{Instance, ProviderInfo, ProviderRecord, TypeTable};
use crate::scope::Scopes;

/// What a provider extension may consult while extracting.
pub struct ExtractContext<'a> {
    /// Produced types registered so far, by name.
    pub types: &'a TypeTable,
    pub scopes: &'a Scopes,
}

/// Recognizes one provider kind and normalizes it into a [`ProviderInfo`].
///
/// Extraction must be a pure function of the provider.
pub trait ProviderExtension: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn supports_provider(&self, provider: &dyn Provider) -> bool;

    fn extract(&self, provider: &dyn Provider, context: &ExtractContext<'_>) -> DiResult<ProviderInfo>;
}

/// Runs once, synchronously, while the container is built.
pub trait OnInitExtension: Send + Sync + 'static {
    fn on_init(&self, container: &Container) -> DiResult<()>;
}

/// Acquires something when an async container is entered.
///
/// The returned release is pushed onto the root context's cleanup stack and
/// runs when the container exits.
#[async_trait]
pub trait LifespanExtension: Send + Sync + 'static {
    async fn lifespan(&self, container: &Container) -> DiResult<Option<Release>>;
}

/// Acquires something when a container is entered; run by both container
/// kinds.
pub trait SyncLifespanExtension: Send + Sync + 'static {
    fn lifespan(&self, container: &Container) -> DiResult<Option<Release>>;
}

/// Observes constructions made by async resolutions.
///
/// `context` is the context of the scope that owns the instance.
#[async_trait]
pub trait OnResolveExtension: Send + Sync + 'static {
    async fn on_resolve(&self, context: &Context, record: &ProviderRecord, instance: &Instance);
}

/// Observes constructions made by sync resolutions.
pub trait SyncOnResolveExtension: Send + Sync + 'static {
    fn on_resolve(&self, context: &Context, record: &ProviderRecord, instance: &Instance);
}

/// One extension, tagged with its capability.
#[derive(Clone)]
pub enum Extension {
    Provider(Arc<dyn ProviderExtension>),
    OnInit(Arc<dyn OnInitExtension>),
    Lifespan(Arc<dyn LifespanExtension>),
    LifespanSync(Arc<dyn SyncLifespanExtension>),
    OnResolve(Arc<dyn OnResolveExtension>),
    OnResolveSync(Arc<dyn SyncOnResolveExtension>),
}

impl Extension {
    pub fn provider(extension: impl ProviderExtension) -> Self {
        Extension::Provider(Arc::new(extension))
    }

    pub fn on_init(extension: impl OnInitExtension) -> Self {
        Extension::OnInit(Arc::new(extension))
    }

    pub fn lifespan(extension: impl LifespanExtension) -> Self {
        Extension::Lifespan(Arc::new(extension))
    }

    pub fn lifespan_sync(extension: impl SyncLifespanExtension) -> Self {
        Extension::LifespanSync(Arc::new(extension))
    }

    pub fn on_resolve(extension: impl OnResolveExtension) -> Self {
        Extension::OnResolve(Arc::new(extension))
    }

    pub fn on_resolve_sync(extension: impl SyncOnResolveExtension) -> Self {
        Extension::OnResolveSync(Arc::new(extension))
    }
}

/// Extensions partitioned by capability, each list in registration order.
#[derive(Clone, Default)]
pub struct Extensions {
    pub(crate) providers: Vec<Arc<dyn ProviderExtension>>,
    pub(crate) on_init: Vec<Arc<dyn OnInitExtension>>,
    pub(crate) lifespan: Vec<Arc<dyn LifespanExtension>>,
    pub(crate) lifespan_sync: Vec<Arc<dyn SyncLifespanExtension>>,
    pub(crate) on_resolve: Vec<Arc<dyn OnResolveExtension>>,
    pub(crate) on_resolve_sync: Vec<Arc<dyn SyncOnResolveExtension>>,
}

impl Extensions {
    /// Partitions user extensions followed by defaults; user provider
    /// extensions therefore take precedence over the built-in ones.
    pub fn new<E, D>(extensions: E, defaults: D) -> Self
    where
        E: IntoIterator<Item = Extension>,
        D: IntoIterator<Item = Extension>,
    {
        let mut partitioned = Self::default();
        for extension in extensions.into_iter().chain(defaults) {
            match extension {
                Extension::Provider(ext) => partitioned.providers.push(ext),
                Extension::OnInit(ext) => partitioned.on_init.push(ext),
                Extension::Lifespan(ext) => partitioned.lifespan.push(ext),
                Extension::LifespanSync(ext) => partitioned.lifespan_sync.push(ext),
                Extension::OnResolve(ext) => partitioned.on_resolve.push(ext),
                Extension::OnResolveSync(ext) => partitioned.on_resolve_sync.push(ext),
            }
        }
        partitioned
    }
}

/// Built-in provider extensions: scoped factories, objects, context values.
pub fn default_extensions() -> Vec<Extension> {
    vec![
        Extension::provider(ScopedExtension),
        Extension::provider(ObjectExtension),
        Extension::provider(ContextExtension),
    ]
}

#[cfg(test)]
pub(crate) fn default_provider_extensions() -> Vec<Arc<dyn ProviderExtension>> {
    Extensions::new([], default_extensions()).providers
}
