//! Factory providers: scoped, singleton and transient.

use std::any::Any;
use std::future::Future;
use std::mem;
use std::sync::Arc;

use async_trait::async_trait;

use super::{apply_upcast, upcast, Dependencies, Provided, Provider, Resource, Upcast};
use crate::directives::Directives;
use crate::error::{DiError, DiResult};
use crate::extensions::{ExtractContext, ProviderExtension};
use crate::internal::BoxFuture;
use crate::key::TypeKey;
use crate::registration::{Dependency, Implementation, Instance, ProviderInfo};
use crate::scope::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifestyle {
    Scoped,
    Singleton,
    Transient,
}

type SyncFactory = Arc<dyn Fn(&Dependencies) -> DiResult<Provided> + Send + Sync>;
type AsyncFactory = Arc<dyn Fn(Dependencies) -> BoxFuture<'static, DiResult<Provided>> + Send + Sync>;

enum Factory {
    Sync(SyncFactory),
    Async(AsyncFactory),
}

impl Factory {
    fn address(&self) -> usize {
        match self {
            Factory::Sync(factory) => Arc::as_ptr(factory) as *const () as usize,
            Factory::Async(factory) => Arc::as_ptr(factory) as *const () as usize,
        }
    }

    /// Fn items and non-capturing closures are identified by type; capturing
    /// closures by their allocation.
    fn identify<F: 'static>(&self) -> Implementation {
        if mem::size_of::<F>() == 0 {
            Implementation::of_factory::<F>()
        } else {
            Implementation::Closure {
                address: self.address(),
                name: std::any::type_name::<F>(),
            }
        }
    }
}

enum Declared {
    Key(Dependency),
    /// Type referenced by name, looked up in the type table at registration.
    Named { name: Arc<str>, type_name: Arc<str> },
}

/// A factory provider.
///
/// Instances are cached once per scope context; the default scope is the
/// tier after the outermost one (`request` with the default tiers).
/// [`Singleton`] and [`Transient`] build the same provider with a different
/// lifestyle.
///
/// Four factory shapes are supported: [`new`](Scoped::new) and
/// [`new_async`](Scoped::new_async) return plain values,
/// [`resource`](Scoped::resource) and
/// [`resource_async`](Scoped::resource_async) return a [`Resource`] whose
/// release runs when the owning context closes.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_inject::{Scoped, SyncContainer};
///
/// struct Settings { url: String }
/// struct Database { url: String }
///
/// let container = SyncContainer::new();
/// container.register(Scoped::new(|_| Ok(Settings { url: "sqlite://".into() }))).unwrap();
/// container
///     .register(
///         Scoped::new(|deps| {
///             let settings = deps.get::<Settings>("settings")?;
///             Ok(Database { url: settings.url.clone() })
///         })
///         .dependency::<Settings>("settings"),
///     )
///     .unwrap();
///
/// let ctx = container.context().unwrap();
/// let a = ctx.get_sync::<Database>().unwrap();
/// let b = ctx.get_sync::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
pub struct Scoped {
    factory: Factory,
    implementation: Implementation,
    actual: Option<TypeKey>,
    interface: Option<TypeKey>,
    dependencies: Vec<Declared>,
    scope: Option<Scope>,
    lifestyle: Lifestyle,
    context_manager: bool,
    upcast: Option<Upcast>,
}

impl Scoped {
    fn from_factory<F: 'static>(factory: Factory, actual: Option<TypeKey>, context_manager: bool) -> Self {
        let implementation = factory.identify::<F>();
        Self {
            factory,
            implementation,
            actual,
            interface: None,
            dependencies: Vec::new(),
            scope: None,
            lifestyle: Lifestyle::Scoped,
            context_manager,
            upcast: None,
        }
    }

    /// Provider backed by a synchronous factory.
    pub fn new<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Dependencies) -> DiResult<T> + Send + Sync + 'static,
    {
        Self::from_factory::<F>(
            Factory::Sync(Arc::new(move |deps| {
                factory(deps).map(|value| Provided::Value(Arc::new(value) as Instance))
            })),
            Some(TypeKey::of::<T>()),
            false,
        )
    }

    /// Provider backed by an async factory.
    pub fn new_async<T, F, Fut>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<T>> + Send + 'static,
    {
        Self::from_factory::<F>(
            Factory::Async(Arc::new(move |deps| {
                let produced = factory(deps);
                Box::pin(async move {
                    produced
                        .await
                        .map(|value| Provided::Value(Arc::new(value) as Instance))
                })
            })),
            Some(TypeKey::of::<T>()),
            false,
        )
    }

    /// Provider whose products are scoped resources.
    pub fn resource<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Dependencies) -> DiResult<Resource<T>> + Send + Sync + 'static,
    {
        Self::from_factory::<F>(
            Factory::Sync(Arc::new(move |deps| factory(deps).map(Resource::into_provided))),
            Some(TypeKey::of::<T>()),
            true,
        )
    }

    /// Provider whose products are scoped resources acquired asynchronously.
    pub fn resource_async<T, F, Fut>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<Resource<T>>> + Send + 'static,
    {
        Self::from_factory::<F>(
            Factory::Async(Arc::new(move |deps| {
                let acquired = factory(deps);
                Box::pin(async move { acquired.await.map(Resource::into_provided) })
            })),
            Some(TypeKey::of::<T>()),
            true,
        )
    }

    /// Provider producing type-erased instances.
    ///
    /// The produced type is unknown, so registration fails with
    /// [`DiError::CannotDetermineReturnType`] unless
    /// [`produces`](Scoped::produces) or [`with_interface`](Scoped::with_interface)
    /// is given.
    pub fn dynamic<F>(factory: F) -> Self
    where
        F: Fn(&Dependencies) -> DiResult<Instance> + Send + Sync + 'static,
    {
        Self::from_factory::<F>(
            Factory::Sync(Arc::new(move |deps| factory(deps).map(Provided::Value))),
            None,
            false,
        )
    }

    fn lifestyle(mut self, lifestyle: Lifestyle) -> Self {
        self.lifestyle = lifestyle;
        self
    }

    /// Overrides the default scope tier.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Registers under `interface` instead of the produced type.
    pub fn with_interface(mut self, interface: TypeKey) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Declares the produced type explicitly, e.g. a structural generic key.
    pub fn produces(mut self, actual: TypeKey) -> Self {
        self.actual = Some(actual);
        self
    }

    /// Registers under trait object `I`; dependants receive `Arc<I>` via
    /// `get_trait`.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use ferrous_inject::{Scoped, SyncContainer};
    ///
    /// trait Store: Send + Sync { fn name(&self) -> &str; }
    /// struct Memory;
    /// impl Store for Memory { fn name(&self) -> &str { "memory" } }
    ///
    /// let container = SyncContainer::new();
    /// container
    ///     .register(Scoped::new(|_| Ok(Memory)).implements(|m: Arc<Memory>| m as Arc<dyn Store>))
    ///     .unwrap();
    ///
    /// let ctx = container.context().unwrap();
    /// assert_eq!(ctx.get_trait_sync::<dyn Store>().unwrap().name(), "memory");
    /// ```
    pub fn implements<T, I, F>(mut self, upcast_fn: F) -> Self
    where
        T: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.interface = Some(TypeKey::of::<I>());
        self.upcast = Some(upcast(upcast_fn));
        self
    }

    /// Declares a factory input.
    pub fn depends_on(mut self, name: impl Into<Arc<str>>, type_key: TypeKey) -> Self {
        self.dependencies.push(Declared::Key(Dependency::new(name, type_key)));
        self
    }

    /// Declares a factory input by type name, resolved against the types
    /// registered so far.
    pub fn depends_on_named(mut self, name: impl Into<Arc<str>>, type_name: impl Into<Arc<str>>) -> Self {
        self.dependencies.push(Declared::Named {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    /// Declares a factory input of Rust type `T`.
    pub fn dependency<T: ?Sized + 'static>(self, name: impl Into<Arc<str>>) -> Self {
        self.depends_on(name, TypeKey::of::<T>())
    }

    /// Declares a factory input receiving every provider of `T`.
    pub fn dependency_many<T: ?Sized + 'static>(self, name: impl Into<Arc<str>>) -> Self {
        self.depends_on(name, TypeKey::many(TypeKey::of::<T>()))
    }

    fn produced_key(&self) -> TypeKey {
        self.actual
            .clone()
            .or_else(|| self.interface.clone())
            .unwrap_or_else(|| TypeKey::named(self.implementation.to_string()))
    }
}

#[async_trait]
impl Provider for Scoped {
    fn implementation(&self) -> Implementation {
        self.implementation.clone()
    }

    fn provide(&self, dependencies: Dependencies) -> DiResult<Provided> {
        match &self.factory {
            Factory::Sync(factory) => factory(&dependencies),
            Factory::Async(_) => Err(DiError::AsyncProvider(self.produced_key())),
        }
    }

    async fn provide_async(&self, dependencies: Dependencies) -> DiResult<Provided> {
        match &self.factory {
            Factory::Sync(factory) => factory(&dependencies),
            Factory::Async(factory) => factory(dependencies).await,
        }
    }

    fn as_interface(&self, instance: Instance) -> DiResult<Instance> {
        apply_upcast(self.upcast.as_ref(), instance)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory provider cached in the outermost tier, with construction
/// serialized across concurrent first resolutions.
///
/// Constructors mirror [`Scoped`]'s and return a `Scoped` provider.
pub struct Singleton;

impl Singleton {
    pub fn new<T, F>(factory: F) -> Scoped
    where
        T: Send + Sync + 'static,
        F: Fn(&Dependencies) -> DiResult<T> + Send + Sync + 'static,
    {
        Scoped::new(factory).lifestyle(Lifestyle::Singleton)
    }

    pub fn new_async<T, F, Fut>(factory: F) -> Scoped
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<T>> + Send + 'static,
    {
        Scoped::new_async(factory).lifestyle(Lifestyle::Singleton)
    }

    pub fn resource<T, F>(factory: F) -> Scoped
    where
        T: Send + Sync + 'static,
        F: Fn(&Dependencies) -> DiResult<Resource<T>> + Send + Sync + 'static,
    {
        Scoped::resource(factory).lifestyle(Lifestyle::Singleton)
    }

    pub fn resource_async<T, F, Fut>(factory: F) -> Scoped
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<Resource<T>>> + Send + 'static,
    {
        Scoped::resource_async(factory).lifestyle(Lifestyle::Singleton)
    }
}

/// Factory provider that is never cached: every resolution constructs.
pub struct Transient;

impl Transient {
    pub fn new<T, F>(factory: F) -> Scoped
    where
        T: Send + Sync + 'static,
        F: Fn(&Dependencies) -> DiResult<T> + Send + Sync + 'static,
    {
        Scoped::new(factory).lifestyle(Lifestyle::Transient)
    }

    pub fn new_async<T, F, Fut>(factory: F) -> Scoped
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<T>> + Send + 'static,
    {
        Scoped::new_async(factory).lifestyle(Lifestyle::Transient)
    }

    pub fn resource<T, F>(factory: F) -> Scoped
    where
        T: Send + Sync + 'static,
        F: Fn(&Dependencies) -> DiResult<Resource<T>> + Send + Sync + 'static,
    {
        Scoped::resource(factory).lifestyle(Lifestyle::Transient)
    }

    pub fn resource_async<T, F, Fut>(factory: F) -> Scoped
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<Resource<T>>> + Send + 'static,
    {
        Scoped::resource_async(factory).lifestyle(Lifestyle::Transient)
    }
}

/// Extracts [`ProviderInfo`] from [`Scoped`] providers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopedExtension;

impl ProviderExtension for ScopedExtension {
    fn name(&self) -> &'static str {
        "scoped"
    }

    fn supports_provider(&self, provider: &dyn Provider) -> bool {
        provider.as_any().is::<Scoped>()
    }

    fn extract(&self, provider: &dyn Provider, context: &ExtractContext<'_>) -> DiResult<ProviderInfo> {
        let scoped = provider
            .as_any()
            .downcast_ref::<Scoped>()
            .ok_or_else(|| DiError::UnsupportedProvider(provider.implementation().to_string()))?;

        let actual_type = scoped
            .actual
            .clone()
            .or_else(|| scoped.interface.clone())
            .ok_or_else(|| DiError::CannotDetermineReturnType(scoped.implementation.to_string()))?;
        let interface = scoped.interface.clone().unwrap_or_else(|| actual_type.clone());

        let dependencies = scoped
            .dependencies
            .iter()
            .map(|declared| match declared {
                Declared::Key(dependency) => Ok(dependency.clone()),
                Declared::Named { name, type_name } => context
                    .types
                    .lookup(type_name)
                    .map(|key| Dependency::new(name.clone(), key.clone()))
                    .ok_or_else(|| DiError::ProviderNotFound(TypeKey::named(type_name.clone()))),
            })
            .collect::<DiResult<Vec<_>>>()?;

        let scope = scoped.scope.unwrap_or_else(|| match scoped.lifestyle {
            Lifestyle::Singleton => context.scopes.first(),
            Lifestyle::Scoped | Lifestyle::Transient => context.scopes.default_scoped(),
        });

        let is_async = matches!(scoped.factory, Factory::Async(_));
        let resolved = Directives::new().resolved(is_async, scoped.context_manager);
        let directives = match scoped.lifestyle {
            Lifestyle::Scoped => resolved.cached(),
            Lifestyle::Singleton => resolved.cached().locked(),
            Lifestyle::Transient => resolved,
        };

        Ok(ProviderInfo {
            interface,
            actual_type,
            dependencies,
            scope,
            directives,
        })
    }
}
