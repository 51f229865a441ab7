//! Scope contexts and the scope chain.
//!
//! A [`Context`] is one live instance of a scope tier. It owns a cache of
//! instances built in that tier and a LIFO cleanup stack, and sees every
//! ancestor context through its scope chain, so instances owned by outer
//! tiers are shared with inner ones.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::container::ContainerCore;
use crate::engine;
use crate::error::{DiError, DiResult};
use crate::internal::{ExitStack, KeyLocks};
use crate::key::TypeKey;
use crate::plan::Mode;
use crate::providers::{downcast, downcast_all, downcast_all_trait, downcast_trait, Release};
use crate::registration::Instance;
use crate::scope::Scope;

/// Values placed into a new context's cache before any resolution.
///
/// Seeded values satisfy [`FromContext`](crate::FromContext) providers.
#[derive(Clone, Default)]
pub struct ContextSeed {
    values: HashMap<TypeKey, Instance>,
}

impl ContextSeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.with_arc(Arc::new(value))
    }

    pub fn with_arc<T: Send + Sync + 'static>(self, value: Arc<T>) -> Self {
        self.with_instance(TypeKey::of::<T>(), value)
    }

    /// Seeds an instance under an arbitrary key.
    pub fn with_instance(mut self, key: TypeKey, instance: Instance) -> Self {
        self.values.insert(key, instance);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Cache, cleanup stack and construction locks of one context.
pub(crate) struct ScopeState {
    scope: Scope,
    cache: Mutex<HashMap<TypeKey, Instance>>,
    exit_stack: Mutex<ExitStack>,
    locks: KeyLocks,
}

impl ScopeState {
    pub(crate) fn new(scope: Scope, seed: ContextSeed) -> Self {
        Self {
            scope,
            cache: Mutex::new(seed.values),
            exit_stack: Mutex::new(ExitStack::default()),
            locks: KeyLocks::default(),
        }
    }

    pub(crate) fn scope(&self) -> Scope {
        self.scope
    }

    pub(crate) fn cached(&self, key: &TypeKey) -> Option<Instance> {
        self.cache.lock().get(key).cloned()
    }

    /// Stores unless another resolution got there first; returns the winner.
    pub(crate) fn store(&self, key: TypeKey, instance: Instance) -> Instance {
        self.cache.lock().entry(key).or_insert(instance).clone()
    }

    pub(crate) fn push_release(&self, resource: TypeKey, release: Release) {
        self.exit_stack.lock().push(resource, release);
    }

    pub(crate) fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    pub(crate) fn take_exit_stack(&self) -> ExitStack {
        std::mem::take(&mut *self.exit_stack.lock())
    }
}

impl Drop for ScopeState {
    fn drop(&mut self) {
        let pending = self.exit_stack.get_mut().len();
        if pending > 0 {
            warn!(
                scope = %self.scope,
                pending,
                "scope context dropped with unreleased resources; close it to run their releases"
            );
        }
    }
}

/// A live scope context.
///
/// Cloning is cheap and yields a handle to the same context. Contexts are
/// obtained from a container ([`Container::context`]) and nest through
/// [`child`](Context::child), one tier at a time.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_inject::{Scoped, Singleton, SyncContainer};
///
/// struct Pool;
/// struct Session;
///
/// let container = SyncContainer::new();
/// container.register(Singleton::new(|_| Ok(Pool))).unwrap();
/// container.register(Scoped::new(|_| Ok(Session))).unwrap();
///
/// let first = container.context().unwrap();
/// let second = container.context().unwrap();
///
/// // Outer-tier instances are shared across requests...
/// assert!(Arc::ptr_eq(&first.get_sync::<Pool>().unwrap(), &second.get_sync::<Pool>().unwrap()));
/// // ...request-tier instances are not.
/// assert!(!Arc::ptr_eq(&first.get_sync::<Session>().unwrap(), &second.get_sync::<Session>().unwrap()));
/// ```
///
/// [`Container::context`]: crate::Container::context
#[derive(Clone)]
pub struct Context {
    chain: Arc<[Arc<ScopeState>]>,
    core: Arc<ContainerCore>,
}

impl Context {
    pub(crate) fn root(core: Arc<ContainerCore>, state: Arc<ScopeState>) -> Self {
        Self {
            chain: Arc::from(vec![state]),
            core,
        }
    }

    // The chain always holds at least the root state.
    pub(crate) fn state(&self) -> &Arc<ScopeState> {
        &self.chain[self.chain.len() - 1]
    }

    pub(crate) fn core(&self) -> &Arc<ContainerCore> {
        &self.core
    }

    /// Live context of `scope` in this chain, if any.
    pub(crate) fn state_for(&self, scope: Scope) -> Option<&Arc<ScopeState>> {
        self.chain
            .get(scope.depth())
            .filter(|state| state.scope() == scope)
    }

    /// This chain truncated to `scope`.
    pub(crate) fn ancestor(&self, scope: Scope) -> Context {
        let chain = match self.chain.get(..=scope.depth()) {
            Some(prefix) if prefix.len() < self.chain.len() => Arc::from(prefix),
            _ => self.chain.clone(),
        };
        Context {
            chain,
            core: self.core.clone(),
        }
    }

    /// Tier of this context.
    pub fn scope(&self) -> Scope {
        self.state().scope()
    }

    /// Opens a context at the next tier.
    ///
    /// Fails with [`DiError::NoScope`] if this context is already at the
    /// innermost tier.
    pub fn child(&self) -> DiResult<Context> {
        self.child_with(ContextSeed::default())
    }

    /// Opens a context at the next tier with a pre-seeded cache.
    pub fn child_with(&self, seed: ContextSeed) -> DiResult<Context> {
        let scope = self.core.scopes.next(Some(self.scope()))?;
        let mut chain = self.chain.to_vec();
        chain.push(Arc::new(ScopeState::new(scope, seed)));
        trace!(scope = %scope, "opened scope context");
        Ok(Context {
            chain: chain.into(),
            core: self.core.clone(),
        })
    }

    /// Resolves `key`, awaiting async providers.
    pub async fn resolve(&self, key: &TypeKey) -> DiResult<Instance> {
        let plan = self.core.plan(key, Mode::Async)?;
        engine::run_async(&plan, self).await
    }

    /// Resolves `key` without suspending.
    ///
    /// Fails with [`DiError::AsyncProvider`] if any provider in the
    /// dependency graph is async.
    pub fn resolve_sync(&self, key: &TypeKey) -> DiResult<Instance> {
        let plan = self.core.plan(key, Mode::Sync)?;
        engine::run_sync(&plan, self)
    }

    pub async fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast(self.resolve(&TypeKey::of::<T>()).await?)
    }

    pub async fn get_trait<I: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<I>> {
        downcast_trait(&self.resolve(&TypeKey::of::<I>()).await?)
    }

    /// Every provider of `T`, in registration order.
    pub async fn get_all<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        downcast_all(&self.resolve(&TypeKey::many(TypeKey::of::<T>())).await?)
    }

    pub async fn get_all_trait<I: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<I>>> {
        downcast_all_trait(&self.resolve(&TypeKey::many(TypeKey::of::<I>())).await?)
    }

    pub fn get_sync<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast(self.resolve_sync(&TypeKey::of::<T>())?)
    }

    pub fn get_trait_sync<I: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<I>> {
        downcast_trait(&self.resolve_sync(&TypeKey::of::<I>())?)
    }

    pub fn get_all_sync<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        downcast_all(&self.resolve_sync(&TypeKey::many(TypeKey::of::<T>()))?)
    }

    pub fn get_all_trait_sync<I: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<I>>> {
        downcast_all_trait(&self.resolve_sync(&TypeKey::many(TypeKey::of::<I>()))?)
    }

    /// Releases this context's resources, newest first.
    ///
    /// Every release is attempted; failures come back as one
    /// [`DiError::Cleanup`] or a [`DiError::Teardown`] aggregate.
    pub async fn close(&self) -> DiResult<()> {
        let stack = self.state().take_exit_stack();
        if !stack.is_empty() {
            trace!(scope = %self.scope(), resources = stack.len(), "closing scope context");
        }
        stack.unwind().await
    }

    /// Releases this context's resources without suspending; async releases
    /// are reported as failures.
    pub fn close_sync(&self) -> DiResult<()> {
        let stack = self.state().take_exit_stack();
        if !stack.is_empty() {
            trace!(scope = %self.scope(), resources = stack.len(), "closing scope context");
        }
        stack.unwind_sync()
    }

    /// Runs `body` in a child context and closes it afterwards.
    ///
    /// An error from `body` takes precedence over cleanup errors.
    pub async fn scoped<F, Fut, R>(&self, body: F) -> DiResult<R>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = DiResult<R>>,
    {
        self.scoped_with(ContextSeed::default(), body).await
    }

    pub async fn scoped_with<F, Fut, R>(&self, seed: ContextSeed, body: F) -> DiResult<R>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = DiResult<R>>,
    {
        let child = self.child_with(seed)?;
        let result = body(child.clone()).await;
        let closed = child.close().await;
        finish(result, closed)
    }

    /// Synchronous [`scoped`](Context::scoped).
    pub fn scoped_sync<F, R>(&self, body: F) -> DiResult<R>
    where
        F: FnOnce(&Context) -> DiResult<R>,
    {
        self.scoped_sync_with(ContextSeed::default(), body)
    }

    pub fn scoped_sync_with<F, R>(&self, seed: ContextSeed, body: F) -> DiResult<R>
    where
        F: FnOnce(&Context) -> DiResult<R>,
    {
        let child = self.child_with(seed)?;
        let result = body(&child);
        let closed = child.close_sync();
        finish(result, closed)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("scope", &self.scope())
            .field("depth", &(self.chain.len() - 1))
            .finish()
    }
}

/// Combines a body's outcome with the cleanup that followed it.
pub(crate) fn finish<R>(result: DiResult<R>, closed: DiResult<()>) -> DiResult<R> {
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup)) => {
            warn!(error = %cleanup, "cleanup failed while an earlier error was propagating");
            Err(err)
        }
    }
}
