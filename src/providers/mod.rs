//! Provider kinds and the [`Provider`] trait.
//!
//! A provider is a registered rule for producing instances of a type. The
//! registry never inspects providers directly; a [`ProviderExtension`]
//! recognizes each provider kind and extracts its [`ProviderInfo`].
//!
//! | Kind | Default scope | Cached | Locked |
//! |------|---------------|--------|--------|
//! | [`Scoped`] | tier after the outermost | yes | no |
//! | [`Singleton`] | outermost | yes | yes |
//! | [`Transient`] | tier after the outermost | no | no |
//! | [`Object`] | outermost | no (always the same value) | no |
//! | [`FromContext`] | tier after the outermost | must be seeded | no |
//!
//! [`ProviderExtension`]: crate::ProviderExtension
//! [`ProviderInfo`]: crate::ProviderInfo

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DiResult;
use crate::registration::{Implementation, Instance};

mod context;
mod dependencies;
mod object;
mod resource;
mod scoped;

pub use context::{ContextExtension, FromContext};
pub use dependencies::Dependencies;
pub(crate) use dependencies::{downcast, downcast_all, downcast_all_trait, downcast_trait};
pub use object::{Object, ObjectExtension};
pub use resource::{Provided, Release, Resource};
pub use scoped::{Scoped, ScopedExtension, Singleton, Transient};

/// A registered rule for producing instances.
///
/// Built-in kinds cover factories, pre-built values and context-supplied
/// values. Custom kinds implement this trait and ship a matching
/// [`ProviderExtension`](crate::ProviderExtension).
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Identity used to reject duplicate registrations.
    fn implementation(&self) -> Implementation;

    /// Produces an instance without suspending.
    fn provide(&self, dependencies: Dependencies) -> DiResult<Provided>;

    /// Produces an instance, possibly suspending.
    async fn provide_async(&self, dependencies: Dependencies) -> DiResult<Provided> {
        self.provide(dependencies)
    }

    /// Converts a cached concrete instance into the shape dependants of the
    /// interface expect.
    fn as_interface(&self, instance: Instance) -> DiResult<Instance> {
        Ok(instance)
    }

    fn as_any(&self) -> &dyn Any;
}

/// Conversion from a concrete instance to an interface instance.
pub(crate) type Upcast = Arc<dyn Fn(Instance) -> DiResult<Instance> + Send + Sync>;

pub(crate) fn upcast<T, I, F>(upcast: F) -> Upcast
where
    T: Send + Sync + 'static,
    I: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
{
    Arc::new(move |instance: Instance| {
        let concrete = downcast::<T>(instance)?;
        Ok(Arc::new(upcast(concrete)) as Instance)
    })
}

pub(crate) fn apply_upcast(upcast: Option<&Upcast>, instance: Instance) -> DiResult<Instance> {
    match upcast {
        Some(upcast) => upcast(instance),
        None => Ok(instance),
    }
}
