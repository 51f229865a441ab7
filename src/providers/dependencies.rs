//! Built dependency instances handed to factories.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::registration::Instance;

/// Named, already-built inputs of a factory.
///
/// Entries follow the provider's declared dependency order. Accessors
/// downcast and fail with [`DiError::TypeMismatch`] when the stored instance
/// is not of the requested type.
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_inject::{Dependencies, Instance};
///
/// let deps = Dependencies::new().with("port", Arc::new(8080u16) as Instance);
/// assert_eq!(*deps.get::<u16>("port").unwrap(), 8080);
/// assert!(deps.get::<u32>("port").is_err());
/// assert!(deps.get::<u16>("host").is_err());
/// ```
#[derive(Clone, Default)]
pub struct Dependencies {
    args: SmallVec<[(Arc<str>, Instance); 4]>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            args: SmallVec::with_capacity(capacity),
        }
    }

    /// Adds an entry; builder form used mostly when calling factories by hand.
    pub fn with(mut self, name: impl Into<Arc<str>>, instance: Instance) -> Self {
        self.push(name.into(), instance);
        self
    }

    pub(crate) fn push(&mut self, name: Arc<str>, instance: Instance) {
        self.args.push((name, instance));
    }

    /// The type-erased instance bound to `name`.
    pub fn instance(&self, name: &str) -> DiResult<&Instance> {
        self.args
            .iter()
            .find(|(arg, _)| &**arg == name)
            .map(|(_, instance)| instance)
            .ok_or_else(|| DiError::MissingArgument(name.to_string()))
    }

    /// A concrete dependency.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        downcast(self.instance(name)?.clone())
    }

    /// A dependency registered through `implements`, as a trait object.
    pub fn get_trait<I: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<I>> {
        downcast_trait(self.instance(name)?)
    }

    /// A collection dependency of concrete instances.
    pub fn get_all<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Vec<Arc<T>>> {
        downcast_all(self.instance(name)?)
    }

    /// A collection dependency of trait objects.
    pub fn get_all_trait<I: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Vec<Arc<I>>> {
        downcast_all_trait(self.instance(name)?)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|(name, _)| &**name)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(instance: Instance) -> DiResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
}

// Trait-object instances are stored as `Arc<Arc<dyn I>>`.
pub(crate) fn downcast_trait<I: ?Sized + Send + Sync + 'static>(instance: &Instance) -> DiResult<Arc<I>> {
    instance
        .downcast_ref::<Arc<I>>()
        .cloned()
        .ok_or(DiError::TypeMismatch(type_name::<I>()))
}

fn members(instance: &Instance) -> DiResult<&Vec<Instance>> {
    instance
        .downcast_ref::<Vec<Instance>>()
        .ok_or(DiError::TypeMismatch(type_name::<Vec<Instance>>()))
}

pub(crate) fn downcast_all<T: Send + Sync + 'static>(instance: &Instance) -> DiResult<Vec<Arc<T>>> {
    members(instance)?.iter().cloned().map(downcast).collect()
}

pub(crate) fn downcast_all_trait<I: ?Sized + Send + Sync + 'static>(
    instance: &Instance,
) -> DiResult<Vec<Arc<I>>> {
    members(instance)?.iter().map(downcast_trait).collect()
}
