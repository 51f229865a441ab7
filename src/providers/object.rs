//! Pre-built values.

use std::any::{type_name, Any};
use std::sync::Arc;

use super::{apply_upcast, upcast, Dependencies, Provided, Provider, Upcast};
use crate::directives::Directives;
use crate::error::{DiError, DiResult};
use crate::extensions::{ExtractContext, ProviderExtension};
use crate::key::TypeKey;
use crate::registration::{Implementation, Instance, ProviderInfo};

/// Provider for a value built before registration.
///
/// Lives in the outermost tier. Every resolution hands out the same value.
///
/// ```rust
/// use ferrous_inject::{Object, SyncContainer};
///
/// let container = SyncContainer::new();
/// container.register(Object::new(42u32)).unwrap();
///
/// let ctx = container.context().unwrap();
/// assert_eq!(*ctx.get_sync::<u32>().unwrap(), 42);
/// ```
pub struct Object {
    value: Instance,
    type_name: &'static str,
    actual: TypeKey,
    interface: Option<TypeKey>,
    upcast: Option<Upcast>,
}

impl Object {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: type_name::<T>(),
            actual: TypeKey::of::<T>(),
            interface: None,
            upcast: None,
        }
    }

    pub fn with_interface(mut self, interface: TypeKey) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Registers under trait object `I`.
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
}

impl Provider for Object {
    fn implementation(&self) -> Implementation {
        Implementation::Instance {
            address: Arc::as_ptr(&self.value) as *const () as usize,
            type_name: self.type_name,
        }
    }

    fn provide(&self, _dependencies: Dependencies) -> DiResult<Provided> {
        Ok(Provided::Value(self.value.clone()))
    }

    fn as_interface(&self, instance: Instance) -> DiResult<Instance> {
        apply_upcast(self.upcast.as_ref(), instance)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Extracts [`ProviderInfo`] from [`Object`] providers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectExtension;

impl ProviderExtension for ObjectExtension {
    fn name(&self) -> &'static str {
        "object"
    }

    fn supports_provider(&self, provider: &dyn Provider) -> bool {
        provider.as_any().is::<Object>()
    }

    fn extract(&self, provider: &dyn Provider, context: &ExtractContext<'_>) -> DiResult<ProviderInfo> {
        let object = provider
            .as_any()
            .downcast_ref::<Object>()
            .ok_or_else(|| DiError::UnsupportedProvider(provider.implementation().to_string()))?;

        Ok(ProviderInfo {
            interface: object.interface.clone().unwrap_or_else(|| object.actual.clone()),
            actual_type: object.actual.clone(),
            dependencies: Vec::new(),
            scope: context.scopes.first(),
            directives: Directives::new().resolved(false, false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_value_every_time() {
        let object = Object::new(String::from("shared"));
        let Provided::Value(a) = object.provide(Dependencies::new()).unwrap() else {
            panic!("expected a value");
        };
        let Provided::Value(b) = object.provide(Dependencies::new()).unwrap() else {
            panic!("expected a value");
        };
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_distinct_values_are_distinct_implementations() {
        assert_ne!(Object::new(1u8).implementation(), Object::new(1u8).implementation());

        let shared = Arc::new(1u8);
        assert_eq!(
            Object::from_arc(shared.clone()).implementation(),
            Object::from_arc(shared).implementation()
        );
    }
}
