//! Provider descriptors for introspection and diagnostics.

use crate::registration::ProviderRecord;

/// Snapshot of one registered provider.
///
/// Descriptors are plain data: type names are rendered to strings so they
/// can be printed, compared in tests or (with `graph-export`) serialized.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, Scoped, Singleton};
///
/// struct Pool;
/// struct Repo;
///
/// let container = Container::new();
/// container.register(Singleton::new(|_| Ok(Pool))).unwrap();
/// container
///     .register(Scoped::new(|_| Ok(Repo)).dependency::<Pool>("pool"))
///     .unwrap();
///
/// let descriptors = container.descriptors();
/// assert_eq!(descriptors.len(), 2);
///
/// let pool = &descriptors[0];
/// assert_eq!(pool.scope, "lifetime");
/// assert!(pool.cached && pool.locked);
///
/// let repo = &descriptors[1];
/// assert_eq!(repo.scope, "request");
/// assert_eq!(repo.dependencies[0].0, "pool");
/// assert!(repo.dependencies[0].1.ends_with("Pool"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(serde::Serialize, serde::Deserialize))]
pub struct ProviderDescriptor {
    pub interface: String,
    pub actual_type: String,
    pub scope: String,
    pub cached: bool,
    /// False for values that must be seeded into the context.
    pub constructed: bool,
    pub locked: bool,
    pub is_async: bool,
    pub is_context_manager: bool,
    /// (parameter name, requested type), in declaration order.
    pub dependencies: Vec<(String, String)>,
    pub implementation: String,
    /// Name of the provider extension that classified the provider.
    pub extension: String,
}

impl ProviderDescriptor {
    pub(crate) fn from_record(record: &ProviderRecord) -> Self {
        let info = &record.info;
        Self {
            interface: info.interface.to_string(),
            actual_type: info.actual_type.to_string(),
            scope: info.scope.name().to_string(),
            cached: info.directives.is_cached(),
            constructed: info.directives.resolve.is_some(),
            locked: info.directives.is_locked(),
            is_async: info.directives.is_async(),
            is_context_manager: info.directives.is_context_manager(),
            dependencies: info
                .dependencies
                .iter()
                .map(|dep| (dep.name.to_string(), dep.type_key.to_string()))
                .collect(),
            implementation: record.provider.implementation().to_string(),
            extension: record.extension.name().to_string(),
        }
    }

    /// True if the provider must find its value already in the context.
    pub fn is_context_value(&self) -> bool {
        self.cached && !self.constructed
    }

    /// True if the provider declares a dependency on `type_name`.
    pub fn depends_on(&self, type_name: &str) -> bool {
        self.dependencies.iter().any(|(_, ty)| ty == type_name)
    }
}

#[cfg(test)]
mod tests {
    use crate::container::Container;
    use crate::key::TypeKey;
    use crate::providers::{FromContext, Object, Transient};

    struct Request;
    struct Handler;

    #[test]
    fn test_descriptors_follow_registration_order() {
        let container = Container::new();
        container.register(Object::new(7u32)).unwrap();
        container.register(FromContext::of::<Request>()).unwrap();
        container
            .register(Transient::new_async(|_| async { Ok::<_, crate::DiError>(Handler) }).dependency::<Request>("req"))
            .unwrap();

        let descriptors = container.descriptors();
        let extensions: Vec<_> = descriptors.iter().map(|d| d.extension.as_str()).collect();
        assert_eq!(extensions, ["object", "context", "scoped"]);

        assert!(!descriptors[0].cached);
        assert!(descriptors[1].is_context_value());
        assert!(!descriptors[2].is_context_value());

        let handler = &descriptors[2];
        assert!(handler.is_async);
        assert!(!handler.cached);
        assert!(handler.depends_on(&TypeKey::of::<Request>().to_string()));
    }
}
