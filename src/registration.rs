//! Provider registration types and the provider registry.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::directives::Directives;
use crate::error::{DiError, DiResult};
use crate::extensions::{ExtractContext, ProviderExtension};
use crate::key::TypeKey;
use crate::providers::Provider;
use crate::scope::{Scope, Scopes};

/// Type-erased instance as stored in scope caches.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// One named input of a provider's factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub name: Arc<str>,
    pub type_key: TypeKey,
}

impl Dependency {
    pub fn new(name: impl Into<Arc<str>>, type_key: TypeKey) -> Self {
        Self {
            name: name.into(),
            type_key,
        }
    }
}

/// Normalized description of one provider, produced by a [`ProviderExtension`].
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// Type callers request.
    pub interface: TypeKey,
    /// Concrete type produced; instances are cached under this key.
    pub actual_type: TypeKey,
    /// Factory inputs, in declaration order.
    pub dependencies: Vec<Dependency>,
    /// Owning scope tier.
    pub scope: Scope,
    pub directives: Directives,
}

/// Identity of the thing behind a provider, used to reject duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Implementation {
    /// A fn item or non-capturing closure, identified by its type.
    Factory { id: TypeId, name: &'static str },
    /// A capturing closure, identified by the address of its shared factory.
    Closure { address: usize, name: &'static str },
    /// A pre-built value, identified by its address.
    Instance { address: usize, type_name: &'static str },
    /// A value supplied by the context.
    Context(TypeKey),
}

impl Implementation {
    pub fn of_factory<F: 'static>() -> Self {
        Implementation::Factory {
            id: TypeId::of::<F>(),
            name: std::any::type_name::<F>(),
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Factory { name, .. } => f.write_str(name),
            Implementation::Closure { address, name } => write!(f, "{} at {:#x}", name, address),
            Implementation::Instance { address, type_name } => {
                write!(f, "{} instance at {:#x}", type_name, address)
            }
            Implementation::Context(key) => write!(f, "context value {}", key),
        }
    }
}

/// A registered provider together with its extracted info.
pub struct ProviderRecord {
    pub provider: Arc<dyn Provider>,
    pub info: ProviderInfo,
    pub extension: Arc<dyn ProviderExtension>,
}

impl ProviderRecord {
    /// Presents a concrete instance as the requested interface.
    pub(crate) fn expose(&self, instance: Instance) -> DiResult<Instance> {
        self.provider.as_interface(instance)
    }
}

impl fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRecord")
            .field("implementation", &self.provider.implementation())
            .field("info", &self.info)
            .field("extension", &self.extension.name())
            .finish()
    }
}

/// Declaration of a generic type: its parameter names and generic bases.
///
/// ```rust
/// use ferrous_inject::{TypeDecl, TypeKey};
///
/// // struct Repo<T>: Store<T>
/// let decl = TypeDecl::new("Repo")
///     .params(["T"])
///     .base(TypeKey::named("Store").with_args([TypeKey::param("T")]));
/// assert_eq!(decl.params.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: Arc<str>,
    pub params: Vec<Arc<str>>,
    pub bases: Vec<TypeKey>,
}

impl TypeDecl {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            bases: Vec::new(),
        }
    }

    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn base(mut self, base: TypeKey) -> Self {
        self.bases.push(base);
        self
    }
}

/// Name lookup for produced types and generic declarations.
#[derive(Debug, Default, Clone)]
pub struct TypeTable {
    names: HashMap<Arc<str>, TypeKey>,
    decls: HashMap<Arc<str>, TypeDecl>,
}

impl TypeTable {
    /// Records `key` under its origin name and under the last path segment
    /// of that name. Short names never shadow an earlier entry.
    pub(crate) fn record(&mut self, key: &TypeKey) {
        let origin = key.origin();
        let name: Arc<str> = Arc::from(origin.name());
        if let Some(short) = short_name(&name) {
            self.names
                .entry(Arc::from(short))
                .or_insert_with(|| origin.clone());
        }
        self.names.insert(name, origin);
    }

    pub(crate) fn declare(&mut self, decl: TypeDecl) {
        self.decls.insert(decl.name.clone(), decl);
    }

    /// Type registered under `name`, full or short.
    pub fn lookup(&self, name: &str) -> Option<&TypeKey> {
        self.names.get(name)
    }

    pub fn declaration(&self, name: &str) -> Option<&TypeDecl> {
        self.decls.get(name)
    }

    /// Parameter bindings for a produced type.
    ///
    /// Binds the declaration's parameters to the key's arguments, then
    /// follows the declaration's generic bases so that a non-generic type
    /// deriving from `Service<i32>` binds `Service`'s parameter as well.
    pub fn bindings(&self, key: &TypeKey) -> HashMap<Arc<str>, TypeKey> {
        let mut bindings = HashMap::new();
        let mut visited = HashSet::new();
        self.collect_bindings(key, &mut bindings, &mut visited);
        bindings
    }

    fn collect_bindings(
        &self,
        key: &TypeKey,
        bindings: &mut HashMap<Arc<str>, TypeKey>,
        visited: &mut HashSet<Arc<str>>,
    ) {
        let Some(decl) = self.decls.get(key.name()) else {
            return;
        };
        if !visited.insert(decl.name.clone()) {
            return;
        }
        for (param, arg) in decl.params.iter().zip(key.args()) {
            bindings.entry(param.clone()).or_insert_with(|| arg.clone());
        }
        for base in &decl.bases {
            let bound = base.substitute(bindings);
            self.collect_bindings(&bound, bindings, visited);
        }
    }
}

fn short_name(name: &str) -> Option<&str> {
    name.rsplit_once("::").map(|(_, short)| short)
}

/// Ordered provider records per interface.
pub struct Registry {
    providers: HashMap<TypeKey, Vec<Arc<ProviderRecord>>>,
    order: Vec<Arc<ProviderRecord>>,
    types: TypeTable,
    scopes: Scopes,
    extensions: Vec<Arc<dyn ProviderExtension>>,
}

impl Registry {
    pub(crate) fn new(scopes: Scopes, extensions: Vec<Arc<dyn ProviderExtension>>) -> Self {
        Self {
            providers: HashMap::new(),
            order: Vec::new(),
            types: TypeTable::default(),
            scopes,
            extensions,
        }
    }

    /// Classifies and stores a provider.
    ///
    /// The first extension that supports the provider extracts its info.
    pub(crate) fn register(&mut self, provider: Arc<dyn Provider>) -> DiResult<Arc<ProviderRecord>> {
        let extension = self
            .extensions
            .iter()
            .find(|ext| ext.supports_provider(provider.as_ref()))
            .cloned()
            .ok_or_else(|| DiError::UnsupportedProvider(provider.implementation().to_string()))?;

        let info = extension.extract(
            provider.as_ref(),
            &ExtractContext {
                types: &self.types,
                scopes: &self.scopes,
            },
        )?;

        if !self.scopes.contains(info.scope) {
            return Err(DiError::UnknownScope {
                ty: info.interface,
                scope: info.scope.name(),
            });
        }

        let implementation = provider.implementation();
        let existing = self.providers.entry(info.interface.clone()).or_default();
        if existing
            .iter()
            .any(|record| record.provider.implementation() == implementation)
        {
            return Err(DiError::DuplicateProvider {
                interface: info.interface,
                implementation: implementation.to_string(),
            });
        }

        debug!(
            interface = %info.interface,
            actual = %info.actual_type,
            scope = %info.scope,
            extension = extension.name(),
            "registered provider"
        );

        self.types.record(&info.actual_type);
        self.types.record(&info.interface);

        let record = Arc::new(ProviderRecord {
            provider,
            info,
            extension,
        });
        existing.push(record.clone());
        self.order.push(record.clone());
        Ok(record)
    }

    /// First-registered provider for `key`.
    pub fn get_provider(&self, key: &TypeKey) -> DiResult<&Arc<ProviderRecord>> {
        self.providers
            .get(key)
            .and_then(|records| records.first())
            .ok_or_else(|| DiError::ProviderNotFound(key.clone()))
    }

    /// Every provider for `key`, in registration order.
    pub fn get_providers(&self, key: &TypeKey) -> DiResult<&[Arc<ProviderRecord>]> {
        match self.providers.get(key) {
            Some(records) if !records.is_empty() => Ok(records),
            _ => Err(DiError::ProviderNotFound(key.clone())),
        }
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.providers.get(key).map_or(false, |records| !records.is_empty())
    }

    /// All records in registration order.
    pub fn records(&self) -> &[Arc<ProviderRecord>] {
        &self.order
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub(crate) fn declare(&mut self, decl: TypeDecl) {
        self.types.declare(decl);
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }
}
