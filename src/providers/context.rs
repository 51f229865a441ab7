//! Values supplied by the context rather than constructed.

use std::any::Any;

use super::{Dependencies, Provided, Provider};
use crate::directives::Directives;
use crate::error::{DiError, DiResult};
use crate::extensions::{ExtractContext, ProviderExtension};
use crate::key::TypeKey;
use crate::registration::{Implementation, ProviderInfo};
use crate::scope::Scope;

/// Declares a type whose value is seeded into a scope context when the
/// context is created, e.g. the inbound request of a web handler.
///
/// Resolving it from a context that was not seeded fails with
/// [`DiError::MissingContextValue`].
///
/// ```rust
/// use ferrous_inject::{ContextSeed, FromContext, SyncContainer};
///
/// struct Request { path: String }
///
/// let container = SyncContainer::new();
/// container.register(FromContext::of::<Request>()).unwrap();
///
/// let seed = ContextSeed::new().with(Request { path: "/users".into() });
/// let ctx = container.context_with(seed).unwrap();
/// assert_eq!(ctx.get_sync::<Request>().unwrap().path, "/users");
/// ```
pub struct FromContext {
    key: TypeKey,
    scope: Option<Scope>,
}

impl FromContext {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::with_key(TypeKey::of::<T>())
    }

    pub fn with_key(key: TypeKey) -> Self {
        Self { key, scope: None }
    }

    /// Tier whose contexts carry the value; defaults to the tier after the
    /// outermost.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }
}

impl Provider for FromContext {
    fn implementation(&self) -> Implementation {
        Implementation::Context(self.key.clone())
    }

    fn provide(&self, _dependencies: Dependencies) -> DiResult<Provided> {
        Err(DiError::MissingContextValue(self.key.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Extracts [`ProviderInfo`] from [`FromContext`] providers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextExtension;

impl ProviderExtension for ContextExtension {
    fn name(&self) -> &'static str {
        "context"
    }

    fn supports_provider(&self, provider: &dyn Provider) -> bool {
        provider.as_any().is::<FromContext>()
    }

    fn extract(&self, provider: &dyn Provider, context: &ExtractContext<'_>) -> DiResult<ProviderInfo> {
        let from_context = provider
            .as_any()
            .downcast_ref::<FromContext>()
            .ok_or_else(|| DiError::UnsupportedProvider(provider.implementation().to_string()))?;

        Ok(ProviderInfo {
            interface: from_context.key.clone(),
            actual_type: from_context.key.clone(),
            dependencies: Vec::new(),
            scope: from_context.scope.unwrap_or_else(|| context.scopes.default_scoped()),
            directives: Directives::new().required(),
        })
    }
}
