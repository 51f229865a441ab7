//! Error types for the dependency injection container.

use thiserror::Error;

use crate::key::TypeKey;

/// Boxed error returned by factories and release actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependency injection errors
///
/// Structural errors (missing or conflicting registrations, scope
/// misconfiguration) are never swallowed by the container; they always reach
/// the caller carrying the offending type.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{DiError, SyncContainer, TypeKey};
///
/// struct Unregistered;
///
/// let container = SyncContainer::new();
/// let ctx = container.context().unwrap();
/// match ctx.resolve_sync(&TypeKey::of::<Unregistered>()) {
///     Err(DiError::ProviderNotFound(key)) => assert_eq!(key, TypeKey::of::<Unregistered>()),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Error)]
pub enum DiError {
    /// No provider registered for the type
    #[error("Provider for type {0} not found")]
    ProviderNotFound(TypeKey),
    /// Same implementation registered twice for one interface
    #[error("Provider for type {interface} with implementation {implementation} already registered")]
    DuplicateProvider {
        interface: TypeKey,
        implementation: String,
    },
    /// No provider extension recognizes the provider
    #[error("No provider extension supports {0}")]
    UnsupportedProvider(String),
    /// Child context requested past the innermost scope tier
    #[error("No scope after {0}")]
    NoScope(&'static str),
    /// A scope set was empty or named a tier twice
    #[error("Invalid scope set: {0}")]
    InvalidScopes(String),
    /// Provider declared a scope outside the container's scope set
    #[error("Scope {scope} of {ty} is not defined for this container")]
    UnknownScope { ty: TypeKey, scope: &'static str },
    /// Produced type could not be established and no interface was given
    #[error("Cannot determine the produced type of {0}")]
    CannotDetermineReturnType(String),
    /// The provider's scope has no live context in the calling chain
    #[error("{ty} lives in scope {scope}, which is not active in this context")]
    ScopeNotActive { ty: TypeKey, scope: &'static str },
    /// A context-supplied value was not seeded into its scope's cache
    #[error("{0} must be supplied by the context but was not")]
    MissingContextValue(TypeKey),
    /// An async provider was reached by a synchronous resolution
    #[error("{0} is provided asynchronously and cannot be resolved synchronously")]
    AsyncProvider(TypeKey),
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", display_path(.0))]
    Circular(Vec<TypeKey>),
    /// Instance downcast failed
    #[error("Type mismatch for {0}")]
    TypeMismatch(&'static str),
    /// A factory asked for an argument it did not declare
    #[error("Missing dependency argument {0}")]
    MissingArgument(String),
    /// A factory failed
    #[error("Provider failed: {0}")]
    Provider(#[source] BoxError),
    /// Releasing a scoped resource failed
    #[error("Releasing {resource} failed: {source}")]
    Cleanup {
        resource: String,
        #[source]
        source: Box<DiError>,
    },
    /// Several resources failed to release; in release order
    #[error("{} resources failed to release, first: {}", .0.len(), display_first(.0))]
    Teardown(Vec<DiError>),
}

impl DiError {
    /// Wraps an arbitrary error raised inside a factory or release action.
    pub fn provider(err: impl Into<BoxError>) -> Self {
        DiError::Provider(err.into())
    }

    /// Collapses cleanup failures: none, the single error, or a `Teardown` aggregate.
    pub(crate) fn from_cleanup(mut errors: Vec<DiError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(DiError::Teardown(errors)),
        }
    }
}

fn display_path(path: &[TypeKey]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn display_first(errors: &[DiError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
