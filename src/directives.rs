//! Compilation directives attached to providers.
//!
//! Directives are independent flags read by the plan compiler. A provider
//! carries at most one directive of each kind.

/// Instances are cached in the owning scope context.
///
/// `optional == false` means the value must already be in the cache (it was
/// seeded into the context); `optional == true` means compute once and store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheDirective {
    pub optional: bool,
}

/// The provider is invoked to construct instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolveDirective {
    /// Construction suspends.
    pub is_async: bool,
    /// The product is a scoped resource with a deferred release.
    pub is_context_manager: bool,
}

/// Concurrent first constructions in one scope context are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockDirective {
    pub enabled: bool,
}

/// The directive set of one provider.
///
/// No cache directive means the provider is transient.
///
/// ```rust
/// use ferrous_inject::Directives;
///
/// let singleton = Directives::new().cached().resolved(false, true).locked();
/// assert!(singleton.is_cached() && singleton.is_locked());
/// assert!(singleton.is_context_manager());
///
/// let transient = Directives::new().resolved(false, false);
/// assert!(!transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Directives {
    pub cache: Option<CacheDirective>,
    pub resolve: Option<ResolveDirective>,
    pub lock: Option<LockDirective>,
}

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute once per scope context, then reuse.
    pub fn cached(mut self) -> Self {
        self.cache = Some(CacheDirective { optional: true });
        self
    }

    /// The value must be present in the cache before resolution.
    pub fn required(mut self) -> Self {
        self.cache = Some(CacheDirective { optional: false });
        self
    }

    pub fn resolved(mut self, is_async: bool, is_context_manager: bool) -> Self {
        self.resolve = Some(ResolveDirective {
            is_async,
            is_context_manager,
        });
        self
    }

    pub fn locked(mut self) -> Self {
        self.lock = Some(LockDirective { enabled: true });
        self
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.map_or(false, |lock| lock.enabled)
    }

    pub fn is_async(&self) -> bool {
        self.resolve.map_or(false, |resolve| resolve.is_async)
    }

    pub fn is_context_manager(&self) -> bool {
        self.resolve.map_or(false, |resolve| resolve.is_context_manager)
    }
}
