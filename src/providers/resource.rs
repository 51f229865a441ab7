//! Provider products: plain values and scoped resources.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::DiResult;
use crate::internal::BoxFuture;
use crate::registration::Instance;
use crate::traits::{AsyncDispose, Dispose};

/// Deferred release action of a scoped resource.
///
/// Releases run when the scope context that owns the resource is closed,
/// in reverse order of acquisition.
pub enum Release {
    Sync(Box<dyn FnOnce() -> DiResult<()> + Send>),
    Async(Box<dyn FnOnce() -> BoxFuture<'static, DiResult<()>> + Send>),
}

impl Release {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() -> DiResult<()> + Send + 'static,
    {
        Release::Sync(Box::new(release))
    }

    pub fn new_async<F, Fut>(release: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        Release::Async(Box::new(move || Box::pin(release())))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Release::Async(_))
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Release::Sync(_) => f.write_str("Release::Sync"),
            Release::Async(_) => f.write_str("Release::Async"),
        }
    }
}

/// What a provider hands back to the engine.
pub enum Provided {
    /// A plain value.
    Value(Instance),
    /// A value whose release is deferred to the owning scope's teardown.
    Resource(Instance, Release),
}

enum TypedRelease<T> {
    Sync(Box<dyn FnOnce(Arc<T>) -> DiResult<()> + Send>),
    Async(Box<dyn FnOnce(Arc<T>) -> BoxFuture<'static, DiResult<()>> + Send>),
}

/// A value paired with the action that releases it.
///
/// Returned by resource factories ([`Scoped::resource`] and friends). The
/// release receives the shared instance once the owning scope closes.
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use ferrous_inject::{Resource, Scoped, SyncContainer};
///
/// struct Connection {
///     closed: Arc<AtomicBool>,
/// }
///
/// let closed = Arc::new(AtomicBool::new(false));
/// let flag = closed.clone();
///
/// let container = SyncContainer::new();
/// container
///     .register(Scoped::resource(move |_| {
///         Ok(Resource::new(Connection { closed: flag.clone() }, |conn| {
///             conn.closed.store(true, Ordering::SeqCst);
///             Ok(())
///         }))
///     }))
///     .unwrap();
///
/// let ctx = container.context().unwrap();
/// ctx.get_sync::<Connection>().unwrap();
/// assert!(!closed.load(Ordering::SeqCst));
/// ctx.close_sync().unwrap();
/// assert!(closed.load(Ordering::SeqCst));
/// ```
///
/// [`Scoped::resource`]: crate::Scoped::resource
pub struct Resource<T> {
    value: T,
    release: TypedRelease<T>,
}

impl<T: Send + Sync + 'static> Resource<T> {
    pub fn new<R>(value: T, release: R) -> Self
    where
        R: FnOnce(Arc<T>) -> DiResult<()> + Send + 'static,
    {
        Self {
            value,
            release: TypedRelease::Sync(Box::new(release)),
        }
    }

    pub fn new_async<R, Fut>(value: T, release: R) -> Self
    where
        R: FnOnce(Arc<T>) -> Fut + Send + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        Self {
            value,
            release: TypedRelease::Async(Box::new(move |value| Box::pin(release(value)))),
        }
    }

    pub(crate) fn into_provided(self) -> Provided {
        let value = Arc::new(self.value);
        let handle = value.clone();
        let release = match self.release {
            TypedRelease::Sync(release) => Release::Sync(Box::new(move || release(handle))),
            TypedRelease::Async(release) => Release::Async(Box::new(move || release(handle))),
        };
        Provided::Resource(value, release)
    }
}

impl<T: Dispose> Resource<T> {
    /// Resource released through [`Dispose::dispose`].
    pub fn disposable(value: T) -> Self {
        Self::new(value, |value| {
            value.dispose();
            Ok(())
        })
    }
}

impl<T: AsyncDispose> Resource<T> {
    /// Resource released through [`AsyncDispose::dispose`].
    pub fn async_disposable(value: T) -> Self {
        Self::new_async(value, |value| async move {
            value.dispose().await;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_release_receives_value() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let resource = Resource::new(7u32, move |value| {
            *sink.lock().unwrap() = Some(*value);
            Ok(())
        });

        let Provided::Resource(instance, release) = resource.into_provided() else {
            panic!("expected a resource");
        };
        assert_eq!(*instance.downcast::<u32>().unwrap(), 7);
        assert!(!release.is_async());

        if let Release::Sync(release) = release {
            release().unwrap();
        }
        assert_eq!(*seen.lock().unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_async_release() {
        let seen = Arc::new(Mutex::new(false));
        let sink = seen.clone();
        let resource = Resource::new_async("conn", move |_| async move {
            *sink.lock().unwrap() = true;
            Ok(())
        });

        let Provided::Resource(_, Release::Async(release)) = resource.into_provided() else {
            panic!("expected an async resource");
        };
        release().await.unwrap();
        assert!(*seen.lock().unwrap());
    }
}
