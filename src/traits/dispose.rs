//! Disposal traits for scoped resources.

/// Synchronous release of a scoped resource.
///
/// Products implementing this trait can be turned into a [`Resource`] whose
/// release calls `dispose` when the owning scope context is closed.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Dispose, Resource, Scoped, SyncContainer};
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         println!("Flushing cache: {}", self.name);
///     }
/// }
///
/// let container = SyncContainer::new();
/// container
///     .register(Scoped::resource(|_| {
///         Ok(Resource::disposable(Cache { name: "user_cache".to_string() }))
///     }))
///     .unwrap();
///
/// let ctx = container.context().unwrap();
/// let cache = ctx.get_sync::<Cache>().unwrap();
/// assert_eq!(cache.name, "user_cache");
/// ctx.close_sync().unwrap(); // prints "Flushing cache: user_cache"
/// ```
///
/// [`Resource`]: crate::Resource
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Asynchronous release of a scoped resource.
///
/// Resources built from an `AsyncDispose` product can only be released by an
/// async close; a synchronous close reports them as cleanup errors.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use ferrous_inject::{AsyncDispose, Container, Resource, Scoped};
///
/// struct DatabaseClient {
///     connection_id: String,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for DatabaseClient {
///     async fn dispose(&self) {
///         println!("Closing database connection: {}", self.connection_id);
///     }
/// }
///
/// # tokio_test();
/// # fn tokio_test() {
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let container = Container::new();
/// container
///     .register(Scoped::resource_async(|_| async {
///         Ok(Resource::async_disposable(DatabaseClient {
///             connection_id: "conn_123".to_string(),
///         }))
///     }))
///     .unwrap();
///
/// let ctx = container.context().unwrap();
/// let client = ctx.get::<DatabaseClient>().await.unwrap();
/// assert_eq!(client.connection_id, "conn_123");
/// ctx.close().await.unwrap();
/// # });
/// # }
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}
