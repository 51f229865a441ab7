//! # ferrous-inject
//!
//! Scoped dependency injection with compiled, cached resolution plans.
//!
//! ## Features
//!
//! - **Scope tiers**: an ordered set of lifetimes (`lifetime`, `request` by
//!   default); every context sees the instances of its ancestors
//! - **Compiled plans**: the dependency graph of a type is built and ordered
//!   once per (type, mode); later resolutions only run the plan
//! - **Scoped resources**: products paired with a release that runs when
//!   their owning context closes, newest first
//! - **Sync and async**: one registry serves both resolution modes
//! - **Collections and generics**: resolve every provider of a type, or a
//!   structurally keyed generic such as `Box<i32>`
//! - **Extensions**: pluggable provider kinds, lifespans and on-resolve
//!   observers
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ferrous_inject::{Scoped, Singleton, SyncContainer};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = SyncContainer::new();
//! container
//!     .register(Singleton::new(|_| {
//!         Ok(Database {
//!             url: "postgres://localhost".to_string(),
//!         })
//!     }))
//!     .unwrap();
//! container
//!     .register(
//!         Scoped::new(|deps| Ok(UserService { db: deps.get("db")? }))
//!             .dependency::<Database>("db"),
//!     )
//!     .unwrap();
//!
//! let request = container.context().unwrap();
//! let users = request.get_sync::<UserService>().unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! request.close_sync().unwrap();
//! ```
//!
//! ## Provider Kinds
//!
//! - **Singleton**: one instance per container, construction serialized
//! - **Scoped**: one instance per request context
//! - **Transient**: a fresh instance on every resolution
//! - **Object**: a pre-built value
//! - **FromContext**: a value seeded into the context by the host
//!
//! ## Trait Resolution
//!
//! ```rust
//! use std::sync::Arc;
//! use ferrous_inject::{SyncContainer, Transient};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! let container = SyncContainer::new();
//! container
//!     .register(Transient::new(|_| Ok(English)).implements(|e: Arc<English>| e as Arc<dyn Greeter>))
//!     .unwrap();
//!
//! let greeter = container.context().unwrap().get_trait_sync::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```
//!
//! ## Scoped Resources
//!
//! ```rust
//! use ferrous_inject::{Container, Resource, Scoped};
//!
//! struct Connection;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ferrous_inject::DiResult<()> {
//! let container = Container::new();
//! container.register(Scoped::resource_async(|_| async {
//!     Ok(Resource::new_async(Connection, |_conn| async { Ok(()) }))
//! }))?;
//!
//! container
//!     .root()
//!     .scoped(|request| async move {
//!         let _conn = request.get::<Connection>().await?;
//!         Ok(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod container;
pub mod context;
pub mod descriptors;
pub mod directives;
pub mod error;
pub mod extensions;
pub mod key;
pub mod observer;
pub mod providers;
pub mod scope;
pub mod traits;

#[cfg(feature = "graph-export")]
pub mod graph_export;

// Internal modules
mod engine;
mod graph;
mod internal;
mod plan;
mod registration;

pub use container::{Container, ContainerBuilder, SyncContainer};
pub use context::{Context, ContextSeed};
pub use descriptors::ProviderDescriptor;
pub use directives::{CacheDirective, Directives, LockDirective, ResolveDirective};
pub use error::{BoxError, DiError, DiResult};
pub use extensions::{
    default_extensions, Extension, Extensions, ExtractContext, LifespanExtension, OnInitExtension,
    OnResolveExtension, ProviderExtension, SyncLifespanExtension, SyncOnResolveExtension,
};
pub use internal::BoxFuture;
pub use key::TypeKey;
pub use observer::TracingObserver;
pub use plan::Mode;
pub use providers::{
    ContextExtension, Dependencies, FromContext, Object, ObjectExtension, Provided, Provider, Release,
    Resource, Scoped, ScopedExtension, Singleton, Transient,
};
pub use registration::{
    Dependency, Implementation, Instance, ProviderInfo, ProviderRecord, TypeDecl, TypeTable,
};
pub use scope::{Scope, Scopes};
pub use traits::{AsyncDispose, Dispose};

#[cfg(feature = "graph-export")]
pub use graph_export::{DependencyGraph, GraphEdge, GraphNode, NodeKind};
