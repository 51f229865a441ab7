//! Internal implementation details.

use std::future::Future;
use std::pin::Pin;

pub(crate) mod exit_stack;
pub(crate) mod locks;

pub(crate) use exit_stack::ExitStack;
pub(crate) use locks::KeyLocks;

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
