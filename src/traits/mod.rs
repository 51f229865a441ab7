//! Traits implemented by user types.

mod dispose;

pub use dispose::{AsyncDispose, Dispose};
