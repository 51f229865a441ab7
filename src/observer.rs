//! On-resolve observer that reports constructions through `tracing`.
//!
//! Register it for either mode (or both) on a container builder:
//!
//! ```rust
//! use ferrous_inject::{Container, Extension, TracingObserver};
//!
//! let container = Container::builder()
//!     .extension(Extension::on_resolve(TracingObserver::new()))
//!     .extension(Extension::on_resolve_sync(TracingObserver::with_label("sync")))
//!     .build()
//!     .unwrap();
//! # drop(container);
//! ```
//!
//! Observers see constructions only; cache hits are silent.

use async_trait::async_trait;
use tracing::debug;

use crate::context::Context;
use crate::extensions::{OnResolveExtension, SyncOnResolveExtension};
use crate::registration::{Instance, ProviderRecord};

/// Logs every construction at debug level.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    label: &'static str,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self { label: "ferrous-inject" }
    }

    /// Observer whose events carry `label`, to tell containers apart.
    pub fn with_label(label: &'static str) -> Self {
        Self { label }
    }

    fn record(&self, context: &Context, record: &ProviderRecord) {
        debug!(
            label = self.label,
            interface = %record.info.interface,
            actual = %record.info.actual_type,
            scope = %context.scope(),
            implementation = %record.provider.implementation(),
            "provided instance"
        );
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncOnResolveExtension for TracingObserver {
    fn on_resolve(&self, context: &Context, record: &ProviderRecord, _instance: &Instance) {
        self.record(context, record);
    }
}

#[async_trait]
impl OnResolveExtension for TracingObserver {
    async fn on_resolve(&self, context: &Context, record: &ProviderRecord, _instance: &Instance) {
        self.record(context, record);
    }
}
