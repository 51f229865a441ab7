//! LIFO stack of release actions owned by one scope context.

use tracing::warn;

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::providers::Release;

struct Entry {
    resource: TypeKey,
    release: Release,
}

/// Release actions in acquisition order; unwound last-in first-out.
///
/// Unwinding is best-effort: a failing release is recorded and the
/// remaining entries are still released.
#[derive(Default)]
pub(crate) struct ExitStack {
    entries: Vec<Entry>,
}

impl ExitStack {
    pub(crate) fn push(&mut self, resource: TypeKey, release: Release) {
        self.entries.push(Entry { resource, release });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every release without suspending. Async releases cannot run here
    /// and are reported as failures.
    pub(crate) fn unwind_sync(self) -> DiResult<()> {
        let mut errors = Vec::new();
        for Entry { resource, release } in self.entries.into_iter().rev() {
            let result = match release {
                Release::Sync(release) => release(),
                Release::Async(_) => Err(DiError::AsyncProvider(resource.clone())),
            };
            if let Err(err) = result {
                errors.push(cleanup_error(resource, err));
            }
        }
        DiError::from_cleanup(errors).map_or(Ok(()), Err)
    }

    /// Runs every release, awaiting async ones.
    pub(crate) async fn unwind(self) -> DiResult<()> {
        let mut errors = Vec::new();
        for Entry { resource, release } in self.entries.into_iter().rev() {
            let result = match release {
                Release::Sync(release) => release(),
                Release::Async(release) => release().await,
            };
            if let Err(err) = result {
                errors.push(cleanup_error(resource, err));
            }
        }
        DiError::from_cleanup(errors).map_or(Ok(()), Err)
    }
}

fn cleanup_error(resource: TypeKey, source: DiError) -> DiError {
    warn!(resource = %resource, error = %source, "releasing scoped resource failed");
    DiError::Cleanup {
        resource: resource.to_string(),
        source: Box::new(source),
    }
}
