//! Per-key construction locks for one scope context.

use std::collections::HashMap;
use std::pin::pin;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

use crate::key::TypeKey;

/// Lazily created locks, one per cached type.
#[derive(Default)]
pub(crate) struct KeyLocks {
    locks: Mutex<HashMap<TypeKey, Arc<KeyLock>>>,
}

impl KeyLocks {
    pub(crate) fn get(&self, key: &TypeKey) -> Arc<KeyLock> {
        self.locks.lock().entry(key.clone()).or_default().clone()
    }
}

/// A lock shared by sync and async resolutions of one key.
///
/// Sync callers block on a condvar; async callers wait on a [`Notify`] so no
/// runtime thread is parked while another task builds the value.
#[derive(Default)]
pub(crate) struct KeyLock {
    held: Mutex<bool>,
    released: Condvar,
    notify: Notify,
}

impl KeyLock {
    pub(crate) fn lock_sync(self: &Arc<Self>) -> KeyGuard {
        let mut held = self.held.lock();
        while *held {
            self.released.wait(&mut held);
        }
        *held = true;
        KeyGuard { lock: self.clone() }
    }

    pub(crate) async fn lock(self: &Arc<Self>) -> KeyGuard {
        loop {
            // Registered before the check so a release in between still wakes us.
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            if self.try_acquire() {
                return KeyGuard { lock: self.clone() };
            }
            notified.await;
        }
    }

    fn try_acquire(&self) -> bool {
        let mut held = self.held.lock();
        !std::mem::replace(&mut *held, true)
    }

    fn release(&self) {
        *self.held.lock() = false;
        self.released.notify_all();
        self.notify.notify_waiters();
    }
}

/// Held while a value is constructed; dropping it (also on cancellation)
/// releases the key.
pub(crate) struct KeyGuard {
    lock: Arc<KeyLock>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}
