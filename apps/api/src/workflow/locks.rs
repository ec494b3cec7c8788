//! Per-thread async locks.
//!
//! A turn holds its thread's guard from checkpoint load to checkpoint save,
//! so two turns on one thread never interleave. Different threads never
//! contend. Entries are weak and swept when a new lock is created.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::workflow::store::ThreadId;

#[derive(Default)]
pub struct ThreadLocks {
    registry: Mutex<HashMap<ThreadId, Weak<Mutex<()>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, thread_id: &ThreadId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut registry = self.registry.lock().await;
            match registry.get(thread_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    registry.retain(|_, weak| weak.strong_count() > 0);
                    let lock = Arc::new(Mutex::new(()));
                    registry.insert(thread_id.clone(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.registry.lock().await.len()
    }
}
