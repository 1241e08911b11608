//! Per-key async mutexes.
//!
//! Every read-decide-write sequence on a session holds that session's lock,
//! so a manual refresh and the background sweep cannot interleave on the
//! same row. Different keys never contend.

use std::{
  collections::HashMap,
  hash::Hash,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub(crate) struct KeyedLocks<K> {
  inner: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash> KeyedLocks<K> {
  pub fn new() -> Self { Self { inner: Mutex::new(HashMap::new()) } }

  /// Wait for exclusive access to `key`. Released when the guard drops.
  pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
    let mutex = {
      let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
      // Only the map holds idle entries; drop them so the map stays small.
      map.retain(|_, m| Arc::strong_count(m) > 1);
      Arc::clone(map.entry(key).or_default())
    };
    mutex.lock_owned().await
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}
