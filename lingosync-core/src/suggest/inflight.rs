//! Per-row in-flight flags for AI suggestion requests
//!
//! Flags are keyed by row identity, never by a global lock, so a bulk run and
//! a single-row request over unrelated rows proceed independently. The inner
//! mutex is only held for the duration of a set operation and never across an
//! await point.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared set of row keys currently awaiting a suggestion
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the keys currently in flight
    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    /// Mark every key that is not already in flight.
    ///
    /// The returned guard holds only the keys this call marked; keys owned by
    /// another request are skipped.
    pub fn acquire<I, S>(&self, keys: I) -> InFlightGuard
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = self.lock();
        let mut held = HashSet::new();
        for key in keys {
            let key = key.into();
            if set.insert(key.clone()) {
                held.insert(key);
            }
        }
        drop(set);

        InFlightGuard {
            set: self.clone(),
            held,
        }
    }

    /// Mark a single key, or `None` if it is already in flight
    pub fn try_acquire_one(&self, key: &str) -> Option<InFlightGuard> {
        let guard = self.acquire([key]);
        if guard.is_empty() {
            None
        } else {
            Some(guard)
        }
    }
}

/// Scoped ownership of a group of in-flight flags.
///
/// Every flag still held is cleared when the guard drops, which covers early
/// returns, errors and cancelled futures alike.
#[derive(Debug)]
pub struct InFlightGuard {
    set: InFlightSet,
    held: HashSet<String>,
}

impl InFlightGuard {
    /// Keys still held, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.held.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn holds(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    /// Clear one flag. Returns false if this guard did not hold it.
    pub fn release(&mut self, key: &str) -> bool {
        if !self.held.remove(key) {
            return false;
        }
        self.set.lock().remove(key);
        true
    }

    pub fn release_all(&mut self) {
        if self.held.is_empty() {
            return;
        }
        let mut set = self.set.lock();
        for key in self.held.drain() {
            set.remove(&key);
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.release_all();
    }
}
