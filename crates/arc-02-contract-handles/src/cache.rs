//! # Handle Cache
//!
//! Identity cache of handles keyed by `(contract type, address)`.
//!
//! ## Slot States
//!
//! | State | Meaning | Next |
//! |-------|---------|------|
//! | absent | never hydrated, invalidated, or last hydration failed | `Pending` on lookup |
//! | `Pending` | one hydration in flight, shared by all waiters | `Ready` or absent |
//! | `Ready` | handle available | absent on `invalidate`/`clear` |
//!
//! A pending hydration only settles into its slot if the slot still holds
//! that same hydration, so a result started before `invalidate` or `clear`
//! never repopulates the cache.

use crate::domain::CacheKey;
use crate::errors::{HandleError, HydrationSource};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use shared_types::Address;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

type Hydration<H> = Shared<BoxFuture<'static, Result<Arc<H>, HandleError>>>;

enum Slot<H> {
    Pending(Hydration<H>),
    Ready(Arc<H>),
}

/// Cache guaranteeing one handle instance per key.
pub struct HandleCache<H> {
    entries: Mutex<HashMap<CacheKey, Slot<H>>>,
}

impl<H> HandleCache<H>
where
    H: Send + Sync + 'static,
{
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached handle for the key, hydrating it on a miss.
    ///
    /// Concurrent callers for the same key share one hydration: `hydrate`
    /// runs at most once until it settles, and every waiter receives the
    /// same `Arc` (or the same error).
    ///
    /// `hydrate` is invoked while the cache is locked; it should only build
    /// the future, not drive it.
    ///
    /// # Errors
    ///
    /// `HandleError::Hydration` if `hydrate` fails. The key is left
    /// uncached so a later call retries.
    pub async fn get_or_create<F, Fut, E>(
        &self,
        contract_type: &str,
        address: Address,
        hydrate: F,
    ) -> Result<Arc<H>, HandleError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<H, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let key = CacheKey::new(contract_type, address);

        let hydration = {
            let mut entries = self.entries.lock();
            match entries.get(&key) {
                Some(Slot::Ready(handle)) => return Ok(handle.clone()),
                Some(Slot::Pending(hydration)) => {
                    debug!(key = %key, "Joining in-flight hydration");
                    hydration.clone()
                }
                None => {
                    debug!(key = %key, "Hydrating handle");
                    let hydration = Self::start(key.clone(), hydrate());
                    entries.insert(key.clone(), Slot::Pending(hydration.clone()));
                    hydration
                }
            }
        };

        let outcome = hydration.clone().await;
        self.settle(&key, &hydration, &outcome);
        outcome
    }

    fn start<Fut, E>(key: CacheKey, future: Fut) -> Hydration<H>
    where
        Fut: Future<Output = Result<H, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        async move {
            future.await.map(Arc::new).map_err(|error| HandleError::Hydration {
                key,
                source: Arc::new(error) as HydrationSource,
            })
        }
        .boxed()
        .shared()
    }

    /// Move the slot out of `Pending` once its hydration has finished.
    /// Every waiter calls this; only the first one finds work to do.
    fn settle(&self, key: &CacheKey, hydration: &Hydration<H>, outcome: &Result<Arc<H>, HandleError>) {
        let mut entries = self.entries.lock();
        let current = match entries.get(key) {
            Some(Slot::Pending(current)) => current,
            _ => return,
        };
        if !current.ptr_eq(hydration) {
            return;
        }
        match outcome {
            Ok(handle) => {
                entries.insert(key.clone(), Slot::Ready(handle.clone()));
            }
            Err(error) => {
                warn!(key = %key, error = %error, "Hydration failed, key left uncached");
                entries.remove(key);
            }
        }
    }

    /// Cached handle for the key, without hydrating.
    #[must_use]
    pub fn get(&self, contract_type: &str, address: Address) -> Option<Arc<H>> {
        match self.entries.lock().get(&CacheKey::new(contract_type, address)) {
            Some(Slot::Ready(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Remove the entry for the key. Returns true if one was present.
    pub fn invalidate(&self, contract_type: &str, address: Address) -> bool {
        let removed = self
            .entries
            .lock()
            .remove(&CacheKey::new(contract_type, address))
            .is_some();
        if removed {
            debug!(contract_type, address = %address, "Handle invalidated");
        }
        removed
    }

    /// Remove every entry, including in-flight hydrations.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        debug!(dropped, "Handle cache cleared");
    }

    /// Number of hydrated handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// True if no handle is hydrated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H> Default for HandleCache<H>
where
    H: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
