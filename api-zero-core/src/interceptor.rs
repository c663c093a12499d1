//! Interceptor registry.
//!
//! An [`InterceptorManager`] is an ordered list of [`Interceptor`] slots. Each
//! slot holds an optional fulfilled handler (runs on the success path) and an
//! optional rejected handler (may recover from or rethrow an earlier failure).
//!
//! Registration returns an [`InterceptorId`]. Ids increase monotonically from
//! zero and are never reused; ejecting an id empties its slot without shifting
//! the others.
//!
//! # Example
//!
//! ```ignore
//! use api_zero_core::{Interceptor, InterceptorManager, RequestConfig};
//!
//! let manager = InterceptorManager::<RequestConfig>::new();
//! let id = manager.register(Interceptor::new().on_fulfilled(|mut config: RequestConfig| async move {
//!     config.headers.insert("x-trace", "1".parse().unwrap());
//!     Ok(config)
//! }));
//! manager.eject(id);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ApiError;

/// Type alias for a boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handler invoked with the value flowing through the chain.
pub type OnFulfilled<V> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync>;

/// Handler invoked with an earlier failure. Returning `Ok` recovers.
pub type OnRejected<V> =
    Arc<dyn Fn(ApiError) -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync>;

/// Stable identity of a registered interceptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(usize);

impl InterceptorId {
    pub fn get(self) -> usize {
        self.0
    }
}

/// A pair of optional handlers.
pub struct Interceptor<V> {
    fulfilled: Option<OnFulfilled<V>>,
    rejected: Option<OnRejected<V>>,
}

impl<V> Clone for Interceptor<V> {
    fn clone(&self) -> Self {
        Self {
            fulfilled: self.fulfilled.clone(),
            rejected: self.rejected.clone(),
        }
    }
}

impl<V> Default for Interceptor<V> {
    fn default() -> Self {
        Self {
            fulfilled: None,
            rejected: None,
        }
    }
}

impl<V> fmt::Debug for Interceptor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("fulfilled", &self.fulfilled.is_some())
            .field("rejected", &self.rejected.is_some())
            .finish()
    }
}

impl<V: Send + 'static> Interceptor<V> {
    /// An interceptor with no handlers; it passes everything through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler for the success path.
    pub fn on_fulfilled<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        self.fulfilled = Some(Arc::new(
            move |value| -> BoxFuture<'static, Result<V, ApiError>> { Box::pin(f(value)) },
        ));
        self
    }

    /// Set the handler for the failure path.
    pub fn on_rejected<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ApiError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        self.rejected = Some(Arc::new(
            move |err| -> BoxFuture<'static, Result<V, ApiError>> { Box::pin(f(err)) },
        ));
        self
    }

    /// Shorthand for a synchronous fulfilled handler that cannot fail.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(V) -> V + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new().on_fulfilled(move |value| {
            let f = f.clone();
            async move { Ok(f(value)) }
        })
    }

    async fn run(&self, current: Result<V, ApiError>) -> Result<V, ApiError> {
        match current {
            Ok(value) => match &self.fulfilled {
                Some(handler) => handler(value).await,
                None => Ok(value),
            },
            Err(err) => match &self.rejected {
                Some(handler) => handler(err).await,
                None => Err(err),
            },
        }
    }
}

struct Slots<V> {
    /// Id of `entries[0]`. Advanced by `clear` so ids are never handed out twice.
    base: usize,
    entries: Vec<Option<Interceptor<V>>>,
}

/// Ordered, shareable registry of interceptors for one value type.
///
/// Cloning a manager yields another handle to the same registry.
pub struct InterceptorManager<V> {
    slots: Arc<Mutex<Slots<V>>>,
}

impl<V> Clone for InterceptorManager<V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<V> Default for InterceptorManager<V> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                base: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<V> fmt::Debug for InterceptorManager<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.lock();
        f.debug_struct("InterceptorManager")
            .field("next_id", &(slots.base + slots.entries.len()))
            .field("active", &slots.entries.iter().flatten().count())
            .finish()
    }
}

impl<V> InterceptorManager<V> {
    fn lock(&self) -> MutexGuard<'_, Slots<V>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Send + 'static> InterceptorManager<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor and return its id.
    pub fn register(&self, interceptor: Interceptor<V>) -> InterceptorId {
        let mut slots = self.lock();
        slots.entries.push(Some(interceptor));
        InterceptorId(slots.base + slots.entries.len() - 1)
    }

    /// Empty the slot for `id`. Unknown or already-ejected ids are ignored.
    pub fn eject(&self, id: InterceptorId) {
        let mut slots = self.lock();
        let Some(index) = id.0.checked_sub(slots.base) else {
            return;
        };
        if let Some(slot) = slots.entries.get_mut(index) {
            *slot = None;
        }
    }

    /// Remove every interceptor. Ids issued before the reset stay inert.
    pub fn clear(&self) {
        let mut slots = self.lock();
        slots.base += slots.entries.len();
        slots.entries.clear();
    }

    /// Number of live (non-ejected) interceptors.
    pub fn len(&self) -> usize {
        self.lock().entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold `initial` through every live interceptor in registration order.
    ///
    /// The handler list is snapshotted up front, so registrations made while
    /// the chain runs only affect later calls.
    pub async fn apply(&self, initial: Result<V, ApiError>) -> Result<V, ApiError> {
        let chain: Vec<Interceptor<V>> = self.lock().entries.iter().flatten().cloned().collect();

        let mut current = initial;
        for interceptor in &chain {
            current = interceptor.run(current).await;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn push(tag: &'static str) -> Interceptor<Vec<&'static str>> {
        Interceptor::map(move |mut v: Vec<&'static str>| {
            v.push(tag);
            v
        })
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_from_zero() {
        let manager = InterceptorManager::new();
        assert_eq!(manager.register(push("a")).get(), 0);
        assert_eq!(manager.register(push("b")).get(), 1);
        assert_eq!(manager.register(push("c")).get(), 2);
        assert_eq!(manager.len(), 3);
    }

    #[tokio::test]
    async fn test_apply_runs_in_registration_order() {
        let manager = InterceptorManager::new();
        manager.register(push("a"));
        manager.register(push("b"));
        let out = manager.apply(Ok(vec![])).await.unwrap();
        assert_eq!(out, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_eject_skips_only_that_slot() {
        let manager = InterceptorManager::new();
        manager.register(push("a"));
        let b = manager.register(push("b"));
        manager.register(push("c"));

        manager.eject(b);
        let out = manager.apply(Ok(vec![])).await.unwrap();
        assert_eq!(out, ["a", "c"]);

        // Ejecting twice or ejecting an unknown id is a no-op
        manager.eject(b);
        manager.eject(InterceptorId(99));
        let out = manager.apply(Ok(vec![])).await.unwrap();
        assert_eq!(out, ["a", "c"]);

        // Later registrations get fresh ids
        assert_eq!(manager.register(push("d")).get(), 3);
    }

    #[tokio::test]
    async fn test_clear_never_reuses_ids() {
        let manager = InterceptorManager::new();
        let a = manager.register(push("a"));
        manager.register(push("b"));
        manager.clear();
        assert!(manager.is_empty());

        let c = manager.register(push("c"));
        assert_eq!(c.get(), 2);

        // Stale id from before the reset does not touch the new slot
        manager.eject(a);
        let out = manager.apply(Ok(vec![])).await.unwrap();
        assert_eq!(out, ["c"]);
    }

    #[tokio::test]
    async fn test_rejection_propagates_without_handler() {
        let manager: InterceptorManager<u32> = InterceptorManager::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        manager.register(Interceptor::new().on_fulfilled(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(v) }
        }));

        let err = manager
            .apply(Err(ApiError::network("down")))
            .await
            .unwrap_err();
        assert!(err.is_network_error());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_handler_can_recover() {
        let manager: InterceptorManager<u32> = InterceptorManager::new();
        manager.register(Interceptor::new().on_rejected(|err: ApiError| async move {
            if err.is_timeout() { Ok(42) } else { Err(err) }
        }));
        manager.register(Interceptor::map(|v: u32| v + 1));

        assert_eq!(manager.apply(Err(ApiError::timeout())).await.unwrap(), 43);
        assert!(manager.apply(Err(ApiError::aborted())).await.is_err());
    }

    #[tokio::test]
    async fn test_fulfilled_error_reaches_next_rejected_handler() {
        let manager: InterceptorManager<u32> = InterceptorManager::new();
        manager.register(
            Interceptor::new()
                .on_fulfilled(|_| async { Err(ApiError::request("bad config")) })
                // A slot's own rejected handler does not see its fulfilled failure
                .on_rejected(|_| async { Ok(1) }),
        );
        manager.register(Interceptor::new().on_rejected(|err: ApiError| async move {
            assert_eq!(err.message(), "bad config");
            Ok(2)
        }));

        assert_eq!(manager.apply(Ok(0)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_registry() {
        let manager: InterceptorManager<u32> = InterceptorManager::new();
        let handle = manager.clone();
        handle.register(Interceptor::map(|v: u32| v * 10));
        assert_eq!(manager.apply(Ok(3)).await.unwrap(), 30);
    }
}
