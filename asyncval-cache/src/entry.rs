//! The per-key cache record.

use std::fmt;
use std::future::Future;
use std::panic;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::warn;

use asyncval_core::DEFAULT_EXPIRATION;

use crate::time::Instant;

/// The memoized computation behind an entry.
///
/// Nothing runs until the first clone is polled. That first poll spawns the producer
/// as its own task, so it runs to completion even if every caller walks away; every
/// clone observes the same task and the same output.
pub(crate) type Deferred<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// One key's record: its deferred value, expiration time and last access time.
pub struct Entry<K, V, E> {
    key: K,
    deferred: Deferred<V, E>,
    expires_at: Instant,
    last_accessed: Mutex<Instant>,
}

impl<K, V, E> Entry<K, V, E>
where
    K: Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Builds an entry whose computation will call `producer(key)` when first awaited.
    ///
    /// Outside a Tokio runtime the producer runs inline on whoever polls it.
    pub(crate) fn new<F, Fut>(key: K, producer: F, ttl: Duration, now: Instant) -> Self
    where
        F: FnOnce(K) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let producer_key = key.clone();
        let computation = async move {
            let result = producer(producer_key).await;
            if result.is_err() {
                warn!("value producer failed; failure stays cached until the entry is swept");
            }
            result
        };

        let deferred = async move {
            match Handle::try_current() {
                Ok(runtime) => match runtime.spawn(computation).await {
                    Ok(result) => result,
                    Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
                    Err(_) => panic!("value producer task was cancelled by runtime shutdown"),
                },
                Err(_) => computation.await,
            }
        }
        .boxed()
        .shared();

        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(DEFAULT_EXPIRATION))
            .unwrap_or(now);

        Self {
            key,
            deferred,
            expires_at,
            last_accessed: Mutex::new(now),
        }
    }

    /// Returns a handle to the shared computation. Awaiting it triggers the producer
    /// if nobody has yet.
    pub(crate) fn deferred(&self) -> Deferred<V, E> {
        self.deferred.clone()
    }

    /// Returns the resolved outcome, once a caller has awaited the computation to
    /// completion.
    ///
    /// Never starts the computation and never touches the access time.
    pub fn peek(&self) -> Option<Result<V, E>> {
        self.deferred.peek().cloned()
    }
}

impl<K, V, E> Entry<K, V, E> {
    /// The key this entry was created for.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// When the entry becomes eligible for removal. Fixed at creation.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Last time a caller received this entry's value.
    pub fn last_accessed(&self) -> Instant {
        *self.last_accessed.lock()
    }

    /// Checks if the entry has expired as of `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Checks if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Records an access. The access time never moves backwards.
    pub(crate) fn touch(&self, now: Instant) {
        let mut last = self.last_accessed.lock();
        if now > *last {
            *last = now;
        }
    }
}

impl<K: fmt::Debug, V, E> fmt::Debug for Entry<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("expires_at", &self.expires_at)
            .field("last_accessed", &self.last_accessed())
            .finish_non_exhaustive()
    }
}
