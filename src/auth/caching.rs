//! A caching decorator for authenticators.
//!
//! [`CachingAuthenticator`] keeps the outcome of recent authentications in a bounded LRU map so
//! that a remote or expensive [`Authenticator`] is only consulted once per credentials and
//! cache period.
//!
//! # Semantics
//!
//! * A rejected authentication (`Ok(None)`) is cached exactly like a successful one.
//! * An [`AuthenticationError`] is never cached. It is handed to every caller waiting for the
//!   failed load and the next lookup tries again.
//! * Concurrent lookups of the same credentials share a single in-flight load. The underlying
//!   authenticator is never invoked twice at the same time for equal credentials.
//! * Invalidating credentials while a load is in flight lets that load finish for its waiters,
//!   but its result is discarded instead of cached.
//! * Loads run as Tokio tasks of their own. They complete even if every caller gave up, and a
//!   panicking authenticator is reported as an [`AuthenticationError`].
//!
//! Cache identity is defined by the credentials' `Hash` and `Eq` implementations. Credentials
//! must therefore have a well-defined structural equality, two values which compare equal are
//! treated as the same cache entry.

use crate::auth::stats::StatsCounter;
use crate::auth::{AuthenticationError, Authenticator, CachePolicy, CacheStats};
use crate::tools::panic_message;
use crate::tools::watch::Watch;
use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

#[cfg(test)]
use mock_instant::thread_local::Instant;
#[cfg(not(test))]
use std::time::Instant;

type LoadResult<P> = Result<Option<P>, AuthenticationError>;
type PendingLoad<P> = Shared<BoxFuture<'static, LoadResult<P>>>;

struct Entry<P> {
    principal: Option<P>,
    written_at: Instant,
    accessed_at: Instant,
}

struct InFlight<P> {
    id: u64,
    load: PendingLoad<P>,
    discard_result: bool,
}

struct State<C: Hash + Eq, P> {
    entries: LruCache<C, Entry<P>>,
    in_flight: HashMap<C, InFlight<P>>,
    next_load_id: u64,
}

struct Inner<C: Hash + Eq, P> {
    policy: CachePolicy,
    caching_enabled: bool,
    state: Mutex<State<C, P>>,
    stats: StatsCounter,
}

/// Wraps an [`Authenticator`] with a bounded, concurrent and invalidatable cache.
///
/// See the [module documentation](self) for the exact caching semantics.
pub struct CachingAuthenticator<C: Hash + Eq, P> {
    underlying: Arc<dyn Authenticator<C, P>>,
    inner: Arc<Inner<C, P>>,
}

impl<C, P> CachingAuthenticator<C, P>
where
    C: Hash + Eq + Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    /// Creates a cache in front of `underlying`, bounded by the given policy.
    pub fn new(underlying: Arc<dyn Authenticator<C, P>>, policy: CachePolicy) -> Self {
        let (entries, caching_enabled) = match policy.capacity() {
            None => (LruCache::unbounded(), true),
            Some(Some(capacity)) => (LruCache::new(capacity), true),
            Some(None) => (LruCache::unbounded(), false),
        };

        CachingAuthenticator {
            underlying,
            inner: Arc::new(Inner {
                policy,
                caching_enabled,
                state: Mutex::new(State {
                    entries,
                    in_flight: HashMap::new(),
                    next_load_id: 0,
                }),
                stats: StatsCounter::default(),
            }),
        }
    }

    /// Resolves the principal for the given credentials, consulting the cache first.
    ///
    /// On a miss this awaits the single in-flight load for these credentials, starting it if
    /// no other caller already did.
    pub async fn authenticate(&self, credentials: &C) -> LoadResult<P> {
        let load = {
            let mut state = self.inner.state.lock();
            if let Some(principal) = self.inner.cached_principal(&mut state, credentials) {
                self.inner.stats.record_hit();
                return Ok(principal);
            }

            self.inner.stats.record_miss();
            match state.in_flight.get(credentials) {
                Some(pending) => pending.load.clone(),
                None => self.start_load(&mut state, credentials.clone()),
            }
        };

        load.await
    }

    fn start_load(&self, state: &mut State<C, P>, credentials: C) -> PendingLoad<P> {
        let id = state.next_load_id;
        state.next_load_id += 1;

        let underlying = Arc::clone(&self.underlying);
        let inner = Arc::downgrade(&self.inner);
        let key = credentials.clone();

        // Detached, the load leaves the in-flight map even if every caller is gone.
        let handle = tokio::spawn(async move {
            let watch = Watch::start();
            let result = AssertUnwindSafe(underlying.authenticate(&key))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(AuthenticationError::backend(anyhow::anyhow!(
                        "Authenticator panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                });
            Inner::complete_load(&inner, id, key, &result, watch.elapsed_us());
            result
        });

        let load = async move {
            handle.await.unwrap_or_else(|err| {
                Err(AuthenticationError::backend(anyhow::anyhow!(
                    "Authentication load was aborted: {}",
                    err
                )))
            })
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            credentials,
            InFlight {
                id,
                load: load.clone(),
                discard_result: false,
            },
        );

        load
    }

    /// Discards the cached principal for the given credentials, if any.
    pub fn invalidate(&self, credentials: &C) {
        let mut state = self.inner.state.lock();
        Inner::invalidate_key(&mut state, credentials);
    }

    /// Discards the cached principals for all given credentials.
    ///
    /// Credentials which are not cached are ignored.
    pub fn invalidate_all_of<'a, I>(&self, credentials: I)
    where
        I: IntoIterator<Item = &'a C>,
        C: 'a,
    {
        let mut state = self.inner.state.lock();
        for key in credentials {
            Inner::invalidate_key(&mut state, key);
        }
    }

    /// Discards every cached principal.
    pub fn invalidate_all(&self) {
        let mut state = self.inner.state.lock();
        let count = state.entries.len();
        state.entries.clear();
        for pending in state.in_flight.values_mut() {
            pending.discard_result = true;
        }

        tracing::debug!("Invalidated {} cached principals", count);
    }

    /// Drops all entries which have expired but were not looked up since.
    pub fn clean_up(&self) {
        let mut state = self.inner.state.lock();
        let now = Instant::now();
        let expired = state
            .entries
            .iter()
            .filter(|(_, entry)| self.inner.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect::<Vec<C>>();

        for key in &expired {
            state.entries.pop(key);
        }
        self.inner.stats.record_evictions(expired.len() as u64);
    }

    /// Returns the approximate number of cached principals.
    ///
    /// Expired entries are only dropped when they are looked up or on [`clean_up`](Self::clean_up),
    /// so they may still be counted here.
    pub fn size(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot()
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }
}

impl<C, P> Inner<C, P>
where
    C: Hash + Eq + Clone,
    P: Clone,
{
    /// Returns the cached principal (which may itself be absent) or `None` on a miss.
    fn cached_principal(&self, state: &mut State<C, P>, credentials: &C) -> Option<Option<P>> {
        let now = Instant::now();
        let entry = state.entries.get_mut(credentials)?;

        if self.is_expired(entry, now) {
            state.entries.pop(credentials);
            self.stats.record_evictions(1);
            return None;
        }

        entry.accessed_at = now;
        Some(entry.principal.clone())
    }

    fn is_expired(&self, entry: &Entry<P>, now: Instant) -> bool {
        self.policy
            .expire_after_write
            .is_some_and(|ttl| now.duration_since(entry.written_at) >= ttl)
            || self
                .policy
                .expire_after_access
                .is_some_and(|ttl| now.duration_since(entry.accessed_at) >= ttl)
    }

    fn invalidate_key(state: &mut State<C, P>, credentials: &C) {
        state.entries.pop(credentials);
        if let Some(pending) = state.in_flight.get_mut(credentials) {
            pending.discard_result = true;
        }
    }

    fn complete_load(
        inner: &Weak<Self>,
        id: u64,
        credentials: C,
        result: &LoadResult<P>,
        load_time_us: u32,
    ) {
        // The cache itself is gone, only the waiters of this load are left.
        let Some(inner) = inner.upgrade() else {
            return;
        };

        match result {
            Ok(_) => inner.stats.record_load_success(load_time_us),
            Err(err) => {
                inner.stats.record_load_failure(load_time_us);
                tracing::debug!("Not caching failed authentication: {}", err);
            }
        }

        let mut state = inner.state.lock();
        let Some(pending) = state.in_flight.get(&credentials) else {
            return;
        };
        if pending.id != id {
            return;
        }

        let discard_result = pending.discard_result;
        state.in_flight.remove(&credentials);

        if let Ok(principal) = result
            && !discard_result
        {
            inner.store(&mut state, credentials, principal.clone());
        }
    }

    fn store(&self, state: &mut State<C, P>, credentials: C, principal: Option<P>) {
        if !self.caching_enabled {
            return;
        }

        if !state.entries.contains(&credentials)
            && state.entries.len() >= state.entries.cap().get()
            && state.entries.pop_lru().is_some()
        {
            self.stats.record_evictions(1);
        }

        let now = Instant::now();
        state.entries.put(
            credentials,
            Entry {
                principal,
                written_at: now,
                accessed_at: now,
            },
        );
    }
}

#[async_trait]
impl<C, P> Authenticator<C, P> for CachingAuthenticator<C, P>
where
    C: Hash + Eq + Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    async fn authenticate(&self, credentials: &C) -> LoadResult<P> {
        CachingAuthenticator::authenticate(self, credentials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::CountingAuthenticator;
    use mock_instant::thread_local::MockClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache_with(
        policy: CachePolicy,
    ) -> (Arc<CountingAuthenticator>, CachingAuthenticator<String, String>) {
        let underlying = Arc::new(CountingAuthenticator::default());
        let cache = CachingAuthenticator::new(underlying.clone(), policy);
        (underlying, cache)
    }

    fn shared_cache_with_delay(
        delay: Duration,
    ) -> (Arc<CountingAuthenticator>, Arc<CachingAuthenticator<String, String>>) {
        let underlying = Arc::new(CountingAuthenticator::with_delay(delay));
        let cache = CachingAuthenticator::new(underlying.clone(), CachePolicy::default());
        (underlying, Arc::new(cache))
    }

    fn key(value: &str) -> String {
        value.to_string()
    }

    /// Fails the first call and succeeds afterwards.
    #[derive(Default)]
    struct FlakyAuthenticator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Authenticator<String, String> for FlakyAuthenticator {
        async fn authenticate(
            &self,
            credentials: &String,
        ) -> Result<Option<String>, AuthenticationError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AuthenticationError::backend(anyhow::anyhow!("Backend down")))
            } else {
                Ok(Some(credentials.clone()))
            }
        }
    }

    #[tokio::test]
    async fn cached_principals_are_served_without_calling_the_authenticator() {
        let (underlying, cache) = cache_with(CachePolicy::default());

        for _ in 0..3 {
            let principal = cache.authenticate(&key("good-guy")).await.unwrap();
            assert_eq!(principal.as_deref(), Some("good-guy"));
        }

        assert_eq!(underlying.calls(), 1);
        let stats = cache.stats();
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.load_count(), 1);
    }

    #[tokio::test]
    async fn absent_principals_are_cached() {
        let (underlying, cache) = cache_with(CachePolicy::default());

        assert_eq!(cache.authenticate(&key("nobody")).await.unwrap(), None);
        assert_eq!(cache.authenticate(&key("nobody")).await.unwrap(), None);

        assert_eq!(underlying.calls(), 1);
        assert_eq!(cache.size(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_share_a_single_load() {
        let (underlying, cache) = shared_cache_with_delay(Duration::from_millis(100));

        let tasks = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.authenticate(&key("good-guy")).await })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let principal = task.await.unwrap().unwrap();
            assert_eq!(principal.as_deref(), Some("good-guy"));
        }

        assert_eq!(underlying.calls(), 1);
        assert_eq!(cache.stats().load_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_all_receive_the_same_error() {
        let (underlying, cache) = shared_cache_with_delay(Duration::from_millis(100));

        let tasks = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.authenticate(&key("bad-guy")).await })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert!(err.to_string().contains("CRAP"));
        }
        assert_eq!(underlying.calls(), 1);

        assert!(cache.authenticate(&key("bad-guy")).await.is_err());
        assert_eq!(underlying.calls(), 2);
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats().load_failure_count, 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let underlying = Arc::new(FlakyAuthenticator::default());
        let cache: CachingAuthenticator<String, String> =
            CachingAuthenticator::new(underlying.clone(), CachePolicy::default());

        assert!(cache.authenticate(&key("user")).await.is_err());
        assert_eq!(
            cache.authenticate(&key("user")).await.unwrap().as_deref(),
            Some("user")
        );

        assert_eq!(underlying.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_a_reload_of_one_entry() {
        let (underlying, cache) = cache_with(CachePolicy::default());
        cache.authenticate(&key("good-guy")).await.unwrap();
        cache.authenticate(&key("other")).await.unwrap();

        cache.invalidate(&key("good-guy"));
        cache.invalidate(&key("never-seen"));

        cache.authenticate(&key("good-guy")).await.unwrap();
        cache.authenticate(&key("other")).await.unwrap();
        assert_eq!(underlying.calls(), 3);
    }

    #[tokio::test]
    async fn invalidate_all_of_only_touches_the_given_credentials() {
        let (underlying, cache) = cache_with(CachePolicy::default());
        for name in ["credentials1", "credentials2", "credentials3"] {
            cache.authenticate(&key(name)).await.unwrap();
        }

        cache.invalidate_all_of(&[key("credentials1"), key("credentials3"), key("unknown")]);
        assert_eq!(cache.size(), 1);

        for name in ["credentials1", "credentials2", "credentials3"] {
            cache.authenticate(&key(name)).await.unwrap();
        }
        assert_eq!(underlying.calls(), 5);
    }

    #[tokio::test]
    async fn invalidate_all_clears_every_entry() {
        let (underlying, cache) = cache_with(CachePolicy::default());
        cache.authenticate(&key("credentials1")).await.unwrap();
        cache.authenticate(&key("credentials2")).await.unwrap();

        cache.invalidate_all();
        assert_eq!(cache.size(), 0);

        cache.authenticate(&key("credentials1")).await.unwrap();
        cache.authenticate(&key("credentials2")).await.unwrap();
        assert_eq!(underlying.calls(), 4);
    }

    #[tokio::test]
    async fn size_and_stats_reflect_distinct_loads() {
        let (_, cache) = cache_with(CachePolicy::default());
        cache.authenticate(&key("credentials1")).await.unwrap();
        cache.authenticate(&key("credentials2")).await.unwrap();

        assert_eq!(cache.size(), 2);
        let stats = cache.stats();
        assert_eq!(stats.load_count(), 2);
        assert_eq!(stats.hit_count, 0);
        assert_eq!(stats.miss_count, 2);
    }

    #[tokio::test]
    async fn a_single_entry_cache_evicts_the_least_recently_used_entry() {
        let (underlying, cache) = cache_with(CachePolicy::default().with_maximum_size(1));

        cache.authenticate(&key("credentials1")).await.unwrap();
        cache.authenticate(&key("credentials2")).await.unwrap();
        cache.authenticate(&key("credentials1")).await.unwrap();

        assert_eq!(underlying.calls(), 3);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.stats().eviction_count, 2);
    }

    #[tokio::test]
    async fn lookups_keep_entries_alive_in_a_bounded_cache() {
        let (underlying, cache) = cache_with(CachePolicy::default().with_maximum_size(2));

        cache.authenticate(&key("a")).await.unwrap();
        cache.authenticate(&key("b")).await.unwrap();
        cache.authenticate(&key("a")).await.unwrap();
        cache.authenticate(&key("c")).await.unwrap();
        cache.authenticate(&key("a")).await.unwrap();

        // "b" was the least recently used entry when "c" was inserted.
        assert_eq!(underlying.calls(), 3);
        cache.authenticate(&key("b")).await.unwrap();
        assert_eq!(underlying.calls(), 4);
    }

    #[tokio::test]
    async fn a_zero_sized_cache_never_caches() {
        let (underlying, cache) = cache_with(CachePolicy::default().with_maximum_size(0));

        cache.authenticate(&key("good-guy")).await.unwrap();
        cache.authenticate(&key("good-guy")).await.unwrap();

        assert_eq!(underlying.calls(), 2);
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test]
    async fn entries_expire_after_write() {
        let (underlying, cache) = cache_with(
            CachePolicy::default().with_expire_after_write(Duration::from_secs(10)),
        );

        cache.authenticate(&key("good-guy")).await.unwrap();
        MockClock::advance(Duration::from_secs(5));
        cache.authenticate(&key("good-guy")).await.unwrap();
        assert_eq!(underlying.calls(), 1);

        MockClock::advance(Duration::from_secs(6));
        cache.authenticate(&key("good-guy")).await.unwrap();
        assert_eq!(underlying.calls(), 2);
        assert_eq!(cache.stats().eviction_count, 1);
    }

    #[tokio::test]
    async fn entries_expire_after_access() {
        let (underlying, cache) = cache_with(
            CachePolicy::default().with_expire_after_access(Duration::from_secs(10)),
        );

        cache.authenticate(&key("good-guy")).await.unwrap();
        MockClock::advance(Duration::from_secs(6));
        cache.authenticate(&key("good-guy")).await.unwrap();
        MockClock::advance(Duration::from_secs(6));
        cache.authenticate(&key("good-guy")).await.unwrap();
        assert_eq!(underlying.calls(), 1);

        MockClock::advance(Duration::from_secs(11));
        cache.authenticate(&key("good-guy")).await.unwrap();
        assert_eq!(underlying.calls(), 2);
    }

    #[tokio::test]
    async fn clean_up_drops_expired_entries() {
        let (_, cache) = cache_with(
            CachePolicy::default().with_expire_after_write(Duration::from_secs(10)),
        );
        cache.authenticate(&key("credentials1")).await.unwrap();
        MockClock::advance(Duration::from_secs(8));
        cache.authenticate(&key("credentials2")).await.unwrap();
        MockClock::advance(Duration::from_secs(3));

        cache.clean_up();

        assert_eq!(cache.size(), 1);
        assert_eq!(cache.stats().eviction_count, 1);
    }

    #[tokio::test]
    async fn invalidating_during_a_load_discards_its_result() {
        let (underlying, cache) = shared_cache_with_delay(Duration::from_millis(50));

        let pending = tokio::spawn({
            let cache = cache.clone();
            async move { cache.authenticate(&key("good-guy")).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate(&key("good-guy"));

        let principal = pending.await.unwrap().unwrap();
        assert_eq!(principal.as_deref(), Some("good-guy"));
        assert_eq!(cache.size(), 0);

        cache.authenticate(&key("good-guy")).await.unwrap();
        assert_eq!(underlying.calls(), 2);
    }

    #[tokio::test]
    async fn the_next_caller_joins_an_abandoned_load() {
        let (underlying, cache) = shared_cache_with_delay(Duration::from_millis(50));

        let abandoned = tokio::spawn({
            let cache = cache.clone();
            async move { cache.authenticate(&key("good-guy")).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        abandoned.abort();

        let principal = cache.authenticate(&key("good-guy")).await.unwrap();
        assert_eq!(principal.as_deref(), Some("good-guy"));
        assert_eq!(underlying.calls(), 1);
        assert_eq!(cache.size(), 1);
    }

    #[tokio::test]
    async fn invalidating_everything_during_a_load_discards_its_result() {
        let (underlying, cache) = shared_cache_with_delay(Duration::from_millis(50));
        cache.authenticate(&key("other")).await.unwrap();

        let pending = tokio::spawn({
            let cache = cache.clone();
            async move { cache.authenticate(&key("good-guy")).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate_all();

        let principal = pending.await.unwrap().unwrap();
        assert_eq!(principal.as_deref(), Some("good-guy"));
        assert_eq!(cache.size(), 0);

        cache.authenticate(&key("good-guy")).await.unwrap();
        assert_eq!(underlying.calls(), 3);
    }

    fn loads_in_flight(cache: &CachingAuthenticator<String, String>) -> usize {
        cache.inner.state.lock().in_flight.len()
    }

    #[tokio::test]
    async fn loads_abandoned_by_all_callers_still_complete() {
        let underlying = Arc::new(CountingAuthenticator::with_delay(Duration::from_millis(50)));
        let policy = CachePolicy::default().with_maximum_size(10);
        let cache: Arc<CachingAuthenticator<String, String>> =
            Arc::new(CachingAuthenticator::new(underlying.clone(), policy));

        let callers = (0..100)
            .map(|index| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.authenticate(&format!("token-{index}")).await })
            })
            .collect::<Vec<_>>();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        for caller in &callers {
            caller.abort();
        }
        assert_eq!(loads_in_flight(&cache), 100);

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(loads_in_flight(&cache), 0);
        assert_eq!(cache.size(), 10);
        assert_eq!(underlying.calls(), 100);
        assert_eq!(cache.stats().load_count(), 100);
    }

    /// Panics on the first call and succeeds afterwards.
    #[derive(Default)]
    struct PanickingAuthenticator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Authenticator<String, String> for PanickingAuthenticator {
        async fn authenticate(
            &self,
            credentials: &String,
        ) -> Result<Option<String>, AuthenticationError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("LDAP client exploded");
            }

            Ok(Some(credentials.clone()))
        }
    }

    #[tokio::test]
    async fn panicking_authenticators_fail_a_single_load() {
        let underlying = Arc::new(PanickingAuthenticator::default());
        let cache: CachingAuthenticator<String, String> =
            CachingAuthenticator::new(underlying.clone(), CachePolicy::default());

        let err = cache.authenticate(&key("user")).await.unwrap_err();
        assert!(err.to_string().contains("LDAP client exploded"), "{err}");
        assert_eq!(loads_in_flight(&cache), 0);

        assert_eq!(
            cache.authenticate(&key("user")).await.unwrap().as_deref(),
            Some("user")
        );
        assert_eq!(underlying.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().load_failure_count, 1);
    }

    #[tokio::test]
    async fn caching_authenticators_can_be_used_as_authenticators() {
        let (underlying, cache) = cache_with(CachePolicy::default());
        let authenticator: Arc<dyn Authenticator<String, String>> = Arc::new(cache);

        authenticator.authenticate(&key("good-guy")).await.unwrap();
        authenticator.authenticate(&key("good-guy")).await.unwrap();

        assert_eq!(underlying.calls(), 1);
    }
}
