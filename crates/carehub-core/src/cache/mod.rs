// ── Query cache ──
//
// Keyed store of fetched server state. Each key owns one `Slot`: a watch
// channel carrying the entry snapshot, plus the in-flight fetch shared by
// every concurrent reader. Values are type-erased so one cache serves
// every resource.
//
// Invalidation bumps the slot's epoch. A fetch remembers the epoch it was
// started under and only writes back if that epoch is still current, so a
// response that raced a mutation can never overwrite the invalidation.

mod entry;
mod key;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use entry::{EntryState, QueryResult};
pub use key::{InvalidateFilter, QueryKey, QueryScope};

use crate::config::CacheOptions;
use crate::error::CoreError;
use entry::{EntrySnapshot, Erased};

type FetchOutcome = Result<Erased, Arc<CoreError>>;
type ErasedFetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Erased, CoreError>> + Send + Sync>;
type InFlight = Shared<BoxFuture<'static, FetchOutcome>>;

/// How many times a reader follows an invalidated fetch before giving up
/// and returning whatever the entry holds.
const MAX_FOLLOW: usize = 3;

fn erase<T, F, Fut>(fetcher: F) -> ErasedFetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetcher();
        async move { fut.await.map(|v| Arc::new(v) as Erased) }.boxed()
    })
}

async fn run_fetch(fetcher: ErasedFetcher, options: CacheOptions, key: &QueryKey) -> Result<Erased, CoreError> {
    let mut attempt = 0u8;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < options.retries() => {
                attempt += 1;
                warn!(%key, attempt, error = %e, "query failed; retrying");
                tokio::time::sleep(options.retry_delay).await;
            }
            Err(e) => {
                warn!(%key, error = %e, "query failed");
                return Err(e);
            }
        }
    }
}

// ── Slot ─────────────────────────────────────────────────────────────

struct SlotControl {
    inflight: Option<InFlight>,
    epoch: u64,
    fetcher: ErasedFetcher,
    options: CacheOptions,
    unobserved_since: Instant,
}

struct Slot {
    key: QueryKey,
    snapshot: watch::Sender<EntrySnapshot>,
    control: Mutex<SlotControl>,
    observers: AtomicUsize,
}

impl Slot {
    fn new(key: QueryKey, fetcher: ErasedFetcher, options: CacheOptions) -> Self {
        let (snapshot, _) = watch::channel(EntrySnapshot::default());
        Self {
            key,
            snapshot,
            control: Mutex::new(SlotControl {
                inflight: None,
                epoch: 0,
                fetcher,
                options,
                unobserved_since: Instant::now(),
            }),
            observers: AtomicUsize::new(0),
        }
    }

    fn control(&self) -> MutexGuard<'_, SlotControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> EntrySnapshot {
        self.snapshot.borrow().clone()
    }

    fn epoch(&self) -> u64 {
        self.control().epoch
    }

    fn is_observed(&self) -> bool {
        self.observers.load(Ordering::Acquire) > 0
    }

    /// Join the in-flight fetch, or start one. Returns the fetch and the
    /// epoch it belongs to.
    fn fetch(self: &Arc<Self>) -> (InFlight, u64) {
        let mut ctl = self.control();
        let epoch = ctl.epoch;
        if let Some(inflight) = &ctl.inflight {
            return (inflight.clone(), epoch);
        }

        let fetcher = Arc::clone(&ctl.fetcher);
        let options = ctl.options;
        let weak = Arc::downgrade(self);
        let key = self.key.clone();
        let fut = async move {
            debug!(%key, epoch, "fetching");
            let result = run_fetch(fetcher, options, &key).await.map_err(Arc::new);
            if let Some(slot) = weak.upgrade() {
                slot.settle(epoch, &result);
            }
            result
        }
        .boxed()
        .shared();

        ctl.inflight = Some(fut.clone());
        self.snapshot.send_modify(|s| s.state = EntryState::Fetching);
        drop(ctl);

        // Driven by its own task so that dropping every reader does not
        // cancel the request half way.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(fut.clone());
        }
        (fut, epoch)
    }

    /// Write a finished fetch back, unless the entry was invalidated since.
    fn settle(&self, epoch: u64, result: &FetchOutcome) {
        let mut ctl = self.control();
        if ctl.epoch != epoch {
            debug!(key = %self.key, epoch, current = ctl.epoch, "discarding superseded fetch");
            return;
        }
        ctl.inflight = None;
        match result {
            Ok(value) => self.snapshot.send_modify(|s| {
                s.value = Some(Arc::clone(value));
                s.fetched_at = Some(Instant::now());
                s.state = EntryState::Fresh;
                s.invalidated = false;
                s.error = None;
            }),
            Err(err) => self.snapshot.send_modify(|s| {
                s.state = EntryState::Error;
                s.error = Some(Arc::clone(err));
            }),
        }
    }

    fn invalidate(&self) {
        let mut ctl = self.control();
        ctl.epoch += 1;
        ctl.inflight = None;
        self.snapshot.send_modify(|s| {
            s.invalidated = true;
            if s.state != EntryState::Error {
                s.state = EntryState::Stale;
            }
        });
    }

    fn register(&self, fetcher: ErasedFetcher, options: CacheOptions) {
        let mut ctl = self.control();
        ctl.fetcher = fetcher;
        ctl.options = options;
    }

    fn touch(&self) {
        if !self.is_observed() {
            self.control().unobserved_since = Instant::now();
        }
    }

    fn release(&self) {
        if self.observers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.control().unobserved_since = Instant::now();
        }
    }

    fn is_collectable(&self, now: Instant) -> bool {
        if self.is_observed() {
            return false;
        }
        let ctl = self.control();
        ctl.inflight.is_none() && now.saturating_duration_since(ctl.unobserved_since) >= ctl.options.cache_time
    }
}

// ── QueryCache ───────────────────────────────────────────────────────

/// Shared cache of query results, keyed by [`QueryKey`].
pub struct QueryCache {
    slots: DashMap<QueryKey, Arc<Slot>>,
    defaults: CacheOptions,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

impl QueryCache {
    pub fn new(defaults: CacheOptions) -> Self {
        Self {
            slots: DashMap::new(),
            defaults,
        }
    }

    pub fn defaults(&self) -> CacheOptions {
        self.defaults
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.slots.contains_key(key)
    }

    fn slot(&self, key: &QueryKey, fetcher: ErasedFetcher, options: CacheOptions) -> Arc<Slot> {
        let slot = Arc::clone(
            self.slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Slot::new(key.clone(), Arc::clone(&fetcher), options)))
                .value(),
        );
        slot.register(fetcher, options);
        slot
    }

    /// Read a query with the cache's default options.
    pub async fn read<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryResult<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        self.read_with(key, fetcher, self.defaults).await
    }

    /// Read a query.
    ///
    /// A cold or invalidated entry waits for its fetch. A warm entry
    /// returns immediately and, once older than `stale_time`, starts a
    /// silent background refetch.
    pub async fn read_with<T, F, Fut>(&self, key: &QueryKey, fetcher: F, options: CacheOptions) -> QueryResult<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let slot = self.slot(key, erase(fetcher), options);

        for _ in 0..MAX_FOLLOW {
            let snap = slot.current();
            if !snap.needs_fresh() {
                if snap.state != EntryState::Fetching && snap.is_stale(options.stale_time) {
                    debug!(%key, "stale; refetching in background");
                    let _ = slot.fetch();
                }
                break;
            }
            let (inflight, epoch) = slot.fetch();
            let _ = inflight.await;
            if slot.epoch() == epoch {
                break;
            }
        }

        slot.touch();
        slot.current().view()
    }

    /// Peek at an entry without fetching.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QueryResult<T>> {
        self.slots.get(key).map(|slot| slot.current().view())
    }

    /// Subscribe to a query with the cache's default options.
    pub fn observe<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryObserver<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        self.observe_with(key, fetcher, self.defaults)
    }

    /// Subscribe to a query. Observed entries are refetched as soon as
    /// they are invalidated. Must be called inside a Tokio runtime for
    /// fetches to be driven.
    pub fn observe_with<T, F, Fut>(&self, key: &QueryKey, fetcher: F, options: CacheOptions) -> QueryObserver<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let slot = self.slot(key, erase(fetcher), options);
        slot.observers.fetch_add(1, Ordering::AcqRel);

        let snap = slot.current();
        let wants_fetch = snap.needs_fresh() || snap.is_stale(options.stale_time);
        if wants_fetch && snap.state != EntryState::Fetching {
            let _ = slot.fetch();
        }

        let rx = slot.snapshot.subscribe();
        QueryObserver {
            slot,
            rx,
            _value: PhantomData,
        }
    }

    /// Mark matching entries stale and refetch the observed ones. Fetches
    /// already in flight for those entries will not write back.
    ///
    /// Returns the number of entries invalidated.
    pub fn invalidate(&self, filter: impl Into<InvalidateFilter>) -> usize {
        let filter = filter.into();
        let matched: Vec<Arc<Slot>> = self
            .slots
            .iter()
            .filter(|e| filter.matches(e.key()))
            .map(|e| Arc::clone(e.value()))
            .collect();

        for slot in &matched {
            slot.invalidate();
            if slot.is_observed() {
                let _ = slot.fetch();
            }
        }
        debug!(?filter, count = matched.len(), "invalidated");
        matched.len()
    }

    /// Drop the entry for `key` regardless of observers.
    pub fn remove(&self, key: &QueryKey) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Remove entries that have gone unobserved for longer than their
    /// `cache_time`. Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_collectable(now));
        let removed = before.saturating_sub(self.slots.len());
        if removed > 0 {
            debug!(removed, "cache garbage collected");
        }
        removed
    }

    /// Run [`collect_garbage`](Self::collect_garbage) every `period` until
    /// `cancel` fires or the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(sweeper_task(cache, period, cancel))
    }
}

async fn sweeper_task(cache: Weak<QueryCache>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(cache) = cache.upgrade() else { break };
                cache.collect_garbage();
            }
        }
    }
}

// ── QueryObserver ────────────────────────────────────────────────────

/// Live subscription to one cache entry.
///
/// Keeps the entry from being garbage collected and makes invalidation
/// refetch it eagerly. Dropping the observer releases both.
pub struct QueryObserver<T> {
    slot: Arc<Slot>,
    rx: watch::Receiver<EntrySnapshot>,
    _value: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    pub fn key(&self) -> &QueryKey {
        &self.slot.key
    }

    /// Latest state of the entry.
    pub fn current(&self) -> QueryResult<T> {
        self.rx.borrow().view()
    }

    /// Wait for the next change.
    pub async fn changed(&mut self) -> Option<QueryResult<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().view())
    }

    /// Wait until no fetch is running, then return the entry.
    pub async fn settled(&mut self) -> QueryResult<T> {
        let snap = match self.rx.wait_for(|s| s.state != EntryState::Fetching).await {
            Ok(snap) => snap.clone(),
            Err(_) => self.slot.current(),
        };
        snap.view()
    }

    /// Fetch now, joining a fetch already in flight.
    pub async fn refetch(&self) -> QueryResult<T> {
        let (inflight, _) = self.slot.fetch();
        let _ = inflight.await;
        self.current()
    }
}

impl<T> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        self.slot.release();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use carehub_api::ListParams;
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(page: u32) -> QueryKey {
        QueryKey::list("Asset", ListParams::paged(page, 5))
    }

    fn lazy() -> CacheOptions {
        CacheOptions::default().with_stale_time(Duration::from_secs(3600))
    }

    /// Fetcher that counts calls and answers with the call number after
    /// `delay`.
    fn counting(calls: &Arc<AtomicU32>, delay: Duration) -> impl Fn() -> BoxFuture<'static, Result<u32, CoreError>> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tokio::time::sleep(delay).await;
                Ok(n)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reads_share_one_fetch() {
        let cache = QueryCache::new(lazy());
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        let (a, b, c) = tokio::join!(
            cache.read(&k, counting(&calls, Duration::from_millis(50))),
            cache.read(&k, counting(&calls, Duration::from_millis(50))),
            cache.read(&k, counting(&calls, Duration::from_millis(50))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for r in [a, b, c] {
            assert_eq!(r.value.as_deref(), Some(&1));
            assert!(!r.is_loading);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn warm_read_returns_cached_value_without_fetching() {
        let cache = QueryCache::new(lazy());
        let calls = Arc::new(AtomicU32::new(0));

        cache.read(&key(1), counting(&calls, Duration::ZERO)).await;
        let again = cache.read(&key(1), counting(&calls, Duration::ZERO)).await;

        assert_eq!(again.value.as_deref(), Some(&1));
        assert_eq!(again.state, EntryState::Fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_read_refetches_in_background() {
        let cache = QueryCache::new(CacheOptions::default().with_stale_time(Duration::from_secs(10)));
        let calls = Arc::new(AtomicU32::new(0));

        cache.read(&key(1), counting(&calls, Duration::from_millis(100))).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        let stale = cache.read(&key(1), counting(&calls, Duration::from_millis(100))).await;
        assert_eq!(stale.value.as_deref(), Some(&1));
        assert!(!stale.is_loading, "background refetch must not show loading");

        tokio::time::sleep(Duration::from_millis(200)).await;
        let fresh = cache.peek::<u32>(&key(1)).unwrap();
        assert_eq!(fresh.value.as_deref(), Some(&2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_discards_in_flight_response() {
        let cache = Arc::new(QueryCache::new(lazy()));
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        let reader = {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let k = k.clone();
            tokio::spawn(async move { cache.read(&k, counting(&calls, Duration::from_millis(100))).await })
        };

        // Let the first fetch start, then invalidate mid-flight.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.invalidate(InvalidateFilter::Resource("Asset".into())), 1);

        let result = reader.await.unwrap();
        assert_eq!(result.value.as_deref(), Some(&2), "reader must see post-invalidation data");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_refetches_observed_entries_only() {
        let cache = QueryCache::new(lazy());
        let calls = Arc::new(AtomicU32::new(0));

        let mut observer = cache.observe::<u32, _, _>(&key(1), counting(&calls, Duration::ZERO));
        assert_eq!(observer.settled().await.value.as_deref(), Some(&1));
        cache.read(&key(2), counting(&calls, Duration::ZERO)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(cache.invalidate(InvalidateFilter::Resource("Asset".into())), 2);
        let refreshed = observer.settled().await;
        assert_eq!(refreshed.value.as_deref(), Some(&3));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "unobserved page 2 is not refetched eagerly");

        let page2 = cache.peek::<u32>(&key(2)).unwrap();
        assert_eq!(page2.state, EntryState::Stale);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_last_value_and_flags_error() {
        let cache = QueryCache::new(lazy().with_retry(0));
        let k = key(1);

        cache.read(&k, || async { Ok::<u32, CoreError>(7) }).await;
        cache.invalidate(k.clone());

        let failed = cache
            .read(&k, || async {
                Err::<u32, _>(CoreError::Server {
                    status: 500,
                    message: "db down".into(),
                    field_errors: Vec::new(),
                })
            })
            .await;

        assert!(failed.is_error);
        assert!(!failed.is_loading);
        assert_eq!(failed.value.as_deref(), Some(&7));
        assert_eq!(failed.state, EntryState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_errors_are_retried_within_budget() {
        let cache = QueryCache::new(lazy().with_retry(2));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = cache
            .read(&key(1), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(CoreError::NetworkFailure { reason: "reset".into() })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.value.as_deref(), Some(&3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn garbage_collection_spares_observed_entries() {
        let opts = CacheOptions {
            cache_time: Duration::from_secs(60),
            ..lazy()
        };
        let cache = QueryCache::new(opts);
        let calls = Arc::new(AtomicU32::new(0));

        cache.read(&key(1), counting(&calls, Duration::ZERO)).await;
        let mut observer = cache.observe::<u32, _, _>(&key(2), counting(&calls, Duration::ZERO));
        observer.settled().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.collect_garbage(), 1);
        assert!(!cache.contains(&key(1)));
        assert!(cache.contains(&key(2)));

        drop(observer);
        assert_eq!(cache.collect_garbage(), 0, "freshly released entry survives");
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.collect_garbage(), 1);
        assert!(cache.is_empty());
    }
}
