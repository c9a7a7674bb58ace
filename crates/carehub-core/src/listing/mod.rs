// ── Listing orchestration ──
//
// Drives a paginated, filterable list screen. The current `FilterSelection`
// resolves to exactly one cache query; a session task observes it and
// publishes `ListingView`s. Every selection change bumps `generation`, and
// a session only publishes while its generation is current, so a late
// response for an abandoned query can never reach the screen.
//
// Free-text input is debounced. Each keystroke bumps `input_generation`
// and restarts the timer; the timer only applies the text if no newer
// keystroke arrived.

mod source;
mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use carehub_api::{Page, total_pages};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

pub use source::ListSource;
pub use state::{FilterMode, FilterParams, FilterSelection, ListingView, Rows};

use crate::cache::{QueryCache, QueryKey, QueryObserver, QueryResult};
use crate::config::CacheOptions;

/// Tuning for a [`Listing`].
#[derive(Debug, Clone)]
pub struct ListingOptions {
    pub page_size: u32,
    pub debounce: Duration,
    pub cache: CacheOptions,
    pub params: FilterParams,
    /// Filter the first query starts from.
    pub mode: FilterMode,
    /// Page the first query asks for.
    pub page: u32,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            debounce: Duration::from_millis(600),
            cache: CacheOptions::default(),
            params: FilterParams::default(),
            mode: FilterMode::Unfiltered,
            page: 1,
        }
    }
}

fn spawn<F>(task: F) -> Option<JoinHandle<()>>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::runtime::Handle::try_current()
        .ok()
        .map(|handle| handle.spawn(task))
}

fn abort(handle: &mut Option<JoinHandle<()>>) {
    if let Some(h) = handle.take() {
        h.abort();
    }
}

struct ListingState {
    selection: FilterSelection,
    search_input: String,
    generation: u64,
    input_generation: u64,
    /// Total of the last page seen, for clamping before the next arrives.
    known_total: Option<u64>,
    key: Option<QueryKey>,
    session: Option<JoinHandle<()>>,
    debounce: Option<JoinHandle<()>>,
    closed: bool,
}

struct ListingInner<T> {
    source: Arc<dyn ListSource<T>>,
    cache: Arc<QueryCache>,
    options: ListingOptions,
    state: Mutex<ListingState>,
    view: watch::Sender<ListingView<T>>,
}

impl<T> Drop for ListingInner<T> {
    fn drop(&mut self) {
        let st = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        abort(&mut st.session);
        abort(&mut st.debounce);
    }
}

impl<T: Send + Sync + 'static> ListingInner<T> {
    fn state(&self) -> MutexGuard<'_, ListingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point the listing at the query for the current selection.
    fn requery(self: &Arc<Self>, st: &mut ListingState) {
        if st.closed {
            return;
        }
        st.generation += 1;
        abort(&mut st.session);

        let generation = st.generation;
        let params = st.selection.to_params(&self.options.params);
        let key = QueryKey::list(self.source.resource().clone(), params.clone());
        debug!(%key, generation, mode = %st.selection.mode, "listing query");

        let source = Arc::clone(&self.source);
        let observer: QueryObserver<Page<T>> = self.cache.observe_with(
            &key,
            move || source.fetch_page(params.clone()),
            self.options.cache,
        );
        let initial = observer.current();
        st.key = Some(key);
        st.session = spawn(session_task(Arc::downgrade(self), observer, generation));
        self.absorb(st, generation, initial);
    }

    /// Publish a query result if it belongs to the current generation.
    /// Returns `false` once the session should stop.
    fn absorb(self: &Arc<Self>, st: &mut ListingState, generation: u64, result: QueryResult<Page<T>>) -> bool {
        if st.generation != generation || st.closed {
            return false;
        }

        if let Some(page) = result.value.as_ref().filter(|_| !result.is_loading) {
            st.known_total = Some(page.total_records);
            let pages = total_pages(page.total_records, st.selection.page_size);
            if st.selection.page_number > pages {
                debug!(page = st.selection.page_number, pages, "page out of range; clamping");
                st.selection.page_number = pages;
                self.requery(st);
                return false;
            }
        }

        let total_records = result
            .value
            .as_ref()
            .map(|p| p.total_records)
            .or(st.known_total)
            .unwrap_or(0);
        let view = ListingView {
            degraded: result.value.as_ref().is_some_and(|p| p.degraded),
            rows: Rows(result.value),
            page_number: st.selection.page_number,
            total_pages: total_pages(total_records, st.selection.page_size),
            total_records,
            is_loading: result.is_loading,
            is_error: result.is_error,
            error: result.error,
            selection: st.selection.clone(),
            generation,
        };
        self.view.send_replace(view);
        true
    }

    /// Resolve the typed text into a mode and query it.
    fn apply_search(self: &Arc<Self>, st: &mut ListingState) {
        abort(&mut st.debounce);
        let text = st.search_input.trim().to_owned();
        let mode = if text.is_empty() {
            match &st.selection.mode {
                FilterMode::ByFreeText(_) => FilterMode::Unfiltered,
                other => other.clone(),
            }
        } else {
            FilterMode::ByFreeText(text)
        };
        self.select(st, mode);
    }

    /// Switch mode; a different mode starts again from page 1.
    fn select(self: &Arc<Self>, st: &mut ListingState, mode: FilterMode) {
        if st.selection.mode != mode {
            st.selection.mode = mode;
            st.selection.page_number = 1;
            st.known_total = None;
        }
        self.requery(st);
    }
}

async fn session_task<T: Send + Sync + 'static>(
    listing: Weak<ListingInner<T>>,
    mut observer: QueryObserver<Page<T>>,
    generation: u64,
) {
    while let Some(result) = observer.changed().await {
        let Some(inner) = listing.upgrade() else { break };
        let mut st = inner.state();
        if !inner.absorb(&mut st, generation, result) {
            break;
        }
    }
}

async fn debounce_task<T: Send + Sync + 'static>(listing: Weak<ListingInner<T>>, delay: Duration, input_generation: u64) {
    tokio::time::sleep(delay).await;
    let Some(inner) = listing.upgrade() else { return };
    let mut st = inner.state();
    if st.input_generation != input_generation {
        return;
    }
    // This task is the one being cleared; dropping its handle detaches it.
    st.debounce = None;
    inner.apply_search(&mut st);
}

// ── Listing ──────────────────────────────────────────────────────────

/// A paginated, filterable view over one list resource. Cheap to clone;
/// all clones drive the same state.
pub struct Listing<T> {
    inner: Arc<ListingInner<T>>,
}

impl<T> Clone for Listing<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> Listing<T> {
    /// Create a listing and issue its first query, for `options.mode` on
    /// `options.page` (unfiltered page 1 unless set). Must be called inside
    /// a Tokio runtime.
    pub fn new(source: Arc<dyn ListSource<T>>, cache: Arc<QueryCache>, options: ListingOptions) -> Self {
        let mut selection = FilterSelection::new(options.page_size);
        selection.mode = options.mode.clone().normalized();
        selection.page_number = options.page.max(1);
        let search_input = match &selection.mode {
            FilterMode::ByFreeText(text) => text.clone(),
            _ => String::new(),
        };
        let (view, _) = watch::channel(ListingView::initial(selection.clone()));
        let inner = Arc::new(ListingInner {
            source,
            cache,
            options,
            state: Mutex::new(ListingState {
                selection,
                search_input,
                generation: 0,
                input_generation: 0,
                known_total: None,
                key: None,
                session: None,
                debounce: None,
                closed: false,
            }),
            view,
        });
        {
            let mut st = inner.state();
            inner.requery(&mut st);
        }
        Self { inner }
    }

    fn update(&self, f: impl FnOnce(&Arc<ListingInner<T>>, &mut ListingState)) {
        let mut st = self.inner.state();
        if !st.closed {
            f(&self.inner, &mut st);
        }
    }

    // ── Filters ──────────────────────────────────────────────────────

    /// Show one category. Clears free text and any condition filter.
    pub fn select_category(&self, category: impl Into<String>) {
        let category = category.into();
        self.update(|inner, st| {
            st.search_input.clear();
            abort(&mut st.debounce);
            inner.select(st, FilterMode::ByCategory(category).normalized());
        });
    }

    /// Show one condition. Clears free text and any category filter.
    pub fn select_condition(&self, condition: impl Into<String>) {
        let condition = condition.into();
        self.update(|inner, st| {
            st.search_input.clear();
            abort(&mut st.debounce);
            inner.select(st, FilterMode::ByCondition(condition).normalized());
        });
    }

    /// Record a keystroke. The text is applied once input has been quiet
    /// for the debounce window.
    pub fn type_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|inner, st| {
            st.search_input = text;
            st.input_generation += 1;
            st.generation += 1;
            abort(&mut st.session);
            abort(&mut st.debounce);
            st.debounce = spawn(debounce_task(
                Arc::downgrade(inner),
                inner.options.debounce,
                st.input_generation,
            ));
        });
    }

    /// Apply free text immediately, skipping the debounce window.
    pub fn search_now(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|inner, st| {
            st.search_input = text;
            st.input_generation += 1;
            inner.apply_search(st);
        });
    }

    /// Back to the unfiltered first page.
    pub fn clear_filters(&self) {
        self.update(|inner, st| {
            st.search_input.clear();
            st.input_generation += 1;
            abort(&mut st.debounce);
            inner.select(st, FilterMode::Unfiltered);
        });
    }

    // ── Paging ───────────────────────────────────────────────────────

    /// Go to `page`, clamped to `1..=total_pages` as far as it is known.
    pub fn set_page(&self, page: u32) {
        self.update(|inner, st| {
            let last = st
                .known_total
                .map_or(u32::MAX, |total| total_pages(total, st.selection.page_size));
            let page = page.clamp(1, last);
            if page != st.selection.page_number {
                st.selection.page_number = page;
                inner.requery(st);
            }
        });
    }

    pub fn next_page(&self) {
        let page = self.inner.state().selection.page_number;
        self.set_page(page.saturating_add(1));
    }

    pub fn previous_page(&self) {
        let page = self.inner.state().selection.page_number;
        self.set_page(page.saturating_sub(1));
    }

    /// Change the page size. Starts again from page 1.
    pub fn set_page_size(&self, size: u32) {
        let size = size.max(1);
        self.update(|inner, st| {
            if size != st.selection.page_size {
                st.selection.page_size = size;
                st.selection.page_number = 1;
                inner.requery(st);
            }
        });
    }

    /// Invalidate the active query so it is fetched again.
    pub fn refetch(&self) {
        let key = self.inner.state().key.clone();
        if let Some(key) = key {
            self.inner.cache.invalidate(key);
        }
    }

    /// Stop observing. Later operations are ignored, and anyone waiting in
    /// [`settled`](Self::settled) gets the last view back.
    pub fn close(&self) {
        let mut st = self.inner.state();
        if st.closed {
            return;
        }
        st.closed = true;
        st.generation += 1;
        abort(&mut st.session);
        abort(&mut st.debounce);

        let generation = st.generation;
        self.inner.view.send_modify(|v| {
            v.is_loading = false;
            v.generation = generation;
        });
    }

    // ── Output ───────────────────────────────────────────────────────

    pub fn view(&self) -> ListingView<T> {
        self.inner.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListingView<T>> {
        self.inner.view.subscribe()
    }

    pub fn selection(&self) -> FilterSelection {
        self.inner.state().selection.clone()
    }

    pub fn search_input(&self) -> String {
        self.inner.state().search_input.clone()
    }

    /// Wait until the current query has produced a non-loading view.
    pub async fn settled(&self) -> ListingView<T> {
        let mut rx = self.inner.view.subscribe();
        loop {
            let (target, closed) = {
                let st = self.inner.state();
                (st.generation, st.closed)
            };
            if closed {
                return self.view();
            }
            let seen = match rx.wait_for(|v| v.generation >= target && !v.is_loading).await {
                Ok(view) => view.clone(),
                Err(_) => return self.view(),
            };
            if seen.generation == self.inner.state().generation {
                return seen;
            }
        }
    }
}
