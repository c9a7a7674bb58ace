// ── Cache entry state ──

use std::any::Any;
use std::sync::Arc;

use tokio::time::Instant;

use crate::error::CoreError;

pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

/// Lifecycle of a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryState {
    /// Holds data no older than `stale_time`.
    Fresh,
    /// Holds data that should be refetched on next use.
    #[default]
    Stale,
    /// A fetch is in flight.
    Fetching,
    /// The last fetch failed. Any earlier value is retained.
    Error,
}

/// What the cache publishes to observers on every change.
#[derive(Clone, Default)]
pub(crate) struct EntrySnapshot {
    pub value: Option<Erased>,
    pub fetched_at: Option<Instant>,
    pub state: EntryState,
    /// Set by invalidation, cleared by the next successful fetch.
    pub invalidated: bool,
    pub error: Option<Arc<CoreError>>,
}

impl EntrySnapshot {
    /// Readers must wait for a fetch instead of using what is here.
    pub fn needs_fresh(&self) -> bool {
        self.value.is_none() || self.invalidated || self.state == EntryState::Error
    }

    pub fn is_stale(&self, stale_time: std::time::Duration) -> bool {
        self.fetched_at.is_none_or(|at| at.elapsed() >= stale_time)
    }

    pub fn view<T: Send + Sync + 'static>(&self) -> QueryResult<T> {
        let (value, error) = match self.value.clone().map(|v| v.downcast::<T>()) {
            None => (None, self.error.clone()),
            Some(Ok(v)) => (Some(v), self.error.clone()),
            Some(Err(_)) => (
                None,
                Some(Arc::new(CoreError::Internal(format!(
                    "cached value is not a {}",
                    std::any::type_name::<T>()
                )))),
            ),
        };
        let is_error = error.is_some() && self.state != EntryState::Fetching;
        QueryResult {
            is_loading: self.state == EntryState::Fetching && (value.is_none() || self.invalidated),
            is_error,
            value,
            state: self.state,
            error: if is_error { error } else { None },
            fetched_at: self.fetched_at,
        }
    }
}

/// Typed view of one cache entry.
#[derive(Debug)]
pub struct QueryResult<T> {
    /// Last successfully fetched value, if any.
    pub value: Option<Arc<T>>,
    pub state: EntryState,
    /// A fetch is running and there is no current data to show.
    pub is_loading: bool,
    /// The last fetch failed; `value` (if any) is from an earlier success.
    pub is_error: bool,
    pub error: Option<Arc<CoreError>>,
    pub fetched_at: Option<Instant>,
}

impl<T> Clone for QueryResult<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            state: self.state,
            is_loading: self.is_loading,
            is_error: self.is_error,
            error: self.error.clone(),
            fetched_at: self.fetched_at,
        }
    }
}

impl<T> QueryResult<T> {
    /// Turn into a plain `Result`, preferring the error when the fetch failed.
    pub fn into_result(self) -> Result<Arc<T>, CoreError> {
        match (self.value, self.error) {
            (_, Some(err)) if self.is_error => Err((*err).clone()),
            (Some(v), _) => Ok(v),
            (None, err) => Err(err.map_or_else(
                || CoreError::Internal("query produced no value".into()),
                |e| (*e).clone(),
            )),
        }
    }
}
