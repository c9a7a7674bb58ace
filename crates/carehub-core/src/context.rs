// ── Client context ──
//
// Explicitly constructed bundle of everything a screen needs: the API
// client, the shared query cache and the notification channel. Cloning
// is cheap; every clone shares the same cache and channel.

use std::sync::{Arc, Mutex, PoisonError};

use carehub_api::{ApiClient, ListParams, Page, Resource, ResourceClient, ResourceName, TransportConfig};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{QueryCache, QueryKey, QueryResult};
use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::listing::{ListSource, Listing, ListingOptions};
use crate::mutation::MutationTracker;
use crate::notify::NotificationChannel;

struct ContextInner {
    config: ClientConfig,
    api: ApiClient,
    cache: Arc<QueryCache>,
    notifications: NotificationChannel,
    cancel: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Clone)]
pub struct ClientContext {
    inner: Arc<ContextInner>,
}

impl ClientContext {
    /// Build the HTTP client from `config` and wrap it.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: config.tls.clone().into(),
            timeout: config.timeout,
            ..TransportConfig::default()
        };
        let api = ApiClient::new(config.base_url.as_str(), config.token.clone().into_source(), &transport)?;
        Ok(Self::from_api(api, config))
    }

    /// Wrap an existing API client. `config.base_url` and `config.token`
    /// are not consulted.
    pub fn from_api(api: ApiClient, config: ClientConfig) -> Self {
        let cache = Arc::new(QueryCache::new(config.cache));
        let notifications = NotificationChannel::new(config.notification_duration);
        debug!(base_url = %api.base_url(), "client context created");
        Self {
            inner: Arc::new(ContextInner {
                config,
                api,
                cache,
                notifications,
                cancel: CancellationToken::new(),
                sweeper: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.inner.cache
    }

    pub fn notifications(&self) -> &NotificationChannel {
        &self.inner.notifications
    }

    // ── Resource access ──────────────────────────────────────────────

    pub fn resource<T>(&self, name: impl Into<ResourceName>) -> ResourceClient<T> {
        self.inner.api.resource(name)
    }

    pub fn typed<T: Resource>(&self) -> ResourceClient<T> {
        self.inner.api.typed()
    }

    /// Cached read of one list page.
    pub async fn query_list<T>(&self, client: &ResourceClient<T>, params: ListParams) -> QueryResult<Page<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let key = QueryKey::list(client.name().clone(), params.clone());
        let client = client.clone();
        self.inner
            .cache
            .read(&key, move || client.fetch_page(params.clone()))
            .await
    }

    /// Cached read of one record.
    pub async fn query_item<T>(&self, client: &ResourceClient<T>, id: &str) -> QueryResult<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let key = QueryKey::item(client.name().clone(), id);
        let client = client.clone();
        let id = id.to_owned();
        self.inner
            .cache
            .read(&key, move || {
                let client = client.clone();
                let id = id.clone();
                async move { client.get(&id).await.map_err(CoreError::from) }
            })
            .await
    }

    /// Write tracker wired to this context's cache and notifications.
    pub fn mutation<T>(&self, client: ResourceClient<T>) -> MutationTracker<T> {
        MutationTracker::new(client, Arc::clone(&self.inner.cache), self.inner.notifications.clone())
    }

    // ── Listings ─────────────────────────────────────────────────────

    /// Listing options derived from the context configuration.
    pub fn listing_options(&self) -> ListingOptions {
        let config = &self.inner.config;
        ListingOptions {
            page_size: config.page_size,
            debounce: config.debounce,
            cache: config.cache,
            ..ListingOptions::default()
        }
    }

    pub fn listing<T>(&self, client: ResourceClient<T>) -> Listing<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.listing_with(Arc::new(client), self.listing_options())
    }

    pub fn listing_with<T: Send + Sync + 'static>(
        &self,
        source: Arc<dyn ListSource<T>>,
        options: ListingOptions,
    ) -> Listing<T> {
        Listing::new(source, Arc::clone(&self.inner.cache), options)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the periodic cache sweeper. No-op if already running or if
    /// `gc_interval` is zero.
    pub fn start_gc(&self) {
        let period = self.inner.config.cache.gc_interval;
        if period.is_zero() {
            return;
        }
        let mut sweeper = self.inner.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if sweeper.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        *sweeper = Some(self.inner.cache.spawn_sweeper(period, self.inner.cancel.child_token()));
        info!(?period, "cache sweeper started");
    }

    /// Stop background tasks owned by the context.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.sweeper.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
        debug!("client context shut down");
    }
}
