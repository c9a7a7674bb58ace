// ── Listing data sources ──

use carehub_api::{ListParams, Page, ResourceClient, ResourceName};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;

use crate::error::CoreError;

/// Anything that can serve one page of a list resource.
///
/// Implemented for [`ResourceClient`]; tests and alternative backends can
/// supply their own.
pub trait ListSource<T>: Send + Sync + 'static {
    /// Resource the pages belong to. Used as the cache key prefix.
    fn resource(&self) -> &ResourceName;

    fn fetch_page(&self, params: ListParams) -> BoxFuture<'static, Result<Page<T>, CoreError>>;
}

impl<T> ListSource<T> for ResourceClient<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn resource(&self) -> &ResourceName {
        self.name()
    }

    fn fetch_page(&self, params: ListParams) -> BoxFuture<'static, Result<Page<T>, CoreError>> {
        let client = self.clone();
        async move { client.list(&params).await.map_err(CoreError::from) }.boxed()
    }
}
