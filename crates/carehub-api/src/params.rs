// Resource identity and list parameters.
//
// `ResourceName` + `ListParams` together identify one list query. Both are
// `Hash + Eq` and normalized (filters are kept sorted) so two logically
// equal queries always compare equal.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;

/// Path of a REST resource, e.g. `"Asset"` or `"Guardian"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceName(Cow<'static, str>);

impl ResourceName {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ResourceName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for ResourceName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// A typed entity served by a REST resource.
pub trait Resource: DeserializeOwned + Send + Sync + 'static {
    /// Resource path on the backend.
    const NAME: &'static str;

    fn resource_name() -> ResourceName {
        ResourceName::from_static(Self::NAME)
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    /// Build a page request; zero values are raised to 1.
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    /// Index of the first item on this page.
    pub fn offset(&self) -> usize {
        let skipped = u64::from(self.number.saturating_sub(1)) * u64::from(self.size);
        usize::try_from(skipped).unwrap_or(usize::MAX)
    }
}

/// Parameters of a list request: optional paging plus filter pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListParams {
    pub page: Option<PageRequest>,
    filters: BTreeMap<String, String>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paged(number: u32, size: u32) -> Self {
        Self {
            page: Some(PageRequest::new(number, size)),
            filters: BTreeMap::new(),
        }
    }

    /// Add a filter. Values are trimmed; empty values are dropped so that
    /// `search=""` and no search share one identity.
    pub fn filter(mut self, key: impl Into<String>, value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.filters.insert(key.into(), value.to_owned());
        }
        self
    }

    pub fn filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Query-string pairs in a stable order.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(self.filters.len() + 2);
        if let Some(page) = self.page {
            query.push(("pageNumber".to_owned(), page.number.to_string()));
            query.push(("pageSize".to_owned(), page.size.to_string()));
        }
        query.extend(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_order_does_not_change_identity() {
        let a = ListParams::paged(1, 10)
            .filter("categoryId", "3")
            .filter("search", "chair");
        let b = ListParams::paged(1, 10)
            .filter("search", "chair")
            .filter("categoryId", "3");
        assert_eq!(a, b);
    }

    #[test]
    fn blank_filters_are_dropped() {
        let params = ListParams::new().filter("search", "   ");
        assert_eq!(params, ListParams::new());
    }

    #[test]
    fn page_request_is_one_based() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page.number, 1);
        assert_eq!(page.size, 1);
        assert_eq!(PageRequest::new(3, 5).offset(), 10);
    }

    #[test]
    fn query_pairs_put_paging_first() {
        let query = ListParams::paged(2, 25).filter("condition", "Good").to_query();
        assert_eq!(
            query,
            vec![
                ("pageNumber".to_owned(), "2".to_owned()),
                ("pageSize".to_owned(), "25".to_owned()),
                ("condition".to_owned(), "Good".to_owned()),
            ]
        );
    }
}
