// ── Cache identity ──

use std::fmt;

use carehub_api::{ListParams, ResourceName};

/// What a cached query holds: one page of a list, or a single record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryScope {
    List(ListParams),
    Item(String),
}

/// Cache key: resource path plus normalized request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: ResourceName,
    pub scope: QueryScope,
}

impl QueryKey {
    pub fn list(resource: impl Into<ResourceName>, params: ListParams) -> Self {
        Self {
            resource: resource.into(),
            scope: QueryScope::List(params),
        }
    }

    pub fn item(resource: impl Into<ResourceName>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            scope: QueryScope::Item(id.into()),
        }
    }

    /// Whether this key belongs to `resource` or a sub-path of it.
    pub fn belongs_to(&self, resource: &ResourceName) -> bool {
        let own = self.resource.as_str();
        let root = resource.as_str().trim_end_matches('/');
        own == root
            || own
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            QueryScope::Item(id) => write!(f, "{}/{id}", self.resource),
            QueryScope::List(params) => {
                write!(f, "{}", self.resource)?;
                let query = params.to_query();
                for (i, (k, v)) in query.iter().enumerate() {
                    let sep = if i == 0 { '?' } else { '&' };
                    write!(f, "{sep}{k}={v}")?;
                }
                Ok(())
            }
        }
    }
}

/// Selects cache entries to invalidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidateFilter {
    /// Exactly one key.
    Key(QueryKey),
    /// Every key of a resource, every filtered variant and item included.
    Resource(ResourceName),
}

impl InvalidateFilter {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::Key(k) => k == key,
            Self::Resource(r) => key.belongs_to(r),
        }
    }
}

impl From<QueryKey> for InvalidateFilter {
    fn from(key: QueryKey) -> Self {
        Self::Key(key)
    }
}

impl From<ResourceName> for InvalidateFilter {
    fn from(resource: ResourceName) -> Self {
        Self::Resource(resource)
    }
}
