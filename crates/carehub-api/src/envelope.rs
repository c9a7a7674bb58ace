// List response envelopes.
//
// The backend is inconsistent about how it wraps list payloads:
//
//   { "data": [...], "totalRecords": 12, "pageNumber": 1, "pageSize": 5 }
//   { "Data": [...], "TotalRecords": 12, "PageNumber": 1, "PageSize": 5 }
//   [ ... ]
//
// All of them normalize into one `Page<T>`. Anything else degrades to an
// empty page with a warning; a list view over a contract mismatch should
// render empty, not fail.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::params::PageRequest;

// ── Canonical page ───────────────────────────────────────────────────

/// One page of a list resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_records: u64,
    pub page_number: u32,
    pub page_size: u32,
    /// Set when the body matched no known envelope and was replaced by an
    /// empty page.
    #[serde(skip)]
    pub degraded: bool,
}

impl<T> Page<T> {
    /// An empty first page sized after `request`.
    pub fn empty(request: Option<PageRequest>) -> Self {
        let request = request.unwrap_or(PageRequest { number: 1, size: 0 });
        Self {
            items: Vec::new(),
            total_records: 0,
            page_number: 1,
            page_size: request.size,
            degraded: false,
        }
    }

    /// Number of pages for this result, never less than 1.
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_records, self.page_size)
    }
}

/// `ceil(total_records / page_size)`, floored to 1.
pub fn total_pages(total_records: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 1;
    }
    let pages = total_records.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CamelPage<T> {
    data: Vec<T>,
    #[serde(default)]
    total_records: Option<u64>,
    #[serde(default)]
    page_number: Option<u32>,
    #[serde(default)]
    page_size: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PascalPage<T> {
    data: Vec<T>,
    #[serde(default)]
    total_records: Option<u64>,
    #[serde(default)]
    page_number: Option<u32>,
    #[serde(default)]
    page_size: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEnvelope<T> {
    Camel(CamelPage<T>),
    Pascal(PascalPage<T>),
    Bare(Vec<T>),
}

// ── Envelope ─────────────────────────────────────────────────────────

/// A list response body after shape detection.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    /// Server-side paged response.
    Paged {
        items: Vec<T>,
        total_records: Option<u64>,
        page_number: Option<u32>,
        page_size: Option<u32>,
    },
    /// A bare JSON array holding the full result set.
    Bare(Vec<T>),
    /// Body matched no known shape.
    Unrecognized { reason: String },
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Detect the envelope shape of a list body. Never fails.
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<RawEnvelope<T>>(body) {
            Ok(RawEnvelope::Camel(p)) => Self::Paged {
                items: p.data,
                total_records: p.total_records,
                page_number: p.page_number,
                page_size: p.page_size,
            },
            Ok(RawEnvelope::Pascal(p)) => Self::Paged {
                items: p.data,
                total_records: p.total_records,
                page_number: p.page_number,
                page_size: p.page_size,
            },
            Ok(RawEnvelope::Bare(items)) => Self::Bare(items),
            Err(e) => Self::Unrecognized {
                reason: e.to_string(),
            },
        }
    }
}

impl<T> Envelope<T> {
    /// Normalize into a canonical page.
    ///
    /// Bare arrays are paginated locally when a page was requested.
    /// Unrecognized bodies become an empty, `degraded` page.
    pub fn normalize(self, request: Option<PageRequest>) -> Page<T> {
        match self {
            Self::Paged {
                items,
                total_records,
                page_number,
                page_size,
            } => {
                let received = u64::try_from(items.len()).unwrap_or(u64::MAX);
                let page_size = page_size
                    .or(request.map(|r| r.size))
                    .unwrap_or_else(|| u32::try_from(items.len()).unwrap_or(u32::MAX));
                Page {
                    items,
                    total_records: total_records.unwrap_or(received),
                    page_number: page_number.or(request.map(|r| r.number)).unwrap_or(1),
                    page_size,
                    degraded: false,
                }
            }
            Self::Bare(items) => {
                let total_records = u64::try_from(items.len()).unwrap_or(u64::MAX);
                match request {
                    Some(page) => Page {
                        items: items
                            .into_iter()
                            .skip(page.offset())
                            .take(usize::try_from(page.size).unwrap_or(usize::MAX))
                            .collect(),
                        total_records,
                        page_number: page.number,
                        page_size: page.size,
                        degraded: false,
                    },
                    None => Page {
                        page_size: u32::try_from(items.len()).unwrap_or(u32::MAX),
                        items,
                        total_records,
                        page_number: 1,
                        degraded: false,
                    },
                }
            }
            Self::Unrecognized { reason } => {
                warn!(%reason, "unrecognized list envelope; degrading to empty page");
                Page {
                    degraded: true,
                    ..Page::empty(request)
                }
            }
        }
    }
}
