//! Query orchestration between `carehub-api` and its consumers.
//!
//! - **[`ClientContext`]**: explicitly constructed bundle of API client,
//!   query cache and notification channel. Every screen takes one.
//!
//! - **[`QueryCache`]**: keyed cache of server state with single-flight
//!   fetching, stale-while-revalidate reads, retries, epoch-checked
//!   invalidation and garbage collection of unobserved entries.
//!
//! - **[`MutationTracker`]**: runs one write at a time through
//!   `Idle -> Pending -> Success | Error`, invalidating the resource's cached
//!   queries after success and publishing a notification either way.
//!
//! - **[`NotificationChannel`]**: single-slot, self-clearing user message.
//!
//! - **[`Listing`]**: filter and pagination state machine for list screens,
//!   with debounced free-text search and generation-checked responses.
//!
//! - **Domain model** ([`model`]): typed records for every facility resource.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod listing;
pub mod model;
pub mod mutation;
pub mod notify;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{EntryState, InvalidateFilter, QueryCache, QueryKey, QueryObserver, QueryResult, QueryScope};
pub use config::{CacheOptions, ClientConfig, TlsVerification, TokenConfig};
pub use context::ClientContext;
pub use error::CoreError;
pub use listing::{
    FilterMode, FilterParams, FilterSelection, ListSource, Listing, ListingOptions, ListingView, Rows,
};
pub use mutation::{MutationKind, MutationStatus, MutationTracker};
pub use notify::{Notification, NotificationChannel, Severity};

pub use model::{
    Appointment, Asset, AssetCategory, AssetCondition, Employee, EntityId, Guardian, InventoryItem,
    Resident, Role, User,
};
