// carehub-api: Async typed REST client for the care-facility administration API

pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;
pub mod params;
pub mod transport;

pub use auth::{SharedToken, StaticToken, TokenSource};
pub use client::{Access, ApiClient, ResourceClient, UpdateMethod};
pub use envelope::{Envelope, Page, total_pages};
pub use error::{Error, FieldError};
pub use params::{ListParams, PageRequest, Resource, ResourceName};
pub use transport::{TlsMode, TransportConfig};
