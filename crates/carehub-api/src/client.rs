// Generic REST resource client.
//
// `ApiClient` owns the HTTP client, base URL and token source.
// `ResourceClient<T>` binds it to one resource path and entity type and
// exposes the five verbs every resource supports. No caching happens here.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::TokenSource;
use crate::envelope::{Envelope, Page};
use crate::error::{Error, FieldError};
use crate::params::{ListParams, Resource, ResourceName};
use crate::transport::TransportConfig;

// ── Error response shapes ────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "Message")]
    message: Option<String>,
    #[serde(default, alias = "Title")]
    title: Option<String>,
    #[serde(default, alias = "Errors")]
    errors: Option<ErrorDetails>,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ErrorDetails {
    Fields(BTreeMap<String, Vec<String>>),
    List(Vec<String>),
}

// ── Options ──────────────────────────────────────────────────────────

/// HTTP verb used for updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMethod {
    #[default]
    Patch,
    Put,
}

/// Whether requests carry the bearer token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Access {
    /// Bearer token required; requests fail fast without one.
    #[default]
    Authenticated,
    /// No token attached.
    Public,
}

// ── ApiClient ────────────────────────────────────────────────────────

/// Shared HTTP plumbing for all resource clients. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiInner>,
}

struct ApiInner {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
    timeout: Duration,
}

impl ApiClient {
    /// Build a client from a transport config.
    pub fn new(
        base_url: &str,
        tokens: Arc<dyn TokenSource>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_timeout(base_url, http, tokens, transport.timeout)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, Error> {
        Self::with_timeout(base_url, http, tokens, Duration::from_secs(30))
    }

    fn with_timeout(
        base_url: &str,
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            inner: Arc::new(ApiInner {
                http,
                base_url,
                tokens,
                timeout,
            }),
        })
    }

    /// Parse the base URL and make sure it ends with `/` so resource
    /// segments append instead of replacing the last path component.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// A client for a named resource with a caller-chosen entity type.
    pub fn resource<T>(&self, name: impl Into<ResourceName>) -> ResourceClient<T> {
        ResourceClient {
            api: self.clone(),
            name: name.into(),
            update_method: UpdateMethod::default(),
            access: Access::default(),
            _entity: PhantomData,
        }
    }

    /// A client for a typed entity, using its declared resource path.
    pub fn typed<T: Resource>(&self) -> ResourceClient<T> {
        self.resource(T::resource_name())
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append path segments to the base URL, percent-encoding each one.
    fn url(&self, resource: &ResourceName, id: Option<&str>) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(resource.as_str().split('/').filter(|s| !s.is_empty()));
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    // ── Request plumbing ─────────────────────────────────────────────

    fn request(&self, method: Method, url: Url, access: Access) -> Result<RequestBuilder, Error> {
        let builder = self.inner.http.request(method, url);
        match access {
            Access::Public => Ok(builder),
            Access::Authenticated => {
                let token = self.inner.tokens.bearer_token().ok_or(Error::Unauthenticated)?;
                Ok(builder.bearer_auth(token.expose_secret()))
            }
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, Error> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: self.inner.timeout.as_secs(),
                }
            } else {
                Error::Transport(e)
            }
        })
    }

    async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp.text().await?)
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
        if status == StatusCode::UNAUTHORIZED {
            return Error::SessionExpired;
        }

        let raw = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorBody>(&raw).ok();

        let field_errors = match parsed.as_ref().and_then(|b| b.errors.as_ref()) {
            Some(ErrorDetails::Fields(fields)) => fields
                .iter()
                .map(|(field, messages)| FieldError {
                    field: field.clone(),
                    messages: messages.clone(),
                })
                .collect(),
            Some(ErrorDetails::List(messages)) => vec![FieldError {
                field: String::new(),
                messages: messages.clone(),
            }],
            None => Vec::new(),
        };

        let message = parsed
            .and_then(|b| b.message.or(b.title))
            .or_else(|| (!raw.trim().is_empty() && raw.len() <= 200).then(|| raw.trim().to_owned()))
            .unwrap_or_else(|| status.to_string());

        if status == StatusCode::CONFLICT {
            Error::ConflictInUse { message }
        } else {
            Error::Server {
                status: status.as_u16(),
                message,
                field_errors,
            }
        }
    }
}

fn parse_entity<T: DeserializeOwned>(body: String) -> Result<T, Error> {
    let source = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(source).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::MalformedResponse {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Writes may answer 204 or an empty 200; that is a success without a
/// record to echo back.
fn parse_written<T: DeserializeOwned>(body: String) -> Result<Option<T>, Error> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    parse_entity(body).map(Some)
}

// ── ResourceClient ───────────────────────────────────────────────────

/// Typed client for one REST resource.
pub struct ResourceClient<T> {
    api: ApiClient,
    name: ResourceName,
    update_method: UpdateMethod,
    access: Access,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            name: self.name.clone(),
            update_method: self.update_method,
            access: self.access,
            _entity: PhantomData,
        }
    }
}

impl<T> ResourceClient<T> {
    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Use PUT instead of PATCH for updates.
    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = method;
        self
    }

    /// Send requests without a bearer token.
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}

impl<T: DeserializeOwned> ResourceClient<T> {
    /// `GET /{resource}` with paging and filter parameters.
    pub async fn list(&self, params: &ListParams) -> Result<Page<T>, Error> {
        let url = self.api.url(&self.name, None);
        let query = params.to_query();
        debug!("GET {url} params={query:?}");

        let builder = self.api.request(Method::GET, url, self.access)?.query(&query);
        let resp = self.api.send(builder).await?;
        let body = ApiClient::read_body(resp).await?;
        Ok(Envelope::<T>::parse(&body).normalize(params.page))
    }

    /// `GET /{resource}/{id}`
    pub async fn get(&self, id: &str) -> Result<T, Error> {
        let url = self.api.url(&self.name, Some(id));
        debug!("GET {url}");

        let builder = self.api.request(Method::GET, url, self.access)?;
        let resp = self.api.send(builder).await?;
        parse_entity(ApiClient::read_body(resp).await?)
    }

    /// `POST /{resource}`. `None` when the backend answers without a body.
    pub async fn create<B: Serialize + Sync + ?Sized>(&self, body: &B) -> Result<Option<T>, Error> {
        let url = self.api.url(&self.name, None);
        debug!("POST {url}");

        let builder = self.api.request(Method::POST, url, self.access)?.json(body);
        let resp = self.api.send(builder).await?;
        parse_written(ApiClient::read_body(resp).await?)
    }

    /// `PATCH /{resource}/{id}` (or `PUT`, see [`UpdateMethod`]). `None`
    /// when the backend answers without a body.
    pub async fn update<B: Serialize + Sync + ?Sized>(&self, id: &str, body: &B) -> Result<Option<T>, Error> {
        let url = self.api.url(&self.name, Some(id));
        let method = match self.update_method {
            UpdateMethod::Patch => Method::PATCH,
            UpdateMethod::Put => Method::PUT,
        };
        debug!("{method} {url}");

        let builder = self.api.request(method, url, self.access)?.json(body);
        let resp = self.api.send(builder).await?;
        parse_written(ApiClient::read_body(resp).await?)
    }

    /// `DELETE /{resource}/{id}`
    pub async fn remove(&self, id: &str) -> Result<(), Error> {
        let url = self.api.url(&self.name, Some(id));
        debug!("DELETE {url}");

        let builder = self.api.request(Method::DELETE, url, self.access)?;
        let resp = self.api.send(builder).await?;
        ApiClient::read_body(resp).await.map(|_| ())
    }
}
