// ── Mutation tracking ──
//
// One tracker per write surface (an edit form, a delete button). It runs
// one write at a time through `Idle -> Pending -> Success | Error`, and on
// success invalidates every cached query of the resource. Invalidation
// happens strictly after the success response, never on failure.

use std::future::Future;
use std::sync::Arc;

use carehub_api::{ResourceClient, ResourceName};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cache::{InvalidateFilter, QueryCache};
use crate::error::CoreError;
use crate::notify::NotificationChannel;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    /// Carries the message shown to the user.
    Error(String),
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }
}

/// Tracks writes against one resource.
pub struct MutationTracker<T> {
    client: ResourceClient<T>,
    cache: Arc<QueryCache>,
    notifications: NotificationChannel,
    label: String,
    dependents: Vec<ResourceName>,
    status: Arc<watch::Sender<MutationStatus>>,
}

impl<T> Clone for MutationTracker<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            cache: Arc::clone(&self.cache),
            notifications: self.notifications.clone(),
            label: self.label.clone(),
            dependents: self.dependents.clone(),
            status: Arc::clone(&self.status),
        }
    }
}

/// Puts the tracker back to `Idle` if a pending run is dropped before it
/// settles.
struct PendingGuard<'a> {
    status: &'a watch::Sender<MutationStatus>,
    armed: bool,
}

impl PendingGuard<'_> {
    fn settle(mut self, status: MutationStatus) {
        self.armed = false;
        self.status.send_replace(status);
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.status.send_if_modified(|s| {
                if s.is_pending() {
                    *s = MutationStatus::Idle;
                    true
                } else {
                    false
                }
            });
        }
    }
}

impl<T> MutationTracker<T> {
    pub fn new(client: ResourceClient<T>, cache: Arc<QueryCache>, notifications: NotificationChannel) -> Self {
        let label = client.name().as_str().to_owned();
        let (status, _) = watch::channel(MutationStatus::Idle);
        Self {
            client,
            cache,
            notifications,
            label,
            dependents: Vec::new(),
            status: Arc::new(status),
        }
    }

    /// Name used in notification messages, e.g. "Asset".
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Other resources whose cached queries go stale when this one changes.
    pub fn with_dependents<I, R>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceName>,
    {
        self.dependents.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn resource(&self) -> &ResourceName {
        self.client.name()
    }

    pub fn status(&self) -> MutationStatus {
        self.status.borrow().clone()
    }

    pub fn error(&self) -> Option<String> {
        self.status.borrow().error().map(str::to_owned)
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationStatus> {
        self.status.subscribe()
    }

    /// Return to `Idle` after a finished run. A pending run is left alone.
    pub fn reset(&self) {
        self.status.send_if_modified(|s| {
            if matches!(s, MutationStatus::Success | MutationStatus::Error(_)) {
                *s = MutationStatus::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Move to `Pending` unless a run already is.
    fn claim(&self) -> bool {
        self.status.send_if_modified(|s| {
            if s.is_pending() {
                false
            } else {
                *s = MutationStatus::Pending;
                true
            }
        })
    }

    fn invalidate(&self) -> usize {
        std::iter::once(self.client.name())
            .chain(self.dependents.iter())
            .map(|r| self.cache.invalidate(InvalidateFilter::Resource(r.clone())))
            .sum()
    }

    /// Run a write. Rejected with `MutationInFlight` while another run on
    /// this tracker is pending; `operation` is not called in that case.
    pub async fn run<R, E, F, Fut>(&self, kind: MutationKind, operation: F) -> Result<R, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Into<CoreError>,
    {
        if !self.claim() {
            return Err(CoreError::MutationInFlight {
                resource: self.client.name().to_string(),
            });
        }
        let guard = PendingGuard {
            status: &self.status,
            armed: true,
        };

        match operation().await.map_err(Into::into) {
            Ok(value) => {
                let invalidated = self.invalidate();
                info!(resource = %self.client.name(), ?kind, invalidated, "mutation succeeded");
                self.notifications
                    .success(format!("{} {} successfully", self.label, kind.past_tense()));
                guard.settle(MutationStatus::Success);
                Ok(value)
            }
            Err(err) => {
                let message = failure_message(&self.label, kind, &err);
                warn!(resource = %self.client.name(), ?kind, error = %err, "mutation failed");
                self.notifications.error(message.clone());
                guard.settle(MutationStatus::Error(message));
                Err(err)
            }
        }
    }
}

impl<T: DeserializeOwned> MutationTracker<T> {
    /// Create a record. `None` when the backend confirmed the write without
    /// echoing the record; the write still counts as a success.
    pub async fn create<B: Serialize + Sync + ?Sized>(&self, body: &B) -> Result<Option<T>, CoreError> {
        self.run(MutationKind::Create, || self.client.create(body)).await
    }

    /// Update a record. `None` as for [`create`](Self::create).
    pub async fn update<B: Serialize + Sync + ?Sized>(&self, id: &str, body: &B) -> Result<Option<T>, CoreError> {
        self.run(MutationKind::Update, || self.client.update(id, body)).await
    }

    pub async fn remove(&self, id: &str) -> Result<(), CoreError> {
        self.run(MutationKind::Delete, || self.client.remove(id)).await
    }
}

fn failure_message(label: &str, kind: MutationKind, err: &CoreError) -> String {
    match err {
        CoreError::ConflictInUse { .. } => match kind {
            MutationKind::Create => format!("{label} is already in use"),
            MutationKind::Update | MutationKind::Delete => {
                format!("{label} is already in use and cannot be {}", kind.past_tense())
            }
        },
        other => other.user_message(),
    }
}
