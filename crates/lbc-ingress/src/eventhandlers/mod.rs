//! Typed event handlers fed by the watch adapter
//!
//! A handler receives create/update/delete/generic notifications for one
//! resource kind. Operations return nothing: handlers absorb their own
//! failures so a bad notification never stalls the watch.

pub mod endpoints;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ResolveError;
use crate::trigger::ServiceTrigger;

/// A change notification for one object
#[derive(Debug, Clone)]
pub enum Notification<K> {
    /// Object appeared
    Created(Arc<K>),
    /// Object changed; `old` and `new` always have the same namespace and name
    Updated {
        /// Last snapshot before the change
        old: Arc<K>,
        /// Snapshot after the change
        new: Arc<K>,
    },
    /// Object disappeared; carries the last known snapshot
    Deleted(Arc<K>),
    /// Synthetic notification not tied to a change
    Generic(Arc<K>),
}

impl<K> Notification<K> {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "create",
            Self::Updated { .. } => "update",
            Self::Deleted(_) => "delete",
            Self::Generic(_) => "generic",
        }
    }

    /// The snapshot a handler should act on
    ///
    /// The new state for updates, the last known state for deletes.
    pub fn object(&self) -> &Arc<K> {
        match self {
            Self::Created(obj) | Self::Deleted(obj) | Self::Generic(obj) => obj,
            Self::Updated { new, .. } => new,
        }
    }
}

/// Handler for notifications about objects of kind `K`
#[async_trait]
pub trait EventHandler<K: Send + Sync + 'static>: Send + Sync {
    /// Called when an object is created
    async fn create(&self, ctx: &CancellationToken, obj: Arc<K>);

    /// Called when an object is updated
    async fn update(&self, ctx: &CancellationToken, old: Arc<K>, new: Arc<K>);

    /// Called when an object is deleted
    async fn delete(&self, ctx: &CancellationToken, obj: Arc<K>);

    /// Called for synthetic triggers (periodic resyncs, external requests)
    async fn generic(&self, ctx: &CancellationToken, obj: Arc<K>);
}

/// Route a notification to the matching handler operation
pub async fn dispatch<K, H>(handler: &H, ctx: &CancellationToken, notification: Notification<K>)
where
    K: Send + Sync + 'static,
    H: EventHandler<K> + ?Sized,
{
    match notification {
        Notification::Created(obj) => handler.create(ctx, obj).await,
        Notification::Updated { old, new } => handler.update(ctx, old, new).await,
        Notification::Deleted(obj) => handler.delete(ctx, obj).await,
        Notification::Generic(obj) => handler.generic(ctx, obj).await,
    }
}

/// What handling one notification resulted in
#[derive(Debug)]
pub enum HandleOutcome {
    /// Filtered out before any lookup
    Suppressed,
    /// Trigger accepted by the channel
    Forwarded(ServiceTrigger),
    /// Owning Service could not be resolved; nothing was sent
    Dropped(ResolveError),
    /// Channel consumer is gone; the trigger was discarded
    SinkClosed(ServiceTrigger),
}

impl HandleOutcome {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Suppressed => "suppressed",
            Self::Forwarded(_) => "forwarded",
            Self::Dropped(_) => "dropped",
            Self::SinkClosed(_) => "sink_closed",
        }
    }

    /// The trigger that reached the channel, if any
    pub fn forwarded(&self) -> Option<&ServiceTrigger> {
        match self {
            Self::Forwarded(trigger) => Some(trigger),
            _ => None,
        }
    }
}
