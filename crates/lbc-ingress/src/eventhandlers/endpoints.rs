//! Endpoints event handler
//!
//! Enqueues the owning Service whenever an Endpoints object appears,
//! disappears, or changes its subsets. Triggers go onto a channel that the
//! Service controller consumes as a second watch source.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Endpoints;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use lbc_common::{metrics, NamespacedName};

use super::{EventHandler, HandleOutcome, Notification};
use crate::filter::is_relevant;
use crate::resolver::{owning_service, ServiceResolver};
use crate::trigger::{ServiceTrigger, TriggerSender};

/// Translates Endpoints notifications into Service triggers
///
/// Holds no state of its own; one instance is shared by every concurrent
/// notification.
pub struct EndpointsEventHandler {
    resolver: Arc<dyn ServiceResolver>,
    triggers: TriggerSender,
}

impl EndpointsEventHandler {
    /// Create a handler resolving through `resolver` and sending on `triggers`
    pub fn new(resolver: Arc<dyn ServiceResolver>, triggers: TriggerSender) -> Self {
        Self { resolver, triggers }
    }

    /// Handle one notification end to end
    ///
    /// Never fails: every error is logged and folded into the outcome.
    pub async fn handle(
        &self,
        ctx: &CancellationToken,
        notification: &Notification<Endpoints>,
    ) -> HandleOutcome {
        let outcome = if is_relevant(notification) {
            self.enqueue_impacted_service(ctx, notification.object()).await
        } else {
            trace!(
                endpoints = %NamespacedName::of(&**notification.object()),
                kind = notification.kind(),
                "Ignoring endpoints event without subset change"
            );
            HandleOutcome::Suppressed
        };

        metrics::record_notification(notification.kind(), outcome.label());
        outcome
    }

    async fn enqueue_impacted_service(
        &self,
        ctx: &CancellationToken,
        ep: &Endpoints,
    ) -> HandleOutcome {
        let ep_key = NamespacedName::of(ep);

        let svc_key = match self.resolver.resolve(&owning_service(&ep_key), ctx).await {
            Ok(key) => key,
            Err(e) if e.is_not_found() => {
                debug!(endpoints = %ep_key, error = %e, "Service for endpoints not found");
                return HandleOutcome::Dropped(e);
            }
            Err(e) => {
                error!(endpoints = %ep_key, error = %e, "Failed to fetch service");
                return HandleOutcome::Dropped(e);
            }
        };

        debug!(
            endpoints = %ep_key,
            service = %svc_key,
            "Enqueue service for endpoints event"
        );

        let trigger = ServiceTrigger::new(svc_key);
        match self.triggers.send(trigger.clone()).await {
            Ok(()) => {
                metrics::record_trigger(true);
                HandleOutcome::Forwarded(trigger)
            }
            Err(_) => {
                metrics::record_trigger(false);
                error!(
                    endpoints = %ep_key,
                    service = %trigger.service(),
                    "Service trigger channel closed, dropping trigger"
                );
                HandleOutcome::SinkClosed(trigger)
            }
        }
    }
}

#[async_trait]
impl EventHandler<Endpoints> for EndpointsEventHandler {
    async fn create(&self, ctx: &CancellationToken, obj: Arc<Endpoints>) {
        self.handle(ctx, &Notification::Created(obj)).await;
    }

    async fn update(&self, ctx: &CancellationToken, old: Arc<Endpoints>, new: Arc<Endpoints>) {
        self.handle(ctx, &Notification::Updated { old, new }).await;
    }

    async fn delete(&self, ctx: &CancellationToken, obj: Arc<Endpoints>) {
        self.handle(ctx, &Notification::Deleted(obj)).await;
    }

    async fn generic(&self, ctx: &CancellationToken, obj: Arc<Endpoints>) {
        self.handle(ctx, &Notification::Generic(obj)).await;
    }
}
