//! End-to-end scenarios for the Endpoints → Service trigger path
//!
//! Runs notifications through the public handler API with a recording
//! resolver and a real bounded trigger channel.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{EndpointAddress, EndpointPort, EndpointSubset, Endpoints};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::watcher::Event;
use tokio_util::sync::CancellationToken;

use lbc_common::NamespacedName;
use lbc_ingress::{
    dispatch, trigger_channel, EndpointsEventHandler, EventHandler, EventSource, HandleOutcome,
    Notification, ResolveError, ServiceResolver, TriggerReceiver,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// Resolver answering from a fixed set of existing Services, recording every call
#[derive(Default)]
struct RecordingResolver {
    existing: HashSet<NamespacedName>,
    calls: Mutex<Vec<NamespacedName>>,
}

impl RecordingResolver {
    fn with_services(keys: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            existing: keys
                .iter()
                .map(|(ns, name)| NamespacedName::new(*ns, *name))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<NamespacedName> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceResolver for RecordingResolver {
    async fn resolve(
        &self,
        service: &NamespacedName,
        cancel: &CancellationToken,
    ) -> Result<NamespacedName, ResolveError> {
        self.calls.lock().unwrap().push(service.clone());
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled {
                service: service.clone(),
            });
        }
        if self.existing.contains(service) {
            Ok(service.clone())
        } else {
            Err(ResolveError::NotFound {
                service: service.clone(),
            })
        }
    }
}

fn endpoints(namespace: &str, name: &str, addrs: &[(&str, i32)]) -> Arc<Endpoints> {
    let subsets = addrs
        .iter()
        .map(|(ip, port)| EndpointSubset {
            addresses: Some(vec![EndpointAddress {
                ip: ip.to_string(),
                ..Default::default()
            }]),
            ports: Some(vec![EndpointPort {
                port: *port,
                ..Default::default()
            }]),
            ..Default::default()
        })
        .collect();

    Arc::new(Endpoints {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        subsets: Some(subsets),
    })
}

fn setup(resolver: Arc<RecordingResolver>) -> (EndpointsEventHandler, TriggerReceiver) {
    let (tx, rx) = trigger_channel(8);
    (EndpointsEventHandler::new(resolver, tx), rx)
}

fn drain(rx: &mut TriggerReceiver) -> Vec<NamespacedName> {
    let mut out = Vec::new();
    while let Ok(trigger) = rx.try_recv() {
        out.push(trigger.service().clone());
    }
    out
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn reordered_identical_subsets_forward_nothing() {
    let resolver = RecordingResolver::with_services(&[("ns1", "svcA")]);
    let (handler, mut rx) = setup(resolver.clone());
    let ctx = CancellationToken::new();

    handler
        .update(
            &ctx,
            endpoints("ns1", "svcA", &[("10.0.0.1", 80), ("10.0.0.2", 80)]),
            endpoints("ns1", "svcA", &[("10.0.0.2", 80), ("10.0.0.1", 80)]),
        )
        .await;

    assert!(resolver.calls().is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn added_endpoint_triggers_owning_service() {
    let resolver = RecordingResolver::with_services(&[("ns1", "svcA")]);
    let (handler, mut rx) = setup(resolver.clone());
    let ctx = CancellationToken::new();

    handler
        .update(
            &ctx,
            endpoints("ns1", "svcA", &[("10.0.0.1", 80)]),
            endpoints("ns1", "svcA", &[("10.0.0.1", 80), ("10.0.0.2", 80)]),
        )
        .await;

    assert_eq!(resolver.calls(), vec![NamespacedName::new("ns1", "svcA")]);
    assert_eq!(drain(&mut rx), vec![NamespacedName::new("ns1", "svcA")]);
}

#[tokio::test]
async fn delete_with_missing_service_is_dropped() {
    let resolver = RecordingResolver::with_services(&[]);
    let (handler, mut rx) = setup(resolver.clone());
    let ctx = CancellationToken::new();

    let outcome = handler
        .handle(
            &ctx,
            &Notification::Deleted(endpoints("ns1", "svcA", &[("10.0.0.1", 80)])),
        )
        .await;

    assert_eq!(resolver.calls(), vec![NamespacedName::new("ns1", "svcA")]);
    match outcome {
        HandleOutcome::Dropped(e) => assert!(e.is_not_found()),
        other => panic!("expected Dropped, got {other:?}"),
    }
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn create_triggers_owning_service() {
    let resolver = RecordingResolver::with_services(&[("ns2", "svcB")]);
    let (handler, mut rx) = setup(resolver.clone());
    let ctx = CancellationToken::new();

    handler
        .create(&ctx, endpoints("ns2", "svcB", &[("10.0.1.1", 8080)]))
        .await;

    assert_eq!(resolver.calls(), vec![NamespacedName::new("ns2", "svcB")]);
    assert_eq!(drain(&mut rx), vec![NamespacedName::new("ns2", "svcB")]);
}

#[tokio::test]
async fn generic_never_resolves() {
    let resolver = RecordingResolver::with_services(&[("ns1", "svcA")]);
    let (handler, mut rx) = setup(resolver.clone());
    let ctx = CancellationToken::new();

    handler
        .generic(&ctx, endpoints("ns1", "svcA", &[("10.0.0.1", 80)]))
        .await;

    assert!(resolver.calls().is_empty());
    assert!(drain(&mut rx).is_empty());
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn cancelled_context_forwards_nothing() {
    let resolver = RecordingResolver::with_services(&[("ns1", "svcA")]);
    let (handler, mut rx) = setup(resolver.clone());
    let ctx = CancellationToken::new();
    ctx.cancel();

    let outcome = handler
        .handle(
            &ctx,
            &Notification::Created(endpoints("ns1", "svcA", &[("10.0.0.1", 80)])),
        )
        .await;

    assert!(matches!(outcome, HandleOutcome::Dropped(ResolveError::Cancelled { .. })));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn concurrent_notifications_each_forward_once() {
    let resolver = RecordingResolver::with_services(&[("ns1", "svcA"), ("ns2", "svcB")]);
    let (handler, mut rx) = setup(resolver.clone());
    let handler = Arc::new(handler);
    let ctx = CancellationToken::new();

    let notifications = vec![
        Notification::Created(endpoints("ns1", "svcA", &[("10.0.0.1", 80)])),
        Notification::Created(endpoints("ns2", "svcB", &[("10.0.1.1", 80)])),
        Notification::Deleted(endpoints("ns1", "svcA", &[("10.0.0.1", 80)])),
        Notification::Generic(endpoints("ns2", "svcB", &[("10.0.1.1", 80)])),
    ];

    futures::stream::iter(notifications)
        .for_each_concurrent(4, |n| {
            let handler = Arc::clone(&handler);
            let ctx = ctx.clone();
            async move { dispatch(&*handler, &ctx, n).await }
        })
        .await;

    let mut forwarded = drain(&mut rx);
    forwarded.sort();
    assert_eq!(
        forwarded,
        vec![
            NamespacedName::new("ns1", "svcA"),
            NamespacedName::new("ns1", "svcA"),
            NamespacedName::new("ns2", "svcB"),
        ]
    );
    assert_eq!(resolver.calls().len(), 3);
}

#[tokio::test]
async fn watch_events_flow_through_source_and_handler() {
    let resolver = RecordingResolver::with_services(&[("ns1", "svcA")]);
    let (handler, mut rx) = setup(resolver.clone());
    let ctx = CancellationToken::new();
    let mut source = EventSource::new();

    let events = vec![
        Event::Apply((*endpoints("ns1", "svcA", &[("10.0.0.1", 80)])).clone()),
        // Label-only change: same subsets
        Event::Apply((*endpoints("ns1", "svcA", &[("10.0.0.1", 80)])).clone()),
        Event::Apply((*endpoints("ns1", "svcA", &[("10.0.0.2", 80)])).clone()),
        Event::Delete((*endpoints("ns1", "svcA", &[("10.0.0.2", 80)])).clone()),
    ];

    for event in events {
        for notification in source.observe(event) {
            dispatch(&handler, &ctx, notification).await;
        }
    }

    // create, update with new subsets, delete
    assert_eq!(drain(&mut rx).len(), 3);
    assert_eq!(resolver.calls().len(), 3);
}
