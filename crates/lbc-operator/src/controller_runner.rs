//! Controller runner - builds the futures the operator runs
//!
//! Construction is kept separate from execution so the binary only has to
//! drive the returned futures.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::{Endpoints, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource};
use tokio_util::sync::CancellationToken;

use lbc_ingress::trigger::trigger_stream;
use lbc_ingress::{
    run_endpoints_watch, trigger_channel, EndpointsEventHandler, KubeServiceResolver,
};

use crate::config::OperatorConfig;
use crate::controller::{error_policy, reconcile, ServiceContext};

/// A controller future ready to be polled
pub type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Build the Endpoints watch and the Service controller
///
/// The watch forwards Service triggers over a bounded channel that the
/// Service controller consumes alongside its own Service watch. The watch
/// stops when `shutdown` is cancelled; the controller stops on SIGTERM/SIGINT.
pub fn build_controllers(
    client: Client,
    config: &OperatorConfig,
    shutdown: CancellationToken,
) -> Vec<ControllerFuture> {
    let namespace = config.watch_namespace.as_deref();
    let watcher_config = WatcherConfig::default().timeout(config.watch_timeout_secs);
    let (triggers_tx, triggers_rx) = trigger_channel(config.trigger_buffer);

    let resolver = Arc::new(KubeServiceResolver::new(client.clone()));
    let handler = Arc::new(EndpointsEventHandler::new(resolver, triggers_tx));
    let endpoints_watch = run_endpoints_watch(
        scoped_api::<Endpoints>(client.clone(), namespace),
        watcher_config.clone(),
        handler,
        config.max_concurrent_notifications,
        shutdown,
    );

    let ctx = Arc::new(ServiceContext::new(client.clone()));
    let service_ctrl = Controller::new(scoped_api::<Service>(client, namespace), watcher_config)
        .reconcile_on(trigger_stream(triggers_rx))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(log_reconcile_result("Service"));

    match namespace {
        Some(ns) => tracing::info!(namespace = %ns, "Watching a single namespace"),
        None => tracing::info!("Watching all namespaces"),
    }
    tracing::info!("- Endpoints watch");
    tracing::info!("- Service controller");

    vec![Box::pin(endpoints_watch), Box::pin(service_ctrl)]
}

/// Api scoped to one namespace, or cluster-wide when `namespace` is None
fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Creates a closure for logging reconciliation results
fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
