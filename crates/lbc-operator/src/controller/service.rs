//! Service controller
//!
//! Reconciles Services on their own changes and on triggers derived from
//! Endpoints changes. Reconciliation observes the load balancer state of the
//! Service and its ready backends; provisioning the external load balancer is
//! left to the cloud integration.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Endpoints, Service};
use kube::runtime::controller::Action;
use kube::{Api, Client};
use tracing::{debug, error, info};

use lbc_common::{Error, NamespacedName};

/// Requeue delay after a failed reconciliation
pub const ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// Shared state for Service reconciliation
pub struct ServiceContext {
    /// Kubernetes client
    pub client: Client,
}

impl ServiceContext {
    /// Create a context using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Reconcile one Service
pub async fn reconcile(svc: Arc<Service>, ctx: Arc<ServiceContext>) -> Result<Action, Error> {
    let key = NamespacedName::of(&*svc);

    if !is_load_balancer(&svc) {
        debug!(service = %key, "Skipping service without load balancer");
        return Ok(Action::await_change());
    }

    let api: Api<Endpoints> = Api::namespaced(ctx.client.clone(), &key.namespace);
    let backends = api
        .get_opt(&key.name)
        .await?
        .map(|ep| ready_backends(&ep))
        .unwrap_or_default();

    info!(
        service = %key,
        ready_backends = backends.len(),
        ingress = ?load_balancer_ingress(&svc),
        "Observed load balancer service"
    );

    Ok(Action::await_change())
}

/// Error policy for Service reconciliation
pub fn error_policy(svc: Arc<Service>, error: &Error, _ctx: Arc<ServiceContext>) -> Action {
    error!(
        ?error,
        service = %NamespacedName::of(&*svc),
        "reconciliation failed"
    );
    Action::requeue(ERROR_REQUEUE)
}

/// Whether the Service asks for an external load balancer
pub fn is_load_balancer(svc: &Service) -> bool {
    svc.spec
        .as_ref()
        .and_then(|spec| spec.type_.as_deref())
        .is_some_and(|t| t == "LoadBalancer")
}

/// Hostnames or IPs the load balancer currently publishes
pub fn load_balancer_ingress(svc: &Service) -> Vec<String> {
    svc.status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .map(|ingress| {
            ingress
                .iter()
                .filter_map(|i| i.hostname.clone().or_else(|| i.ip.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Distinct ready addresses across all subsets
pub fn ready_backends(ep: &Endpoints) -> BTreeSet<String> {
    ep.subsets
        .iter()
        .flatten()
        .flat_map(|subset| subset.addresses.iter().flatten())
        .map(|address| address.ip.clone())
        .collect()
}
