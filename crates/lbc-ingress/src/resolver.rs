//! Resolution of the Service that owns an Endpoints object
//!
//! An Endpoints object belongs to the Service with the same namespace and
//! name. The resolver confirms that Service exists with a single read and
//! never retries.

use std::future::Future;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use mockall::automock;

use lbc_common::NamespacedName;

use crate::error::ResolveError;

/// Key of the Service owning the Endpoints object with the given key
pub fn owning_service(endpoints: &NamespacedName) -> NamespacedName {
    endpoints.clone()
}

/// Point lookup of a Service by key
///
/// Allows replacing the API server with a fake in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServiceResolver: Send + Sync {
    /// Fetch the Service and return its key
    ///
    /// Fails with `Cancelled` as soon as `cancel` fires.
    async fn resolve(
        &self,
        service: &NamespacedName,
        cancel: &CancellationToken,
    ) -> Result<NamespacedName, ResolveError>;
}

/// Resolver backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeServiceResolver {
    client: Client,
}

impl KubeServiceResolver {
    /// Create a resolver using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceResolver for KubeServiceResolver {
    async fn resolve(
        &self,
        service: &NamespacedName,
        cancel: &CancellationToken,
    ) -> Result<NamespacedName, ResolveError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &service.namespace);
        lookup_until_cancelled(service, cancel, api.get_opt(&service.name)).await
    }
}

/// Race a Service lookup against cancellation and classify the result
async fn lookup_until_cancelled<F>(
    service: &NamespacedName,
    cancel: &CancellationToken,
    lookup: F,
) -> Result<NamespacedName, ResolveError>
where
    F: Future<Output = Result<Option<Service>, kube::Error>>,
{
    let found = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(ResolveError::Cancelled {
                service: service.clone(),
            });
        }
        result = lookup => result,
    };

    match found {
        Ok(Some(svc)) => Ok(NamespacedName::of(&svc)),
        Ok(None) => Err(ResolveError::NotFound {
            service: service.clone(),
        }),
        Err(source) => Err(ResolveError::Kube {
            service: service.clone(),
            source,
        }),
    }
}
