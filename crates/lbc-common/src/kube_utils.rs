//! Kubernetes helpers shared by the lbc crates
//!
//! Object identity (`NamespacedName`) and kube client construction.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::reflector::ObjectRef;
use kube::{Client, Config, Resource, ResourceExt};
use tracing::debug;

use crate::Error;

/// Namespace-qualified object name, the identity key for namespaced resources
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedName {
    /// Object namespace
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl NamespacedName {
    /// Create a key from a namespace and a name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a namespaced Kubernetes object
    ///
    /// Objects without a namespace yield an empty namespace, mirroring how
    /// the API server addresses them.
    pub fn of<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }

    /// Convert into a typed object reference for a controller queue
    pub fn object_ref<K>(&self) -> ObjectRef<K>
    where
        K: Resource,
        K::DynamicType: Default,
    {
        ObjectRef::new(&self.name).within(&self.namespace)
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
///
/// Watch timeouts must stay below this so idle watches are closed by the API
/// server before the client gives up on the body.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client from optional kubeconfig path with default timeouts
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    create_client_with_timeout(kubeconfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT).await
}

/// Create a kube client from optional kubeconfig path with custom timeouts
pub async fn create_client_with_timeout(
    kubeconfig: Option<&Path>,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig: {}", e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => {
            debug!("Inferring kube config from environment");
            Config::infer().await.map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to infer config: {}", e),
                )
            })?
        }
    };

    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    debug!(
        cluster_url = %config.cluster_url,
        connect_timeout_secs = connect_timeout.as_secs(),
        read_timeout_secs = read_timeout.as_secs(),
        "Creating kube client"
    );
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Endpoints, Service};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use tracing_test::traced_test;

    #[test]
    fn display_is_namespace_slash_name() {
        assert_eq!(NamespacedName::new("ns1", "svcA").to_string(), "ns1/svcA");
    }

    #[test]
    fn key_of_namespaced_object() {
        let ep = Endpoints {
            metadata: ObjectMeta {
                name: Some("svcA".to_string()),
                namespace: Some("ns1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(NamespacedName::of(&ep), NamespacedName::new("ns1", "svcA"));
    }

    #[test]
    fn key_of_object_without_namespace() {
        let ep = Endpoints {
            metadata: ObjectMeta {
                name: Some("orphan".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(NamespacedName::of(&ep), NamespacedName::new("", "orphan"));
    }

    #[test]
    fn object_ref_carries_namespace_and_name() {
        let obj_ref = NamespacedName::new("ns2", "svcB").object_ref::<Service>();
        assert_eq!(obj_ref.name, "svcB");
        assert_eq!(obj_ref.namespace.as_deref(), Some("ns2"));
    }

    #[test]
    fn keys_order_by_namespace_then_name() {
        let mut keys = vec![
            NamespacedName::new("b", "a"),
            NamespacedName::new("a", "z"),
            NamespacedName::new("a", "b"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                NamespacedName::new("a", "b"),
                NamespacedName::new("a", "z"),
                NamespacedName::new("b", "a"),
            ]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_kubeconfig_is_logged_and_rejected() {
        let result = create_client(Some(Path::new("/nonexistent/lbc/kubeconfig"))).await;

        match result {
            Err(Error::Internal { context, .. }) => assert_eq!(context, "create_client"),
            other => panic!("expected internal error, got {:?}", other.map(|_| ())),
        }
        assert!(logs_contain("Loading kubeconfig"));
        assert!(logs_contain("/nonexistent/lbc/kubeconfig"));
        assert!(!logs_contain("Creating kube client"));
    }
}
