//! Change filter for Endpoints notifications
//!
//! Only subset membership affects what a Service's load balancer serves, so
//! an update is propagated when the subsets change and dropped otherwise.
//! Subsets are compared as unordered collections, and so are the address
//! and port lists inside each subset. A missing list equals an empty one.

use k8s_openapi::api::core::v1::{EndpointSubset, Endpoints};
use serde::Serialize;

use crate::eventhandlers::Notification;

/// Whether a notification should reach the resolver
pub fn is_relevant(notification: &Notification<Endpoints>) -> bool {
    match notification {
        Notification::Created(_) | Notification::Deleted(_) => true,
        Notification::Updated { old, new } => {
            !subsets_equal(old.subsets.as_deref(), new.subsets.as_deref())
        }
        Notification::Generic(_) => false,
    }
}

/// Order-insensitive structural equality of two subset lists
pub fn subsets_equal(old: Option<&[EndpointSubset]>, new: Option<&[EndpointSubset]>) -> bool {
    let old = old.unwrap_or_default();
    let new = new.unwrap_or_default();
    old.len() == new.len() && canonical_subsets(old) == canonical_subsets(new)
}

fn canonical_subsets(subsets: &[EndpointSubset]) -> Vec<String> {
    let mut canonical: Vec<String> = subsets.iter().map(canonical_subset).collect();
    canonical.sort_unstable();
    canonical
}

fn canonical_subset(subset: &EndpointSubset) -> String {
    serde_json::json!({
        "addresses": canonical_list(subset.addresses.as_deref()),
        "notReadyAddresses": canonical_list(subset.not_ready_addresses.as_deref()),
        "ports": canonical_list(subset.ports.as_deref()),
    })
    .to_string()
}

fn canonical_list<T: Serialize>(items: Option<&[T]>) -> Vec<String> {
    // Serializing k8s-openapi structs cannot fail
    let mut canonical: Vec<String> = items
        .unwrap_or_default()
        .iter()
        .map(|item| serde_json::to_string(item).unwrap_or_default())
        .collect();
    canonical.sort_unstable();
    canonical
}
