//! Resolution errors for the Endpoints → Service lookup

use lbc_common::NamespacedName;
use thiserror::Error;

/// Failure to resolve the Service owning an Endpoints object
///
/// Every variant is terminal for the notification being handled; nothing
/// retries the lookup.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The Service does not exist (e.g. deleted concurrently)
    #[error("service {service} not found")]
    NotFound {
        /// Key that was looked up
        service: NamespacedName,
    },

    /// The API server call failed
    #[error("failed to fetch service {service}: {source}")]
    Kube {
        /// Key that was looked up
        service: NamespacedName,
        /// The underlying kube-rs error
        #[source]
        source: kube::Error,
    },

    /// The calling context was cancelled before the lookup finished
    #[error("lookup of service {service} cancelled")]
    Cancelled {
        /// Key that was looked up
        service: NamespacedName,
    },
}

impl ResolveError {
    /// Key of the Service the failed lookup was for
    pub fn service(&self) -> &NamespacedName {
        match self {
            Self::NotFound { service } | Self::Kube { service, .. } | Self::Cancelled { service } => {
                service
            }
        }
    }

    /// The owning Service is gone
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Kube {
                source: kube::Error::Api(e),
                ..
            } => e.code == 404,
            _ => false,
        }
    }

    /// I/O or cancellation failure, reported at error severity
    pub fn is_transient(&self) -> bool {
        !self.is_not_found()
    }
}
