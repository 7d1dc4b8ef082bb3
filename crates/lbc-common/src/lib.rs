//! Common types for lbc: errors, telemetry, metrics and kube utilities

#![deny(missing_docs)]

pub mod error;
pub mod kube_utils;
pub mod metrics;
pub mod telemetry;

pub use error::Error;
pub use kube_utils::NamespacedName;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager / reporting component name used by the controllers
pub const CONTROLLER_NAME: &str = "lbc-ingress-controller";
