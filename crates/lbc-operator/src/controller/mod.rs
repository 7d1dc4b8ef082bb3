//! Controllers run by the operator

pub mod service;

pub use service::{error_policy, reconcile, ServiceContext};
