//! lbc operator: Endpoints watch and Service controller wiring

#![deny(missing_docs)]

/// Operator settings from flags and environment
pub mod config;
/// Service controller reconciled on Endpoints-derived triggers
pub mod controller;
/// Builds the controller futures run by the binary
pub mod controller_runner;
/// SIGINT and SIGTERM handling
pub mod signals;

pub use config::OperatorConfig;
