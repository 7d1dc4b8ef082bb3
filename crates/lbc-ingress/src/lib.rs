//! Ingress event handlers for lbc
//!
//! Watches Endpoints and turns membership changes into reconciliation
//! triggers for the Service that owns them:
//! - Filters out updates that leave the subsets untouched
//! - Resolves the owning Service through the API server
//! - Forwards a trigger onto a bounded channel consumed by the Service controller

#![deny(missing_docs)]

pub mod error;
pub mod eventhandlers;
pub mod filter;
pub mod resolver;
pub mod trigger;
pub mod watch;

pub use error::ResolveError;
pub use eventhandlers::endpoints::EndpointsEventHandler;
pub use eventhandlers::{dispatch, EventHandler, HandleOutcome, Notification};
pub use resolver::{owning_service, KubeServiceResolver, ServiceResolver};
pub use trigger::{trigger_channel, ServiceTrigger, TriggerReceiver, TriggerSender};
pub use watch::{run_endpoints_watch, EventSource};
