//! Service reconciliation triggers and the channel that carries them

use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Service;
use kube::runtime::reflector::ObjectRef;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use lbc_common::NamespacedName;

/// Request to re-evaluate one Service
///
/// Carries only the Service identity. Triggers are not deduplicated here;
/// the consuming controller's queue collapses repeats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceTrigger {
    service: NamespacedName,
}

impl ServiceTrigger {
    /// Trigger for the given Service
    pub fn new(service: NamespacedName) -> Self {
        Self { service }
    }

    /// The Service this trigger is for
    pub fn service(&self) -> &NamespacedName {
        &self.service
    }
}

impl From<ServiceTrigger> for ObjectRef<Service> {
    fn from(trigger: ServiceTrigger) -> Self {
        trigger.service.object_ref()
    }
}

/// Producer half, shared by every in-flight notification
pub type TriggerSender = mpsc::Sender<ServiceTrigger>;

/// Consumer half, owned by the Service controller
pub type TriggerReceiver = mpsc::Receiver<ServiceTrigger>;

/// Create the bounded trigger channel
///
/// Senders wait while the channel is full. A capacity of zero is raised to
/// one, the smallest bound tokio supports.
pub fn trigger_channel(capacity: usize) -> (TriggerSender, TriggerReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Adapt the receiver into a stream of Service references for `Controller::reconcile_on`
pub fn trigger_stream(rx: TriggerReceiver) -> impl Stream<Item = ObjectRef<Service>> + Send {
    ReceiverStream::new(rx).map(ObjectRef::<Service>::from)
}
