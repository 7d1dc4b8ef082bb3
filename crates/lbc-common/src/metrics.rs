//! OpenTelemetry metrics for the lbc controllers
//!
//! Instruments are created lazily against the global meter provider, so they
//! are no-ops until telemetry export is configured.

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::KeyValue;

/// Global meter for lbc metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("lbc"));

/// Counter of Endpoints notifications handled
///
/// Labels:
/// - `kind`: create, update, delete, generic
/// - `outcome`: suppressed, forwarded, dropped, sink_closed
pub static ENDPOINTS_NOTIFICATIONS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("lbc_endpoints_notifications_total")
        .with_description("Total number of Endpoints notifications handled, by outcome")
        .with_unit("{notifications}")
        .build()
});

/// Counter of Service reconciliation triggers
///
/// Labels:
/// - `result`: sent, failed
pub static SERVICE_TRIGGERS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("lbc_service_triggers_total")
        .with_description("Total number of Service reconciliation triggers forwarded")
        .with_unit("{triggers}")
        .build()
});

/// Record one handled Endpoints notification
pub fn record_notification(kind: &'static str, outcome: &'static str) {
    ENDPOINTS_NOTIFICATIONS.add(
        1,
        &[KeyValue::new("kind", kind), KeyValue::new("outcome", outcome)],
    );
}

/// Record one Service trigger send attempt
pub fn record_trigger(sent: bool) {
    let result = if sent { "sent" } else { "failed" };
    SERVICE_TRIGGERS.add(1, &[KeyValue::new("result", result)]);
}
