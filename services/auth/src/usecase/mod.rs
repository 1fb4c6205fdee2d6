pub mod otp;
pub mod password;
pub mod session;
pub mod totp;

use crate::domain::repository::AuditSink;
use crate::domain::types::AuditEvent;

/// Deliver an audit event, fire-and-forget. Sink failures are logged and
/// swallowed — an audit outage must never take down authentication.
pub(crate) async fn emit_audit<A: AuditSink>(audit: &A, event: AuditEvent) {
    if let Err(e) = audit.record(&event).await {
        tracing::warn!(error = %e, action = event.action, "audit sink failure");
    }
}
