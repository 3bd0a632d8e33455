//! Outbound ports to collaborators outside the control plane

use async_trait::async_trait;

use super::DomainResult;

/// Runs host-management instructions against virtualization hosts.
///
/// Calls may take seconds. Failures are reported as `DomainError::Upstream`.
#[async_trait]
pub trait HypervisorExecutor: Send + Sync {
    async fn run(&self, instruction: &str) -> DomainResult<Vec<u8>>;
}

/// Fire-and-forget operator notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, text: &str) -> DomainResult<()>;
}
