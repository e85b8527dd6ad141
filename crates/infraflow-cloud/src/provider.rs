//! Control-plane client trait definition

use crate::error::Result;
use crate::model::{
    NetworkInterface, NetworkInterfaceSpec, ResourceGroup, ResourceGroupSpec, VirtualMachine,
    VirtualMachineSpec, VirtualNetwork, VirtualNetworkSpec, WaitUntil,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Authenticated client for a cloud provider's management API
///
/// `get_*` methods return `Ok(None)` when the name does not resolve under its
/// parent; only transport, auth and provider failures are errors.
/// `create_*` and `delete_*` submit a possibly long-running operation and
/// block according to the given [`WaitUntil`].
///
/// Every call observes `cancel`: once it fires the client stops waiting and
/// returns [`CloudError::Cancelled`](crate::CloudError::Cancelled). Work already
/// accepted by the remote side keeps running.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Returns the provider name (e.g., "azure")
    fn name(&self) -> &str;

    async fn get_resource_group(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ResourceGroup>>;

    async fn create_resource_group(
        &self,
        name: &str,
        spec: &ResourceGroupSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<ResourceGroup>;

    /// Deleting a group removes everything inside it on the remote side
    async fn delete_resource_group(
        &self,
        name: &str,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<()>;

    async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VirtualNetwork>>;

    async fn create_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        spec: &VirtualNetworkSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<VirtualNetwork>;

    async fn get_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<NetworkInterface>>;

    async fn create_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        spec: &NetworkInterfaceSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<NetworkInterface>;

    async fn delete_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<()>;

    async fn get_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VirtualMachine>>;

    async fn create_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        spec: &VirtualMachineSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<VirtualMachine>;
}

/// Retry configuration for throttled or transient control-plane responses
///
/// Applied inside a [`ControlPlane`] implementation. The orchestrator itself
/// never retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Delay before retry number `attempt` (zero-based), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.powi(exponent).max(1.0);
        let secs = self.initial_delay.as_secs_f64() * factor;
        // Duration panics on values it cannot represent.
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Polling cadence for operations waited on with [`WaitUntil::Completed`]
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status checks when the remote gives no `Retry-After`
    pub interval: Duration,

    /// Give up waiting after this long
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
            backoff_multiplier: 2.0,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(8000));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(10000)); // capped at max
    }

    #[test]
    fn test_delay_saturates_for_late_attempts() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(30),
            ..RetryConfig::default()
        };

        assert_eq!(config.delay_for_attempt(1100), Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_secs(30));

        let shrinking = RetryConfig {
            backoff_multiplier: 0.5,
            ..RetryConfig::default()
        };
        assert_eq!(shrinking.delay_for_attempt(u32::MAX), Duration::from_secs(1));
    }
}
