//! Azure implementation of [`ControlPlane`]

use crate::client::ArmClient;
use crate::config::AzureConfig;
use crate::error::AzureError;
use crate::wire;
use async_trait::async_trait;
use infraflow_cloud::{
    CloudError, ControlPlane, NetworkInterface, NetworkInterfaceSpec, PollConfig, ResourceGroup,
    ResourceGroupSpec, ResourceId, ResourceKind, RetryConfig, VirtualMachine, VirtualMachineSpec,
    VirtualNetwork, VirtualNetworkSpec, WaitUntil,
};
use tokio_util::sync::CancellationToken;

const RESOURCES_API_VERSION: &str = "2022-09-01";
const NETWORK_API_VERSION: &str = "2023-09-01";
const COMPUTE_API_VERSION: &str = "2024-03-01";

/// Resource Manager control plane scoped to one subscription
pub struct AzureControlPlane {
    client: ArmClient,
    subscription_id: String,
}

impl AzureControlPlane {
    pub fn new(config: &AzureConfig, retry: RetryConfig, poll: PollConfig) -> Self {
        tracing::debug!(subscription = %config.subscription_id, endpoint = %config.resource_manager, "Configuring Azure control plane");
        Self {
            client: ArmClient::new(config, retry, poll),
            subscription_id: config.subscription_id.clone(),
        }
    }

    /// Build from the `AZURE_*` environment variables with default policies
    pub fn from_env() -> crate::Result<Self> {
        let config = AzureConfig::from_env()?;
        Ok(Self::new(
            &config,
            RetryConfig::default(),
            PollConfig::default(),
        ))
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }
}

fn failed(kind: ResourceKind, name: &str) -> impl FnOnce(AzureError) -> CloudError + '_ {
    move |e| e.into_cloud(kind, name)
}

#[async_trait]
impl ControlPlane for AzureControlPlane {
    fn name(&self) -> &str {
        "azure"
    }

    async fn get_resource_group(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<Option<ResourceGroup>> {
        let path = ResourceId::resource_group(&self.subscription_id, name);
        let body = self
            .client
            .get(path.as_str(), RESOURCES_API_VERSION, cancel)
            .await
            .map_err(failed(ResourceKind::ResourceGroup, name))?;
        Ok(body.map(wire::parse_resource_group).transpose()?)
    }

    async fn create_resource_group(
        &self,
        name: &str,
        spec: &ResourceGroupSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<ResourceGroup> {
        let path = ResourceId::resource_group(&self.subscription_id, name);
        let body = self
            .client
            .put(
                path.as_str(),
                RESOURCES_API_VERSION,
                &wire::resource_group_body(spec),
                wait,
                cancel,
            )
            .await
            .map_err(failed(ResourceKind::ResourceGroup, name))?;
        Ok(wire::parse_resource_group(body)?)
    }

    async fn delete_resource_group(
        &self,
        name: &str,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<()> {
        let path = ResourceId::resource_group(&self.subscription_id, name);
        self.client
            .delete(path.as_str(), RESOURCES_API_VERSION, wait, cancel)
            .await
            .map_err(failed(ResourceKind::ResourceGroup, name))
    }

    async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<Option<VirtualNetwork>> {
        let path = ResourceId::virtual_network(&self.subscription_id, resource_group, name);
        let body = self
            .client
            .get(path.as_str(), NETWORK_API_VERSION, cancel)
            .await
            .map_err(failed(ResourceKind::VirtualNetwork, name))?;
        Ok(body.map(wire::parse_virtual_network).transpose()?)
    }

    async fn create_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        spec: &VirtualNetworkSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<VirtualNetwork> {
        let path = ResourceId::virtual_network(&self.subscription_id, resource_group, name);
        let body = self
            .client
            .put(
                path.as_str(),
                NETWORK_API_VERSION,
                &wire::virtual_network_body(spec),
                wait,
                cancel,
            )
            .await
            .map_err(failed(ResourceKind::VirtualNetwork, name))?;
        Ok(wire::parse_virtual_network(body)?)
    }

    async fn get_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<Option<NetworkInterface>> {
        let path = ResourceId::network_interface(&self.subscription_id, resource_group, name);
        let body = self
            .client
            .get(path.as_str(), NETWORK_API_VERSION, cancel)
            .await
            .map_err(failed(ResourceKind::NetworkInterface, name))?;
        Ok(body.map(wire::parse_network_interface).transpose()?)
    }

    async fn create_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        spec: &NetworkInterfaceSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<NetworkInterface> {
        let path = ResourceId::network_interface(&self.subscription_id, resource_group, name);
        let body = self
            .client
            .put(
                path.as_str(),
                NETWORK_API_VERSION,
                &wire::network_interface_body(spec),
                wait,
                cancel,
            )
            .await
            .map_err(failed(ResourceKind::NetworkInterface, name))?;
        Ok(wire::parse_network_interface(body)?)
    }

    async fn delete_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<()> {
        let path = ResourceId::network_interface(&self.subscription_id, resource_group, name);
        self.client
            .delete(path.as_str(), NETWORK_API_VERSION, wait, cancel)
            .await
            .map_err(failed(ResourceKind::NetworkInterface, name))
    }

    async fn get_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<Option<VirtualMachine>> {
        let path = ResourceId::virtual_machine(&self.subscription_id, resource_group, name);
        let body = self
            .client
            .get(path.as_str(), COMPUTE_API_VERSION, cancel)
            .await
            .map_err(failed(ResourceKind::VirtualMachine, name))?;
        Ok(body.map(wire::parse_virtual_machine).transpose()?)
    }

    async fn create_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        spec: &VirtualMachineSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> infraflow_cloud::Result<VirtualMachine> {
        let path = ResourceId::virtual_machine(&self.subscription_id, resource_group, name);
        let body = self
            .client
            .put(
                path.as_str(),
                COMPUTE_API_VERSION,
                &wire::virtual_machine_body(spec),
                wait,
                cancel,
            )
            .await
            .map_err(failed(ResourceKind::VirtualMachine, name))?;
        Ok(wire::parse_virtual_machine(body)?)
    }
}
