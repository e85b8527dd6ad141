//! Virtual network primitives

use crate::error::Result;
use crate::model::{
    ResourceGroup, SUBNET_ADDRESS_PREFIX, SUBNET_NAME, SubnetSpec, VNET_ADDRESS_PREFIX,
    VirtualNetwork, VirtualNetworkSpec, WaitUntil,
};
use crate::provider::ControlPlane;
use tokio_util::sync::CancellationToken;

pub async fn lookup(
    client: &dyn ControlPlane,
    group: &ResourceGroup,
    name: &str,
    cancel: &CancellationToken,
) -> Result<Option<VirtualNetwork>> {
    tracing::debug!(resource_group = %group.name, vnet = %name, "Looking up virtual network");
    client.get_virtual_network(&group.name, name, cancel).await
}

/// The fixed address plan: one /16 space with a single /24 subnet
pub fn address_plan(location: &str) -> VirtualNetworkSpec {
    VirtualNetworkSpec {
        location: location.to_string(),
        address_prefixes: vec![VNET_ADDRESS_PREFIX.to_string()],
        subnets: vec![SubnetSpec {
            name: SUBNET_NAME.to_string(),
            address_prefix: SUBNET_ADDRESS_PREFIX.to_string(),
        }],
    }
}

/// Create a network in `group`, placed in the group's location
pub async fn create(
    client: &dyn ControlPlane,
    group: &ResourceGroup,
    name: &str,
    wait: WaitUntil,
    cancel: &CancellationToken,
) -> Result<VirtualNetwork> {
    let spec = address_plan(&group.location);
    tracing::debug!(resource_group = %group.name, vnet = %name, %wait, "Creating virtual network");
    client
        .create_virtual_network(&group.name, name, &spec, wait, cancel)
        .await
}
