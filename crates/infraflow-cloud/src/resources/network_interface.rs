//! Network interface primitives
//!
//! Interfaces are never exposed on their own; they exist only as the first
//! step of creating a virtual machine.

use crate::error::{CloudError, Result};
use crate::model::{
    NetworkInterface, NetworkInterfaceSpec, ResourceGroup, VirtualNetwork, WaitUntil,
};
use crate::provider::ControlPlane;
use tokio_util::sync::CancellationToken;

/// Name of the interface owned by machine `vm_name`
pub fn name_for(vm_name: &str) -> String {
    format!("{vm_name}-nic")
}

/// Look up the interface owned by machine `vm_name`
pub async fn lookup(
    client: &dyn ControlPlane,
    group: &ResourceGroup,
    vm_name: &str,
    cancel: &CancellationToken,
) -> Result<Option<NetworkInterface>> {
    let name = name_for(vm_name);
    tracing::debug!(resource_group = %group.name, nic = %name, "Looking up network interface");
    client.get_network_interface(&group.name, &name, cancel).await
}

/// Create the interface for machine `vm_name`, bound to the network's subnet
pub async fn create(
    client: &dyn ControlPlane,
    group: &ResourceGroup,
    vnet: &VirtualNetwork,
    vm_name: &str,
    wait: WaitUntil,
    cancel: &CancellationToken,
) -> Result<NetworkInterface> {
    let subnet = vnet
        .primary_subnet()
        .ok_or_else(|| CloudError::MissingSubnet(vnet.name.clone()))?;

    let name = name_for(vm_name);
    let spec = NetworkInterfaceSpec {
        location: group.location.clone(),
        ip_configuration_name: format!("{name}-config"),
        subnet_id: subnet.id.clone(),
    };

    tracing::debug!(
        resource_group = %group.name,
        nic = %name,
        subnet = %subnet.id,
        %wait,
        "Creating network interface"
    );
    client
        .create_network_interface(&group.name, &name, &spec, wait, cancel)
        .await
}

pub async fn delete(
    client: &dyn ControlPlane,
    group: &ResourceGroup,
    nic: &NetworkInterface,
    wait: WaitUntil,
    cancel: &CancellationToken,
) -> Result<()> {
    tracing::debug!(resource_group = %group.name, nic = %nic.name, %wait, "Deleting network interface");
    client
        .delete_network_interface(&group.name, &nic.name, wait, cancel)
        .await
}
