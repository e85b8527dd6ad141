//! Virtual machine primitives

use crate::error::Result;
use crate::model::{
    AdminAccess, ImageReference, NetworkInterface, OS_DISK_STORAGE_TYPE, OsDiskSpec,
    ResourceGroup, SecuritySpec, VM_SIZE, VirtualMachine, VirtualMachineSpec, WaitUntil,
};
use crate::provider::ControlPlane;
use tokio_util::sync::CancellationToken;

/// Look up a machine. A machine without realized data counts as absent.
pub async fn lookup(
    client: &dyn ControlPlane,
    group: &ResourceGroup,
    name: &str,
    cancel: &CancellationToken,
) -> Result<Option<VirtualMachine>> {
    tracing::debug!(resource_group = %group.name, vm = %name, "Looking up virtual machine");
    let vm = client.get_virtual_machine(&group.name, name, cancel).await?;
    Ok(vm.filter(VirtualMachine::has_data))
}

/// The fixed machine shape, attached to `nic`
pub fn spec_for(
    group: &ResourceGroup,
    nic: &NetworkInterface,
    name: &str,
    admin: &AdminAccess,
) -> VirtualMachineSpec {
    VirtualMachineSpec {
        location: group.location.clone(),
        size: VM_SIZE.to_string(),
        computer_name: name.to_string(),
        image: ImageReference::ubuntu_2404(),
        os_disk: OsDiskSpec {
            storage_account_type: OS_DISK_STORAGE_TYPE.to_string(),
            delete_with_vm: true,
        },
        security: SecuritySpec {
            trusted_launch: true,
            secure_boot: true,
            virtual_tpm: true,
            hibernation: false,
        },
        admin: admin.clone(),
        network_interface_id: nic.id.clone(),
    }
}

pub async fn create(
    client: &dyn ControlPlane,
    group: &ResourceGroup,
    nic: &NetworkInterface,
    name: &str,
    admin: &AdminAccess,
    wait: WaitUntil,
    cancel: &CancellationToken,
) -> Result<VirtualMachine> {
    let spec = spec_for(group, nic, name, admin);
    tracing::debug!(resource_group = %group.name, vm = %name, nic = %nic.id, %wait, "Creating virtual machine");
    client
        .create_virtual_machine(&group.name, name, &spec, wait, cancel)
        .await
}
