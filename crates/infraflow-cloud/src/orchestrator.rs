//! Provisioning workflows
//!
//! Each workflow resolves its parents by lookup, then performs the dependent
//! creates in order. `Ok(None)` means a resource required by the workflow does
//! not exist; in that case no create call has been made. The first error
//! aborts the workflow.
//!
//! Lookup-then-create is not atomic against other writers. Two requests racing
//! to create the same name are arbitrated by the control plane, which reports
//! the loser as a 409.

use crate::error::Result;
use crate::model::{AdminAccess, ResourceGroup, VirtualMachine, VirtualNetwork, WaitUntil};
use crate::provider::ControlPlane;
use crate::resources::{network_interface, resource_group, virtual_machine, virtual_network};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Composes the per-resource primitives into the supported workflows
///
/// Holds no per-request state, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct Provisioner {
    client: Arc<dyn ControlPlane>,
    admin: AdminAccess,
}

impl Provisioner {
    pub fn new(client: Arc<dyn ControlPlane>, admin: AdminAccess) -> Self {
        Self { client, admin }
    }

    pub fn client(&self) -> &dyn ControlPlane {
        self.client.as_ref()
    }

    pub async fn create_resource_group(
        &self,
        name: &str,
        location: &str,
        cancel: &CancellationToken,
    ) -> Result<ResourceGroup> {
        let group = resource_group::create(
            self.client(),
            name,
            location,
            WaitUntil::Completed,
            cancel,
        )
        .await?;
        tracing::info!(resource_group = %group.name, id = %group.id, "Resource group created");
        Ok(group)
    }

    pub async fn get_resource_group(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ResourceGroup>> {
        resource_group::lookup(self.client(), name, cancel).await
    }

    /// Start deleting a group. Returns once the control plane accepts the
    /// request; removal of the contents continues remotely.
    pub async fn delete_resource_group(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<()>> {
        let Some(group) = self.resolve_group(name, cancel).await? else {
            return Ok(None);
        };
        resource_group::delete(self.client(), &group, WaitUntil::Started, cancel).await?;
        tracing::info!(resource_group = %group.name, "Resource group deletion accepted");
        Ok(Some(()))
    }

    pub async fn create_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VirtualNetwork>> {
        let Some(group) = self.resolve_group(resource_group, cancel).await? else {
            return Ok(None);
        };
        let vnet =
            virtual_network::create(self.client(), &group, name, WaitUntil::Completed, cancel)
                .await?;
        tracing::info!(resource_group = %group.name, vnet = %vnet.name, id = %vnet.id, "Virtual network created");
        Ok(Some(vnet))
    }

    pub async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VirtualNetwork>> {
        let Some(group) = self.resolve_group(resource_group, cancel).await? else {
            return Ok(None);
        };
        virtual_network::lookup(self.client(), &group, name, cancel).await
    }

    /// Create a machine and its network interface inside an existing network
    ///
    /// The interface is created first because the machine references it. If
    /// the machine create then fails, an interface created by this call is
    /// deleted again on a best-effort basis and the original error is
    /// returned. An interface that already existed is left alone, and nothing
    /// is attempted after a cancellation or an authorization failure.
    pub async fn create_virtual_machine(
        &self,
        resource_group: &str,
        vnet_name: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VirtualMachine>> {
        let Some(group) = self.resolve_group(resource_group, cancel).await? else {
            return Ok(None);
        };
        let Some(vnet) = virtual_network::lookup(self.client(), &group, vnet_name, cancel).await?
        else {
            tracing::info!(resource_group = %group.name, vnet = %vnet_name, "Virtual network not found");
            return Ok(None);
        };

        let existing_nic = network_interface::lookup(self.client(), &group, name, cancel).await?;
        let nic = network_interface::create(
            self.client(),
            &group,
            &vnet,
            name,
            WaitUntil::Completed,
            cancel,
        )
        .await?;

        let vm = match virtual_machine::create(
            self.client(),
            &group,
            &nic,
            name,
            &self.admin,
            WaitUntil::Completed,
            cancel,
        )
        .await
        {
            Ok(vm) => vm,
            Err(err) => {
                let rejected = err.is_cancelled() || err.status() == Some(401);
                if existing_nic.is_some() {
                    tracing::debug!(nic = %nic.id, "Keeping network interface that predates this request");
                } else if !rejected {
                    self.release_network_interface(&group, &nic, cancel).await;
                }
                return Err(err);
            }
        };

        tracing::info!(resource_group = %group.name, vm = %vm.name, id = %vm.id, "Virtual machine created");
        Ok(Some(vm))
    }

    pub async fn get_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VirtualMachine>> {
        let Some(group) = self.resolve_group(resource_group, cancel).await? else {
            return Ok(None);
        };
        virtual_machine::lookup(self.client(), &group, name, cancel).await
    }

    async fn resolve_group(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ResourceGroup>> {
        let group = resource_group::lookup(self.client(), name, cancel).await?;
        if group.is_none() {
            tracing::info!(resource_group = %name, "Resource group not found");
        }
        Ok(group)
    }

    /// Compensate for a failed machine create by removing its interface
    async fn release_network_interface(
        &self,
        group: &ResourceGroup,
        nic: &crate::model::NetworkInterface,
        cancel: &CancellationToken,
    ) {
        match network_interface::delete(self.client(), group, nic, WaitUntil::Started, cancel)
            .await
        {
            Ok(()) => {
                tracing::info!(nic = %nic.id, "Removed network interface left by failed virtual machine create");
            }
            Err(e) => {
                tracing::warn!(nic = %nic.id, error = %e, "Failed to remove orphaned network interface; manual cleanup required");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use crate::mock::{MockControlPlane, Operation};

    fn provisioner(mock: &Arc<MockControlPlane>) -> Provisioner {
        Provisioner::new(
            mock.clone(),
            AdminAccess::new("azureuser", "ssh-ed25519 AAAAC3Nza test"),
        )
    }

    fn ready_topology() -> Arc<MockControlPlane> {
        Arc::new(
            MockControlPlane::new()
                .with_resource_group("rg1", "westus")
                .with_virtual_network("rg1", "vnet1", &["Default"]),
        )
    }

    #[tokio::test]
    async fn test_create_then_get_resource_group() {
        let mock = Arc::new(MockControlPlane::new());
        let p = provisioner(&mock);
        let cancel = CancellationToken::new();

        let created = p
            .create_resource_group("rg1", "westus", &cancel)
            .await
            .unwrap();
        let found = p.get_resource_group("rg1", &cancel).await.unwrap().unwrap();

        assert_eq!(created.name, "rg1");
        assert_eq!(created.location, "westus");
        assert_eq!(found.name, "rg1");
        assert_eq!(found.location, "westus");
        assert_eq!(
            mock.calls()[0].wait,
            Some(WaitUntil::Completed),
            "group create must wait for completion"
        );
    }

    #[tokio::test]
    async fn test_get_resource_group_is_idempotent() {
        let mock = Arc::new(MockControlPlane::new().with_resource_group("rg1", "westus"));
        let p = provisioner(&mock);
        let cancel = CancellationToken::new();

        let first = p.get_resource_group("rg1", &cancel).await.unwrap();
        let second = p.get_resource_group("rg1", &cancel).await.unwrap();
        assert_eq!(first, second);
        assert!(mock.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_group_never_deletes() {
        let mock = Arc::new(MockControlPlane::new());
        let p = provisioner(&mock);

        let result = p
            .delete_resource_group("ghost", &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(mock.operations(), vec![Operation::GetResourceGroup]);
    }

    #[tokio::test]
    async fn test_delete_group_waits_only_for_acceptance() {
        let mock = Arc::new(MockControlPlane::new().with_resource_group("rg1", "westus"));
        let p = provisioner(&mock);

        let result = p
            .delete_resource_group("rg1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, Some(()));
        let delete = mock.mutations().pop().unwrap();
        assert_eq!(delete.operation, Operation::DeleteResourceGroup);
        assert_eq!(delete.wait, Some(WaitUntil::Started));
    }

    #[tokio::test]
    async fn test_create_vnet_without_group_is_not_found() {
        let mock = Arc::new(MockControlPlane::new());
        let p = provisioner(&mock);

        let result = p
            .create_virtual_network("rg1", "vnet1", &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(mock.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_create_vnet_inherits_group_location() {
        let mock = Arc::new(MockControlPlane::new().with_resource_group("rg1", "eastus2"));
        let p = provisioner(&mock);

        let vnet = p
            .create_virtual_network("rg1", "vnet1", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(vnet.location.as_deref(), Some("eastus2"));
        assert_eq!(vnet.id.name(), "vnet1");
        assert_eq!(vnet.subnets.len(), 1);
        assert_eq!(vnet.subnets[0].name, "Default");
    }

    #[tokio::test]
    async fn test_get_vnet_requires_group() {
        let mock = Arc::new(MockControlPlane::new());
        let p = provisioner(&mock);

        let result = p
            .get_virtual_network("rg1", "vnet1", &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(mock.operations(), vec![Operation::GetResourceGroup]);
    }

    #[tokio::test]
    async fn test_create_vm_creates_nic_first() {
        let mock = ready_topology();
        let p = provisioner(&mock);

        let vm = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(vm.id.name(), "vm1");
        assert_eq!(
            mock.operations(),
            vec![
                Operation::GetResourceGroup,
                Operation::GetVirtualNetwork,
                Operation::GetNetworkInterface,
                Operation::CreateNetworkInterface,
                Operation::CreateVirtualMachine,
            ]
        );
        let nic_call = &mock.mutations()[0];
        assert_eq!(nic_call.name, "vm1-nic");
        assert_eq!(nic_call.wait, Some(WaitUntil::Completed));
        assert!(mock.has_network_interface("rg1", "vm1-nic"));
    }

    #[tokio::test]
    async fn test_create_vm_without_vnet_is_not_found() {
        let mock = Arc::new(MockControlPlane::new().with_resource_group("rg1", "westus"));
        let p = provisioner(&mock);

        let result = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(mock.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_create_vm_without_group_skips_vnet_lookup() {
        let mock = Arc::new(MockControlPlane::new());
        let p = provisioner(&mock);

        let result = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(mock.operations(), vec![Operation::GetResourceGroup]);
    }

    #[tokio::test]
    async fn test_create_vm_in_vnet_without_subnet_fails() {
        let mock = Arc::new(
            MockControlPlane::new()
                .with_resource_group("rg1", "westus")
                .with_virtual_network("rg1", "vnet1", &[]),
        );
        let p = provisioner(&mock);

        let err = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::MissingSubnet(ref n) if n == "vnet1"));
        assert!(mock.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_failed_vm_create_releases_nic() {
        let mock = ready_topology();
        mock.fail(Operation::CreateVirtualMachine, 409, "Conflict on vm1");
        let p = provisioner(&mock);

        let err = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "Conflict on vm1");
        let release = mock.mutations().pop().unwrap();
        assert_eq!(release.operation, Operation::DeleteNetworkInterface);
        assert_eq!(release.name, "vm1-nic");
        assert_eq!(release.wait, Some(WaitUntil::Started));
        assert!(!mock.has_network_interface("rg1", "vm1-nic"));
    }

    #[tokio::test]
    async fn test_failed_release_keeps_original_error() {
        let mock = ready_topology();
        mock.fail(Operation::CreateVirtualMachine, 400, "InvalidParameter");
        mock.fail(Operation::DeleteNetworkInterface, 500, "boom");
        let p = provisioner(&mock);

        let err = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "InvalidParameter");
    }

    #[tokio::test]
    async fn test_unauthorized_vm_create_is_not_compensated() {
        let mock = ready_topology();
        mock.fail(Operation::CreateVirtualMachine, 401, "Unauthorized");
        let p = provisioner(&mock);

        let err = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(
            mock.operations().last(),
            Some(&Operation::CreateVirtualMachine)
        );
    }

    #[tokio::test]
    async fn test_failed_update_keeps_existing_nic() {
        let mock = ready_topology();
        let p = provisioner(&mock);
        let cancel = CancellationToken::new();

        p.create_virtual_machine("rg1", "vnet1", "vm1", &cancel)
            .await
            .unwrap()
            .unwrap();

        mock.fail(
            Operation::CreateVirtualMachine,
            409,
            "Changing property 'linuxConfiguration.ssh.publicKeys' is not allowed.",
        );
        let err = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert!(mock.has_virtual_machine("rg1", "vm1"));
        assert!(mock.has_network_interface("rg1", "vm1-nic"));
        assert!(
            !mock
                .operations()
                .contains(&Operation::DeleteNetworkInterface)
        );
    }

    #[tokio::test]
    async fn test_unauthorized_stops_workflow() {
        let mock = ready_topology();
        mock.fail(Operation::GetVirtualNetwork, 401, "Unauthorized");
        let p = provisioner(&mock);

        let err = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(mock.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_get_vm_without_data_is_absent() {
        let mock = Arc::new(
            MockControlPlane::new()
                .with_resource_group("rg1", "westus")
                .with_unrealized_virtual_machine("rg1", "vm1"),
        );
        let p = provisioner(&mock);

        let result = p
            .get_virtual_machine("rg1", "vm1", &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_request_stops_before_create() {
        let mock = ready_topology();
        let p = provisioner(&mock);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = p
            .create_virtual_machine("rg1", "vnet1", "vm1", &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(mock.mutations().is_empty());
    }
}
